pub mod boundary;
pub mod content_guard;

pub use boundary::SandboxBoundary;
pub use content_guard::{ContentGuard, DEFAULT_EXFIL_PATTERNS};
