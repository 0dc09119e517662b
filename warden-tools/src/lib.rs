pub mod error;
pub mod evidence;
pub mod execution_context;
pub mod generator;
pub mod registry;
pub mod sandbox;
pub mod tools;
pub mod traits;

pub use error::{DenialReason, ToolError};
pub use evidence::{EvidenceError, EvidenceEvent, EvidenceSink};
pub use execution_context::ExecutionContext;
pub use generator::{ExtractiveGenerator, TextGenerator};
pub use registry::{RegisteredTool, ToolRegistry};
pub use sandbox::{ContentGuard, SandboxBoundary};
pub use tools::{register_builtin_tools, OwnerClass, Tool};
pub use traits::{AuthDecision, Authorizer};
