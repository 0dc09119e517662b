pub mod base;
pub mod check_policy;
pub mod generate_report;
pub mod list_files;
pub mod read_file;
pub mod search_docs;
pub mod send_email;
pub mod summarize;
pub mod write_file;

pub use base::{OwnerClass, Tool};
pub use check_policy::CheckPolicyTool;
pub use generate_report::GenerateReportTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use search_docs::SearchDocsTool;
pub use send_email::SendEmailTool;
pub use summarize::SummarizeFindingsTool;
pub use write_file::WriteToFileTool;

use crate::error::ToolError;
use crate::generator::TextGenerator;
use crate::registry::ToolRegistry;
use crate::sandbox::ContentGuard;
use std::sync::Arc;
use std::time::Duration;

/// Registers the standard research/analysis/writing tool set.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    generator: Arc<dyn TextGenerator>,
    guard: Arc<ContentGuard>,
    generation_timeout: Duration,
) -> Result<(), ToolError> {
    registry
        .register(Arc::new(SearchDocsTool))?
        .register(Arc::new(SummarizeFindingsTool::new(
            generator.clone(),
            generation_timeout,
        )))?
        .register(Arc::new(CheckPolicyTool))?
        .register(Arc::new(GenerateReportTool::new(
            generator,
            guard.clone(),
            generation_timeout,
        )))?
        .register(Arc::new(WriteToFileTool::new(guard.clone())))?
        .register(Arc::new(ReadFileTool))?
        .register(Arc::new(ListFilesTool))?
        .register(Arc::new(SendEmailTool::new(guard)))?;
    Ok(())
}
