//! Text-generation collaborator used by the summarization and report tools.

use crate::error::ToolError;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, ToolError>;

    async fn compose_report(&self, title: &str, body: &str) -> Result<String, ToolError>;
}

/// Deterministic generator: keeps the leading sentences of the input.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl ExtractiveGenerator {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl TextGenerator for ExtractiveGenerator {
    async fn summarize(&self, text: &str) -> Result<String, ToolError> {
        let sentences: Vec<&str> = text
            .split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(self.max_sentences)
            .collect();
        Ok(sentences.join(" "))
    }

    async fn compose_report(&self, title: &str, body: &str) -> Result<String, ToolError> {
        Ok(format!("{}\n\n{}\n", title, body.trim()))
    }
}

/// Bounds one generation call; generation may take minutes but never blocks
/// indefinitely.
pub async fn bounded<F>(timeout: Duration, call: F) -> Result<String, ToolError>
where
    F: std::future::Future<Output = Result<String, ToolError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ToolError::Timeout),
    }
}
