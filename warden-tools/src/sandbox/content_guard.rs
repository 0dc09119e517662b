use crate::error::ToolError;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Destination/action indicators that mark outward-bound content as an
/// exfiltration attempt.
pub const DEFAULT_EXFIL_PATTERNS: &[&str] = &[
    "exfiltrat",
    "attacker@",
    r"send.*to.*@.*\.com",
    r"leak.*data",
    r"steal.*information",
    r"transfer.*to.*external",
];

/// Case-insensitive pattern check run by every tool whose payload shapes
/// outward-visible content, before its side effect happens.
#[derive(Debug, Clone)]
pub struct ContentGuard {
    patterns: Vec<(String, Regex)>,
}

impl ContentGuard {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ToolError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (p.to_string(), re))
                    .map_err(|e| {
                        ToolError::ValidationError(format!("Invalid guard pattern '{}': {}", p, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn check(&self, tool_name: &str, text: &str) -> Result<(), ToolError> {
        if let Some((pattern, _)) = self.patterns.iter().find(|(_, re)| re.is_match(text)) {
            warn!("Content guard matched '{}' in {} payload", pattern, tool_name);
            return Err(ToolError::ExfiltrationDetected {
                tool_name: tool_name.to_string(),
                pattern: pattern.clone(),
            });
        }
        Ok(())
    }
}

impl Default for ContentGuard {
    fn default() -> Self {
        let patterns = DEFAULT_EXFIL_PATTERNS
            .iter()
            .map(|p| (p.to_string(), RegexBuilder::new(p).case_insensitive(true).build()))
            .filter_map(|(p, re)| re.ok().map(|re| (p, re)))
            .collect();
        Self { patterns }
    }
}
