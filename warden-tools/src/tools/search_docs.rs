use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::tools::base::{parse_input, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const CORPUS: &[(&str, &str, f64)] = &[
    (
        "Project X compliance status: All regulatory requirements met as of Q4 2024.",
        "compliance_report_q4.pdf",
        0.95,
    ),
    (
        "Security audit findings: No critical vulnerabilities detected. Minor issues addressed.",
        "security_audit_2024.pdf",
        0.88,
    ),
    (
        "Data governance: All PII handling procedures follow GDPR guidelines.",
        "data_governance_policy.pdf",
        0.82,
    ),
];

#[derive(Deserialize)]
struct SearchInput {
    query: String,
}

/// Read-only search over a fixed document corpus.
pub struct SearchDocsTool;

#[async_trait]
impl Tool for SearchDocsTool {
    fn name(&self) -> &'static str {
        "search_docs"
    }

    fn description(&self) -> &'static str {
        "Searches the document corpus"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"}
            },
            "required": ["query"]
        })
    }

    fn max_calls(&self) -> u32 {
        10
    }

    async fn execute(&self, _ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: SearchInput = parse_input(input)?;
        let hits: Vec<Value> = CORPUS
            .iter()
            .map(|(text, source, score)| json!({"text": text, "source": source, "score": score}))
            .collect();

        Ok(json!({
            "query": input.query,
            "count": hits.len(),
            "hits": hits,
        }))
    }
}
