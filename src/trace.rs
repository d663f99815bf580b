//
//  trace.rs
//  Lattice
//
//  Created by hak (tharun)
//

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// One causal-reasoning-stack record. Emitted by every analytics
/// operation and attached to the tool result so the consuming agent can
/// justify its answers.
#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub id: Uuid,
    /// What was done, e.g. "pagerank", "scc_decomposition".
    pub action: String,
    /// What it was done to, e.g. a symbol id or "graph".
    pub target: String,
    /// The tool that triggered the operation.
    pub tool: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Free-form metadata bag: iteration counts, convergence, sizes.
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceStep {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            target: target.into(),
            tool: String::new(),
            started_at: Utc::now(),
            duration_ms: 0,
            metadata: Map::new(),
            error: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn meta(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Record elapsed time from `started_at` to now.
    pub fn finish(&mut self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}

/// A tool output: structured payload plus a human-readable rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    /// Typed output, serialized. Empty object on failure — tools never
    /// produce partial structured outputs.
    pub output: Value,
    /// Marker-annotated text report.
    pub output_text: String,
    pub tokens_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_step: Option<TraceStep>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error-kind string, e.g. "not-found".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl ToolResult {
    /// Successful result from a typed output and its text rendering.
    pub fn ok(output: Value, output_text: String) -> Self {
        let tokens_used = estimate_tokens(&output_text);
        Self {
            success: true,
            output,
            output_text,
            tokens_used,
            trace_step: None,
            duration_ms: 0,
            error: None,
            error_kind: None,
        }
    }

    /// Failed result. No structured payload, just the error text.
    pub fn fail(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            output: Value::Object(Map::new()),
            output_text: error.clone(),
            tokens_used: estimate_tokens(&error),
            trace_step: None,
            duration_ms: 0,
            error: Some(error),
            error_kind: None,
        }
    }

    /// Failed result carrying the taxonomy kind of the source error.
    pub fn from_error(err: &crate::error::LatticeError) -> Self {
        let mut result = Self::fail(err.to_string());
        result.error_kind = Some(err.kind());
        result
    }

    pub fn with_trace(mut self, trace: TraceStep) -> Self {
        self.trace_step = Some(trace);
        self
    }
}

/// Rough token estimate: ~4 characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_step_metadata() {
        let mut step = TraceStep::new("pagerank", "graph").with_tool("find_important");
        step.meta("iterations", 42);
        step.meta("converged", true);
        step.finish();

        assert_eq!(step.action, "pagerank");
        assert_eq!(step.tool, "find_important");
        assert_eq!(step.metadata.get("iterations"), Some(&Value::from(42)));
        assert_eq!(step.metadata.get("converged"), Some(&Value::from(true)));
    }

    #[test]
    fn test_failed_result_has_no_structured_output() {
        let result = ToolResult::fail("symbol not found: 'render'");
        assert!(!result.success);
        assert_eq!(result.output, Value::Object(Map::new()));
        assert!(result.error.as_deref().unwrap().contains("render"));
    }

    #[test]
    fn test_token_estimate() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
