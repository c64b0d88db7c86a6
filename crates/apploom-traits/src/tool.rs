//! The tool seam between the agent loop and anything it can invoke.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// What a tool advertises to the model: name, description and a JSON
/// Schema object for its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// The text fed back to the model for this invocation. Plain strings
    /// pass through, structured results are JSON-encoded, a null result
    /// reads as no output at all.
    pub fn as_llm_content(&self) -> String {
        if !self.success {
            let reason = self.error.as_deref().unwrap_or("tool execution failed");
            return format!("Error: {reason}");
        }
        match &self.result {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            structured => structured.to_string(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema object describing the input.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<ToolOutput>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn llm_content_for_success() {
        let structured = ToolOutput::success(json!({"stdout": "ok"}));
        assert_eq!(structured.as_llm_content(), r#"{"stdout":"ok"}"#);

        let text = ToolOutput::success(Value::String("plain".into()));
        assert_eq!(text.as_llm_content(), "plain");

        let nothing = ToolOutput::success(Value::Null);
        assert_eq!(nothing.as_llm_content(), "");
    }

    #[test]
    fn llm_content_for_errors_is_prefixed() {
        let output = ToolOutput::error("disk full");
        assert_eq!(output.as_llm_content(), "Error: disk full");
    }
}
