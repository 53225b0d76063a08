//! Echo 工具（测试 / 探活用）

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::tools::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tools::Tool;

/// Echo 工具：回显文本
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text (for testing). Args: {\"text\": \"message\"}"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![ParamSpec::optional(
            "text",
            ParamKind::String,
            "text to echo back",
        )])
    }

    async fn execute(&self, args: &HashMap<String, String>) -> Result<String, AgentError> {
        Ok(args
            .get("text")
            .map(String::as_str)
            .unwrap_or("(empty)")
            .to_string())
    }
}
