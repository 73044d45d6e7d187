//! Meta-cognition tools. They only echo their input back, which puts the
//! model's reasoning into the run trace; both always succeed.

use async_trait::async_trait;
use edupilot_core::RunContext;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use serde_json::json;

use crate::opt_str;

pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn id(&self) -> ToolName {
        ToolName::Think
    }

    fn description(&self) -> &str {
        "Think step by step before acting. Record your reasoning about the learner and \
         what to do next. Has no side effects."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "thought": { "type": "string", "description": "Your reasoning" }
            },
            "required": ["thought"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &RunContext) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(json!({
            "recorded": true,
            "thought": opt_str(&arguments, "thought").unwrap_or_default(),
        })))
    }
}

pub struct ReflectTool;

#[async_trait]
impl Tool for ReflectTool {
    fn id(&self) -> ToolName {
        ToolName::Reflect
    }

    fn description(&self) -> &str {
        "Reflect on a tool result: what you observed and what you will do next. \
         Has no side effects."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "observation": { "type": "string", "description": "What you noticed" },
                "next_step": { "type": "string", "description": "What you will do next" }
            },
            "required": ["observation"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &RunContext) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(json!({
            "recorded": true,
            "observation": opt_str(&arguments, "observation").unwrap_or_default(),
            "next_step": opt_str(&arguments, "next_step").unwrap_or_default(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ctx;

    #[tokio::test]
    async fn think_echoes() {
        let result = ThinkTool
            .execute(json!({"thought": "先看掌握度"}), &ctx())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["thought"], "先看掌握度");
    }

    #[tokio::test]
    async fn reflect_never_fails() {
        let result = ReflectTool.execute(json!(null), &ctx()).await.unwrap();
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["observation"], "");
        assert_eq!(data["next_step"], "");
    }
}
