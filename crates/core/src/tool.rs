//! Tool trait — the abstraction over orchestration capabilities.
//!
//! The catalog is fixed: every tool is identified by a [`ToolName`] variant,
//! and the model's string tool names are parsed into that enum at lookup, so
//! an unknown name is rejected before any execution starts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::run::RunContext;

/// Identity of every tool in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    GetLearnerProfile,
    GetMasteryStats,
    GetBehaviorSignals,
    GetMemories,
    GetLearningSchedule,
    DecideTeachingIntent,
    GenerateLearningContent,
    GenerateFeedback,
    WriteMemory,
    Think,
    Reflect,
}

impl ToolName {
    pub const ALL: [ToolName; 11] = [
        Self::GetLearnerProfile,
        Self::GetMasteryStats,
        Self::GetBehaviorSignals,
        Self::GetMemories,
        Self::GetLearningSchedule,
        Self::DecideTeachingIntent,
        Self::GenerateLearningContent,
        Self::GenerateFeedback,
        Self::WriteMemory,
        Self::Think,
        Self::Reflect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetLearnerProfile => "get_learner_profile",
            Self::GetMasteryStats => "get_mastery_stats",
            Self::GetBehaviorSignals => "get_behavior_signals",
            Self::GetMemories => "get_memories",
            Self::GetLearningSchedule => "get_learning_schedule",
            Self::DecideTeachingIntent => "decide_teaching_intent",
            Self::GenerateLearningContent => "generate_learning_content",
            Self::GenerateFeedback => "generate_feedback",
            Self::WriteMemory => "write_memory",
            Self::Think => "think",
            Self::Reflect => "reflect",
        }
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::NotFound(s.to_string()))
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute, as sent by the model
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content fed back to the model
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result whose output is the JSON rendering of `data`.
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: data.to_string(),
            data: Some(data),
        }
    }

    /// A failed result in the `{success:false, error}` shape.
    pub fn failure(error: impl Into<String>) -> Self {
        let data = serde_json::json!({ "success": false, "error": error.into() });
        Self {
            call_id: String::new(),
            success: false,
            output: data.to_string(),
            data: Some(data),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The catalog identity of this tool.
    fn id(&self) -> ToolName;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments in the scope of one run.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &RunContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.id().as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The orchestration loop uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Look up and execute tools when the model requests them
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same identity.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.id(), tool);
    }

    /// Resolve a model-supplied name into a registered tool.
    pub fn lookup(&self, name: &str) -> std::result::Result<&dyn Tool, ToolError> {
        let id: ToolName = name.parse()?;
        self.get(id).ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn get(&self, id: ToolName) -> Option<&dyn Tool> {
        self.tools.get(&id).map(|t| t.as_ref())
    }

    /// All tool definitions, in catalog order (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool call.
    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &RunContext,
    ) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.lookup(&call.name)?;
        let mut result = tool.execute(call.arguments.clone(), ctx).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// Registered tool identities, sorted.
    pub fn ids(&self) -> Vec<ToolName> {
        let mut ids: Vec<ToolName> = self.tools.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// A minimal tool for registry tests.
    struct EchoThought;

    #[async_trait]
    impl Tool for EchoThought {
        fn id(&self) -> ToolName {
            ToolName::Think
        }
        fn description(&self) -> &str {
            "Echoes the thought back"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "thought": { "type": "string" } },
                "required": ["thought"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            _ctx: &RunContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            Ok(ToolResult::ok(arguments))
        }
    }

    fn ctx() -> RunContext {
        RunContext::new("kid", NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())
    }

    #[test]
    fn tool_names_roundtrip() {
        for id in ToolName::ALL {
            assert_eq!(id.as_str().parse::<ToolName>().unwrap(), id);
        }
    }

    #[test]
    fn unknown_name_rejected_at_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoThought));
        assert!(matches!(registry.lookup("shell"), Err(ToolError::NotFound(_))));
        assert!(registry.lookup("think").is_ok());
        // Known name, but not registered
        assert!(matches!(registry.lookup("reflect"), Err(ToolError::NotFound(_))));
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoThought));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "think");
    }

    #[tokio::test]
    async fn execute_sets_call_id() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoThought));
        let call = ToolCall {
            id: "call_1".into(),
            name: "think".into(),
            arguments: serde_json::json!({"thought": "start with mastery"}),
        };
        let result = registry.execute(&call, &ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.call_id, "call_1");
        assert!(result.output.contains("start with mastery"));
    }

    #[test]
    fn failure_shape() {
        let result = ToolResult::failure("upstream timeout");
        assert!(!result.success);
        let data = result.data.unwrap();
        assert_eq!(data["success"], false);
        assert_eq!(data["error"], "upstream timeout");
    }
}
