//! Learner-state readers.
//!
//! Each reader goes through the [`ContextAggregator`]'s per-source fetches,
//! so a store failure yields the same default the aggregator would use.

use std::sync::Arc;

use async_trait::async_trait;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use edupilot_core::{MemoryLayer, RunContext};
use edupilot_memory::ContextAggregator;
use serde_json::json;

use crate::{opt_str, to_json};

fn no_arguments() -> serde_json::Value {
    json!({ "type": "object", "properties": {} })
}

/// Returns the learner's profile.
pub struct GetLearnerProfileTool {
    aggregator: Arc<ContextAggregator>,
}

impl GetLearnerProfileTool {
    pub fn new(aggregator: Arc<ContextAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Tool for GetLearnerProfileTool {
    fn id(&self) -> ToolName {
        ToolName::GetLearnerProfile
    }

    fn description(&self) -> &str {
        "Get the learner's profile: display name, grade level and learning period \
         (school, exam_prep or vacation)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_arguments()
    }

    async fn execute(&self, _arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let profile = self.aggregator.profile(&ctx.child_id).await;
        Ok(ToolResult::ok(to_json(&profile)))
    }
}

/// Returns mastery statistics.
pub struct GetMasteryStatsTool {
    aggregator: Arc<ContextAggregator>,
}

impl GetMasteryStatsTool {
    pub fn new(aggregator: Arc<ContextAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Tool for GetMasteryStatsTool {
    fn id(&self) -> ToolName {
        ToolName::GetMasteryStats
    }

    fn description(&self) -> &str {
        "Get mastery statistics: average mastery, weakest and strongest knowledge points, \
         recent error rate and how many points are mastered."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_arguments()
    }

    async fn execute(&self, _arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let stats = self.aggregator.mastery(&ctx.child_id).await;
        let mut data = to_json(&stats);
        data["mastered_ratio"] = json!(stats.mastered_ratio());
        Ok(ToolResult::ok(data))
    }
}

/// Returns behavior signals from recent sessions.
pub struct GetBehaviorSignalsTool {
    aggregator: Arc<ContextAggregator>,
}

impl GetBehaviorSignalsTool {
    pub fn new(aggregator: Arc<ContextAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Tool for GetBehaviorSignalsTool {
    fn id(&self) -> ToolName {
        ToolName::GetBehaviorSignals
    }

    fn description(&self) -> &str {
        "Get behavior signals from recent sessions: abandon rate, average completion time, \
         performance trend and number of completed tasks."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_arguments()
    }

    async fn execute(&self, _arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let signals = self.aggregator.behavior(&ctx.child_id).await;
        Ok(ToolResult::ok(to_json(&signals)))
    }
}

/// Returns memory records, optionally from one layer.
pub struct GetMemoriesTool {
    aggregator: Arc<ContextAggregator>,
}

impl GetMemoriesTool {
    pub fn new(aggregator: Arc<ContextAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Tool for GetMemoriesTool {
    fn id(&self) -> ToolName {
        ToolName::GetMemories
    }

    fn description(&self) -> &str {
        "Get remembered observations about the learner. Filter by layer: ephemeral \
         (session notes), hypothesis (tentative beliefs) or stable (confirmed patterns). \
         Omit the layer to get all of them."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "layer": {
                    "type": "string",
                    "enum": ["ephemeral", "hypothesis", "stable"],
                    "description": "Memory layer to read (default: all layers)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let layer = opt_str(&arguments, "layer")
            .map(str::parse::<MemoryLayer>)
            .transpose()
            .map_err(ToolError::InvalidArguments)?;

        let records = self.aggregator.memories(&ctx.child_id, layer).await;
        Ok(ToolResult::ok(json!({
            "count": records.len(),
            "records": to_json(&records),
        })))
    }
}
