//! Decision wrapper: aggregate today's context and run the intent engine.

use std::sync::Arc;

use async_trait::async_trait;
use edupilot_core::RunContext;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use edupilot_memory::ContextAggregator;
use edupilot_pedagogy::decide_intent;
use serde_json::json;

use crate::{caregiver_from_args, to_json};

pub struct DecideTeachingIntentTool {
    aggregator: Arc<ContextAggregator>,
}

impl DecideTeachingIntentTool {
    pub fn new(aggregator: Arc<ContextAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Tool for DecideTeachingIntentTool {
    fn id(&self) -> ToolName {
        ToolName::DecideTeachingIntent
    }

    fn description(&self) -> &str {
        "Decide today's teaching intent (reinforce, verify, challenge, lighten, introduce or \
         pause) from the learner's mastery, behavior and emotional state. Returns the intent, \
         the rule that fired, focus knowledge points, question count and difficulty."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "caregiver_kind": {
                    "type": "string",
                    "enum": ["emotion_report", "schedule_change", "other"],
                    "description": "Kind of caregiver note, if one was given"
                },
                "caregiver_note": {
                    "type": "string",
                    "description": "The caregiver's note"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let caregiver = caregiver_from_args(&arguments).or_else(|| ctx.caregiver_signal.clone());
        let context = self.aggregator.get_context(&ctx.child_id, ctx.today).await;
        let intent = decide_intent(&context, caregiver.as_ref());

        let mut data = to_json(&intent);
        data["emotion_signal"] = json!(context.emotion_signal.as_str());
        data["avg_mastery"] = json!(context.mastery_stats.avg_mastery);
        Ok(ToolResult::ok(data))
    }
}
