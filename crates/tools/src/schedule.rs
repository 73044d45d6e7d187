//! Schedule reader: today's effective mode and, given a material type, the
//! learning decision for it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use edupilot_core::RunContext;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use edupilot_memory::ContextAggregator;
use edupilot_pedagogy::{MaterialType, ScheduleResolver};
use serde_json::json;

use crate::{opt_str, to_json};

pub struct GetLearningScheduleTool {
    aggregator: Arc<ContextAggregator>,
    resolver: Arc<ScheduleResolver>,
}

impl GetLearningScheduleTool {
    pub fn new(aggregator: Arc<ContextAggregator>, resolver: Arc<ScheduleResolver>) -> Self {
        Self { aggregator, resolver }
    }
}

#[async_trait]
impl Tool for GetLearningScheduleTool {
    fn id(&self) -> ToolName {
        ToolName::GetLearningSchedule
    }

    fn description(&self) -> &str {
        "Resolve today's learning schedule. Returns the effective mode (daily_light, \
         weekend_review, exam_prep or vacation) and, when a material type is known, how the \
         material should be presented and how many practice items are allowed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let materials: Vec<&str> = MaterialType::ALL.iter().map(|m| m.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "material_type": {
                    "type": "string",
                    "enum": materials,
                    "description": "Type of the uploaded material (default: the run's material type)"
                },
                "date": {
                    "type": "string",
                    "description": "Date to plan for, YYYY-MM-DD (default: today)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let date = match opt_str(&arguments, "date") {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| ToolError::InvalidArguments(format!("date '{raw}': {e}")))?,
            None => ctx.today,
        };
        let material = opt_str(&arguments, "material_type").or(ctx.material_type.as_deref());

        let profile = self.aggregator.profile(&ctx.child_id).await;
        let resolution = self
            .resolver
            .resolve_schedule(profile.learning_period, date, material);

        tracing::debug!(
            child_id = %ctx.child_id,
            mode = %resolution.effective_mode,
            material = ?material,
            "Schedule resolved"
        );

        let mut data = to_json(&resolution);
        data["date"] = json!(date.to_string());
        data["learning_period"] = json!(profile.learning_period.as_str());
        Ok(ToolResult::ok(data))
    }
}
