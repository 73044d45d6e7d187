//! Feedback-only generation, used for essays and other work that should be
//! commented on rather than turned into practice items.

use std::sync::Arc;

use async_trait::async_trait;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use edupilot_core::{ContentGenerator, GenerationPhase, GenerationRequest, RunContext};
use edupilot_memory::ContextAggregator;
use serde_json::json;
use tracing::warn;

use crate::opt_str;

pub struct GenerateFeedbackTool {
    aggregator: Arc<ContextAggregator>,
    generator: Arc<dyn ContentGenerator>,
}

impl GenerateFeedbackTool {
    pub fn new(aggregator: Arc<ContextAggregator>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { aggregator, generator }
    }
}

#[async_trait]
impl Tool for GenerateFeedbackTool {
    fn id(&self) -> ToolName {
        ToolName::GenerateFeedback
    }

    fn description(&self) -> &str {
        "Write caring, specific feedback on the learner's uploaded work (for example an essay). \
         Produces an analysis with strengths and suggestions, never practice items."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "instruction": {
                    "type": "string",
                    "description": "What the feedback should concentrate on"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let (profile, mastery) = tokio::join!(
            self.aggregator.profile(&ctx.child_id),
            self.aggregator.mastery(&ctx.child_id),
        );

        let request = GenerationRequest {
            phase: GenerationPhase::Feedback,
            instruction: opt_str(&arguments, "instruction").unwrap_or_default().to_string(),
            attachments: ctx.attachments.clone(),
            grade_level: profile.grade_level,
            recent_accuracy: 1.0 - mastery.recent_error_rate,
            question_count: 0,
            teaching_intent: None,
        };

        match self.generator.generate(request).await {
            Ok(output) => Ok(ToolResult::ok(json!({
                "analysis": output.analysis,
                "feedback": output.material,
            }))),
            Err(e) => {
                warn!(child_id = %ctx.child_id, error = %e, "Feedback generation failed");
                Ok(ToolResult::failure(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use edupilot_core::error::GenerationError;
    use edupilot_core::{Attachment, LearningPeriod};

    #[tokio::test]
    async fn feedback_passes_attachments() {
        let generator = Arc::new(ScriptedGenerator::new());
        let tool = GenerateFeedbackTool::new(aggregator(store(LearningPeriod::School)), generator.clone());
        let ctx = ctx().with_attachments(vec![Attachment::text("essay.txt", "我的妈妈")]);

        let result = tool.execute(json!({"instruction": "看结构"}), &ctx).await.unwrap();
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["analysis"], "结构清楚");
        assert_eq!(data["feedback"]["strengths"][0], "开头生动");

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[0].phase, GenerationPhase::Feedback);
        assert_eq!(requests[0].instruction, "看结构");
        assert_eq!(requests[0].attachments[0].name, "essay.txt");
        assert_eq!(requests[0].grade_level, 4);
    }

    #[tokio::test]
    async fn terminal_failure_is_reported_not_raised() {
        let mut generator = ScriptedGenerator::new();
        generator.feedback = Err(GenerationError::Terminal("content policy".into()));
        let tool = GenerateFeedbackTool::new(aggregator(store(LearningPeriod::School)), Arc::new(generator));

        let result = tool.execute(json!({}), &ctx()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.data.unwrap()["success"], false);
    }
}
