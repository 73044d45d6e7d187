//! Two-phase learning-content generation.
//!
//! The material phase and the item-bank phase are generated independently
//! and merged by the [`Sanitizer`]. The item count is bounded three ways: the
//! intent's count, the schedule decision's count, and the mode ceiling.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use edupilot_core::{
    ChildContext, ContentGenerator, GenerationOutput, GenerationPhase, GenerationRequest,
    IntentType, RunContext, TeachingIntent,
};
use edupilot_memory::ContextAggregator;
use edupilot_pedagogy::schedule::{decide_str, dynamic_question_count};
use edupilot_pedagogy::skill::skills_for;
use edupilot_pedagogy::{
    EffectiveMode, LearningDecision, MaterialType, Sanitizer, ScheduleResolver, decide_intent,
    pick_skills,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use tracing::{debug, warn};

use crate::{caregiver_from_args, opt_str, to_json};

/// Number of practice skills named in the generation prompt.
const SKILLS_PER_SESSION: usize = 2;

pub struct GenerateLearningContentTool {
    aggregator: Arc<ContextAggregator>,
    resolver: Arc<ScheduleResolver>,
    generator: Arc<dyn ContentGenerator>,
    sanitizer: Sanitizer,
    rng: Mutex<StdRng>,
}

impl GenerateLearningContentTool {
    pub fn new(
        aggregator: Arc<ContextAggregator>,
        resolver: Arc<ScheduleResolver>,
        generator: Arc<dyn ContentGenerator>,
        sanitizer: Sanitizer,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            aggregator,
            resolver,
            generator,
            sanitizer,
            rng: Mutex::new(rng),
        }
    }

    fn pick(&self, intent: IntentType) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pick_skills(skills_for(intent), SKILLS_PER_SESSION, &mut *rng)
    }
}

/// How many items to ask for.
///
/// With a schedule decision the decision's count is a ceiling on the
/// requested count; without one the count adapts to mastery and error rate
/// inside the mode's range, still under the mode's hard ceiling.
pub fn plan_item_count(
    intent: &TeachingIntent,
    decision: Option<&LearningDecision>,
    mode: EffectiveMode,
    context: &ChildContext,
    requested: Option<u32>,
) -> u32 {
    if intent.intent_type == IntentType::Pause {
        return 0;
    }
    let base = requested.unwrap_or(intent.question_count);
    let count = match decision {
        Some(decision) if !decision.front_mode.allows_items() => 0,
        Some(decision) => base.min(decision.question_count),
        None => dynamic_question_count(
            base,
            context.mastery_stats.avg_mastery,
            context.mastery_stats.recent_error_rate,
            mode,
        ),
    };
    mode.hard_ceiling().map_or(count, |ceiling| count.min(ceiling))
}

fn instruction(decision: Option<&LearningDecision>, skills: &[String], extra: Option<&str>) -> String {
    let mut lines = Vec::new();
    if let Some(decision) = decision {
        lines.push(decision.focus_message.clone());
    }
    if !skills.is_empty() {
        lines.push(format!("Emphasize: {}", skills.join(", ")));
    }
    if let Some(extra) = extra {
        lines.push(extra.to_string());
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for GenerateLearningContentTool {
    fn id(&self) -> ToolName {
        ToolName::GenerateLearningContent
    }

    fn description(&self) -> &str {
        "Generate learning material and practice items for the uploaded attachments. \
         The teaching intent and today's schedule decide how many items are produced; \
         the count you request is only an upper bound. Items are checked and cleaned \
         before they are returned."
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
                "question_count": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Requested number of items (default: the intent's count)"
                },
                "instruction": {
                    "type": "string",
                    "description": "Extra guidance for the generator"
                },
                "caregiver_kind": {
                    "type": "string",
                    "enum": ["emotion_report", "schedule_change", "other"]
                },
                "caregiver_note": { "type": "string" }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let caregiver = caregiver_from_args(&arguments).or_else(|| ctx.caregiver_signal.clone());
        let material_type = opt_str(&arguments, "material_type").or(ctx.material_type.as_deref());
        let requested = arguments
            .get("question_count")
            .and_then(|v| v.as_u64())
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        let context = self.aggregator.get_context(&ctx.child_id, ctx.today).await;
        let intent = decide_intent(&context, caregiver.as_ref());
        let mode = self
            .resolver
            .effective_mode(context.profile.learning_period, ctx.today);
        let decision = material_type.map(|m| decide_str(m, mode));
        let count = plan_item_count(&intent, decision.as_ref(), mode, &context, requested);
        let skills = self.pick(intent.intent_type);

        debug!(
            child_id = %ctx.child_id,
            intent = %intent.intent_type,
            mode = %mode,
            question_count = count,
            "Generating learning content"
        );

        let request = |phase: GenerationPhase, question_count: u32| GenerationRequest {
            phase,
            instruction: instruction(decision.as_ref(), &skills, opt_str(&arguments, "instruction")),
            attachments: ctx.attachments.clone(),
            grade_level: context.profile.grade_level,
            recent_accuracy: 1.0 - context.mastery_stats.recent_error_rate,
            question_count,
            teaching_intent: Some(intent.clone()),
        };

        let material = match self.generator.generate(request(GenerationPhase::Material, 0)).await {
            Ok(output) => output,
            Err(e) => {
                warn!(child_id = %ctx.child_id, error = %e, "Material generation failed");
                return Ok(ToolResult::failure(e.to_string()));
            }
        };
        let bank = if count > 0 {
            match self.generator.generate(request(GenerationPhase::ItemBank, count)).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(child_id = %ctx.child_id, error = %e, "Item bank generation failed");
                    return Ok(ToolResult::failure(e.to_string()));
                }
            }
        } else {
            GenerationOutput::default()
        };

        let content = self.sanitizer.merge(material, bank, count);
        if !content.rejected.is_empty() {
            debug!(rejected = content.rejected.len(), "Generated items rejected during sanitizing");
        }

        Ok(ToolResult::ok(json!({
            "effective_mode": mode.as_str(),
            "learning_decision": decision.as_ref().map(to_json),
            "teaching_intent": to_json(&intent),
            "question_count": count,
            "skills": skills,
            "analysis": content.analysis,
            "material": content.material,
            "items": to_json(&content.items),
            "rejected": to_json(&content.rejected),
        })))
    }
}
