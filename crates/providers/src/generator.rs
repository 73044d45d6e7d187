//! Model-backed content generator.
//!
//! Each [`GenerationPhase`] gets its own fixed instructions; the request's
//! attachments, grade, accuracy and teaching intent are rendered into the
//! user message. The raw reply goes through
//! [`edupilot_core::json::lenient_decode`], so fenced, truncated or
//! trailing-comma output still yields a [`GenerationOutput`].

use std::sync::Arc;

use async_trait::async_trait;
use edupilot_config::AppConfig;
use edupilot_core::error::GenerationError;
use edupilot_core::json::lenient_decode;
use edupilot_core::message::Message;
use edupilot_core::provider::ProviderRequest;
use edupilot_core::{ContentGenerator, GenerationOutput, GenerationPhase, GenerationRequest, Provider};
use serde_json::Value;
use tracing::debug;

const MATERIAL_PROMPT: &str = "You prepare study material for a primary or middle school student. \
Read the attached material and reply with one JSON object: \
{\"analysis\": string, \"material\": {\"title\": string, \"summary\": string, \"key_points\": [string]}}. \
Use encouraging language and never label the child.";

const ITEM_BANK_PROMPT: &str = "You write practice items for a primary or middle school student. \
Reply with one JSON object: {\"items\": [{\"id\": string, \"type\": \"single_choice\"|\"multiple_choice\"|\"true_false\"|\"fill_blank\"|\"short_answer\", \
\"stem\": string, \"options\": [string], \"answer\": string, \"explanation\": string, \"knowledge_point\": string}]}. \
Write exactly the requested number of items. Options contain only the option text.";

const FEEDBACK_PROMPT: &str = "You give caring, specific feedback on a student's work. \
Reply with one JSON object: {\"analysis\": string, \"material\": {\"strengths\": [string], \"suggestions\": [string]}}. \
Do not write practice items.";

/// Generates content by prompting a [`Provider`].
pub struct LlmContentGenerator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmContentGenerator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, config.generation_model()).with_max_tokens(config.default_max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn system_prompt(phase: GenerationPhase) -> &'static str {
        match phase {
            GenerationPhase::Material => MATERIAL_PROMPT,
            GenerationPhase::ItemBank => ITEM_BANK_PROMPT,
            GenerationPhase::Feedback => FEEDBACK_PROMPT,
        }
    }

    fn user_prompt(request: &GenerationRequest) -> String {
        let mut prompt = format!(
            "Grade: {}\nRecent accuracy: {:.0}%\n",
            request.grade_level,
            request.recent_accuracy.clamp(0.0, 1.0) * 100.0
        );
        if request.phase == GenerationPhase::ItemBank {
            prompt.push_str(&format!("Number of items: {}\n", request.question_count));
        }
        if let Some(intent) = &request.teaching_intent {
            prompt.push_str(&format!(
                "Teaching intent: {} ({:?} difficulty)\n",
                intent.intent_type, intent.difficulty_level
            ));
            if !intent.focus_knowledge_points.is_empty() {
                prompt.push_str(&format!("Focus on: {}\n", intent.focus_knowledge_points.join(", ")));
            }
        }
        if !request.instruction.is_empty() {
            prompt.push_str(&format!("\n{}\n", request.instruction));
        }
        for attachment in &request.attachments {
            prompt.push_str(&format!(
                "\n--- {} ({}) ---\n{}\n",
                attachment.name, attachment.mime_type, attachment.content
            ));
        }
        prompt
    }
}

/// Shape a decoded reply into a [`GenerationOutput`].
///
/// A bare array is taken as the item list; `questions` is accepted as an
/// alias for `items`.
pub fn output_from_value(value: Value) -> GenerationOutput {
    match value {
        Value::Array(items) => GenerationOutput {
            items,
            ..GenerationOutput::default()
        },
        Value::Object(mut obj) => {
            let analysis = match obj.remove("analysis") {
                Some(Value::String(s)) => s,
                Some(other) if !other.is_null() => other.to_string(),
                _ => String::new(),
            };
            let items = match obj.remove("items").or_else(|| obj.remove("questions")) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let material = obj
                .remove("material")
                .unwrap_or_else(|| if obj.is_empty() { Value::Null } else { Value::Object(obj) });
            GenerationOutput {
                analysis,
                material,
                items,
            }
        }
        other => GenerationOutput {
            analysis: other.to_string(),
            ..GenerationOutput::default()
        },
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutput, GenerationError> {
        let provider_request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(Self::system_prompt(request.phase)),
                Message::user(Self::user_prompt(&request)),
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools: Vec::new(),
        };

        debug!(phase = ?request.phase, model = %self.model, "Generating content");
        let response = self.provider.complete(provider_request).await?;

        let value = lenient_decode(&response.message.content)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        Ok(output_from_value(value))
    }
}
