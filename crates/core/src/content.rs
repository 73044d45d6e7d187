//! Content-generation contract.
//!
//! Material and item-bank generation is delegated to an external
//! collaborator. The orchestration layer only sees [`ContentGenerator`];
//! the LLM-backed implementation lives in `edupilot-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::teaching::TeachingIntent;

/// A caller-supplied attachment (photo of homework, exam scan, text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name or file name
    pub name: String,

    /// MIME type, e.g. "image/jpeg" or "text/plain"
    #[serde(default = "default_mime")]
    pub mime_type: String,

    /// Inline text content or a storage URL
    pub content: String,
}

fn default_mime() -> String {
    "text/plain".into()
}

impl Attachment {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: default_mime(),
            content: content.into(),
        }
    }
}

/// Which half of a two-phase generation is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// Reading/context material plus an analysis of the attachments
    Material,
    /// Independently generated question bank
    ItemBank,
    /// Written feedback only, no questions
    Feedback,
}

/// A generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub phase: GenerationPhase,

    pub instruction: String,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    pub grade_level: u8,

    /// Accuracy over recent tasks, [0, 1]
    pub recent_accuracy: f64,

    /// Number of items wanted (ignored for material/feedback phases)
    #[serde(default)]
    pub question_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching_intent: Option<TeachingIntent>,
}

/// Raw generation output. `items` stay untyped until sanitized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOutput {
    #[serde(default)]
    pub analysis: String,

    #[serde(default)]
    pub material: serde_json::Value,

    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// The content-generation collaborator.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> std::result::Result<GenerationOutput, GenerationError>;
}
