//! Teaching intent — the pedagogical mode chosen for one session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six mutually exclusive teaching intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Reinforce,
    Verify,
    Challenge,
    Lighten,
    Introduce,
    Pause,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reinforce => "reinforce",
            Self::Verify => "verify",
            Self::Challenge => "challenge",
            Self::Lighten => "lighten",
            Self::Introduce => "introduce",
            Self::Pause => "pause",
        }
    }

    /// Maximum number of focus knowledge points for this intent.
    pub fn max_focus_points(&self) -> usize {
        match self {
            Self::Reinforce | Self::Verify => 3,
            Self::Challenge => 2,
            Self::Lighten => 1,
            Self::Introduce | Self::Pause => 0,
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Low,
    Medium,
    High,
}

/// A resolved teaching intent.
///
/// Invariant: `intent_type == Pause` implies `question_count == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingIntent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,

    /// Human-readable explanation of which rule fired
    pub reason: String,

    /// Names of the knowledge points to focus on
    #[serde(default)]
    pub focus_knowledge_points: Vec<String>,

    pub question_count: u32,

    pub difficulty_level: DifficultyLevel,
}
