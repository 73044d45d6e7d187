//! Learner memory layers and the persistence contract.
//!
//! Memory is split into three layers:
//! - **ephemeral** — short-lived session notes
//! - **hypothesis** — tentative beliefs about the learner ("seems tired on Mondays")
//! - **stable** — confirmed long-term patterns, never written by the model
//!
//! The persistence layer itself is an external collaborator; this module only
//! defines the [`LearnerStore`] interface it must satisfy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;
use crate::learner::{BehaviorSignals, EmotionTrend, LearnerProfile, MasteryStats};

/// Which memory layer a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    Ephemeral,
    Hypothesis,
    Stable,
}

impl MemoryLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ephemeral => "ephemeral",
            Self::Hypothesis => "hypothesis",
            Self::Stable => "stable",
        }
    }

    /// Whether the orchestration loop may write to this layer.
    pub fn is_model_writable(&self) -> bool {
        !matches!(self, Self::Stable)
    }
}

impl FromStr for MemoryLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ephemeral" => Ok(Self::Ephemeral),
            "hypothesis" => Ok(Self::Hypothesis),
            "stable" => Ok(Self::Stable),
            other => Err(format!("unknown memory layer '{other}'")),
        }
    }
}

impl fmt::Display for MemoryLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single keyed memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub key: String,

    pub value: serde_json::Value,

    pub layer: MemoryLayer,

    /// How strongly this record is believed, [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_confidence() -> f64 {
    0.5
}

impl MemoryRecord {
    pub fn new(key: impl Into<String>, value: serde_json::Value, layer: MemoryLayer) -> Self {
        Self {
            key: key.into(),
            value,
            layer,
            confidence: default_confidence(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// The persistence contract consumed by the context aggregator and tools.
///
/// Every method is independently failable; callers decide whether a failure
/// is absorbed into a default or surfaced.
#[async_trait]
pub trait LearnerStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "postgres").
    fn name(&self) -> &str;

    async fn fetch_profile(&self, child_id: &str) -> std::result::Result<LearnerProfile, StoreError>;

    async fn fetch_mastery(&self, child_id: &str) -> std::result::Result<MasteryStats, StoreError>;

    async fn fetch_behavior(&self, child_id: &str) -> std::result::Result<BehaviorSignals, StoreError>;

    /// Fetch the records of one layer, or all layers when `layer` is `None`.
    async fn fetch_memory(
        &self,
        child_id: &str,
        layer: Option<MemoryLayer>,
    ) -> std::result::Result<Vec<MemoryRecord>, StoreError>;

    async fn fetch_emotion_trend(&self, child_id: &str) -> std::result::Result<EmotionTrend, StoreError>;

    /// Insert or replace the record with the same `(layer, key)`.
    async fn upsert_memory(&self, child_id: &str, record: MemoryRecord) -> std::result::Result<(), StoreError>;
}
