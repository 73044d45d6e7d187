//! Learner-state domain types.
//!
//! [`ChildContext`] is the immutable snapshot every decision cycle works
//! from. It is assembled fresh by the context aggregator, read by the intent
//! engine and the tools, and dropped at the end of the cycle.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::memory::MemoryRecord;

/// Stable-pattern key holding the ISO date of the last `introduce` session.
pub const LAST_INTRODUCE_KEY: &str = "last_introduce";

/// Returned by [`ChildContext::days_since_last_introduce`] when no date is recorded.
pub const NO_INTRODUCE_DAYS: i64 = 999;

/// Caregiver-set learning period, persisted with the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningPeriod {
    #[default]
    School,
    ExamPrep,
    Vacation,
}

impl LearningPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::School => "school",
            Self::ExamPrep => "exam_prep",
            Self::Vacation => "vacation",
        }
    }
}

impl FromStr for LearningPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "school" => Ok(Self::School),
            "exam_prep" => Ok(Self::ExamPrep),
            "vacation" => Ok(Self::Vacation),
            other => Err(format!("unknown learning period '{other}'")),
        }
    }
}

impl fmt::Display for LearningPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic learner profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub child_id: String,

    #[serde(default)]
    pub display_name: String,

    /// School grade, 1–12
    #[serde(default = "default_grade")]
    pub grade_level: u8,

    #[serde(default)]
    pub learning_period: LearningPeriod,
}

fn default_grade() -> u8 {
    3
}

impl LearnerProfile {
    /// The profile used when the real one cannot be fetched.
    pub fn fallback(child_id: &str) -> Self {
        Self {
            child_id: child_id.to_string(),
            display_name: String::new(),
            grade_level: default_grade(),
            learning_period: LearningPeriod::School,
        }
    }
}

/// A knowledge point with its current mastery score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePoint {
    pub id: String,
    pub name: String,
    /// Mastery in [0, 1]
    pub mastery: f64,
}

impl KnowledgePoint {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mastery: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mastery: mastery.clamp(0.0, 1.0),
        }
    }
}

/// Aggregated mastery statistics for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryStats {
    #[serde(default = "default_avg_mastery")]
    pub avg_mastery: f64,

    /// Ordered by ascending mastery
    #[serde(default)]
    pub weak_points: Vec<KnowledgePoint>,

    /// Ordered by descending mastery
    #[serde(default)]
    pub strong_points: Vec<KnowledgePoint>,

    #[serde(default)]
    pub recent_error_rate: f64,

    #[serde(default)]
    pub total_points: u32,

    #[serde(default)]
    pub mastered_count: u32,
}

impl MasteryStats {
    /// Build stats, enforcing ranges, point ordering and
    /// `mastered_count <= total_points`.
    pub fn new(
        avg_mastery: f64,
        mut weak_points: Vec<KnowledgePoint>,
        mut strong_points: Vec<KnowledgePoint>,
        recent_error_rate: f64,
        total_points: u32,
        mastered_count: u32,
    ) -> Self {
        weak_points.sort_by(|a, b| a.mastery.total_cmp(&b.mastery));
        strong_points.sort_by(|a, b| b.mastery.total_cmp(&a.mastery));
        Self {
            avg_mastery: avg_mastery.clamp(0.0, 1.0),
            weak_points,
            strong_points,
            recent_error_rate: recent_error_rate.clamp(0.0, 1.0),
            total_points,
            mastered_count: mastered_count.min(total_points),
        }
    }

    /// Re-apply the invariants to stats that came from an untrusted source.
    pub fn normalized(self) -> Self {
        Self::new(
            self.avg_mastery,
            self.weak_points,
            self.strong_points,
            self.recent_error_rate,
            self.total_points,
            self.mastered_count,
        )
    }

    /// Share of knowledge points already mastered, 0 when nothing is tracked.
    pub fn mastered_ratio(&self) -> f64 {
        if self.total_points == 0 {
            0.0
        } else {
            f64::from(self.mastered_count) / f64::from(self.total_points)
        }
    }
}

impl Default for MasteryStats {
    fn default() -> Self {
        Self::new(0.5, Vec::new(), Vec::new(), 0.0, 0, 0)
    }
}

fn default_avg_mastery() -> f64 {
    0.5
}

/// Direction of recent performance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// Behavioral signals derived from recent task sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSignals {
    /// Share of abandoned tasks, [0, 1]
    #[serde(default)]
    pub abandon_rate: f64,

    /// Average completion time in seconds
    #[serde(default)]
    pub avg_completion_time: f64,

    #[serde(default)]
    pub trend: Trend,

    #[serde(default)]
    pub recent_tasks_completed: u32,
}

impl BehaviorSignals {
    pub fn normalized(self) -> Self {
        Self {
            abandon_rate: self.abandon_rate.clamp(0.0, 1.0),
            avg_completion_time: self.avg_completion_time.max(0.0),
            ..self
        }
    }
}

impl Default for BehaviorSignals {
    fn default() -> Self {
        Self {
            abandon_rate: 0.0,
            avg_completion_time: 0.0,
            trend: Trend::Stable,
            recent_tasks_completed: 0,
        }
    }
}

/// Derived emotional state. Never stored as primary data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionSignal {
    #[default]
    Neutral,
    Frustration,
    Avoidance,
    Fatigue,
    LowMood,
    Engaged,
}

impl EmotionSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Frustration => "frustration",
            Self::Avoidance => "avoidance",
            Self::Fatigue => "fatigue",
            Self::LowMood => "low_mood",
            Self::Engaged => "engaged",
        }
    }
}

impl fmt::Display for EmotionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion-trend statistics as stored by the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionTrend {
    /// Number of emotion observations behind this trend
    #[serde(default)]
    pub sample_count: u32,

    /// Most frequent recent emotion, if any
    #[serde(default)]
    pub dominant: Option<EmotionSignal>,

    /// Raised when recent sessions suggest the load should be reduced
    #[serde(default)]
    pub needs_lightening: bool,

    /// Consecutive sessions ending in frustration
    #[serde(default)]
    pub frustration_streak: u32,
}

/// Kind of out-of-band note a caregiver can attach to a decision request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaregiverSignalKind {
    EmotionReport,
    ScheduleChange,
    Other,
}

impl FromStr for CaregiverSignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "emotion_report" => Ok(Self::EmotionReport),
            "schedule_change" => Ok(Self::ScheduleChange),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown caregiver signal kind '{other}'")),
        }
    }
}

/// A caregiver note that may override the mastery-driven intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaregiverSignal {
    pub kind: CaregiverSignalKind,
    #[serde(default)]
    pub content: String,
}

/// Immutable per-cycle snapshot of everything known about a learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildContext {
    pub profile: LearnerProfile,
    pub mastery_stats: MasteryStats,
    pub behavior_signals: BehaviorSignals,
    pub emotion_signal: EmotionSignal,
    pub active_hypotheses: Vec<MemoryRecord>,
    pub stable_patterns: BTreeMap<String, serde_json::Value>,
    /// The date this snapshot describes
    pub as_of: NaiveDate,
}

impl ChildContext {
    pub fn child_id(&self) -> &str {
        &self.profile.child_id
    }

    /// Days since the last `introduce` session, or [`NO_INTRODUCE_DAYS`]
    /// when the pattern is missing or not a date.
    pub fn days_since_last_introduce(&self) -> i64 {
        self.stable_patterns
            .get(LAST_INTRODUCE_KEY)
            .and_then(|v| v.as_str())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(|last| (self.as_of - last).num_days())
            .unwrap_or(NO_INTRODUCE_DAYS)
    }
}
