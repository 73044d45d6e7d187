//! JSON learner fixtures.
//!
//! A fixture is one learner's complete persisted state:
//!
//! ```json
//! {
//!   "profile": { "child_id": "kid-1", "display_name": "小明", "grade_level": 3 },
//!   "mastery": { "avg_mastery": 0.45, "weak_points": [], "strong_points": [] },
//!   "behavior": { "abandon_rate": 0.1, "trend": "stable" },
//!   "memories": [ { "key": "last_introduce", "value": "2025-03-01", "layer": "stable" } ],
//!   "emotion_trend": { "sample_count": 0 }
//! }
//! ```
//!
//! Every section except `profile` may be omitted.

use std::path::Path;

use edupilot_core::error::StoreError;
use edupilot_core::{BehaviorSignals, EmotionTrend, LearnerProfile, MasteryStats, MemoryRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerFixture {
    pub profile: LearnerProfile,
    #[serde(default)]
    pub mastery: MasteryStats,
    #[serde(default)]
    pub behavior: BehaviorSignals,
    #[serde(default)]
    pub memories: Vec<MemoryRecord>,
    #[serde(default)]
    pub emotion_trend: EmotionTrend,
}

impl LearnerFixture {
    /// A learner with only a profile; everything else defaults.
    pub fn new(profile: LearnerProfile) -> Self {
        Self {
            profile,
            mastery: MasteryStats::default(),
            behavior: BehaviorSignals::default(),
            memories: Vec::new(),
            emotion_trend: EmotionTrend::default(),
        }
    }

    /// Parse a fixture, re-applying the range invariants to the numbers.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let mut fixture: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::Storage(format!("invalid learner fixture: {e}")))?;
        fixture.mastery = fixture.mastery.normalized();
        fixture.behavior = fixture.behavior.normalized();
        Ok(fixture)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Storage(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    pub fn child_id(&self) -> &str {
        &self.profile.child_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edupilot_core::{LearningPeriod, MemoryLayer, Trend};
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "profile": { "child_id": "kid-1", "display_name": "小明", "grade_level": 4, "learning_period": "exam_prep" },
        "mastery": {
            "avg_mastery": 1.4,
            "weak_points": [ { "id": "a", "name": "面积", "mastery": 0.5 }, { "id": "b", "name": "分数", "mastery": 0.1 } ],
            "strong_points": [],
            "recent_error_rate": 0.2,
            "total_points": 4,
            "mastered_count": 9
        },
        "behavior": { "abandon_rate": 0.1, "avg_completion_time": 420, "trend": "improving", "recent_tasks_completed": 6 },
        "memories": [ { "key": "last_introduce", "value": "2025-03-01", "layer": "stable" } ]
    }"#;

    #[test]
    fn parses_and_normalizes() {
        let fixture = LearnerFixture::from_json(FIXTURE).unwrap();
        assert_eq!(fixture.child_id(), "kid-1");
        assert_eq!(fixture.profile.learning_period, LearningPeriod::ExamPrep);
        assert!((fixture.mastery.avg_mastery - 1.0).abs() < f64::EPSILON);
        assert_eq!(fixture.mastery.mastered_count, 4);
        assert_eq!(fixture.mastery.weak_points[0].name, "分数");
        assert_eq!(fixture.behavior.trend, Trend::Improving);
        assert_eq!(fixture.memories[0].layer, MemoryLayer::Stable);
        assert_eq!(fixture.emotion_trend.sample_count, 0);
    }

    #[test]
    fn profile_only_fixture() {
        let fixture = LearnerFixture::from_json(r#"{"profile": {"child_id": "kid-2"}}"#).unwrap();
        assert!((fixture.mastery.avg_mastery - 0.5).abs() < f64::EPSILON);
        assert!(fixture.memories.is_empty());
    }

    #[test]
    fn invalid_json_is_a_storage_error() {
        assert!(matches!(LearnerFixture::from_json("{"), Err(StoreError::Storage(_))));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let fixture = LearnerFixture::load(file.path()).unwrap();
        assert_eq!(fixture.profile.grade_level, 4);
    }
}
