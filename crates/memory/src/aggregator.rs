//! Context aggregation: one immutable [`ChildContext`] per decision cycle.
//!
//! All sub-fetches run concurrently and are independent; a failed fetch is
//! logged and replaced by its documented default, so [`ContextAggregator::get_context`]
//! never fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use edupilot_config::EmotionConfig;
use edupilot_core::{
    BehaviorSignals, ChildContext, EmotionSignal, EmotionTrend, LearnerProfile, LearnerStore,
    MasteryStats, MemoryLayer, MemoryRecord, Trend,
};
use tracing::warn;

/// Builds [`ChildContext`] snapshots from a [`LearnerStore`].
#[derive(Clone)]
pub struct ContextAggregator {
    store: Arc<dyn LearnerStore>,
    min_trend_samples: u32,
}

impl ContextAggregator {
    pub fn new(store: Arc<dyn LearnerStore>) -> Self {
        Self::from_config(store, &EmotionConfig::default())
    }

    pub fn from_config(store: Arc<dyn LearnerStore>, config: &EmotionConfig) -> Self {
        Self {
            store,
            min_trend_samples: config.min_trend_samples,
        }
    }

    pub fn store(&self) -> &Arc<dyn LearnerStore> {
        &self.store
    }

    /// Profile, or the fallback profile (`school` period) on failure.
    pub async fn profile(&self, child_id: &str) -> LearnerProfile {
        self.store.fetch_profile(child_id).await.unwrap_or_else(|e| {
            warn!(child_id, error = %e, "Profile fetch failed, using fallback profile");
            LearnerProfile::fallback(child_id)
        })
    }

    /// Mastery, or `avg_mastery = 0.5` with no points on failure.
    pub async fn mastery(&self, child_id: &str) -> MasteryStats {
        match self.store.fetch_mastery(child_id).await {
            Ok(stats) => stats.normalized(),
            Err(e) => {
                warn!(child_id, error = %e, "Mastery fetch failed, using defaults");
                MasteryStats::default()
            }
        }
    }

    /// Behavior, or zero abandonment with a stable trend on failure.
    pub async fn behavior(&self, child_id: &str) -> BehaviorSignals {
        match self.store.fetch_behavior(child_id).await {
            Ok(signals) => signals.normalized(),
            Err(e) => {
                warn!(child_id, error = %e, "Behavior fetch failed, using defaults");
                BehaviorSignals::default()
            }
        }
    }

    /// Records of one layer (or all), empty on failure.
    pub async fn memories(&self, child_id: &str, layer: Option<MemoryLayer>) -> Vec<MemoryRecord> {
        self.store.fetch_memory(child_id, layer).await.unwrap_or_else(|e| {
            warn!(child_id, layer = ?layer, error = %e, "Memory fetch failed, using empty set");
            Vec::new()
        })
    }

    /// Emotion trend, or an empty (insufficient) trend on failure.
    pub async fn emotion_trend(&self, child_id: &str) -> EmotionTrend {
        self.store.fetch_emotion_trend(child_id).await.unwrap_or_else(|e| {
            warn!(child_id, error = %e, "Emotion trend fetch failed, ignoring trend");
            EmotionTrend::default()
        })
    }

    /// Assemble today's snapshot for `child_id`.
    pub async fn get_context(&self, child_id: &str, as_of: NaiveDate) -> ChildContext {
        let (profile, mastery_stats, behavior_signals, hypotheses, stable, trend) = tokio::join!(
            self.profile(child_id),
            self.mastery(child_id),
            self.behavior(child_id),
            self.memories(child_id, Some(MemoryLayer::Hypothesis)),
            self.memories(child_id, Some(MemoryLayer::Stable)),
            self.emotion_trend(child_id),
        );

        let emotion_signal =
            derive_emotion(&trend, &hypotheses, &behavior_signals, self.min_trend_samples);
        let stable_patterns: BTreeMap<String, serde_json::Value> =
            stable.into_iter().map(|r| (r.key, r.value)).collect();

        tracing::debug!(
            child_id,
            emotion = %emotion_signal,
            avg_mastery = mastery_stats.avg_mastery,
            "Context aggregated"
        );

        ChildContext {
            profile,
            mastery_stats,
            behavior_signals,
            emotion_signal,
            active_hypotheses: hypotheses,
            stable_patterns,
            as_of,
        }
    }
}

/// Derive the emotion signal with fixed precedence:
/// sufficient trend data, then hypothesis keys, then behavior heuristics.
pub fn derive_emotion(
    trend: &EmotionTrend,
    hypotheses: &[MemoryRecord],
    behavior: &BehaviorSignals,
    min_trend_samples: u32,
) -> EmotionSignal {
    if trend.sample_count >= min_trend_samples {
        if trend.needs_lightening {
            return if trend.frustration_streak >= 3 {
                EmotionSignal::LowMood
            } else {
                EmotionSignal::Fatigue
            };
        }
        if let Some(
            dominant @ (EmotionSignal::Fatigue
            | EmotionSignal::Frustration
            | EmotionSignal::LowMood
            | EmotionSignal::Engaged),
        ) = trend.dominant
        {
            return dominant;
        }
    }

    for (needle, signal) in [
        ("fatigue", EmotionSignal::Fatigue),
        ("frustration", EmotionSignal::Frustration),
        ("avoidance", EmotionSignal::Avoidance),
    ] {
        if hypotheses
            .iter()
            .any(|r| r.key.to_lowercase().contains(needle))
        {
            return signal;
        }
    }

    if behavior.abandon_rate > 0.6 {
        EmotionSignal::Avoidance
    } else if behavior.abandon_rate > 0.2 || behavior.trend == Trend::Declining {
        EmotionSignal::Fatigue
    } else if behavior.trend == Trend::Improving && behavior.recent_tasks_completed > 5 {
        EmotionSignal::Engaged
    } else {
        EmotionSignal::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchKind, InMemoryStore, LearnerFixture};
    use edupilot_core::KnowledgePoint;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn fixture() -> LearnerFixture {
        let mut fixture = LearnerFixture::new(LearnerProfile {
            child_id: "kid-1".into(),
            display_name: "小明".into(),
            grade_level: 4,
            learning_period: edupilot_core::LearningPeriod::ExamPrep,
        });
        fixture.mastery = MasteryStats::new(0.3, vec![KnowledgePoint::new("a", "分数", 0.2)], vec![], 0.4, 5, 1);
        fixture.behavior = BehaviorSignals {
            abandon_rate: 0.1,
            avg_completion_time: 200.0,
            trend: Trend::Improving,
            recent_tasks_completed: 8,
        };
        fixture.memories = vec![
            MemoryRecord::new("evening_fatigue", json!(true), MemoryLayer::Hypothesis),
            MemoryRecord::new("last_introduce", json!("2025-03-01"), MemoryLayer::Stable),
            MemoryRecord::new("scratch", json!("x"), MemoryLayer::Ephemeral),
        ];
        fixture
    }

    fn behavior(abandon: f64, trend: Trend, completed: u32) -> BehaviorSignals {
        BehaviorSignals {
            abandon_rate: abandon,
            avg_completion_time: 0.0,
            trend,
            recent_tasks_completed: completed,
        }
    }

    #[tokio::test]
    async fn aggregates_all_sources() {
        let store = Arc::new(InMemoryStore::new().with_fixture(fixture()));
        let ctx = ContextAggregator::new(store).get_context("kid-1", today()).await;

        assert_eq!(ctx.profile.grade_level, 4);
        assert!((ctx.mastery_stats.avg_mastery - 0.3).abs() < f64::EPSILON);
        assert_eq!(ctx.active_hypotheses.len(), 1);
        assert_eq!(ctx.stable_patterns["last_introduce"], json!("2025-03-01"));
        assert_eq!(ctx.days_since_last_introduce(), 11);
        // Hypothesis key beats the engaged behavior heuristic
        assert_eq!(ctx.emotion_signal, EmotionSignal::Fatigue);
        assert_eq!(ctx.as_of, today());
    }

    #[tokio::test]
    async fn failed_fetches_fall_back_to_defaults() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_fixture(fixture())
                .fail_on(FetchKind::Mastery)
                .fail_on(FetchKind::Behavior)
                .fail_on(FetchKind::Memory)
                .fail_on(FetchKind::Profile),
        );
        let ctx = ContextAggregator::new(store).get_context("kid-1", today()).await;

        assert!((ctx.mastery_stats.avg_mastery - 0.5).abs() < f64::EPSILON);
        assert_eq!(ctx.behavior_signals.trend, Trend::Stable);
        assert!(ctx.behavior_signals.abandon_rate.abs() < f64::EPSILON);
        assert!(ctx.active_hypotheses.is_empty());
        assert!(ctx.stable_patterns.is_empty());
        assert_eq!(ctx.profile.learning_period, edupilot_core::LearningPeriod::School);
        assert_eq!(ctx.child_id(), "kid-1");
        assert_eq!(ctx.emotion_signal, EmotionSignal::Neutral);
    }

    #[tokio::test]
    async fn unknown_child_gets_full_defaults() {
        let store = Arc::new(InMemoryStore::new());
        let ctx = ContextAggregator::new(store).get_context("ghost", today()).await;
        assert_eq!(ctx.child_id(), "ghost");
        assert_eq!(ctx.days_since_last_introduce(), 999);
    }

    #[test]
    fn sufficient_trend_with_lightening_flag() {
        let mut trend = EmotionTrend {
            sample_count: 3,
            dominant: Some(EmotionSignal::Engaged),
            needs_lightening: true,
            frustration_streak: 3,
        };
        let calm = behavior(0.0, Trend::Stable, 0);
        assert_eq!(derive_emotion(&trend, &[], &calm, 3), EmotionSignal::LowMood);
        trend.frustration_streak = 2;
        assert_eq!(derive_emotion(&trend, &[], &calm, 3), EmotionSignal::Fatigue);
        trend.needs_lightening = false;
        assert_eq!(derive_emotion(&trend, &[], &calm, 3), EmotionSignal::Engaged);
    }

    #[test]
    fn insufficient_trend_is_ignored() {
        let trend = EmotionTrend {
            sample_count: 2,
            dominant: Some(EmotionSignal::LowMood),
            needs_lightening: true,
            frustration_streak: 5,
        };
        assert_eq!(
            derive_emotion(&trend, &[], &behavior(0.0, Trend::Stable, 0), 3),
            EmotionSignal::Neutral
        );
    }

    #[test]
    fn hypothesis_order_is_fatigue_frustration_avoidance() {
        let records = vec![
            MemoryRecord::new("math_avoidance", json!(true), MemoryLayer::Hypothesis),
            MemoryRecord::new("frustration_with_fractions", json!(true), MemoryLayer::Hypothesis),
        ];
        let calm = behavior(0.0, Trend::Stable, 0);
        assert_eq!(
            derive_emotion(&EmotionTrend::default(), &records, &calm, 3),
            EmotionSignal::Frustration
        );
    }

    #[test]
    fn behavior_heuristics() {
        let none = EmotionTrend::default();
        assert_eq!(derive_emotion(&none, &[], &behavior(0.7, Trend::Stable, 0), 3), EmotionSignal::Avoidance);
        assert_eq!(derive_emotion(&none, &[], &behavior(0.3, Trend::Stable, 0), 3), EmotionSignal::Fatigue);
        assert_eq!(derive_emotion(&none, &[], &behavior(0.0, Trend::Declining, 0), 3), EmotionSignal::Fatigue);
        assert_eq!(derive_emotion(&none, &[], &behavior(0.0, Trend::Improving, 6), 3), EmotionSignal::Engaged);
        assert_eq!(derive_emotion(&none, &[], &behavior(0.0, Trend::Improving, 5), 3), EmotionSignal::Neutral);
    }
}
