//! Teaching-intent decision engine.
//!
//! A fixed precedence chain over one [`ChildContext`]; the first rule that
//! fires wins:
//!
//! 1. **pause** — low mood while declining, heavy abandonment, or avoidance
//!    with moderate abandonment
//! 2. **lighten** — fatigue/frustration, moderate abandonment, or a declining trend
//! 3. **caregiver override** — a negative emotion report or a schedule change
//! 4. **mastery tiers** — reinforce below 0.4, verify below 0.7, otherwise
//!    introduce if the gate opens, else challenge
//!
//! The resolved type is then filled in from [`defaults_for`] and
//! [`select_focus`]. No randomness and no I/O.

use edupilot_core::{
    CaregiverSignal, CaregiverSignalKind, ChildContext, DifficultyLevel, EmotionSignal,
    IntentType, KnowledgePoint, MasteryStats, TeachingIntent, Trend,
};

/// Minimum days between two `introduce` sessions.
pub const INTRODUCE_COOLDOWN_DAYS: i64 = 3;

/// Mastered share of tracked points required before new material.
pub const INTRODUCE_MASTERED_RATIO: f64 = 0.6;

const NEGATIVE_AFFECT_KEYWORDS: &[&str] = &[
    "累", "烦", "哭", "不开心", "难过", "压力", "焦虑", "害怕", "tired", "upset", "stressed",
    "anxious", "sad", "crying",
];

/// Default `(question_count, difficulty)` per intent type.
pub fn defaults_for(intent: IntentType) -> (u32, DifficultyLevel) {
    match intent {
        IntentType::Reinforce => (5, DifficultyLevel::Low),
        IntentType::Verify => (4, DifficultyLevel::Medium),
        IntentType::Challenge => (3, DifficultyLevel::High),
        IntentType::Lighten => (2, DifficultyLevel::Low),
        IntentType::Introduce => (3, DifficultyLevel::Medium),
        IntentType::Pause => (0, DifficultyLevel::Low),
    }
}

/// Pick the knowledge points an intent should concentrate on.
pub fn select_focus(intent: IntentType, mastery: &MasteryStats) -> Vec<String> {
    let limit = intent.max_focus_points();
    match intent {
        IntentType::Reinforce => names(mastery.weak_points.iter(), limit),
        // Closest to mastered first
        IntentType::Verify => names(mastery.weak_points.iter().rev(), limit),
        IntentType::Challenge => names(mastery.strong_points.iter(), limit),
        IntentType::Lighten => {
            let picked = names(mastery.strong_points.iter(), limit);
            if picked.is_empty() {
                names(mastery.weak_points.iter(), limit)
            } else {
                picked
            }
        }
        IntentType::Introduce | IntentType::Pause => Vec::new(),
    }
}

fn names<'a>(points: impl Iterator<Item = &'a KnowledgePoint>, n: usize) -> Vec<String> {
    points.take(n).map(|p| p.name.clone()).collect()
}

/// Whether a caregiver note carries negative-affect vocabulary.
pub fn has_negative_affect(note: &str) -> bool {
    let note = note.to_lowercase();
    NEGATIVE_AFFECT_KEYWORDS.iter().any(|k| note.contains(k))
}

/// Decide today's teaching intent.
pub fn decide_intent(ctx: &ChildContext, caregiver: Option<&CaregiverSignal>) -> TeachingIntent {
    let (intent_type, reason) = resolve(ctx, caregiver);
    let (question_count, difficulty_level) = defaults_for(intent_type);
    let intent = TeachingIntent {
        intent_type,
        reason,
        focus_knowledge_points: select_focus(intent_type, &ctx.mastery_stats),
        question_count,
        difficulty_level,
    };
    tracing::debug!(
        child_id = %ctx.child_id(),
        intent = %intent.intent_type,
        reason = %intent.reason,
        "Teaching intent decided"
    );
    intent
}

fn resolve(ctx: &ChildContext, caregiver: Option<&CaregiverSignal>) -> (IntentType, String) {
    let emotion = ctx.emotion_signal;
    let abandon = ctx.behavior_signals.abandon_rate;
    let declining = ctx.behavior_signals.trend == Trend::Declining;

    if emotion == EmotionSignal::LowMood && declining {
        return (IntentType::Pause, "low mood with a declining trend".into());
    }
    if abandon > 0.5 {
        return (IntentType::Pause, format!("abandon rate {abandon:.2} above 0.5"));
    }
    if emotion == EmotionSignal::Avoidance && abandon > 0.3 {
        return (
            IntentType::Pause,
            format!("avoidance with abandon rate {abandon:.2}"),
        );
    }

    if matches!(emotion, EmotionSignal::Fatigue | EmotionSignal::Frustration) {
        return (IntentType::Lighten, format!("emotion signal is {emotion}"));
    }
    if abandon > 0.2 {
        return (IntentType::Lighten, format!("abandon rate {abandon:.2} above 0.2"));
    }
    if declining {
        return (IntentType::Lighten, "performance trend is declining".into());
    }

    if let Some(signal) = caregiver {
        match signal.kind {
            CaregiverSignalKind::EmotionReport
                if has_negative_affect(&signal.content) && abandon > 0.2 =>
            {
                return (IntentType::Lighten, "caregiver reported negative emotion".into());
            }
            CaregiverSignalKind::ScheduleChange => {
                return (IntentType::Lighten, "caregiver reported a schedule change".into());
            }
            _ => {}
        }
    }

    let stats = &ctx.mastery_stats;
    let avg = stats.avg_mastery;
    if avg < 0.4 {
        return (IntentType::Reinforce, format!("average mastery {avg:.2} below 0.4"));
    }
    if avg < 0.7 {
        return (IntentType::Verify, format!("average mastery {avg:.2} in [0.4, 0.7)"));
    }

    let ratio = stats.mastered_ratio();
    let mood_ok = emotion == EmotionSignal::Engaged || emotion == EmotionSignal::Neutral;
    let days = ctx.days_since_last_introduce();
    if ratio >= INTRODUCE_MASTERED_RATIO && mood_ok && days >= INTRODUCE_COOLDOWN_DAYS {
        return (
            IntentType::Introduce,
            format!("mastered {ratio:.2} of points, {days} days since last new material"),
        );
    }
    (IntentType::Challenge, format!("average mastery {avg:.2} at or above 0.7"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use edupilot_core::{BehaviorSignals, LearnerProfile};
    use edupilot_core::learner::LAST_INTRODUCE_KEY;
    use serde_json::json;

    use super::*;

    fn ctx(avg: f64, abandon: f64, trend: Trend, emotion: EmotionSignal) -> ChildContext {
        ChildContext {
            profile: LearnerProfile::fallback("kid-1"),
            mastery_stats: MasteryStats::new(
                avg,
                vec![
                    KnowledgePoint::new("kp-1", "分数加法", 0.2),
                    KnowledgePoint::new("kp-2", "小数乘法", 0.35),
                    KnowledgePoint::new("kp-3", "面积", 0.5),
                    KnowledgePoint::new("kp-4", "周长", 0.55),
                ],
                vec![
                    KnowledgePoint::new("kp-5", "加法", 0.95),
                    KnowledgePoint::new("kp-6", "减法", 0.9),
                    KnowledgePoint::new("kp-7", "乘法口诀", 0.85),
                ],
                0.1,
                10,
                7,
            ),
            behavior_signals: BehaviorSignals {
                abandon_rate: abandon,
                avg_completion_time: 300.0,
                trend,
                recent_tasks_completed: 4,
            },
            emotion_signal: emotion,
            active_hypotheses: vec![],
            stable_patterns: BTreeMap::new(),
            as_of: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
        }
    }

    fn neutral(avg: f64) -> ChildContext {
        ctx(avg, 0.0, Trend::Stable, EmotionSignal::Neutral)
    }

    #[test]
    fn heavy_abandonment_pauses_despite_high_mastery() {
        let intent = decide_intent(&ctx(0.9, 0.6, Trend::Stable, EmotionSignal::Engaged), None);
        assert_eq!(intent.intent_type, IntentType::Pause);
        assert_eq!(intent.question_count, 0);
        assert!(intent.focus_knowledge_points.is_empty());
    }

    #[test]
    fn low_mood_and_declining_pauses() {
        let intent = decide_intent(&ctx(0.5, 0.0, Trend::Declining, EmotionSignal::LowMood), None);
        assert_eq!(intent.intent_type, IntentType::Pause);
    }

    #[test]
    fn avoidance_with_moderate_abandonment_pauses() {
        let intent = decide_intent(&ctx(0.5, 0.35, Trend::Stable, EmotionSignal::Avoidance), None);
        assert_eq!(intent.intent_type, IntentType::Pause);
    }

    #[test]
    fn fatigue_lightens_with_strongest_point() {
        let intent = decide_intent(&ctx(0.9, 0.0, Trend::Stable, EmotionSignal::Fatigue), None);
        assert_eq!(intent.intent_type, IntentType::Lighten);
        assert_eq!(intent.question_count, 2);
        assert_eq!(intent.difficulty_level, DifficultyLevel::Low);
        assert_eq!(intent.focus_knowledge_points, vec!["加法"]);
    }

    #[test]
    fn abandonment_band_and_decline_lighten() {
        assert_eq!(
            decide_intent(&ctx(0.5, 0.5, Trend::Stable, EmotionSignal::Neutral), None).intent_type,
            IntentType::Lighten
        );
        assert_eq!(
            decide_intent(&ctx(0.5, 0.0, Trend::Declining, EmotionSignal::Neutral), None).intent_type,
            IntentType::Lighten
        );
    }

    #[test]
    fn schedule_change_overrides_mastery() {
        let signal = CaregiverSignal {
            kind: CaregiverSignalKind::ScheduleChange,
            content: "this week has a school trip".into(),
        };
        let intent = decide_intent(&neutral(0.2), Some(&signal));
        assert_eq!(intent.intent_type, IntentType::Lighten);
    }

    #[test]
    fn emotion_report_needs_abandonment_to_override() {
        let signal = CaregiverSignal {
            kind: CaregiverSignalKind::EmotionReport,
            content: "孩子这几天很累".into(),
        };
        assert!(has_negative_affect(&signal.content));
        let intent = decide_intent(&neutral(0.2), Some(&signal));
        assert_eq!(intent.intent_type, IntentType::Reinforce);
    }

    #[test]
    fn mastery_tiers() {
        assert_eq!(decide_intent(&neutral(0.39), None).intent_type, IntentType::Reinforce);
        assert_eq!(decide_intent(&neutral(0.4), None).intent_type, IntentType::Verify);
        assert_eq!(decide_intent(&neutral(0.69), None).intent_type, IntentType::Verify);
    }

    #[test]
    fn reinforce_focuses_on_three_weakest() {
        let intent = decide_intent(&neutral(0.3), None);
        assert_eq!(intent.focus_knowledge_points, vec!["分数加法", "小数乘法", "面积"]);
        assert_eq!((intent.question_count, intent.difficulty_level), (5, DifficultyLevel::Low));
    }

    #[test]
    fn verify_focuses_on_points_nearest_mastery() {
        let intent = decide_intent(&neutral(0.5), None);
        assert_eq!(intent.focus_knowledge_points, vec!["周长", "面积", "小数乘法"]);
    }

    #[test]
    fn high_mastery_introduces_when_gate_open() {
        let intent = decide_intent(&neutral(0.8), None);
        assert_eq!(intent.intent_type, IntentType::Introduce);
        assert!(intent.focus_knowledge_points.is_empty());
        assert_eq!(intent.question_count, 3);
    }

    #[test]
    fn recent_introduce_falls_back_to_challenge() {
        let mut c = neutral(0.8);
        c.stable_patterns
            .insert(LAST_INTRODUCE_KEY.into(), json!("2025-03-11"));
        let intent = decide_intent(&c, None);
        assert_eq!(intent.intent_type, IntentType::Challenge);
        assert_eq!(intent.focus_knowledge_points, vec!["加法", "减法"]);
        assert_eq!(intent.difficulty_level, DifficultyLevel::High);
    }

    #[test]
    fn unparseable_last_introduce_counts_as_never() {
        let mut c = neutral(0.8);
        c.stable_patterns
            .insert(LAST_INTRODUCE_KEY.into(), json!("last tuesday"));
        assert_eq!(decide_intent(&c, None).intent_type, IntentType::Introduce);
    }

    #[test]
    fn low_mastered_ratio_challenges() {
        let mut c = neutral(0.8);
        c.mastery_stats.mastered_count = 5;
        assert_eq!(decide_intent(&c, None).intent_type, IntentType::Challenge);
    }

    #[test]
    fn lighten_falls_back_to_weakest_without_strong_points() {
        let mut c = ctx(0.5, 0.0, Trend::Stable, EmotionSignal::Frustration);
        c.mastery_stats.strong_points.clear();
        let intent = decide_intent(&c, None);
        assert_eq!(intent.focus_knowledge_points, vec!["分数加法"]);
    }

    #[test]
    fn decisions_are_deterministic() {
        let c = neutral(0.55);
        assert_eq!(decide_intent(&c, None), decide_intent(&c, None));
    }
}
