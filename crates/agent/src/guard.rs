//! Content guard: the schedule's hard constraints, applied to the final
//! answer of a run whatever the model produced.

use std::sync::Arc;

use edupilot_pedagogy::{EffectiveMode, LearningDecision, ScheduleResolver, Violation};
use serde_json::Value;
use tracing::warn;

pub struct ContentGuard {
    resolver: Arc<ScheduleResolver>,
}

impl ContentGuard {
    pub fn new(resolver: Arc<ScheduleResolver>) -> Self {
        Self { resolver }
    }

    /// Most items allowed today.
    ///
    /// A decision that does not present items allows none; otherwise the
    /// decision count and the mode ceiling both apply. Without a decision
    /// the top of the mode's range is the limit.
    pub fn item_ceiling(decision: Option<&LearningDecision>, mode: EffectiveMode) -> u32 {
        let from_decision = match decision {
            Some(d) if !d.front_mode.allows_items() => 0,
            Some(d) => d.question_count,
            None => mode.question_range().1,
        };
        mode.hard_ceiling()
            .map_or(from_decision, |ceiling| from_decision.min(ceiling))
    }

    /// Enforce the constraints on `result` and return what was found.
    ///
    /// Items with forbidden words are dropped and the rest are cut to the
    /// ceiling. Forbidden words anywhere else in the answer are reported but
    /// the text is kept as written.
    pub fn enforce(
        &self,
        result: &mut Value,
        decision: Option<&LearningDecision>,
        mode: EffectiveMode,
    ) -> Vec<Violation> {
        let mut violations = self.resolver.validate(&text_outside_items(result), 0, mode);
        if !violations.is_empty() {
            warn!(
                mode = %mode,
                violations = violations.len(),
                "Forbidden wording in the final answer"
            );
        }

        let Some(items) = result.get_mut("items").and_then(Value::as_array_mut) else {
            return violations;
        };

        let mut item_violations = 0;
        items.retain(|item| {
            let found = self.resolver.validate(&visible_text(item), 0, mode);
            if found.is_empty() {
                true
            } else {
                item_violations += found.len();
                violations.extend(found);
                false
            }
        });

        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        violations.extend(self.resolver.validate("", count, mode));

        let ceiling = Self::item_ceiling(decision, mode);
        if count > ceiling {
            items.truncate(ceiling as usize);
        }

        if item_violations > 0 || count > ceiling {
            warn!(
                mode = %mode,
                ceiling,
                kept = items.len(),
                violations = item_violations,
                "Content guard corrected the final answer"
            );
        }
        violations
    }
}

/// String content of the answer apart from its `items`.
fn text_outside_items(result: &Value) -> String {
    match result.as_object() {
        Some(map) => {
            let mut out = String::new();
            map.iter()
                .filter(|(key, _)| key.as_str() != "items")
                .for_each(|(_, v)| collect_text(v, &mut out));
            out
        }
        None => visible_text(result),
    }
}

/// All string content of a JSON value, space-separated.
fn visible_text(value: &Value) -> String {
    let mut out = String::new();
    collect_text(value, &mut out);
    out
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(s);
            out.push(' ');
        }
        Value::Array(values) => values.iter().for_each(|v| collect_text(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_text(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edupilot_pedagogy::schedule::decide;
    use edupilot_pedagogy::MaterialType;
    use serde_json::json;

    fn guard() -> ContentGuard {
        ContentGuard::new(Arc::new(ScheduleResolver::default()))
    }

    fn items(n: usize) -> Value {
        json!({
            "items": (0..n).map(|i| json!({"id": format!("q{i}"), "stem": format!("第{i}题")})).collect::<Vec<_>>()
        })
    }

    #[test]
    fn ceilings() {
        let lesson = decide(MaterialType::TextbookLesson, EffectiveMode::DailyLight);
        assert_eq!(ContentGuard::item_ceiling(Some(&lesson), EffectiveMode::DailyLight), 2);
        let exam = decide(MaterialType::CompletedExam, EffectiveMode::ExamPrep);
        assert_eq!(ContentGuard::item_ceiling(Some(&exam), EffectiveMode::ExamPrep), 12);
        let essay = decide(MaterialType::EssayPrompt, EffectiveMode::Vacation);
        assert_eq!(ContentGuard::item_ceiling(Some(&essay), EffectiveMode::Vacation), 0);
        assert_eq!(ContentGuard::item_ceiling(None, EffectiveMode::DailyLight), 3);
        assert_eq!(ContentGuard::item_ceiling(None, EffectiveMode::Vacation), 15);
    }

    #[test]
    fn truncates_to_daily_light_ceiling() {
        let mut result = items(6);
        let violations = guard().enforce(&mut result, None, EffectiveMode::DailyLight);
        assert_eq!(result["items"].as_array().unwrap().len(), 3);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::CountExceeded { count: 6, ceiling: 3, .. })));
    }

    #[test]
    fn drops_items_with_forbidden_words() {
        let mut result = json!({
            "items": [
                {"id": "q1", "stem": "3 + 4 = ?", "answer": "7"},
                {"id": "q2", "stem": "做错了就是笨", "answer": "x"},
                {"id": "q3", "stem": "ok", "options": ["fine", "You are STUPID"]},
            ]
        });
        let violations = guard().enforce(&mut result, None, EffectiveMode::WeekendReview);
        let kept = result["items"].as_array().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["id"], "q1");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn feedback_only_clears_items() {
        let essay = decide(MaterialType::EssayPrompt, EffectiveMode::WeekendReview);
        let mut result = items(2);
        guard().enforce(&mut result, Some(&essay), EffectiveMode::WeekendReview);
        assert!(result["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn answer_text_is_reported_but_kept() {
        let mut result = json!({"answer": "你真笨"});
        let violations = guard().enforce(&mut result, None, EffectiveMode::DailyLight);
        assert_eq!(
            violations,
            vec![Violation::ForbiddenWord { word: "笨".into(), occurrences: 1 }]
        );
        assert_eq!(result["answer"], "你真笨");

        let mut clean = json!({"answer": "今天休息一下吧"});
        assert!(guard().enforce(&mut clean, None, EffectiveMode::DailyLight).is_empty());
    }

    #[test]
    fn text_beside_items_is_scanned_too() {
        let mut result = json!({
            "focus_message": "你真笨，太差了",
            "analysis": {"summary": "lazy"},
            "items": [{"id": "q1", "stem": "1 + 1 = ?"}],
        });
        let violations = guard().enforce(&mut result, None, EffectiveMode::DailyLight);
        let words: Vec<String> = violations
            .iter()
            .filter_map(|v| match v {
                Violation::ForbiddenWord { word, .. } => Some(word.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(words, vec!["笨", "太差了", "lazy"]);
        assert_eq!(result["items"].as_array().unwrap().len(), 1);
        assert_eq!(result["focus_message"], "你真笨，太差了");
    }
}
