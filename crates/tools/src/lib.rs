//! The tool catalog for the EduPilot orchestration loop.
//!
//! Eleven tools, grouped by what they touch:
//! - readers: learner profile, mastery, behavior, memories, schedule
//! - decision: teaching intent
//! - content: learning content (two-phase) and essay feedback
//! - memory writer: ephemeral and hypothesis layers only
//! - meta-cognition: `think` and `reflect`
//!
//! Readers never fail the run; store failures come back as documented
//! defaults. Content tools turn generation failures into
//! `{success: false, error}` results instead of errors.

pub mod content;
pub mod feedback;
pub mod intent;
pub mod readers;
pub mod reflection;
pub mod schedule;
pub mod write_memory;

use std::sync::Arc;

use edupilot_config::AppConfig;
use edupilot_core::tool::ToolRegistry;
use edupilot_core::{CaregiverSignal, CaregiverSignalKind, ContentGenerator, EventBus};
use edupilot_memory::ContextAggregator;
use edupilot_pedagogy::{Sanitizer, ScheduleResolver};
use serde::Serialize;
use serde_json::Value;

pub use content::GenerateLearningContentTool;
pub use feedback::GenerateFeedbackTool;
pub use intent::DecideTeachingIntentTool;
pub use readers::{GetBehaviorSignalsTool, GetLearnerProfileTool, GetMasteryStatsTool, GetMemoriesTool};
pub use reflection::{ReflectTool, ThinkTool};
pub use schedule::GetLearningScheduleTool;
pub use write_memory::WriteMemoryTool;

/// Shared collaborators handed to the catalog.
#[derive(Clone)]
pub struct ToolDeps {
    pub aggregator: Arc<ContextAggregator>,
    pub resolver: Arc<ScheduleResolver>,
    pub generator: Arc<dyn ContentGenerator>,
    pub sanitizer: Sanitizer,
    pub events: Option<Arc<EventBus>>,
    /// Seed for skill picking; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl ToolDeps {
    pub fn new(
        aggregator: Arc<ContextAggregator>,
        resolver: Arc<ScheduleResolver>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            aggregator,
            resolver,
            generator,
            sanitizer: Sanitizer::default(),
            events: None,
            seed: None,
        }
    }

    /// Apply the sanitizer and generation sections of `config`.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.sanitizer = Sanitizer::from_config(&config.sanitizer);
        self.seed = config.generation.seed;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Create the registry with all eleven tools.
pub fn default_registry(deps: ToolDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetLearnerProfileTool::new(deps.aggregator.clone())));
    registry.register(Box::new(GetMasteryStatsTool::new(deps.aggregator.clone())));
    registry.register(Box::new(GetBehaviorSignalsTool::new(deps.aggregator.clone())));
    registry.register(Box::new(GetMemoriesTool::new(deps.aggregator.clone())));
    registry.register(Box::new(GetLearningScheduleTool::new(
        deps.aggregator.clone(),
        deps.resolver.clone(),
    )));
    registry.register(Box::new(DecideTeachingIntentTool::new(deps.aggregator.clone())));
    registry.register(Box::new(GenerateLearningContentTool::new(
        deps.aggregator.clone(),
        deps.resolver.clone(),
        deps.generator.clone(),
        deps.sanitizer,
        deps.seed,
    )));
    registry.register(Box::new(GenerateFeedbackTool::new(
        deps.aggregator.clone(),
        deps.generator.clone(),
    )));
    let mut writer = WriteMemoryTool::new(deps.aggregator.store().clone());
    if let Some(events) = deps.events {
        writer = writer.with_events(events);
    }
    registry.register(Box::new(writer));
    registry.register(Box::new(ThinkTool));
    registry.register(Box::new(ReflectTool));
    registry
}

/// Serialize a value for a tool result. Our types always serialize.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Optional string argument, trimmed; empty counts as absent.
pub(crate) fn opt_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Caregiver signal from `caregiver_kind`/`caregiver_note` arguments.
///
/// An unknown kind is treated as `other` so the note is never lost.
pub(crate) fn caregiver_from_args(arguments: &Value) -> Option<CaregiverSignal> {
    let kind = opt_str(arguments, "caregiver_kind")?;
    Some(CaregiverSignal {
        kind: kind.parse().unwrap_or(CaregiverSignalKind::Other),
        content: opt_str(arguments, "caregiver_note").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use edupilot_core::error::GenerationError;
    use edupilot_core::{
        BehaviorSignals, GenerationOutput, GenerationPhase, GenerationRequest, KnowledgePoint,
        LearnerProfile, LearningPeriod, MasteryStats, MemoryLayer, MemoryRecord, RunContext, Trend,
    };
    use edupilot_memory::{InMemoryStore, LearnerFixture};
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns one scripted result per phase and records every request.
    pub struct ScriptedGenerator {
        pub material: Result<GenerationOutput, GenerationError>,
        pub bank: Result<GenerationOutput, GenerationError>,
        pub feedback: Result<GenerationOutput, GenerationError>,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        pub fn new() -> Self {
            Self {
                material: Ok(GenerationOutput {
                    analysis: "课文讲的是分数的意义".into(),
                    material: json!({"title": "分数", "summary": "把一个整体平均分"}),
                    items: vec![],
                }),
                bank: Ok(GenerationOutput {
                    items: (1..=6)
                        .map(|i| json!({"id": format!("q{i}"), "type": "true_false", "stem": format!("第{i}题"), "answer": "对"}))
                        .collect(),
                    ..GenerationOutput::default()
                }),
                feedback: Ok(GenerationOutput {
                    analysis: "结构清楚".into(),
                    material: json!({"strengths": ["开头生动"], "suggestions": ["结尾再点题"]}),
                    items: vec![],
                }),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn phases(&self) -> Vec<GenerationPhase> {
            self.requests.lock().unwrap().iter().map(|r| r.phase).collect()
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutput, GenerationError> {
            let phase = request.phase;
            self.requests.lock().unwrap().push(request);
            match phase {
                GenerationPhase::Material => self.material.clone(),
                GenerationPhase::ItemBank => self.bank.clone(),
                GenerationPhase::Feedback => self.feedback.clone(),
            }
        }
    }

    pub fn today() -> NaiveDate {
        // A Wednesday with no holiday
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    /// A grade-4 learner in the verify band (avg mastery 0.55).
    pub fn fixture(period: LearningPeriod) -> LearnerFixture {
        let mut fixture = LearnerFixture::new(LearnerProfile {
            child_id: "kid-1".into(),
            display_name: "小明".into(),
            grade_level: 4,
            learning_period: period,
        });
        fixture.mastery = MasteryStats::new(
            0.55,
            vec![
                KnowledgePoint::new("k1", "分数加法", 0.2),
                KnowledgePoint::new("k2", "小数乘法", 0.45),
            ],
            vec![KnowledgePoint::new("k3", "加法", 0.95)],
            0.2,
            10,
            5,
        );
        fixture.behavior = BehaviorSignals {
            abandon_rate: 0.05,
            avg_completion_time: 300.0,
            trend: Trend::Stable,
            recent_tasks_completed: 4,
        };
        fixture.memories = vec![MemoryRecord::new(
            "prefers_pictures",
            json!(true),
            MemoryLayer::Hypothesis,
        )];
        fixture
    }

    pub fn store(period: LearningPeriod) -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new().with_fixture(fixture(period)))
    }

    pub fn aggregator(store: Arc<InMemoryStore>) -> Arc<ContextAggregator> {
        Arc::new(ContextAggregator::new(store))
    }

    pub fn ctx() -> RunContext {
        RunContext::new("kid-1", today())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use edupilot_core::{LearningPeriod, ToolName};
    use serde_json::json;

    #[test]
    fn default_registry_has_full_catalog() {
        let deps = ToolDeps::new(
            aggregator(store(LearningPeriod::School)),
            Arc::new(ScheduleResolver::default()),
            Arc::new(ScriptedGenerator::new()),
        );
        let registry = default_registry(deps);
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.ids(), ToolName::ALL.to_vec());
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{} schema", def.name);
        }
    }

    #[test]
    fn caregiver_args() {
        assert!(caregiver_from_args(&json!({})).is_none());
        let signal = caregiver_from_args(&json!({"caregiver_kind": "schedule_change"})).unwrap();
        assert_eq!(signal.kind, CaregiverSignalKind::ScheduleChange);
        assert!(signal.content.is_empty());
        let signal =
            caregiver_from_args(&json!({"caregiver_kind": "gossip", "caregiver_note": "hi"})).unwrap();
        assert_eq!(signal.kind, CaregiverSignalKind::Other);
        assert_eq!(signal.content, "hi");
    }
}
