//! Shared test helpers for orchestration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use edupilot_core::error::{GenerationError, ProviderError};
use edupilot_core::message::{Message, MessageToolCall};
use edupilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use edupilot_core::{
    ContentGenerator, GenerationOutput, GenerationPhase, GenerationRequest, KnowledgePoint,
    LearnerProfile, LearningPeriod, MasteryStats,
};
use edupilot_memory::{InMemoryStore, LearnerFixture};
use serde_json::json;

/// A mock provider that returns a sequence of scripted responses.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }
}

/// Always fails with the given error.
pub struct FailingProvider(pub ProviderError);

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.0.clone())
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(thought).with_tool_calls(tool_calls),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Returns long, well-formed content for every phase.
pub struct CannedGenerator {
    pub phases: Mutex<Vec<GenerationPhase>>,
}

impl CannedGenerator {
    pub fn new() -> Self {
        Self {
            phases: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContentGenerator for CannedGenerator {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutput, GenerationError> {
        self.phases.lock().unwrap().push(request.phase);
        Ok(match request.phase {
            GenerationPhase::Material => GenerationOutput {
                analysis: "本课讲分数的意义和大小比较。".repeat(10),
                material: json!({"title": "分数", "summary": "把一个整体平均分成若干份。".repeat(10)}),
                items: vec![],
            },
            GenerationPhase::ItemBank => GenerationOutput {
                items: (0..request.question_count)
                    .map(|i| {
                        json!({
                            "id": format!("q{i}"),
                            "type": "single_choice",
                            "stem": format!("第{i}题：下面哪个分数最大？"),
                            "options": ["1/2", "1/3", "1/4"],
                            "answer": "1/2",
                            "explanation": "分子相同，分母越小分数越大。",
                        })
                    })
                    .collect(),
                ..GenerationOutput::default()
            },
            GenerationPhase::Feedback => GenerationOutput {
                analysis: "结构清楚，细节生动".into(),
                material: json!({"strengths": ["开头生动"], "suggestions": ["结尾再点题"]}),
                items: vec![],
            },
        })
    }
}

/// A Wednesday with no holiday.
pub fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
}

/// A grade-4 learner in the verify band.
pub fn learner_store(period: LearningPeriod) -> Arc<InMemoryStore> {
    let mut fixture = LearnerFixture::new(LearnerProfile {
        child_id: "kid-1".into(),
        display_name: "小明".into(),
        grade_level: 4,
        learning_period: period,
    });
    fixture.mastery = MasteryStats::new(
        0.55,
        vec![KnowledgePoint::new("k1", "分数加法", 0.3)],
        vec![KnowledgePoint::new("k2", "加法", 0.95)],
        0.2,
        10,
        5,
    );
    Arc::new(InMemoryStore::new().with_fixture(fixture))
}

/// A school-period learner who qualifies for `introduce`: high mastery,
/// neutral behavior, no earlier introduce on record.
pub fn strong_learner_store() -> Arc<InMemoryStore> {
    let mut fixture = LearnerFixture::new(LearnerProfile {
        child_id: "kid-1".into(),
        display_name: "小红".into(),
        grade_level: 5,
        learning_period: LearningPeriod::School,
    });
    fixture.mastery = MasteryStats::new(0.85, Vec::new(), Vec::new(), 0.05, 10, 8);
    Arc::new(InMemoryStore::new().with_fixture(fixture))
}
