//! The orchestration loop.
//!
//! Each turn sends the run history, the task's system prompt and the tool
//! catalog to the model:
//!
//! 1. **Tool calls** are executed one by one. Each result is appended to the
//!    history, summarized first when it is longer than the threshold; the
//!    full output goes to the run's steps and the event bus.
//! 2. **Text without tool calls** ends the run. The JSON answer is extracted
//!    and passed through the content guard.
//! 3. **Neither** ends the run with [`RunError::EmptyResponse`].
//!
//! Reaching the turn ceiling ends the run as a partial success with the
//! trace so far. Cancellation is checked before every turn.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use edupilot_config::AppConfig;
use edupilot_core::error::{RunError, ToolError};
use edupilot_core::json::extract_json;
use edupilot_core::learner::LAST_INTRODUCE_KEY;
use edupilot_core::message::{Message, MessageToolCall};
use edupilot_core::provider::{Provider, ProviderRequest};
use edupilot_core::tool::{ToolCall, ToolName, ToolRegistry, ToolResult};
use edupilot_core::{
    CancelFlag, DomainEvent, EventBus, IntentType, LearnerStore, MemoryLayer, MemoryRecord, RunContext,
};
use edupilot_memory::ContextAggregator;
use edupilot_pedagogy::{ScheduleResolver, Violation};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::guard::ContentGuard;
use crate::run::{AgentRunState, OrchestrationOutcome, OrchestrationRequest, RunStatus, ToolCallRecord};
use crate::summarize::summarize;

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    aggregator: Arc<ContextAggregator>,
    resolver: Arc<ScheduleResolver>,
    guard: ContentGuard,
    events: Arc<EventBus>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_turns: u32,
    summarize_threshold: usize,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        aggregator: Arc<ContextAggregator>,
        resolver: Arc<ScheduleResolver>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            aggregator,
            guard: ContentGuard::new(resolver.clone()),
            resolver,
            events: Arc::new(EventBus::default()),
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
            max_turns: 8,
            summarize_threshold: 2000,
        }
    }

    /// Apply model and orchestration settings from `config`.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.model = config.default_model.clone();
        self.temperature = config.default_temperature;
        self.max_tokens = Some(config.default_max_tokens);
        self.max_turns = config.orchestration.max_turns;
        self.summarize_threshold = config.orchestration.summarize_threshold_chars;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_summarize_threshold(mut self, chars: usize) -> Self {
        self.summarize_threshold = chars;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Run one request to a terminal state. Never panics on model or tool
    /// failure; the outcome's status says how the run ended.
    pub async fn run(&self, request: OrchestrationRequest, cancel: &CancelFlag) -> OrchestrationOutcome {
        let ctx = &request.context;
        let tool_defs = self.tools.definitions();
        let mut state = AgentRunState {
            messages: vec![
                Message::system(request.task.system_prompt()),
                Message::user(request.opening_message()),
            ],
            ..AgentRunState::default()
        };
        let mut turns = 0u32;

        info!(
            run_id = %ctx.run_id,
            child_id = %ctx.child_id,
            task = %request.task,
            max_turns = self.max_turns,
            "Orchestration run starting"
        );

        loop {
            if cancel.is_cancelled() {
                info!(run_id = %ctx.run_id, turn = turns, "Run cancelled");
                return self.fail(ctx, RunStatus::Cancelled, turns, state, RunError::Cancelled);
            }
            if turns >= self.max_turns {
                warn!(run_id = %ctx.run_id, max_turns = self.max_turns, "Turn ceiling reached");
                return self.finish(ctx, OrchestrationOutcome::from_state(
                    ctx.run_id.clone(),
                    RunStatus::PartialSuccess,
                    turns,
                    state,
                ));
            }

            let provider_request = ProviderRequest {
                model: self.model.clone(),
                messages: state.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_defs.clone(),
            };

            let response = match self.provider.complete(provider_request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(run_id = %ctx.run_id, turn = turns + 1, error = %e, "Model call failed");
                    return self.fail(ctx, RunStatus::Failed, turns, state, RunError::Model(e));
                }
            };
            turns += 1;

            self.events.publish(DomainEvent::ModelCalled {
                run_id: ctx.run_id.clone(),
                turn: turns,
                model: response.model.clone(),
                tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
                timestamp: Utc::now(),
            });

            let message = response.message;
            debug!(
                run_id = %ctx.run_id,
                turn = turns,
                tool_calls = message.tool_calls.len(),
                "Model turn"
            );

            if !message.tool_calls.is_empty() {
                let calls = message.tool_calls.clone();
                state.messages.push(message);
                for call in &calls {
                    self.execute_tool(ctx, call, &mut state).await;
                }
                continue;
            }

            if message.content.trim().is_empty() {
                warn!(run_id = %ctx.run_id, turn = turns, "Model returned nothing usable");
                return self.fail(ctx, RunStatus::Failed, turns, state, RunError::EmptyResponse);
            }

            let mut result = extract_json(&message.content);
            state.messages.push(message);
            let violations = self.guard_result(ctx, &mut result).await;
            if engine_intent(&state.steps) == Some(IntentType::Introduce) {
                self.record_introduce(ctx).await;
            }

            let mut outcome =
                OrchestrationOutcome::from_state(ctx.run_id.clone(), RunStatus::Completed, turns, state);
            outcome.result = Some(result);
            outcome.violations = violations;
            return self.finish(ctx, outcome);
        }
    }

    async fn execute_tool(&self, ctx: &RunContext, call: &MessageToolCall, state: &mut AgentRunState) {
        state.tool_call_count += 1;
        let start = Instant::now();

        let params = parse_arguments(&call.arguments);
        let result = match &params {
            Ok(arguments) => {
                let tool_call = ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: arguments.clone(),
                };
                self.tools.execute(&tool_call, ctx).await
            }
            Err(e) => Err(e.clone()),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        // Invalid operations become a failed result; the run continues.
        let result = result.unwrap_or_else(|e| {
            warn!(run_id = %ctx.run_id, tool = %call.name, error = %e, "Tool call rejected");
            ToolResult::failure(e.to_string())
        });
        debug!(
            run_id = %ctx.run_id,
            tool = %call.name,
            success = result.success,
            duration_ms,
            "Tool executed"
        );

        self.events.publish(DomainEvent::ToolExecuted {
            run_id: ctx.run_id.clone(),
            tool_name: call.name.clone(),
            success: result.success,
            duration_ms,
            full_output: result.output.clone(),
            timestamp: Utc::now(),
        });

        let summary = summarize(&call.name, &result.output, self.summarize_threshold);
        if summary.is_some() {
            debug!(
                tool = %call.name,
                chars = result.output.chars().count(),
                "Tool output summarized for the model"
            );
        }
        let injected = summary.clone().unwrap_or_else(|| result.output.clone());
        state.messages.push(Message::tool_result(&call.id, injected));

        state.steps.push(ToolCallRecord {
            name: call.name.clone(),
            params: params.unwrap_or(Value::Null),
            output: result.output,
            success: result.success,
            summarized: summary.is_some(),
        });
    }

    /// Apply today's hard constraints to a final answer.
    async fn guard_result(&self, ctx: &RunContext, result: &mut Value) -> Vec<Violation> {
        let profile = self.aggregator.profile(&ctx.child_id).await;
        let resolution = self.resolver.resolve_schedule(
            profile.learning_period,
            ctx.today,
            ctx.material_type.as_deref(),
        );
        self.guard.enforce(
            result,
            resolution.learning_decision.as_ref(),
            resolution.effective_mode,
        )
    }

    /// An `introduce` session starts the cooldown: record today's date in the
    /// stable layer. This write bypasses `write_memory`, which cannot reach
    /// the stable layer.
    async fn record_introduce(&self, ctx: &RunContext) {
        let record = MemoryRecord::new(
            LAST_INTRODUCE_KEY,
            json!(ctx.today.format("%Y-%m-%d").to_string()),
            MemoryLayer::Stable,
        )
        .with_confidence(1.0);

        match self.aggregator.store().upsert_memory(&ctx.child_id, record).await {
            Ok(()) => {
                info!(child_id = %ctx.child_id, date = %ctx.today, "Recorded introduce session");
                self.events.publish(DomainEvent::MemoryWritten {
                    child_id: ctx.child_id.clone(),
                    layer: MemoryLayer::Stable.to_string(),
                    key: LAST_INTRODUCE_KEY.to_string(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => warn!(child_id = %ctx.child_id, error = %e, "Could not record introduce session"),
        }
    }

    fn fail(
        &self,
        ctx: &RunContext,
        status: RunStatus,
        turns: u32,
        state: AgentRunState,
        err: RunError,
    ) -> OrchestrationOutcome {
        let mut outcome = OrchestrationOutcome::from_state(ctx.run_id.clone(), status, turns, state);
        outcome.error = Some(err.user_message().to_string());
        self.finish(ctx, outcome)
    }

    fn finish(&self, ctx: &RunContext, outcome: OrchestrationOutcome) -> OrchestrationOutcome {
        info!(
            run_id = %ctx.run_id,
            status = %outcome.status,
            turns = outcome.turns,
            tool_calls = outcome.tool_call_count,
            "Orchestration run finished"
        );
        self.events.publish(DomainEvent::RunFinished {
            run_id: ctx.run_id.clone(),
            child_id: ctx.child_id.clone(),
            status: outcome.status.to_string(),
            turns: outcome.turns,
            tool_calls: outcome.tool_call_count,
            timestamp: Utc::now(),
        });
        outcome
    }
}

/// Tool-call arguments as sent by the model. Empty means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(format!("arguments are not JSON: {e}")))
}

/// The intent the decision engine produced most recently in this run.
///
/// Only successful `decide_teaching_intent` and `generate_learning_content`
/// steps count; what the model writes in its answer does not.
fn engine_intent(steps: &[ToolCallRecord]) -> Option<IntentType> {
    steps.iter().rev().filter(|s| s.success).find_map(|step| {
        let pointer = match step.name.parse::<ToolName>().ok()? {
            ToolName::DecideTeachingIntent => "/type",
            ToolName::GenerateLearningContent => "/teaching_intent/type",
            _ => return None,
        };
        let output: Value = serde_json::from_str(&step.output).ok()?;
        let raw = output.pointer(pointer)?.as_str()?;
        serde_json::from_value(Value::String(raw.to_string())).ok()
    })
}
