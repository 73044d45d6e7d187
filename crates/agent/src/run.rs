//! Run request, run-owned state and the flattened outcome.

use std::fmt;
use std::str::FromStr;

use edupilot_core::message::Message;
use edupilot_core::RunContext;
use edupilot_pedagogy::Violation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the caller wants from a run. Each task has its own system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Plan today's session from the learner's state alone
    DailyPlan,
    /// Turn uploaded material into content for today
    ProcessMaterial,
    /// Comment on uploaded work without practice items
    EssayFeedback,
    /// Answer a caregiver's question about the learner
    Consult,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyPlan => "daily_plan",
            Self::ProcessMaterial => "process_material",
            Self::EssayFeedback => "essay_feedback",
            Self::Consult => "consult",
        }
    }

    /// Shared companion rules followed by this task's instructions.
    pub fn system_prompt(&self) -> String {
        format!("{SHARED_RULES}\n\n{}", self.instructions())
    }

    fn instructions(&self) -> &'static str {
        match self {
            Self::DailyPlan => DAILY_PLAN_PROMPT,
            Self::ProcessMaterial => PROCESS_MATERIAL_PROMPT,
            Self::EssayFeedback => ESSAY_FEEDBACK_PROMPT,
            Self::Consult => CONSULT_PROMPT,
        }
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "daily_plan" => Ok(Self::DailyPlan),
            "process_material" => Ok(Self::ProcessMaterial),
            "essay_feedback" => Ok(Self::EssayFeedback),
            "consult" => Ok(Self::Consult),
            other => Err(format!("unknown task '{other}'")),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SHARED_RULES: &str = "You are a patient learning companion for a primary or middle \
school student, working on behalf of their caregiver. Use the tools to look at the learner's \
real state before deciding anything. Never label the child or use shaming words. When you are \
done, reply with a single JSON object and no tool calls.";

const DAILY_PLAN_PROMPT: &str = "Plan today's learning. Call decide_teaching_intent and \
get_learning_schedule first. If the intent is pause, do not generate content. Otherwise call \
generate_learning_content. Final answer: {\"teaching_intent\": {...}, \"focus_message\": string, \
\"items\": [...]}.";

const PROCESS_MATERIAL_PROMPT: &str = "The caregiver uploaded material. Call \
get_learning_schedule to see how it should be used today, then decide_teaching_intent, then \
generate_learning_content. Record anything notable with write_memory. Final answer: \
{\"teaching_intent\": {...}, \"learning_decision\": {...}, \"analysis\": string, \"items\": [...]}.";

const ESSAY_FEEDBACK_PROMPT: &str = "The caregiver uploaded a piece of writing. Call \
generate_feedback. Do not create practice items. Final answer: {\"analysis\": string, \
\"strengths\": [string], \"suggestions\": [string]}.";

const CONSULT_PROMPT: &str = "Answer the caregiver's question using what the tools tell you \
about the learner. Final answer: {\"answer\": string}.";

/// Input to one orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    pub task: TaskKind,
    /// The caller's message; may be empty
    pub message: String,
    pub context: RunContext,
}

impl OrchestrationRequest {
    pub fn new(task: TaskKind, context: RunContext) -> Self {
        Self {
            task,
            message: String::new(),
            context,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The task message that opens the run history.
    pub(crate) fn opening_message(&self) -> String {
        let ctx = &self.context;
        let mut text = format!("Task: {}\nToday: {}", self.task, ctx.today);
        if let Some(material) = &ctx.material_type {
            text.push_str(&format!("\nMaterial type: {material}"));
        }
        if !ctx.attachments.is_empty() {
            let names: Vec<&str> = ctx.attachments.iter().map(|a| a.name.as_str()).collect();
            text.push_str(&format!("\nAttachments: {}", names.join(", ")));
        }
        if let Some(signal) = &ctx.caregiver_signal {
            text.push_str(&format!("\nCaregiver note ({:?}): {}", signal.kind, signal.content));
        }
        if !self.message.trim().is_empty() {
            text.push_str(&format!("\n\n{}", self.message.trim()));
        }
        text
    }
}

/// One executed tool call. `output` is the unsummarized result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub params: Value,
    pub output: String,
    pub success: bool,
    /// Whether the copy sent back to the model was summarized
    pub summarized: bool,
}

/// State owned by exactly one run.
#[derive(Debug, Default)]
pub struct AgentRunState {
    pub messages: Vec<Message>,
    pub tool_call_count: usize,
    pub steps: Vec<ToolCallRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Turn ceiling reached; the trace so far is returned
    PartialSuccess,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartialSuccess => "partial_success",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run produced, including its trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationOutcome {
    pub run_id: String,
    pub status: RunStatus,
    /// Final structured answer (completed runs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Caller-facing error message; diagnostics go to the logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub turns: u32,
    pub tool_call_count: usize,
    pub steps: Vec<ToolCallRecord>,
    /// Hard-constraint breaches corrected by the content guard
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(skip)]
    pub messages: Vec<Message>,
}

impl OrchestrationOutcome {
    pub(crate) fn from_state(run_id: String, status: RunStatus, turns: u32, state: AgentRunState) -> Self {
        Self {
            run_id,
            status,
            result: None,
            error: None,
            turns,
            tool_call_count: state.tool_call_count,
            steps: state.steps,
            violations: Vec::new(),
            messages: state.messages,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::PartialSuccess)
    }

    /// Names of the tools called, in order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}
