//! The EduPilot orchestration loop.
//!
//! A run follows a **Look → Decide → Generate** cycle driven by the model:
//!
//! 1. **Receive** a task and its run context (learner, date, attachments)
//! 2. **Send to the model** with the task's system prompt and the tool catalog
//! 3. **If tool calls**: execute them, append (possibly summarized) results,
//!    loop back to step 2
//! 4. **If text**: extract the JSON answer, enforce today's hard
//!    constraints on it, and return
//!
//! The loop ends at the turn ceiling with a partial result, on
//! cancellation, or on a model failure. Every run owns its own state; the
//! collaborators behind [`TeachingService`] are shared.

pub mod guard;
pub mod orchestrator;
pub mod run;
pub mod service;
pub mod summarize;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use guard::ContentGuard;
pub use orchestrator::Orchestrator;
pub use run::{
    AgentRunState, OrchestrationOutcome, OrchestrationRequest, RunStatus, TaskKind, ToolCallRecord,
};
pub use service::TeachingService;
