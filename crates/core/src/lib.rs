//! # EduPilot Core
//!
//! Domain types, traits, and error definitions for the EduPilot
//! teaching-decision runtime. This crate has **no framework dependencies**:
//! it defines the learner model and the collaborator contracts that every
//! other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] — the generative model call primitive
//! - [`LearnerStore`] — persistence of learner state and memory layers
//! - [`ContentGenerator`] — material and item-bank generation
//! - [`Tool`] — a capability the orchestration loop may invoke
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stand-ins for any of them.

pub mod content;
pub mod error;
pub mod event;
pub mod json;
pub mod learner;
pub mod memory;
pub mod message;
pub mod provider;
pub mod run;
pub mod teaching;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use content::{Attachment, ContentGenerator, GenerationOutput, GenerationPhase, GenerationRequest};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use learner::{
    BehaviorSignals, CaregiverSignal, CaregiverSignalKind, ChildContext, EmotionSignal,
    EmotionTrend, KnowledgePoint, LearnerProfile, LearningPeriod, MasteryStats, Trend,
};
pub use memory::{LearnerStore, MemoryLayer, MemoryRecord};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use run::{CancelFlag, RunContext};
pub use teaching::{DifficultyLevel, IntentType, TeachingIntent};
pub use tool::{Tool, ToolCall, ToolName, ToolRegistry, ToolResult};
