//! Model-facing implementations for EduPilot.
//!
//! - [`OpenAiCompatProvider`] — chat completions over any OpenAI-compatible endpoint
//! - [`RetryingProvider`] — bounded exponential backoff around another provider
//! - [`LlmContentGenerator`] — the [`edupilot_core::ContentGenerator`] backed by a provider

pub mod generator;
pub mod openai_compat;
pub mod retry;

pub use generator::LlmContentGenerator;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryingProvider;
