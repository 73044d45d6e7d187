//! Learner persistence for EduPilot.
//!
//! Production deployments plug their own database behind
//! [`edupilot_core::LearnerStore`]; this crate ships the in-memory backend
//! used by tests and the CLI, seeded from JSON fixtures, plus the
//! [`ContextAggregator`] that folds a store's answers into one
//! [`edupilot_core::ChildContext`].

pub mod aggregator;
pub mod fixture;
pub mod in_memory;

pub use aggregator::{ContextAggregator, derive_emotion};
pub use fixture::LearnerFixture;
pub use in_memory::{FetchKind, InMemoryStore};
