//! Pure teaching-decision logic for EduPilot.
//!
//! Nothing in this crate performs I/O or reads the clock: every function
//! is deterministic given its inputs, which is what lets the orchestration
//! layer treat these results as hard constraints.
//!
//! - [`schedule`] — calendar → effective mode, material × mode → learning decision
//! - [`intent`] — learner snapshot → teaching intent
//! - [`merge`] — material + item bank → sanitized learning content
//! - [`skill`] — seeded practice-skill picking

pub mod intent;
pub mod merge;
pub mod schedule;
pub mod skill;

pub use intent::decide_intent;
pub use merge::{ItemType, LearningContent, QuizItem, Sanitizer};
pub use skill::pick_skills;
pub use schedule::{
    EffectiveMode, FrontMode, HolidayCalendar, LearningDecision, MaterialType,
    ScheduleResolution, ScheduleResolver, Violation,
};
