//! Request-scoped run state shared with tools.
//!
//! Tools never read ambient globals: everything they need about the current
//! request (learner, date, attachments) arrives through [`RunContext`], so
//! concurrent runs cannot see each other's attachments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::content::Attachment;
use crate::learner::CaregiverSignal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,

    pub child_id: String,

    /// The calendar date the run plans for
    pub today: NaiveDate,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Material type of the attachments, when the caller knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_signal: Option<CaregiverSignal>,
}

impl RunContext {
    pub fn new(child_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            child_id: child_id.into(),
            today,
            attachments: Vec::new(),
            material_type: None,
            caregiver_signal: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_material_type(mut self, material_type: impl Into<String>) -> Self {
        self.material_type = Some(material_type.into());
        self
    }

    pub fn with_caregiver_signal(mut self, signal: CaregiverSignal) -> Self {
        self.caregiver_signal = Some(signal);
        self
    }
}

/// Cooperative cancellation handle, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());
        flag.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn each_context_gets_its_own_run_id() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 6).unwrap();
        let a = RunContext::new("kid", today);
        let b = RunContext::new("kid", today);
        assert_ne!(a.run_id, b.run_id);
    }
}
