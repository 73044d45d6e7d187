//! In-memory learner store, useful for testing and the CLI.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use edupilot_core::error::StoreError;
use edupilot_core::{
    BehaviorSignals, EmotionTrend, LearnerProfile, LearnerStore, MasteryStats, MemoryLayer,
    MemoryRecord,
};
use tokio::sync::RwLock;

use crate::fixture::LearnerFixture;

/// Store operations that can be told to fail, to exercise degraded paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Profile,
    Mastery,
    Behavior,
    Memory,
    EmotionTrend,
    Upsert,
}

/// Learners keyed by child ID, behind a tokio `RwLock`.
pub struct InMemoryStore {
    learners: RwLock<HashMap<String, LearnerFixture>>,
    failing: HashSet<FetchKind>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            learners: RwLock::new(HashMap::new()),
            failing: HashSet::new(),
        }
    }

    pub fn with_fixture(mut self, fixture: LearnerFixture) -> Self {
        self.learners
            .get_mut()
            .insert(fixture.child_id().to_string(), fixture);
        self
    }

    /// Make every call of `kind` return [`StoreError::Unavailable`].
    pub fn fail_on(mut self, kind: FetchKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub async fn insert(&self, fixture: LearnerFixture) {
        self.learners
            .write()
            .await
            .insert(fixture.child_id().to_string(), fixture);
    }

    fn check(&self, kind: FetchKind) -> Result<(), StoreError> {
        if self.failing.contains(&kind) {
            Err(StoreError::Unavailable(format!("{kind:?} fetch disabled")))
        } else {
            Ok(())
        }
    }

    async fn read<T>(
        &self,
        kind: FetchKind,
        child_id: &str,
        f: impl FnOnce(&LearnerFixture) -> T,
    ) -> Result<T, StoreError> {
        self.check(kind)?;
        let learners = self.learners.read().await;
        learners
            .get(child_id)
            .map(f)
            .ok_or_else(|| StoreError::NotFound(child_id.to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LearnerStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch_profile(&self, child_id: &str) -> Result<LearnerProfile, StoreError> {
        self.read(FetchKind::Profile, child_id, |l| l.profile.clone()).await
    }

    async fn fetch_mastery(&self, child_id: &str) -> Result<MasteryStats, StoreError> {
        self.read(FetchKind::Mastery, child_id, |l| l.mastery.clone()).await
    }

    async fn fetch_behavior(&self, child_id: &str) -> Result<BehaviorSignals, StoreError> {
        self.read(FetchKind::Behavior, child_id, |l| l.behavior.clone()).await
    }

    async fn fetch_memory(
        &self,
        child_id: &str,
        layer: Option<MemoryLayer>,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        self.read(FetchKind::Memory, child_id, |l| {
            l.memories
                .iter()
                .filter(|r| layer.is_none_or(|wanted| r.layer == wanted))
                .cloned()
                .collect()
        })
        .await
    }

    async fn fetch_emotion_trend(&self, child_id: &str) -> Result<EmotionTrend, StoreError> {
        self.read(FetchKind::EmotionTrend, child_id, |l| l.emotion_trend.clone())
            .await
    }

    async fn upsert_memory(&self, child_id: &str, mut record: MemoryRecord) -> Result<(), StoreError> {
        self.check(FetchKind::Upsert)?;
        let mut learners = self.learners.write().await;
        let learner = learners
            .get_mut(child_id)
            .ok_or_else(|| StoreError::NotFound(child_id.to_string()))?;

        record.updated_at = Utc::now();
        match learner
            .memories
            .iter_mut()
            .find(|r| r.layer == record.layer && r.key == record.key)
        {
            Some(existing) => *existing = record,
            None => learner.memories.push(record),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> InMemoryStore {
        let mut fixture = LearnerFixture::new(LearnerProfile::fallback("kid-1"));
        fixture.memories = vec![
            MemoryRecord::new("fatigue_evening", json!(true), MemoryLayer::Hypothesis),
            MemoryRecord::new("last_introduce", json!("2025-03-01"), MemoryLayer::Stable),
        ];
        InMemoryStore::new().with_fixture(fixture)
    }

    #[tokio::test]
    async fn fetch_known_learner() {
        let store = store();
        let profile = store.fetch_profile("kid-1").await.unwrap();
        assert_eq!(profile.child_id, "kid-1");
        assert!((store.fetch_mastery("kid-1").await.unwrap().avg_mastery - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unknown_learner_is_not_found() {
        let store = store();
        assert!(matches!(store.fetch_profile("nobody").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn memory_filtered_by_layer() {
        let store = store();
        let all = store.fetch_memory("kid-1", None).await.unwrap();
        assert_eq!(all.len(), 2);
        let stable = store.fetch_memory("kid-1", Some(MemoryLayer::Stable)).await.unwrap();
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].key, "last_introduce");
    }

    #[tokio::test]
    async fn upsert_replaces_same_layer_and_key() {
        let store = store();
        store
            .upsert_memory(
                "kid-1",
                MemoryRecord::new("last_introduce", json!("2025-03-12"), MemoryLayer::Stable),
            )
            .await
            .unwrap();
        store
            .upsert_memory(
                "kid-1",
                MemoryRecord::new("last_introduce", json!("note"), MemoryLayer::Ephemeral),
            )
            .await
            .unwrap();

        let stable = store.fetch_memory("kid-1", Some(MemoryLayer::Stable)).await.unwrap();
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].value, json!("2025-03-12"));
        assert_eq!(store.fetch_memory("kid-1", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fail_on_only_affects_that_fetch() {
        let store = store().fail_on(FetchKind::Mastery);
        assert!(matches!(store.fetch_mastery("kid-1").await, Err(StoreError::Unavailable(_))));
        assert!(store.fetch_behavior("kid-1").await.is_ok());
    }

    #[tokio::test]
    async fn insert_after_construction() {
        let store = InMemoryStore::new();
        store.insert(LearnerFixture::new(LearnerProfile::fallback("kid-9"))).await;
        assert!(store.fetch_emotion_trend("kid-9").await.is_ok());
    }
}
