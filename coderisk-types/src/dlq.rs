use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which pipeline stage produced the failure, and roughly how retryable it
/// is. Mirrors `resilience::FailureKind` but kept here too since a DLQ
/// entry needs to serialize it independent of that crate's retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Stager,
    Grapher,
    Atomizer,
    RiskIndexer,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Stager => "stager",
            FailureStage::Grapher => "grapher",
            FailureStage::Atomizer => "atomizer",
            FailureStage::RiskIndexer => "risk_indexer",
        }
    }
}

/// What kind of entity the failed unit of work was about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum EntityRef {
    Commit(Uuid),
    Issue(Uuid),
    PullRequest(Uuid),
    CodeBlock(Uuid),
}

impl EntityRef {
    pub fn kind_str(&self) -> &'static str {
        match self {
            EntityRef::Commit(_) => "commit",
            EntityRef::Issue(_) => "issue",
            EntityRef::PullRequest(_) => "pull_request",
            EntityRef::CodeBlock(_) => "code_block",
        }
    }

    pub fn target_id(&self) -> Uuid {
        match self {
            EntityRef::Commit(id) | EntityRef::Issue(id) | EntityRef::PullRequest(id) | EntityRef::CodeBlock(id) => *id,
        }
    }
}

/// Deterministic id for the DLQ row tracking `entity`'s failures at
/// `stage`, within `repo_id`. Computing it from identity alone (rather
/// than minting a fresh id per failure) is what lets a repeat failure of
/// the same unit of work escalate one row's attempt counter instead of
/// piling up a new `attempt = 1` row each time.
pub fn entry_id(repo_id: Uuid, stage: FailureStage, entity: &EntityRef) -> Uuid {
    crate::ids::dlq_entry_id(repo_id, stage.as_str(), entity.kind_str(), entity.target_id())
}

/// One dead-letter-queue entry: a unit of work that failed and is either
/// awaiting its next retry or has exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlqEntry {
    pub id: Uuid,
    pub repo_id: Uuid,
    pub stage: FailureStage,
    pub entity: EntityRef,
    pub retry_count: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: String,
    pub dead: bool,
    pub created_at: DateTime<Utc>,
}

impl DlqEntry {
    /// Builds a fresh (zero prior retries) entry for `entity`'s first
    /// failure at `stage`. `id` is deterministic on `(repo_id, stage,
    /// entity)`, not random, so the caller can look up whether this same
    /// unit of work already has an open row before deciding to insert.
    pub fn new(repo_id: Uuid, stage: FailureStage, entity: EntityRef, error: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = entry_id(repo_id, stage, &entity);
        Self {
            id,
            repo_id,
            stage,
            entity,
            retry_count: 0,
            next_attempt_at: now,
            last_error: error.into(),
            dead: false,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entries_for_the_same_entity_share_an_id() {
        let repo = Uuid::new_v4();
        let entity = EntityRef::Commit(Uuid::new_v4());
        let now = Utc::now();
        let a = DlqEntry::new(repo, FailureStage::Atomizer, entity.clone(), "boom", now);
        let b = DlqEntry::new(repo, FailureStage::Atomizer, entity, "boom again", now);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn new_entries_for_different_entities_get_different_ids() {
        let repo = Uuid::new_v4();
        let now = Utc::now();
        let a = DlqEntry::new(repo, FailureStage::Atomizer, EntityRef::Commit(Uuid::new_v4()), "boom", now);
        let b = DlqEntry::new(repo, FailureStage::Atomizer, EntityRef::Commit(Uuid::new_v4()), "boom", now);
        assert_ne!(a.id, b.id);
    }
}
