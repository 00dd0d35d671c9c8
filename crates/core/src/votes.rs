use async_trait::async_trait;
use thiserror::Error;

use crate::domain::item::ItemKey;
use crate::domain::vote::{VoteKind, VoteTally};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no vote record exists for `{0}`")]
    NotFound(ItemKey),
    #[error("vote store database error: {0}")]
    Database(String),
    #[error("vote store operation `{operation}` exceeded {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },
    #[error("vote store unavailable: {0}")]
    Unavailable(String),
}

/// Durable counters keyed by item identity.
///
/// Implementations must apply same-key increments atomically: two concurrent votes on one
/// item both land.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn increment(&self, key: &ItemKey, kind: VoteKind) -> Result<(), StoreError>;
    async fn read(&self, key: &ItemKey) -> Result<VoteTally, StoreError>;
    async fn ensure_exists(&self, key: &ItemKey) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<(ItemKey, VoteTally)>, StoreError>;
}
