use std::collections::HashMap;

use tokio::sync::RwLock;

use smashbot_core::{ItemKey, StoreError, VoteKind, VoteStore, VoteTally};

#[derive(Default)]
pub struct InMemoryVoteStore {
    tallies: RwLock<HashMap<ItemKey, VoteTally>>,
}

impl InMemoryVoteStore {
    pub fn with_tallies(tallies: impl IntoIterator<Item = (ItemKey, VoteTally)>) -> Self {
        Self { tallies: RwLock::new(tallies.into_iter().collect()) }
    }
}

#[async_trait::async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn increment(&self, key: &ItemKey, kind: VoteKind) -> Result<(), StoreError> {
        let mut tallies = self.tallies.write().await;
        tallies.entry(key.clone()).or_default().record(kind);
        Ok(())
    }

    async fn read(&self, key: &ItemKey) -> Result<VoteTally, StoreError> {
        let tallies = self.tallies.read().await;
        tallies.get(key).copied().ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn ensure_exists(&self, key: &ItemKey) -> Result<(), StoreError> {
        let mut tallies = self.tallies.write().await;
        tallies.entry(key.clone()).or_default();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(ItemKey, VoteTally)>, StoreError> {
        let tallies = self.tallies.read().await;
        let mut listed: Vec<_> = tallies.iter().map(|(key, tally)| (key.clone(), *tally)).collect();
        listed.sort_by(|left, right| left.0.cmp(&right.0));
        Ok(listed)
    }
}
