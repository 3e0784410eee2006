use std::collections::HashMap;

use super::*;

/// Keeps everything in process memory. Used by tests and when no database
/// is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: tokio::sync::Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<AccountId, Vec<ReplayFile>>,
    by_path: HashMap<String, AccountId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ReplayStore for MemoryStore {
    async fn find_owner(&self, stored_path: &str) -> Result<Option<AccountId>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.by_path.get(stored_path).cloned())
    }

    async fn attach_decoded(
        &self,
        account: &AccountId,
        stored_path: &str,
        data: &DecodedMatch,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        let entry = inner
            .accounts
            .get_mut(account)
            .and_then(|replays| replays.iter_mut().find(|r| r.stored_path == stored_path))
            .ok_or(StoreError::NotFound)?;

        entry
            .attach(data.clone())
            .map_err(|_| StoreError::AlreadyProcessed)
    }

    async fn remove_entry(
        &self,
        account: &AccountId,
        replay_id: &str,
    ) -> Result<ReplayFile, StoreError> {
        let mut inner = self.inner.lock().await;

        let replays = inner.accounts.get_mut(account).ok_or(StoreError::NotFound)?;
        let index = replays
            .iter()
            .position(|r| r.id == replay_id)
            .ok_or(StoreError::NotFound)?;
        let removed = replays.remove(index);

        inner.by_path.remove(&removed.stored_path);
        Ok(removed)
    }

    async fn insert_entry(
        &self,
        account: &AccountId,
        replay: NewReplay,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.by_path.contains_key(&replay.stored_path) {
            return Err(StoreError::Conflict(replay.stored_path));
        }

        inner
            .by_path
            .insert(replay.stored_path.clone(), account.clone());
        inner
            .accounts
            .entry(account.clone())
            .or_default()
            .push(replay.into());
        Ok(())
    }

    async fn list_entries(&self, account: &AccountId) -> Result<Vec<ReplayFile>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.get(account).cloned().unwrap_or_default())
    }
}
