#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backend::decoder::{DecodeError, Decoder};
use backend::ingest::{IngestConfig, IngestWorker};
use backend::store::{MemoryStore, ReplayStore, StoreError};
use common::{AccountId, DecodedMatch, NewReplay, ReplayFile};

/// Reads the "replay" as decoder output instead of running a decoder.
#[derive(Default)]
pub struct FileDecoder {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl FileDecoder {
    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }
}

#[async_trait::async_trait]
impl Decoder for FileDecoder {
    async fn decode(&self, input: &Path) -> Result<DecodedMatch, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let content = tokio::fs::read(input).await.map_err(DecodeError::Spawn)?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        backend::decoder::parse_output(&content)
    }
}

/// Counts the calls that changed something in the wrapped store.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub attached: AtomicUsize,
    pub removed: AtomicUsize,
}

impl CountingStore {
    pub fn mutations(&self) -> usize {
        self.attached.load(Ordering::SeqCst) + self.removed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReplayStore for CountingStore {
    async fn find_owner(&self, stored_path: &str) -> Result<Option<AccountId>, StoreError> {
        self.inner.find_owner(stored_path).await
    }

    async fn attach_decoded(
        &self,
        account: &AccountId,
        stored_path: &str,
        data: &DecodedMatch,
    ) -> Result<(), StoreError> {
        self.inner.attach_decoded(account, stored_path, data).await?;
        self.attached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_entry(
        &self,
        account: &AccountId,
        replay_id: &str,
    ) -> Result<ReplayFile, StoreError> {
        let removed = self.inner.remove_entry(account, replay_id).await?;
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(removed)
    }

    async fn insert_entry(
        &self,
        account: &AccountId,
        replay: NewReplay,
    ) -> Result<(), StoreError> {
        self.inner.insert_entry(account, replay).await
    }

    async fn list_entries(&self, account: &AccountId) -> Result<Vec<ReplayFile>, StoreError> {
        self.inner.list_entries(account).await
    }
}

pub fn account() -> AccountId {
    AccountId::new("6650a1f0c2e4b2d1a8f3e901")
}

pub fn new_replay(file_name: &str) -> NewReplay {
    NewReplay {
        id: format!("id-{}", file_name),
        stored_path: format!("uploads/{}", file_name),
        original_name: format!("original {}", file_name),
    }
}

/// Decoder output for a small match.
pub fn match_json(id: &str, player: &str, goals: u32) -> String {
    let goal_events: Vec<_> = (0..goals)
        .map(|g| serde_json::json!({"PlayerName": player, "frame": 1800 * (g + 1), "PlayerTeam": 0}))
        .collect();

    serde_json::json!({
        "file": format!("{}.replay", id),
        "replay": {
            "game_type": "TAGame.Replay_Soccar_TA",
            "properties": {
                "Id": id,
                "RecordFPS": 30.0,
                "Team0Score": goals,
                "PlayerStats": [
                    {"Name": player, "Team": 0, "Goals": goals, "Assists": 1, "Saves": 2, "Score": 100}
                ],
                "Goals": goal_events
            }
        }
    })
    .to_string()
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn worker_config(watch_dir: &Path) -> IngestConfig {
    IngestConfig {
        watch_dir: watch_dir.to_path_buf(),
        poll_interval: Duration::from_millis(20),
        ..IngestConfig::default()
    }
}

pub fn worker<D, S>(watch_dir: &Path, decoder: Arc<D>, store: Arc<S>) -> IngestWorker
where
    D: Decoder + 'static,
    S: ReplayStore + 'static,
{
    IngestWorker::new(worker_config(watch_dir), decoder, store)
}
