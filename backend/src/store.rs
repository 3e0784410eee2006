//! Persistence of replay entries owned by accounts.
//!
//! Nothing in here touches the filesystem, raw and intermediate files are
//! the ingestion worker's business.

use common::{AccountId, DecodedMatch, NewReplay, ReplayFile};

mod memory;
pub use memory::MemoryStore;

mod pg;
pub use pg::DieselStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("replay entry not found")]
    NotFound,
    #[error("replay entry was already processed")]
    AlreadyProcessed,
    #[error("stored path {0:?} is already registered")]
    Conflict(String),
    #[error("database: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool: {0}")]
    Pool(String),
    #[error("running migrations: {0}")]
    Migration(String),
    #[error("stored payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait ReplayStore: Send + Sync {
    /// The account whose replays include an entry stored at `stored_path`.
    async fn find_owner(&self, stored_path: &str) -> Result<Option<AccountId>, StoreError>;

    /// Marks the entry at `stored_path` as processed and attaches `data`.
    ///
    /// Only unprocessed entries are updated, a processed one yields
    /// [`StoreError::AlreadyProcessed`].
    async fn attach_decoded(
        &self,
        account: &AccountId,
        stored_path: &str,
        data: &DecodedMatch,
    ) -> Result<(), StoreError>;

    /// Removes one entry and hands it back.
    async fn remove_entry(
        &self,
        account: &AccountId,
        replay_id: &str,
    ) -> Result<ReplayFile, StoreError>;

    /// Registers an uploaded replay, creating the account record if needed.
    async fn insert_entry(&self, account: &AccountId, replay: NewReplay)
        -> Result<(), StoreError>;

    /// All entries of `account`, oldest upload first.
    async fn list_entries(&self, account: &AccountId) -> Result<Vec<ReplayFile>, StoreError>;
}
