//! Background ingestion of uploaded replay files.
//!
//! Every tick lists the watched directory and drives each `.replay` file
//! through decode, attach and cleanup. A file's failure never affects the
//! other files of the same tick, and the raw file is gone from the watched
//! directory once its tick is done.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;

use crate::decoder::{intermediate_path, Decoder};
use crate::store::{ReplayStore, StoreError};

pub const REPLAY_EXTENSION: &str = ".replay";

const MAX_QUARANTINE_SUFFIX: u32 = 1000;

/// What happens to a raw file whose decode failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    Delete,
    /// Move the file into the given directory for later inspection.
    Quarantine(PathBuf),
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub watch_dir: PathBuf,
    /// Prefix the upload path recorded in front of the file name,
    /// `uploads` turns `abc.replay` into `uploads/abc.replay`.
    pub stored_path_prefix: String,
    pub poll_interval: Duration,
    /// Files processed at the same time within one tick.
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("uploads/"),
            stored_path_prefix: "uploads".to_owned(),
            poll_interval: Duration::from_secs(5),
            concurrency: 4,
            failure_policy: FailurePolicy::Delete,
        }
    }
}

/// The key an upload recorded for a file named `file_name`.
pub fn stored_path_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_owned()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Attached,
    /// The entry had been processed before, nothing was written.
    AlreadyProcessed,
    /// Decoded, but no account references the file.
    Orphaned,
    DecodeFailed,
    StoreFailed,
    /// Removed by someone else between listing and claiming.
    Vanished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub attached: usize,
    pub already_processed: usize,
    pub orphaned: usize,
    pub decode_failed: usize,
    pub store_failed: usize,
    pub vanished: usize,
    /// Files claimed by a concurrently running tick.
    pub skipped: usize,
    pub cleanup_failed: usize,
}

impl TickSummary {
    pub fn processed(&self) -> usize {
        self.attached + self.already_processed + self.orphaned + self.decode_failed + self.store_failed
    }

    fn record(&mut self, outcome: FileOutcome) {
        let counter = match outcome {
            FileOutcome::Attached => &mut self.attached,
            FileOutcome::AlreadyProcessed => &mut self.already_processed,
            FileOutcome::Orphaned => &mut self.orphaned,
            FileOutcome::DecodeFailed => &mut self.decode_failed,
            FileOutcome::StoreFailed => &mut self.store_failed,
            FileOutcome::Vanished => &mut self.vanished,
        };
        *counter += 1;
    }
}

pub struct IngestWorker {
    config: IngestConfig,
    decoder: Arc<dyn Decoder>,
    store: Arc<dyn ReplayStore>,
    claimed: Arc<Mutex<HashSet<PathBuf>>>,
}

/// Releases a claimed file when dropped.
struct Claim {
    path: PathBuf,
    claimed: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        if let Ok(mut claimed) = self.claimed.lock() {
            claimed.remove(&self.path);
        }
    }
}

struct FileResult {
    outcome: FileOutcome,
    cleanup_failed: usize,
}

impl IngestWorker {
    pub fn new(
        config: IngestConfig,
        decoder: Arc<dyn Decoder>,
        store: Arc<dyn ReplayStore>,
    ) -> Self {
        Self {
            config,
            decoder,
            store,
            claimed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ticks every poll interval until `shutdown` fires.
    ///
    /// Shutdown is only observed between ticks, a running tick always
    /// completes its cleanup first.
    pub async fn run(&self, shutdown: tokio_util::sync::CancellationToken) {
        tracing::info!(
            watch_dir = %self.config.watch_dir.display(),
            interval = ?self.config.poll_interval,
            "Watching for new replay files"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Stopping ingestion");
                    break;
                }
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(summary) if summary.processed() > 0 => {
                            tracing::info!(?summary, "Finished ingestion tick");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(watch_dir = %self.config.watch_dir.display(), "Listing watched directory: {}", e);
                        }
                    };
                }
            }
        }
    }

    /// Processes every replay file currently in the watched directory.
    ///
    /// Only a failure to list the directory is returned, per-file errors
    /// are logged and counted in the summary.
    pub async fn tick(&self) -> Result<TickSummary, std::io::Error> {
        let files = self.list_replays().await?;
        let mut summary = TickSummary::default();

        let claims: Vec<Claim> = files
            .into_iter()
            .filter_map(|path| {
                let claim = self.claim(path);
                if claim.is_none() {
                    summary.skipped += 1;
                }
                claim
            })
            .collect();

        let results: Vec<FileResult> = futures::stream::iter(claims)
            .map(|claim| async move {
                let result = self.process_file(&claim.path).await;
                drop(claim);
                result
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for result in results {
            summary.record(result.outcome);
            summary.cleanup_failed += result.cleanup_failed;
        }

        Ok(summary)
    }

    async fn list_replays(&self) -> Result<Vec<PathBuf>, std::io::Error> {
        let mut entries = tokio::fs::read_dir(&self.config.watch_dir).await?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_file = match entry.file_type().await {
                Ok(t) => t.is_file(),
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), "Reading file type: {}", e);
                    continue;
                }
            };

            let is_replay = entry
                .file_name()
                .to_str()
                .map(|n| n.ends_with(REPLAY_EXTENSION))
                .unwrap_or(false);

            if is_file && is_replay {
                files.push(entry.path());
            }
        }

        Ok(files)
    }

    fn claim(&self, path: PathBuf) -> Option<Claim> {
        let mut claimed = self.claimed.lock().ok()?;
        if !claimed.insert(path.clone()) {
            tracing::debug!(path = %path.display(), "Already claimed by another tick");
            return None;
        }

        Some(Claim {
            path,
            claimed: self.claimed.clone(),
        })
    }

    #[tracing::instrument(name = "ingest", skip(self, path), fields(file = %path.display()))]
    async fn process_file(&self, path: &Path) -> FileResult {
        // An earlier claim holder may have finished between listing and claiming.
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("File vanished before processing");
            return FileResult {
                outcome: FileOutcome::Vanished,
                cleanup_failed: 0,
            };
        }

        let artifact = intermediate_path(path);

        let outcome = match self.decoder.decode(path).await {
            Ok(decoded) => self.attach(path, &decoded).await,
            Err(e) => {
                tracing::error!("Decoding replay: {}", e);
                FileOutcome::DecodeFailed
            }
        };

        let mut cleanup_failed = 0;
        if !self.dispose_raw(path, outcome).await {
            cleanup_failed += 1;
        }
        if !remove_if_present(&artifact).await {
            cleanup_failed += 1;
        }

        FileResult {
            outcome,
            cleanup_failed,
        }
    }

    async fn attach(&self, path: &Path, decoded: &common::DecodedMatch) -> FileOutcome {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => return FileOutcome::Orphaned,
        };
        let stored_path = stored_path_key(&self.config.stored_path_prefix, file_name);

        let owner = match self.store.find_owner(&stored_path).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                tracing::debug!(%stored_path, "No account references this replay, discarding");
                return FileOutcome::Orphaned;
            }
            Err(e) => {
                tracing::error!(%stored_path, "Looking up replay owner: {}", e);
                return FileOutcome::StoreFailed;
            }
        };

        match self.store.attach_decoded(&owner, &stored_path, decoded).await {
            Ok(()) => {
                tracing::info!(account = %owner, %stored_path, "Stored replay data");
                FileOutcome::Attached
            }
            Err(StoreError::AlreadyProcessed) => {
                tracing::warn!(account = %owner, %stored_path, "Replay was already processed");
                FileOutcome::AlreadyProcessed
            }
            Err(StoreError::NotFound) => {
                tracing::debug!(account = %owner, %stored_path, "Replay entry removed while decoding");
                FileOutcome::Orphaned
            }
            Err(e) => {
                tracing::error!(account = %owner, %stored_path, "Attaching replay data: {}", e);
                FileOutcome::StoreFailed
            }
        }
    }

    /// Deletes or quarantines the raw file. Returns false when the file could
    /// not be removed from the watched directory.
    async fn dispose_raw(&self, path: &Path, outcome: FileOutcome) -> bool {
        if let (FileOutcome::DecodeFailed, FailurePolicy::Quarantine(dir)) =
            (outcome, &self.config.failure_policy)
        {
            match quarantine(path, dir).await {
                Ok(target) => {
                    tracing::warn!(to = %target.display(), "Quarantined undecodable replay");
                    return true;
                }
                Err(e) => {
                    tracing::error!(quarantine = %dir.display(), "Quarantining replay, deleting instead: {}", e);
                }
            };
        }

        remove_if_present(path).await
    }
}

/// Moves `path` into `dir` without replacing anything already quarantined.
///
/// The target name is reserved with an exclusive create first, a taken name
/// gets a numeric suffix: `bad.replay`, `bad-1.replay`, `bad-2.replay`.
async fn quarantine(path: &Path, dir: &Path) -> Result<PathBuf, std::io::Error> {
    tokio::fs::create_dir_all(dir).await?;

    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;

    for attempt in 0..MAX_QUARANTINE_SUFFIX {
        let target = dir.join(quarantine_name(Path::new(file_name), attempt));

        let reserved = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await;
        match reserved {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };

        if let Err(e) = tokio::fs::rename(path, &target).await {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(e);
        }
        return Ok(target);
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free quarantine name for {}", file_name.to_string_lossy()),
    ))
}

fn quarantine_name(file_name: &Path, attempt: u32) -> PathBuf {
    if attempt == 0 {
        return file_name.to_path_buf();
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.extension() {
        Some(ext) => PathBuf::from(format!("{}-{}.{}", stem, attempt, ext.to_string_lossy())),
        None => PathBuf::from(format!("{}-{}", stem, attempt)),
    }
}

async fn remove_if_present(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Removing file, leaving it for the next tick: {}", e);
            false
        }
    }
}
