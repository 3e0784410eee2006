use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::decoder::DecoderConfig;
use crate::ingest::{FailurePolicy, IngestConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("poll interval must be at least one second")]
    PollInterval,
    #[error("decode timeout must be at least one second")]
    DecodeTimeout,
    #[error("ingest concurrency must be at least 1")]
    Concurrency,
    #[error("quarantine directory must differ from the watched directory")]
    QuarantineInWatchDir,
}

#[derive(Debug, clap::Parser)]
#[command(name = "backend", about = "Replay ingestion and statistics service")]
pub struct Cli {
    /// Postgres connection string, replays are kept in memory without it.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 8)]
    pub database_max_connections: usize,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    /// Directory the upload handler drops raw replay files into.
    #[arg(long, env = "WATCH_DIR", default_value = "uploads/")]
    pub watch_dir: PathBuf,

    /// Prefix of the stored path recorded at upload time.
    #[arg(long, env = "STORED_PATH_PREFIX", default_value = "uploads")]
    pub stored_path_prefix: String,

    /// Directory stored paths are relative to.
    #[arg(long, env = "DATA_ROOT", default_value = ".")]
    pub data_root: PathBuf,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 5)]
    pub poll_interval_secs: u64,

    #[arg(long, env = "INGEST_CONCURRENCY", default_value_t = 4)]
    pub ingest_concurrency: usize,

    #[arg(long, env = "DECODER_PROGRAM", default_value = "./rrrocket")]
    pub decoder_program: PathBuf,

    #[arg(
        long,
        env = "DECODER_ARGS",
        value_delimiter = ' ',
        allow_hyphen_values = true,
        default_values_t = ["--json-lines".to_string(), "--multiple".to_string()]
    )]
    pub decoder_args: Vec<String>,

    #[arg(long, env = "DECODE_TIMEOUT_SECS", default_value_t = 60)]
    pub decode_timeout_secs: u64,

    /// Keep replays that fail to decode in this directory instead of
    /// deleting them.
    #[arg(long, env = "QUARANTINE_DIR")]
    pub quarantine_dir: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL", default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

/// Everything the service needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: usize,
    pub listen_addr: SocketAddr,
    pub data_root: PathBuf,
    pub ingest: IngestConfig,
    pub decoder: DecoderConfig,
    pub log_level: tracing::Level,
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.poll_interval_secs == 0 {
            return Err(ConfigError::PollInterval);
        }
        if cli.decode_timeout_secs == 0 {
            return Err(ConfigError::DecodeTimeout);
        }
        if cli.ingest_concurrency == 0 {
            return Err(ConfigError::Concurrency);
        }

        let failure_policy = match cli.quarantine_dir {
            Some(dir) if same_dir(&dir, &cli.watch_dir) => {
                return Err(ConfigError::QuarantineInWatchDir);
            }
            Some(dir) => FailurePolicy::Quarantine(dir),
            None => FailurePolicy::Delete,
        };

        Ok(Self {
            database_url: cli.database_url,
            database_max_connections: cli.database_max_connections.max(1),
            listen_addr: cli.listen_addr,
            data_root: cli.data_root,
            ingest: IngestConfig {
                watch_dir: cli.watch_dir,
                stored_path_prefix: cli.stored_path_prefix,
                poll_interval: Duration::from_secs(cli.poll_interval_secs),
                concurrency: cli.ingest_concurrency,
                failure_policy,
            },
            decoder: DecoderConfig {
                program: cli.decoder_program,
                args: cli.decoder_args,
                timeout: Duration::from_secs(cli.decode_timeout_secs),
            },
            log_level: cli.log_level,
        })
    }
}

/// Whether both paths name the same directory. Existing directories are
/// compared after resolving symlinks, others lexically from the current
/// directory with `.` components dropped.
fn same_dir(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (a.canonicalize(), b.canonicalize()) {
        return a == b;
    }

    let lexical = |p: &Path| -> PathBuf {
        std::path::absolute(p)
            .unwrap_or_else(|_| p.to_path_buf())
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    lexical(a) == lexical(b)
}
