//! Conversion of raw replay files into [`DecodedMatch`] values.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use common::DecodedMatch;

const STDERR_EXCERPT: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("running decoder: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("decoder did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("decoder exited with {status}: {stderr}")]
    ExitStatus {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("decoder produced no output")]
    EmptyOutput,
    #[error("malformed decoder output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("writing intermediate output: {0}")]
    Artifact(#[source] std::io::Error),
}

/// Turns one replay file into structured match data.
///
/// Every failure is final for the file in question, callers do not retry.
#[async_trait::async_trait]
pub trait Decoder: Send + Sync {
    async fn decode(&self, input: &Path) -> Result<DecodedMatch, DecodeError>;
}

/// Location of the decoder's raw output for `input`: `parsed_<name>.json`
/// next to the input file.
pub fn intermediate_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("parsed_{}.json", name))
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub program: PathBuf,
    /// Passed before the input path.
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("./rrrocket"),
            args: vec!["--json-lines".to_owned(), "--multiple".to_owned()],
            timeout: Duration::from_secs(60),
        }
    }
}

/// Runs an external decoder executable once per file.
#[derive(Debug, Clone)]
pub struct ExternalDecoder {
    config: DecoderConfig,
}

impl ExternalDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    async fn run(&self, input: &Path) -> Result<Vec<u8>, DecodeError> {
        let child = tokio::process::Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DecodeError::Spawn)?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(res) => res.map_err(DecodeError::Spawn)?,
            Err(_) => return Err(DecodeError::TimedOut(self.config.timeout)),
        };

        if !output.status.success() {
            return Err(DecodeError::ExitStatus {
                status: output.status,
                stderr: excerpt(&output.stderr),
            });
        }

        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %excerpt(&output.stderr), "Decoder wrote to stderr");
        }

        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl Decoder for ExternalDecoder {
    #[tracing::instrument(skip(self))]
    async fn decode(&self, input: &Path) -> Result<DecodedMatch, DecodeError> {
        let stdout = self.run(input).await?;

        let artifact = intermediate_path(input);
        let result = match tokio::fs::write(&artifact, &stdout).await {
            Ok(()) => parse_output(&stdout),
            Err(e) => Err(DecodeError::Artifact(e)),
        };

        remove_artifact(&artifact).await;

        result
    }
}

/// Parses decoder output into a single match.
///
/// The output is a sequence of JSON objects, either one per line or pretty
/// printed. They are merged in order, later keys replacing earlier ones.
pub fn parse_output(output: &[u8]) -> Result<DecodedMatch, DecodeError> {
    let mut merged: Option<serde_json::Map<String, serde_json::Value>> = None;

    for value in serde_json::Deserializer::from_slice(output).into_iter::<serde_json::Value>() {
        let object = match value? {
            serde_json::Value::Object(o) => o,
            other => {
                return Err(DecodeError::Malformed(
                    <serde_json::Error as serde::de::Error>::custom(format!(
                        "expected a JSON object but found {}",
                        other
                    )),
                ));
            }
        };

        match merged.as_mut() {
            Some(m) => m.extend(object),
            None => merged = Some(object),
        };
    }

    let merged = merged.ok_or(DecodeError::EmptyOutput)?;
    Ok(serde_json::from_value(serde_json::Value::Object(merged))?)
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), "Removing intermediate output: {}", e);
        }
    };
}

fn excerpt(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .trim()
        .chars()
        .take(STDERR_EXCERPT)
        .collect()
}
