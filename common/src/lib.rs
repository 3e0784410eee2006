pub mod replay;
pub mod report;

pub use replay::DecodedMatch;
pub use report::AggregateReport;

/// Identifier of the account owning a set of replays.
///
/// Supplied by the authentication layer, which is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new<IS>(id: IS) -> Self
    where
        IS: Into<String>,
    {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One uploaded replay, embedded in an account.
///
/// `data` is present exactly when `processed` is true. Once processed the
/// entry only changes by being removed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFile {
    pub id: String,
    pub stored_path: String,
    pub original_name: String,
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DecodedMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyProcessed;

impl ReplayFile {
    pub fn attach(&mut self, data: DecodedMatch) -> Result<(), AlreadyProcessed> {
        if self.processed {
            return Err(AlreadyProcessed);
        }

        self.data = Some(data);
        self.processed = true;
        Ok(())
    }

    /// The decoded payload, if the replay has been processed.
    pub fn decoded(&self) -> Option<&DecodedMatch> {
        self.data.as_ref().filter(|_| self.processed)
    }
}

/// A freshly uploaded replay, before the ingestion worker has seen it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReplay {
    pub id: String,
    pub stored_path: String,
    pub original_name: String,
}

impl From<NewReplay> for ReplayFile {
    fn from(value: NewReplay) -> Self {
        Self {
            id: value.id,
            stored_path: value.stored_path,
            original_name: value.original_name,
            processed: false,
            data: None,
        }
    }
}

/// Listing entry without the decoded payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayInfo {
    pub id: String,
    pub original_name: String,
    pub processed: bool,
}

impl From<&ReplayFile> for ReplayInfo {
    fn from(value: &ReplayFile) -> Self {
        Self {
            id: value.id.clone(),
            original_name: value.original_name.clone(),
            processed: value.processed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub replay_ids: Vec<String>,
}
