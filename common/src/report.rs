use std::collections::HashMap;

/// Combined statistics over a selection of decoded replays.
///
/// Computed per request and never stored.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub player_goals: HashMap<String, u64>,
    pub player_assists: HashMap<String, u64>,
    pub player_saves: HashMap<String, u64>,
    pub timeline: Vec<TimelineEntry>,
    /// Distinct player names in the order they were first seen.
    pub players: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub match_id: String,
    /// Seconds since the start of the recording. Always `0.0` for matches
    /// without a usable frame rate, in which case the value carries no meaning.
    pub time_seconds: f64,
    pub player: String,
    pub event_type: TimelineEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimelineEventKind {
    Goal,
}

/// Final standings of a single match.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBoard {
    pub match_id: String,
    pub map: Option<String>,
    pub teams: Vec<ScoreBoardTeam>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBoardTeam {
    pub number: u32,
    pub score: u32,
    pub players: Vec<ScoreBoardPlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBoardPlayer {
    pub name: String,
    pub score: u32,
    pub goals: u32,
    pub assists: u32,
    pub saves: u32,
    pub shots: u32,
}
