//! Structured match data produced by the replay decoder.
//!
//! A [`DecodedMatch`] keeps the decoder's JSON document exactly as it was
//! produced and serializes back to it, so a stored payload never loses or
//! gains fields. The typed view below covers only what the reports read and
//! is built from that document on deserialization.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct DecodedMatch {
    file: Option<String>,
    replay: ReplayBody,
    raw: serde_json::Value,
}

impl DecodedMatch {
    /// Name of the input file as reported by the decoder.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn replay(&self) -> &ReplayBody {
        &self.replay
    }

    pub fn properties(&self) -> Option<&MatchProperties> {
        self.replay.properties.as_ref()
    }

    /// The document as the decoder emitted it.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }
}

#[derive(Deserialize)]
struct TypedView {
    #[serde(default)]
    file: Option<String>,
    replay: ReplayBody,
}

impl TryFrom<serde_json::Value> for DecodedMatch {
    type Error = serde_json::Error;

    fn try_from(raw: serde_json::Value) -> Result<Self, Self::Error> {
        let typed = TypedView::deserialize(&raw)?;

        Ok(Self {
            file: typed.file,
            replay: typed.replay,
            raw,
        })
    }
}

impl From<DecodedMatch> for serde_json::Value {
    fn from(value: DecodedMatch) -> Self {
        value.raw
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayBody {
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub properties: Option<MatchProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatchProperties {
    pub id: Option<String>,
    pub team_size: Option<u32>,
    pub team0_score: Option<u32>,
    pub team1_score: Option<u32>,
    pub goals: Vec<GoalEvent>,
    pub player_stats: Vec<PlayerStats>,
    #[serde(rename = "RecordFPS")]
    pub record_fps: f64,
    pub map_name: Option<String>,
    pub date: Option<String>,
    pub num_frames: Option<u64>,
    pub match_type: Option<String>,
    pub replay_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GoalEvent {
    #[serde(rename = "PlayerName")]
    pub player_name: String,
    pub frame: u64,
    #[serde(rename = "PlayerTeam")]
    pub player_team: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlayerStats {
    pub name: String,
    pub team: u32,
    pub goals: u32,
    pub assists: u32,
    pub saves: u32,
    pub shots: u32,
    pub score: u32,
    #[serde(rename = "OnlineID", deserialize_with = "online_id")]
    pub online_id: Option<String>,
    #[serde(rename = "bBot")]
    pub bot: bool,
    pub platform: Option<serde_json::Value>,
}

// Older decoder versions emit the online id as a bare number.
fn online_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "file": "uploads/abc.replay",
        "replay": {
            "header_size": 4768,
            "game_type": "TAGame.Replay_Soccar_TA",
            "properties": {
                "TeamSize": 2,
                "Team0Score": 3,
                "Goals": [{"PlayerName": "PlayerX", "frame": 1800, "PlayerTeam": 0}],
                "PlayerStats": [{
                    "Name": "PlayerX", "Team": 0, "Goals": 3, "Assists": 1, "Saves": 2,
                    "Shots": 5, "Score": 540, "OnlineID": 76561198000000000, "bBot": false,
                    "Platform": {"kind": "OnlinePlatform", "value": "OnlinePlatform_Steam"}
                }],
                "RecordFPS": 30.0,
                "Id": "9F6C2A1E",
                "MapName": "stadium_p",
                "KeyframeDelay": 5.0
            },
            "keyframes": [{"time": 0.0, "frame": 0, "position": 0}]
        }
    }"#;

    #[test]
    fn parses_decoder_output() {
        let decoded: DecodedMatch = serde_json::from_str(SAMPLE).unwrap();
        let props = decoded.properties().unwrap();

        assert_eq!(Some("9F6C2A1E"), props.id.as_deref());
        assert_eq!(30.0, props.record_fps);
        assert_eq!(Some(3), props.team0_score);
        assert_eq!(None, props.team1_score);
        assert_eq!(
            vec![GoalEvent {
                player_name: "PlayerX".to_owned(),
                frame: 1800,
                player_team: 0,
            }],
            props.goals
        );
        assert_eq!(
            Some("76561198000000000"),
            props.player_stats[0].online_id.as_deref()
        );
        assert_eq!(Some("uploads/abc.replay"), decoded.file());
        assert_eq!(
            Some("TAGame.Replay_Soccar_TA"),
            decoded.replay().game_type.as_deref()
        );
    }

    #[test]
    fn unknown_fields_survive_storage() {
        let original: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        let decoded: DecodedMatch = serde_json::from_value(original.clone()).unwrap();

        let stored = serde_json::to_value(&decoded).unwrap();
        assert_eq!(original, stored);

        let restored: DecodedMatch = serde_json::from_value(stored).unwrap();
        assert_eq!(decoded, restored);
    }

    #[test]
    fn stored_payload_matches_decoder_output() {
        let original = serde_json::json!({
            "replay": {
                "properties": {
                    "PlayerStats": [{
                        "Name": "X",
                        "PlayerID": {"fields": {"Uid": "76561198000000000", "EpicAccountId": ""}}
                    }],
                    "Goals": [{"PlayerName": "X", "frame": 10, "PlayerTeam": 1, "Extra": 1}]
                }
            }
        });

        let decoded: DecodedMatch = serde_json::from_value(original.clone()).unwrap();
        let props = decoded.properties().unwrap();
        assert_eq!(0.0, props.record_fps);
        assert!(!props.player_stats[0].bot);
        assert_eq!(None, props.id);

        // Typed defaults stay in the view and never reach the stored document.
        let stored = serde_json::to_value(&decoded).unwrap();
        assert_eq!(original, stored);
        assert_eq!(&original, decoded.raw());
        assert!(stored["replay"]["properties"].get("RecordFPS").is_none());
        assert!(stored["replay"]["properties"]["PlayerStats"][0]
            .get("bBot")
            .is_none());
    }

    #[test]
    fn replay_object_is_required() {
        assert!(serde_json::from_str::<DecodedMatch>(r#"{"file": "x"}"#).is_err());

        let bare: DecodedMatch = serde_json::from_str(r#"{"replay": {}}"#).unwrap();
        assert!(bare.properties().is_none());
    }
}
