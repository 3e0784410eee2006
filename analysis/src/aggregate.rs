use std::collections::HashMap;

use common::replay::{DecodedMatch, MatchProperties};
use common::report::{AggregateReport, TimelineEntry, TimelineEventKind};

/// Folds the given matches into per-player totals and a goal timeline.
///
/// Players are identified by their display name only, so two accounts
/// sharing an in-game name are merged into one entry. Matches without
/// properties are skipped.
pub fn aggregate<'m, I>(matches: I) -> AggregateReport
where
    I: IntoIterator<Item = &'m DecodedMatch>,
{
    let mut totals = Totals::default();
    let mut timeline = Vec::new();

    for (index, decoded) in matches.into_iter().enumerate() {
        let props = match decoded.properties() {
            Some(p) => p,
            None => {
                tracing::warn!(index, file = ?decoded.file(), "Skipping match without properties");
                continue;
            }
        };

        for stats in props.player_stats.iter() {
            totals.add(
                &stats.name,
                u64::from(stats.goals),
                u64::from(stats.assists),
                u64::from(stats.saves),
            );
        }

        let match_id = props.id.clone().unwrap_or_default();
        if !has_usable_frame_rate(props) {
            tracing::warn!(%match_id, fps = props.record_fps, "Match has no usable frame rate, goal times are 0");
        }

        timeline.extend(props.goals.iter().map(|goal| TimelineEntry {
            match_id: match_id.clone(),
            time_seconds: frame_to_seconds(goal.frame, props.record_fps),
            player: goal.player_name.clone(),
            event_type: TimelineEventKind::Goal,
        }));
    }

    AggregateReport {
        player_goals: totals.goals,
        player_assists: totals.assists,
        player_saves: totals.saves,
        timeline,
        players: totals.order,
    }
}

/// Converts a frame index into seconds, yielding `0.0` when the frame rate
/// is zero, negative or not finite.
pub fn frame_to_seconds(frame: u64, fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        frame as f64 / fps
    } else {
        0.0
    }
}

fn has_usable_frame_rate(props: &MatchProperties) -> bool {
    props.goals.is_empty() || (props.record_fps.is_finite() && props.record_fps > 0.0)
}

#[derive(Default)]
struct Totals {
    goals: HashMap<String, u64>,
    assists: HashMap<String, u64>,
    saves: HashMap<String, u64>,
    order: Vec<String>,
}

impl Totals {
    fn add(&mut self, name: &str, goals: u64, assists: u64, saves: u64) {
        match self.goals.get_mut(name) {
            Some(g) => {
                *g += goals;
                *self.assists.entry(name.to_owned()).or_default() += assists;
                *self.saves.entry(name.to_owned()).or_default() += saves;
            }
            None => {
                self.goals.insert(name.to_owned(), goals);
                self.assists.insert(name.to_owned(), assists);
                self.saves.insert(name.to_owned(), saves);
                self.order.push(name.to_owned());
            }
        }
    }
}
