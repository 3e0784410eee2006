use common::replay::DecodedMatch;
use common::report::{ScoreBoard, ScoreBoardPlayer, ScoreBoardTeam};

/// Builds the per-team standings of one match, players sorted by score.
///
/// Returns `None` when the match carries no properties.
pub fn scoreboard(decoded: &DecodedMatch) -> Option<ScoreBoard> {
    let props = decoded.properties()?;

    let mut teams: Vec<ScoreBoardTeam> = Vec::new();
    for stats in props.player_stats.iter() {
        let player = ScoreBoardPlayer {
            name: stats.name.clone(),
            score: stats.score,
            goals: stats.goals,
            assists: stats.assists,
            saves: stats.saves,
            shots: stats.shots,
        };

        match teams.iter_mut().find(|t| t.number == stats.team) {
            Some(team) => team.players.push(player),
            None => teams.push(ScoreBoardTeam {
                number: stats.team,
                score: 0,
                players: vec![player],
            }),
        };
    }

    for (number, score) in [(0, props.team0_score), (1, props.team1_score)] {
        if let Some(team) = teams.iter_mut().find(|t| t.number == number) {
            team.score = score.unwrap_or(0);
        }
    }

    teams.sort_unstable_by_key(|t| t.number);
    for team in teams.iter_mut() {
        team.players.sort_by(|a, b| b.score.cmp(&a.score));
    }

    Some(ScoreBoard {
        match_id: props.id.clone().unwrap_or_default(),
        map: props.map_name.clone(),
        teams,
    })
}
