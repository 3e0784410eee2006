use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::{store_error, ApiState};
use crate::Account;

pub fn router() -> axum::Router<Arc<ApiState>> {
    axum::Router::new()
        .route("/", axum::routing::get(list))
        .route("/:id", axum::routing::delete(remove))
        .route("/:id/scoreboard", axum::routing::get(scoreboard))
}

#[tracing::instrument(skip(state))]
async fn list(
    State(state): State<Arc<ApiState>>,
    account: Account,
) -> Result<axum::Json<Vec<common::ReplayInfo>>, StatusCode> {
    let replays = state
        .store
        .list_entries(account.id())
        .await
        .map_err(|e| store_error("Listing replays", e))?;

    Ok(axum::Json(
        replays.iter().map(common::ReplayInfo::from).collect(),
    ))
}

#[tracing::instrument(skip(state))]
async fn remove(
    State(state): State<Arc<ApiState>>,
    account: Account,
    Path(replay_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = state
        .store
        .remove_entry(account.id(), &replay_id)
        .await
        .map_err(|e| store_error("Removing replay", e))?;

    // Processed replays were already cleaned up by ingestion.
    let raw_path = state.data_root.join(&removed.stored_path);
    match tokio::fs::remove_file(&raw_path).await {
        Ok(()) => tracing::debug!(path = %raw_path.display(), "Deleted raw replay"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %raw_path.display(), "Deleting raw replay: {}", e),
    };

    tracing::info!(replay = %removed.id, "Removed replay");
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
async fn scoreboard(
    State(state): State<Arc<ApiState>>,
    account: Account,
    Path(replay_id): Path<String>,
) -> Result<axum::Json<common::report::ScoreBoard>, StatusCode> {
    let replays = state
        .store
        .list_entries(account.id())
        .await
        .map_err(|e| store_error("Loading replays", e))?;

    let replay = replays
        .iter()
        .find(|r| r.id == replay_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let decoded = replay.decoded().ok_or(StatusCode::CONFLICT)?;

    analysis::scoreboard::scoreboard(decoded)
        .map(axum::Json)
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)
}
