use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use super::{store_error, ApiState};
use crate::Account;

pub fn router() -> axum::Router<Arc<ApiState>> {
    axum::Router::new().route("/", axum::routing::post(report))
}

/// Aggregates the caller's selected replays. Ids that are unknown, belong to
/// someone else or are not processed yet are ignored.
#[tracing::instrument(skip(state, request), fields(selected = request.replay_ids.len()))]
async fn report(
    State(state): State<Arc<ApiState>>,
    account: Account,
    axum::Json(request): axum::Json<common::AnalysisRequest>,
) -> Result<axum::Json<common::AggregateReport>, StatusCode> {
    let replays = state
        .store
        .list_entries(account.id())
        .await
        .map_err(|e| store_error("Loading replays", e))?;

    let selected: Vec<_> = replays
        .iter()
        .filter(|r| request.replay_ids.contains(&r.id))
        .filter_map(|r| r.decoded())
        .collect();
    tracing::debug!(matches = selected.len(), "Generating report");

    Ok(axum::Json(::analysis::aggregate(selected)))
}
