use std::path::PathBuf;
use std::sync::Arc;

use crate::store::{ReplayStore, StoreError};

pub mod analysis;
pub mod replays;

pub struct ApiState {
    pub store: Arc<dyn ReplayStore>,
    /// Stored paths are resolved against this directory.
    pub data_root: PathBuf,
}

pub fn router(state: Arc<ApiState>) -> axum::Router {
    axum::Router::new()
        .nest("/replays", replays::router())
        .nest("/analysis", analysis::router())
        .with_state(state)
}

fn store_error(context: &'static str, error: StoreError) -> axum::http::StatusCode {
    match error {
        StoreError::NotFound => axum::http::StatusCode::NOT_FOUND,
        e => {
            tracing::error!("{}: {}", context, e);
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
