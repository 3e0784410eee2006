mod support;

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use backend::api::{router, ApiState};
use backend::store::{MemoryStore, ReplayStore};
use backend::Account;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use support::*;
use tower::ServiceExt;
use tracing_test::traced_test;

async fn state(data_root: &Path) -> Arc<ApiState> {
    let store = Arc::new(MemoryStore::new());
    for name in ["one.replay", "two.replay", "pending.replay"] {
        store.insert_entry(&account(), new_replay(name)).await.unwrap();
    }
    store
        .attach_decoded(
            &account(),
            "uploads/one.replay",
            &backend::decoder::parse_output(match_json("M1", "PlayerX", 2).as_bytes()).unwrap(),
        )
        .await
        .unwrap();
    store
        .attach_decoded(
            &account(),
            "uploads/two.replay",
            &backend::decoder::parse_output(match_json("M2", "PlayerY", 1).as_bytes()).unwrap(),
        )
        .await
        .unwrap();

    Arc::new(ApiState {
        store,
        data_root: data_root.to_path_buf(),
    })
}

fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(Account::HEADER, account().as_str());

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[traced_test]
async fn requires_account() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/replays")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::UNAUTHORIZED, response.status());
}

#[tokio::test]
#[traced_test]
async fn lists_replays() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()).await);

    let response = app.oneshot(request("GET", "/replays", None)).await.unwrap();
    assert_eq!(StatusCode::OK, response.status());

    let body = json_body(response).await;
    let processed: Vec<(String, bool)> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["id"].as_str().unwrap().to_owned(),
                r["processed"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        vec![
            ("id-one.replay".to_owned(), true),
            ("id-two.replay".to_owned(), true),
            ("id-pending.replay".to_owned(), false),
        ],
        processed
    );
}

#[tokio::test]
#[traced_test]
async fn aggregates_selected_replays() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()).await);

    let response = app
        .oneshot(request(
            "POST",
            "/analysis",
            Some(serde_json::json!({
                "replayIds": ["id-one.replay", "id-two.replay", "id-pending.replay", "unknown"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());

    let body = json_body(response).await;
    assert_eq!(serde_json::json!({"PlayerX": 2, "PlayerY": 1}), body["playerGoals"]);
    assert_eq!(serde_json::json!(["PlayerX", "PlayerY"]), body["players"]);
    assert_eq!(3, body["timeline"].as_array().unwrap().len());
    assert_eq!(serde_json::json!(60.0), body["timeline"][0]["timeSeconds"]);
}

#[tokio::test]
#[traced_test]
async fn empty_selection() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()).await);

    let response = app
        .oneshot(request(
            "POST",
            "/analysis",
            Some(serde_json::json!({"replayIds": []})),
        ))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());

    let body = json_body(response).await;
    assert_eq!(serde_json::json!({}), body["playerGoals"]);
    assert_eq!(serde_json::json!([]), body["timeline"]);
    assert_eq!(serde_json::json!([]), body["players"]);
}

#[tokio::test]
#[traced_test]
async fn delete_removes_entry_and_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("uploads")).unwrap();
    let raw = write_file(&dir.path().join("uploads"), "pending.replay", "binary");

    let state = state(dir.path()).await;
    let app = router(state.clone());

    let response = app
        .clone()
        .oneshot(request("DELETE", "/replays/id-pending.replay", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, response.status());
    assert!(!raw.exists());
    assert_eq!(2, state.store.list_entries(&account()).await.unwrap().len());

    let response = app
        .oneshot(request("DELETE", "/replays/id-pending.replay", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
#[traced_test]
async fn scoreboard() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()).await);

    let response = app
        .clone()
        .oneshot(request("GET", "/replays/id-one.replay/scoreboard", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = json_body(response).await;
    assert_eq!(serde_json::json!("M1"), body["matchId"]);
    assert_eq!(serde_json::json!(2), body["teams"][0]["score"]);
    assert_eq!(serde_json::json!("PlayerX"), body["teams"][0]["players"][0]["name"]);

    let response = app
        .clone()
        .oneshot(request("GET", "/replays/id-pending.replay/scoreboard", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, response.status());

    let response = app
        .oneshot(request("GET", "/replays/unknown/scoreboard", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}
