mod mocks;

use std::sync::Arc;

use distil::config::FeedConfig;
use distil::web::{self, AppState};
use distil::Config;
use mocks::feed::write_feed;
use mocks::model::MockModel;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

struct TestApp {
    base: String,
    client: reqwest::Client,
    model: MockModel,
    dir: TempDir,
}

impl TestApp {
    async fn spawn(entries: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().join("out").to_string_lossy().into_owned();
        config.feeds = vec![FeedConfig::new(write_feed(dir.path(), "feed.xml", entries))];

        let model = MockModel::new();
        let state = AppState::new(config, Arc::new(model.clone())).unwrap();
        let listener = web::bind(0).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(web::serve(listener, state));

        Self {
            base,
            client: reqwest::Client::new(),
            model,
            dir,
        }
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
    }

    async fn fetch_session(&self) -> Value {
        let response = self.post("/api/fetch", json!({ "days": 7 })).await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = TestApp::spawn(1).await;

    let response = app.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("EventSource"));
}

#[tokio::test]
async fn test_fetch_then_generate_writes_history() {
    let app = TestApp::spawn(2).await;

    let fetched = app.fetch_session().await;
    assert_eq!(fetched["items"].as_array().unwrap().len(), 2);
    assert_eq!(fetched["health"][0]["status"], "success");
    assert_eq!(fetched["items"][0]["type"], "article");

    let response = app
        .post("/api/generate", json!({ "session": fetched["session"] }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let generated: Value = response.json().await.unwrap();
    assert_eq!(generated["markdown"], "Summary 1 of the prompt.");
    assert_eq!(app.model.prompts().len(), 1);

    let file = generated["file"].as_str().unwrap();
    assert!(file.starts_with("distil-") && file.ends_with(".md"));
    let saved = std::fs::read_to_string(app.dir.path().join("out").join(file)).unwrap();
    assert_eq!(saved, "Summary 1 of the prompt.");

    let listed: Vec<String> = app.get("/api/history").await.json().await.unwrap();
    assert_eq!(listed, vec![file.to_string()]);

    let viewed = app.get(&format!("/api/history/{file}")).await;
    assert_eq!(viewed.status(), StatusCode::OK);
    assert_eq!(viewed.text().await.unwrap(), "Summary 1 of the prompt.");
}

#[tokio::test]
async fn test_stream_emits_chunks_then_complete() {
    let app = TestApp::spawn(2).await;
    let fetched = app.fetch_session().await;
    let session = fetched["session"].as_str().unwrap();

    let body = app
        .get(&format!("/api/generate/stream?session={session}"))
        .await
        .text()
        .await
        .unwrap();

    let progress = body.find("event: progress").unwrap();
    let chunk = body.find("event: chunk").unwrap();
    let complete = body.find("event: complete").unwrap();
    assert!(progress < chunk && chunk < complete);
    assert!(!body.contains("event: error"));
    assert_eq!(app.model.prompts().len(), 1);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = TestApp::spawn(1).await;
    let unknown = Uuid::new_v4();

    let response = app.post("/api/generate", json!({ "session": unknown })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("fetch first"));

    let stream = app
        .get(&format!("/api/generate/stream?session={unknown}"))
        .await
        .text()
        .await
        .unwrap();
    assert!(stream.contains("event: error"));
    assert!(!stream.contains("event: complete"));
    assert!(app.model.prompts().is_empty());
}

#[tokio::test]
async fn test_empty_session_is_not_found() {
    let app = TestApp::spawn(0).await;

    let fetched = app.fetch_session().await;
    assert!(fetched["items"].as_array().unwrap().is_empty());
    assert_eq!(fetched["health"][0]["status"], "empty");

    let response = app
        .post("/api/generate", json!({ "session": fetched["session"] }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.model.prompts().is_empty());
}

#[tokio::test]
async fn test_history_rejects_traversal() {
    let app = TestApp::spawn(1).await;
    std::fs::write(app.dir.path().join("secret.md"), "keep out").unwrap();

    for name in ["..%2Fsecret.md", "out%2F..%2F..%2Fsecret.md", "missing.md"] {
        let response = app.get(&format!("/api/history/{name}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{name}");
    }
}
