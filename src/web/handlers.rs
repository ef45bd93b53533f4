use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ai::DistilEvent;
use crate::error::AppError;
use crate::models::{ContentItem, FeedHealthReport};

use super::AppState;

const INDEX_HTML: &str = include_str!("index.html");
const MAX_DAYS: u32 = 30;

/// Error body returned by the JSON endpoints.
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::Llm(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub days: Option<u32>,
    pub session: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub session: Uuid,
    pub items: Vec<ContentItem>,
    pub health: FeedHealthReport,
}

#[derive(Debug, Deserialize)]
pub struct SessionRef {
    pub session: Uuid,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub file: String,
    pub markdown: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FetchRequest>,
) -> Json<FetchResponse> {
    let days = request
        .days
        .unwrap_or(state.config.fetch.days_back)
        .clamp(1, MAX_DAYS);

    let collection = state
        .collector
        .collect(
            &state.config.feeds,
            &state.config.youtube.urls,
            &state.collect_options(days),
        )
        .await;

    let session = state.sessions.put(request.session, collection.items.clone());
    tracing::info!("Session {}: fetched {} items", session, collection.items.len());

    Json(FetchResponse {
        session,
        items: collection.items,
        health: collection.health,
    })
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRef>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let items = session_items(&state, &request.session)?;

    let markdown = state
        .summarizer
        .summarize(&state.system_prompt(), &items, &state.distil_options())
        .await
        .inspect_err(|e| tracing::error!("Error during distil generation: {}", e))?;

    let path = state.history.save_timestamped(&markdown).await?;
    Ok(Json(GenerateResponse {
        file: file_name(&path),
        markdown,
    }))
}

/// Server-Sent Events: `progress` and `chunk` while generating, then `complete` or `error`.
pub async fn generate_stream(
    State(state): State<Arc<AppState>>,
    Query(request): Query<SessionRef>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let items = match session_items(&state, &request.session) {
        Ok(items) => items,
        Err(e) => {
            let only = stream::once(async move { error_event(&e) });
            return Sse::new(only.left_stream());
        }
    };

    let (tx, mut rx) = mpsc::channel::<DistilEvent>(64);
    let producer = tokio::spawn(async move {
        let markdown = state
            .summarizer
            .summarize_stream(&state.system_prompt(), &items, &state.distil_options(), &tx)
            .await?;
        let path = state.history.save_timestamped(&markdown).await?;
        Ok::<_, AppError>((file_name(&path), markdown))
    });

    let progress = stream::poll_fn(move |cx| rx.poll_recv(cx)).map(|event| {
        let name = match &event {
            DistilEvent::Progress(_) => "progress",
            DistilEvent::Chunk { .. } => "chunk",
        };
        Event::default().event(name).json_data(&event)
    });

    let outcome = stream::once(async move {
        match producer.await {
            Ok(Ok((file, content))) => Event::default().event("complete").json_data(
                serde_json::json!({ "type": "complete", "file": file, "content": content }),
            ),
            Ok(Err(e)) => {
                tracing::error!("Streaming distil failed: {}", e);
                error_event(&e)
            }
            Err(e) => error_event(&AppError::Other(anyhow::anyhow!("generation task failed: {e}"))),
        }
    });

    Sse::new(progress.chain(outcome).right_stream()).keep_alive(KeepAlive::default())
}

pub async fn history_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.history.list().await?))
}

pub async fn history_view(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.history.read(&name).await?;
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], content).into_response())
}

fn session_items(state: &AppState, id: &Uuid) -> Result<Arc<Vec<ContentItem>>, AppError> {
    state
        .sessions
        .get(id)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| AppError::NotFound("No items fetched. Please fetch first.".into()))
}

fn error_event(e: &AppError) -> Result<Event, axum::Error> {
    Event::default()
        .event("error")
        .json_data(serde_json::json!({ "type": "error", "message": e.to_string() }))
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
