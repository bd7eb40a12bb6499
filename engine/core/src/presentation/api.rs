// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP surface over [`MemAlignService`]. Batch endpoints take the JSONL body
//! as plain text; `/judges/{name}/events` streams memory events as SSE.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::application::service::{CreateJudgeRequest, MemAlignService};
use crate::domain::error::MemAlignError;
use crate::domain::evaluation::JudgmentInput;
use crate::domain::memory::{ExampleId, FeedbackInput, PrincipleId};
use crate::infrastructure::event_bus::{EventBus, EventBusError};

pub struct AppState {
    pub service: Arc<dyn MemAlignService>,
    pub events: EventBus,
    pub start_time: Instant,
}

pub fn app(service: Arc<dyn MemAlignService>, events: EventBus) -> Router {
    let state = Arc::new(AppState {
        service,
        events,
        start_time: Instant::now(),
    });

    Router::new()
        .route("/health", get(health))
        .route("/judges", get(list_judges).post(create_judge))
        .route("/judges/{name}", get(get_judge).delete(delete_judge))
        .route("/judges/{name}/align", post(align))
        .route("/judges/{name}/align-batch", post(align_batch))
        .route("/judges/{name}/align-interactive", post(align_interactive))
        .route("/judges/{name}/evaluate", post(evaluate))
        .route("/judges/{name}/evaluate-batch", post(evaluate_batch))
        .route("/judges/{name}/principles", get(list_principles))
        .route(
            "/judges/{name}/principles/{id}",
            put(update_principle).delete(delete_principle),
        )
        .route("/judges/{name}/examples", get(list_examples))
        .route("/judges/{name}/examples/{id}", axum::routing::delete(delete_example))
        .route("/judges/{name}/stats", get(memory_stats))
        .route("/judges/{name}/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Engine errors rendered as `{ "error", "code" }` with a matching status
pub struct ApiError(MemAlignError);

impl From<MemAlignError> for ApiError {
    fn from(err: MemAlignError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MemAlignError::Validation(_) => StatusCode::BAD_REQUEST,
            MemAlignError::NotFound { .. } => StatusCode::NOT_FOUND,
            MemAlignError::DuplicateJudge(_) => StatusCode::CONFLICT,
            MemAlignError::EmptyMemory(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MemAlignError::ExternalProvider(_) | MemAlignError::ScoreOutOfRange { .. } => StatusCode::BAD_GATEWAY,
            MemAlignError::Repository(_) | MemAlignError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string(), "code": self.0.code() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn list_judges(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_judges().await?))
}

async fn create_judge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateJudgeRequest>,
) -> ApiResult<impl IntoResponse> {
    let judge = state.service.create_judge(request).await?;
    Ok((StatusCode::CREATED, Json(judge)))
}

async fn get_judge(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_judge(&name).await?))
}

async fn delete_judge(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult<StatusCode> {
    state.service.delete_judge(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn align(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(feedback): Json<FeedbackInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.align(&name, feedback).await?))
}

async fn align_batch(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.align_batch(&name, &body).await?))
}

async fn align_interactive(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(input): Json<JudgmentInput>,
) -> ApiResult<impl IntoResponse> {
    let evaluation = state
        .service
        .align_interactive(&name, &input.input_text, input.context.as_deref())
        .await?;
    Ok(Json(evaluation))
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(input): Json<JudgmentInput>,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .service
        .judge(&name, &input.input_text, input.context.as_deref())
        .await?;
    Ok(Json(result))
}

async fn evaluate_batch(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.judge_batch(&name, &body).await?))
}

async fn list_principles(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_principles(&name).await?))
}

#[derive(Deserialize)]
struct UpdatePrincipleRequest {
    text: String,
}

async fn update_principle(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
    Json(request): Json<UpdatePrincipleRequest>,
) -> ApiResult<impl IntoResponse> {
    let id: PrincipleId = id.parse()?;
    Ok(Json(state.service.update_principle(&name, id, &request.text).await?))
}

async fn delete_principle(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let id: PrincipleId = id.parse()?;
    state.service.delete_principle(&name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ExampleQuery {
    query: Option<String>,
    limit: Option<usize>,
}

async fn list_examples(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<ExampleQuery>,
) -> ApiResult<impl IntoResponse> {
    let examples = state
        .service
        .list_examples(&name, params.query.as_deref(), params.limit)
        .await?;
    Ok(Json(examples))
}

async fn delete_example(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let id: ExampleId = id.parse()?;
    state.service.delete_example(&name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn memory_stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.memory_stats(&name).await?))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let judge = state.service.get_judge(&name).await?;
    let receiver = state.events.subscribe_judge(judge.name);

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    let sse = Event::default().event(event.event_type()).data(data);
                    return Some((Ok(sse), receiver));
                }
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
