// HTTP handlers for goals, runs, feedback and config

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::config::PlannerConfig;
use crate::engine::IterationResult;
use crate::errors::PlannerError;
use crate::scope::Scope;

/// Handler error: client mistakes map to 400, everything else to 500.
pub struct ApiError(PlannerError);

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

const ACK: Ack = Ack { ok: true };

#[derive(Debug, Serialize, Deserialize)]
pub struct ScopeText {
    pub scope: Scope,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct GoalsPayload {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RunPayload {
    pub scope: Scope,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub result: IterationResult,
}

#[derive(Debug, Serialize)]
pub struct RunStatus {
    pub scope: Scope,
    pub current_markdown: String,
}

#[derive(Debug, Serialize)]
pub struct Archived {
    pub ok: bool,
    pub archived_as: String,
}

#[derive(Debug, Serialize)]
pub struct PastRuns {
    pub scope: Scope,
    pub archived: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackPayload {
    pub scope: Scope,
    pub text: String,
}

/// Health document
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "overthinker" }))
}

pub async fn get_goals(
    State(state): State<AppState>,
    Path(scope): Path<Scope>,
) -> ApiResult<ScopeText> {
    let text = state.storage.read_goals(scope)?;
    Ok(Json(ScopeText { scope, text }))
}

pub async fn set_goals(
    State(state): State<AppState>,
    Path(scope): Path<Scope>,
    Json(payload): Json<GoalsPayload>,
) -> ApiResult<Ack> {
    state.storage.write_goals(scope, &payload.text)?;
    Ok(Json(ACK))
}

/// Manual iteration. Uses the config as persisted right now.
pub async fn run_once(
    State(state): State<AppState>,
    Json(payload): Json<RunPayload>,
) -> ApiResult<RunResponse> {
    let config = state.config_store.load()?;
    let result = state.engine.run_iteration(payload.scope, &config).await?;
    Ok(Json(RunResponse { ok: true, result }))
}

pub async fn run_status(
    State(state): State<AppState>,
    Path(scope): Path<Scope>,
) -> ApiResult<RunStatus> {
    let current_markdown = state.storage.read_current_run(scope)?;
    Ok(Json(RunStatus {
        scope,
        current_markdown,
    }))
}

pub async fn mark_complete(
    State(state): State<AppState>,
    Path(scope): Path<Scope>,
) -> ApiResult<Archived> {
    match state.storage.move_current_to_past(scope)? {
        Some(archived_as) => Ok(Json(Archived {
            ok: true,
            archived_as,
        })),
        None => Err(PlannerError::NotFound("No current run to move.".to_string()).into()),
    }
}

pub async fn past_runs(
    State(state): State<AppState>,
    Path(scope): Path<Scope>,
) -> ApiResult<PastRuns> {
    let archived = state.storage.list_past_runs(scope)?;
    Ok(Json(PastRuns { scope, archived }))
}

pub async fn add_feedback(
    State(state): State<AppState>,
    Json(payload): Json<FeedbackPayload>,
) -> ApiResult<Ack> {
    state.storage.append_feedback(payload.scope, &payload.text)?;
    Ok(Json(ACK))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Path(scope): Path<Scope>,
) -> ApiResult<ScopeText> {
    let text = state.storage.read_feedback(scope)?;
    Ok(Json(ScopeText { scope, text }))
}

pub async fn get_config(State(state): State<AppState>) -> ApiResult<PlannerConfig> {
    Ok(Json(state.config_store.load()?))
}

/// Replace the config and reload the scheduler with it.
pub async fn set_config(
    State(state): State<AppState>,
    Json(config): Json<PlannerConfig>,
) -> ApiResult<Ack> {
    state.config_store.save(&config)?;
    state.scheduler.lock().await.reload()?;
    tracing::info!(
        autopilot = config.schedule.autopilot,
        interval_minutes = config.schedule.interval_minutes(),
        "Configuration updated"
    );
    Ok(Json(ACK))
}
