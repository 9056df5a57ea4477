//! HTTP request handlers

use super::types::HealthResponse;
use super::AppState;
use crate::dispatcher::DispatchError;
use crate::protocol::{
    Envelope, ErrorCode, Rejection, ResetResponse, ResumeRequest, StartRequest,
};
use crate::session::SessionSnapshot;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/start", post(start))
        .route("/v1/resume", post(resume))
        .route("/v1/sessions/:session_id", get(session_status))
        .route("/v1/sessions/:session_id/reset", post(reset_session))
        .route("/v1/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Protocol
// ============================================================

async fn start(
    State(state): State<AppState>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<Envelope>, AppError> {
    let Json(req) = payload?;
    let outcome = state
        .dispatcher
        .start(&req.session_id, &req.message)
        .await?;
    Ok(Json(Envelope::from(&outcome)))
}

async fn resume(
    State(state): State<AppState>,
    payload: Result<Json<ResumeRequest>, JsonRejection>,
) -> Result<Json<Envelope>, AppError> {
    let Json(req) = payload?;
    let outcome = state
        .dispatcher
        .resume(&req.session_id, &req.to_reply())
        .await?;
    Ok(Json(Envelope::from(&outcome)))
}

// ============================================================
// Session Management
// ============================================================

async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<SessionSnapshot> {
    Json(state.dispatcher.status(&session_id))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResetResponse>, AppError> {
    let reset = state.dispatcher.reset(&session_id)?;
    Ok(Json(ResetResponse { reset }))
}

// ============================================================
// Health & Version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        pending_sessions: state.dispatcher.store().pending_count(),
    })
}

async fn get_version() -> &'static str {
    concat!("resume-gateway ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Dispatch(DispatchError),
    BadRequest(String),
}

impl From<DispatchError> for AppError {
    fn from(error: DispatchError) -> Self {
        AppError::Dispatch(error)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::SessionBusy | ErrorCode::CallInFlight => StatusCode::CONFLICT,
        ErrorCode::NoPendingTask => StatusCode::NOT_FOUND,
        ErrorCode::ReplyKindMismatch | ErrorCode::InvalidReply => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::WorkflowUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            AppError::Dispatch(error) => (error.code(), error.to_string()),
            AppError::BadRequest(msg) => (ErrorCode::InvalidRequest, msg),
        };
        let status = status_for(code);
        if status.is_server_error() {
            tracing::warn!(code = %code, error = %message, "Request failed");
        }

        let body = Json(Rejection::new(code, message));
        (status, body).into_response()
    }
}
