use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mmchat_core::session::SessionKey;
use mmchat_core::CycleView;
use tokio::sync::oneshot;

use crate::state::{AppState, ConnectResponse, CycleRequest, ManagerCommand};

/// Error body: `{status: "error", kind, message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn unavailable(message: impl ToString) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            kind: "unavailable",
            message: message.to_string(),
        }
    }
}

impl From<mmchat_core::Error> for ApiError {
    fn from(e: mmchat_core::Error) -> Self {
        let status = match &e {
            mmchat_core::Error::NotFound(_) => StatusCode::NOT_FOUND,
            mmchat_core::Error::Validation(_) => StatusCode::BAD_REQUEST,
            mmchat_core::Error::Collaborator(_) => StatusCode::BAD_GATEWAY,
            mmchat_core::Error::Parse { .. }
            | mmchat_core::Error::Io(_)
            | mmchat_core::Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": "error",
            "kind": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Send a command to the manager and wait for its reply
async fn ask<T>(
    state: &AppState,
    command: impl FnOnce(oneshot::Sender<T>) -> ManagerCommand,
) -> Result<T, ApiError> {
    let (tx, rx) = oneshot::channel();
    if let Err(e) = state.api_tx.send(command(tx)).await {
        tracing::error!("Failed to send request to manager: {}", e);
        return Err(ApiError::unavailable(e));
    }
    rx.await.map_err(|e| {
        tracing::error!("Failed to receive manager response: {}", e);
        ApiError::unavailable(e)
    })
}

pub async fn connect_handler(
    State(state): State<AppState>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let response = ask(&state, ManagerCommand::Connect).await??;
    Ok(Json(response))
}

pub async fn cycle_handler(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
    Json(payload): Json<CycleRequest>,
) -> Result<Json<CycleView>, ApiError> {
    let cycle = payload.into_cycle()?;
    let view = ask(&state, |reply| ManagerCommand::Cycle {
        connection_id,
        cycle,
        reply,
    })
    .await??;
    Ok(Json(view))
}

pub async fn disconnect_handler(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = ask(&state, |reply| ManagerCommand::Disconnect {
        connection_id,
        reply,
    })
    .await?;
    Ok(Json(serde_json::json!({ "status": "ok", "removed": removed })))
}

pub async fn list_sessions_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionKey>>, ApiError> {
    let sessions = ask(&state, ManagerCommand::ListSessions).await??;
    Ok(Json(sessions))
}
