use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use tokio::sync::oneshot;

use crate::state::{ApiRequest, AppState, ChatInfo, ChatOutcome, ManagerCommand, TranscriptView};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(serde::Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// Error body returned by the JSON endpoints
pub enum ApiError {
    NotFound(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = Json(serde_json::json!({ "status": "error", "message": message }));
        (status, body).into_response()
    }
}

async fn send_command<T>(
    state: &AppState,
    cmd: ManagerCommand,
    rx: oneshot::Receiver<T>,
) -> Result<T, ApiError> {
    if let Err(e) = state.api_tx.send(cmd).await {
        tracing::error!("Failed to send command to manager: {}", e);
        return Err(ApiError::Unavailable("manager is not running".to_string()));
    }
    rx.await.map_err(|e| {
        tracing::error!("Failed to receive manager response: {}", e);
        ApiError::Unavailable("manager dropped the request".to_string())
    })
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn info_handler(State(state): State<AppState>) -> Json<ChatInfo> {
    Json(state.info.as_ref().clone())
}

pub async fn create_session_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TranscriptView>), ApiError> {
    let (tx, rx) = oneshot::channel();
    let view = send_command(&state, ManagerCommand::CreateSession(tx), rx).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<TranscriptView>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let cmd = ManagerCommand::GetTranscript(session_id.clone(), tx);
    match send_command(&state, cmd, rx).await? {
        Some(view) => Ok(Json(view)),
        None => Err(ApiError::NotFound(format!("session {} not found", session_id))),
    }
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let (reply_tx, rx) = oneshot::channel();
    let req = ApiRequest {
        session_id,
        message: payload.message,
        reply_tx,
    };
    let outcome = send_command(&state, ManagerCommand::Chat(req), rx).await?;
    Ok(Json(outcome))
}

pub async fn end_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (tx, rx) = oneshot::channel();
    let cmd = ManagerCommand::EndSession(session_id.clone(), tx);
    if send_command(&state, cmd, rx).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {} not found", session_id)))
    }
}
