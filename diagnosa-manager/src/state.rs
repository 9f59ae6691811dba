use diagnosa_agent::SubmitError;
use diagnosa_core::config::Config;
use diagnosa_core::{Session, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

#[derive(Clone)]
pub struct AppState {
    pub api_tx: mpsc::Sender<ManagerCommand>,
    pub info: Arc<ChatInfo>,
}

pub enum ManagerCommand {
    CreateSession(oneshot::Sender<TranscriptView>),
    Chat(ApiRequest),
    GetTranscript(String, oneshot::Sender<Option<TranscriptView>>),
    EndSession(String, oneshot::Sender<bool>),
}

pub struct ApiRequest {
    pub session_id: String,
    pub message: String,
    pub reply_tx: oneshot::Sender<ChatOutcome>,
}

/// Static texts rendered by the chat page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInfo {
    pub title: String,
    pub description: String,
    pub input_placeholder: String,
    pub model: String,
}

impl ChatInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.ui.title.clone(),
            description: config.ui.description.clone(),
            input_placeholder: config.ui.input_placeholder.clone(),
            model: config.model.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptView {
    pub session_id: String,
    pub transcript: Vec<Turn>,
}

impl TranscriptView {
    pub fn of(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            transcript: session
                .transcript()
                .map(|t| t.snapshot())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Ok,
    Empty,
    Error,
}

/// Result of one exchange as returned to the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub status: ChatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub transcript_len: usize,
}

impl ChatOutcome {
    pub fn from_result(result: Result<String, SubmitError>, transcript_len: usize) -> Self {
        match result {
            Ok(reply) => Self {
                status: ChatStatus::Ok,
                reply: Some(reply),
                notice: None,
                hint: None,
                kind: None,
                transcript_len,
            },
            Err(e) => Self {
                status: if e.is_empty_reply() {
                    ChatStatus::Empty
                } else {
                    ChatStatus::Error
                },
                reply: None,
                notice: Some(e.notice()),
                hint: e.hint().map(str::to_string),
                kind: Some(e.kind().to_string()),
                transcript_len,
            },
        }
    }
}
