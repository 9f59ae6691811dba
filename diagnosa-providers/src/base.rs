//! Base trait for LLM providers

use async_trait::async_trait;
use diagnosa_core::config::ModelConfig;
use diagnosa_core::Turn;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The service rejected the credential
    #[error("Credential rejected: {0}")]
    Credential(String),

    /// The service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded the configured bound
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The requested model does not exist or is not served
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Fixed generation parameters attached to every request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl From<&ModelConfig> for GenerationSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            model: config.name.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

/// One chat-completion call: prior turns as context plus the new user text
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub history: Vec<Turn>,
    pub prompt: String,
    pub settings: GenerationSettings,
}

impl ChatRequest {
    pub fn new(history: Vec<Turn>, prompt: impl Into<String>, settings: GenerationSettings) -> Self {
        Self {
            history,
            prompt: prompt.into(),
            settings,
        }
    }

    /// Full conversation as sent on the wire, ending with the new user turn
    pub fn messages(&self) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.extend(self.history.iter().cloned());
        messages.push(Turn::user(self.prompt.clone()));
        messages
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    /// Set when the service refused to answer the prompt
    pub block_reason: Option<String>,
    pub usage: HashMap<String, i64>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some("STOP".to_string()),
            ..Default::default()
        }
    }

    /// Usable reply text, `None` when absent or whitespace only
    pub fn reply_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn chat(&self, request: ChatRequest) -> ProviderResult<LLMResponse>;

    /// Get the default model for this provider
    fn get_default_model(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagnosa_core::{PrimingPair, Role};

    #[test]
    fn test_messages_end_with_prompt() {
        let history = PrimingPair::default().turns().to_vec();
        let request = ChatRequest::new(history, "tifus", GenerationSettings::default());

        let messages = request.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], Turn::user("tifus"));
        assert_eq!(messages[1].role, Role::Model);
    }

    #[test]
    fn test_default_settings_follow_model_config() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.model, "gemini-1.5-flash");
        assert_eq!(settings.max_output_tokens, 500);
        assert!((settings.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reply_text_ignores_blank_content() {
        assert_eq!(LLMResponse::default().reply_text(), None);
        assert_eq!(LLMResponse::text(" \n").reply_text(), None);
        assert_eq!(LLMResponse::text("Diagnosis").reply_text(), Some("Diagnosis"));
    }
}
