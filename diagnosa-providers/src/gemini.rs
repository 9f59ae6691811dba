//! Gemini generateContent HTTP client

use async_trait::async_trait;
use diagnosa_core::config::Config;
use diagnosa_core::Turn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{ChatRequest, LLMProvider, LLMResponse, ProviderError, ProviderResult};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// generateContent response body
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
    #[serde(default)]
    total_token_count: i64,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Client for the Gemini chat API
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    default_model: String,
    timeout: Duration,
    extra_headers: HashMap<String, String>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: String,
        api_base: Option<String>,
        default_model: String,
        timeout: Duration,
        extra_headers: Option<HashMap<String, String>>,
    ) -> ProviderResult<Self> {
        let api_base = api_base
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            api_key,
            default_model,
            timeout,
            extra_headers: extra_headers.unwrap_or_default(),
        })
    }

    /// Build a client from the loaded configuration and a resolved credential
    pub fn from_config(config: &Config, api_key: String) -> ProviderResult<Self> {
        let provider = &config.providers.gemini;
        Self::new(
            api_key,
            provider.api_base.clone(),
            config.model.name.clone(),
            Duration::from_secs(config.model.timeout_secs),
            provider.extra_headers.clone(),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(request: &ChatRequest) -> GenerateContentRequest {
        let contents = request.messages().into_iter().map(to_content).collect();
        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: request.settings.temperature,
                max_output_tokens: request.settings.max_output_tokens,
            },
        }
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req_builder = req_builder.header(API_KEY_HEADER, &self.api_key);

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        req_builder
    }

    fn parse_response(response: GenerateContentResponse) -> LLMResponse {
        let mut usage = HashMap::new();
        if let Some(meta) = &response.usage_metadata {
            usage.insert("prompt_tokens".to_string(), meta.prompt_token_count);
            usage.insert("completion_tokens".to_string(), meta.candidates_token_count);
            usage.insert("total_tokens".to_string(), meta.total_token_count);
        }

        let block_reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);

        let Some(candidate) = response.candidates.into_iter().next() else {
            return LLMResponse {
                block_reason,
                usage,
                ..Default::default()
            };
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        LLMResponse {
            content: if text.is_empty() { None } else { Some(text) },
            finish_reason: candidate.finish_reason,
            block_reason,
            usage,
        }
    }

    fn classify_transport(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if error.is_decode() {
            ProviderError::InvalidResponse(error.to_string())
        } else {
            ProviderError::Network(error.to_string())
        }
    }
}

fn to_content(turn: Turn) -> Content {
    Content {
        role: Some(turn.role.as_str().to_string()),
        parts: vec![Part {
            text: Some(turn.content),
        }],
    }
}

/// Map a non-success HTTP status to a provider error
fn classify_status(status: StatusCode, body: &str, model: &str) -> ProviderError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    let key_rejected = body.contains("API_KEY_INVALID")
        || envelope.as_ref().is_some_and(|e| {
            e.error.status.as_deref() == Some("UNAUTHENTICATED")
                || e.error
                    .details
                    .iter()
                    .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"))
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Credential(message),
        StatusCode::BAD_REQUEST if key_rejected => ProviderError::Credential(message),
        StatusCode::NOT_FOUND => ProviderError::ModelUnavailable(format!("{}: {}", model, message)),
        _ => ProviderError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn chat(&self, request: ChatRequest) -> ProviderResult<LLMResponse> {
        let model = if request.settings.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            request.settings.model.clone()
        };
        let url = self.endpoint(&model);
        let body = Self::build_request(&request);

        debug!(
            "Sending generateContent request to {} with model {} ({} turns)",
            self.api_base,
            model,
            body.contents.len()
        );

        let response = self
            .apply_headers(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify_transport(e))?;

        if !status.is_success() {
            warn!("Gemini returned HTTP {} for model {}", status, model);
            return Err(classify_status(status, &text, &model));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let response = Self::parse_response(parsed);

        if let Some(reason) = &response.block_reason {
            warn!("Prompt blocked by the service: {}", reason);
        }

        Ok(response)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::GenerationSettings;
    use diagnosa_core::PrimingPair;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write as _;

    fn client_for(base: String, timeout: Duration) -> GeminiClient {
        GeminiClient::new(
            "test-key".to_string(),
            Some(base),
            "gemini-1.5-flash".to_string(),
            timeout,
            None,
        )
        .unwrap()
    }

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest::new(
            PrimingPair::default().turns().to_vec(),
            prompt,
            GenerationSettings::default(),
        )
    }

    #[test]
    fn test_default_api_base_and_endpoint() {
        let client = GeminiClient::new(
            "k".to_string(),
            Some("  ".to_string()),
            "gemini-1.5-flash".to_string(),
            Duration::from_secs(30),
            None,
        )
        .unwrap();
        assert_eq!(client.api_base(), DEFAULT_API_BASE);
        assert_eq!(
            client.endpoint("models/gemini-1.5-pro"),
            format!("{}/models/gemini-1.5-pro:generateContent", DEFAULT_API_BASE)
        );
    }

    #[test]
    fn test_classify_status() {
        let invalid_key = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, invalid_key, "m"),
            ProviderError::Credential(msg) if msg.starts_with("API key not valid")
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, r#"{"error":{"message":"bad"}}"#, "m"),
            ProviderError::ApiError { status: 400, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "denied", "m"),
            ProviderError::Credential(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "", "gemini-x"),
            ProviderError::ModelUnavailable(msg) if msg.starts_with("gemini-x")
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "overloaded", "m"),
            ProviderError::ApiError { status: 503, message } if message == "overloaded"
        ));
    }

    #[tokio::test]
    async fn test_chat_sends_full_history_and_settings() {
        let mut server = mockito::Server::new_async().await;
        let priming = PrimingPair::default();
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_header(API_KEY_HEADER, "test-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": priming.question}]},
                    {"role": "model", "parts": [{"text": priming.acknowledgement}]},
                    {"role": "user", "parts": [{"text": "demam berdarah"}]}
                ],
                "generationConfig": {"temperature": 0.4, "maxOutputTokens": 500}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": "Demam berdarah "}, {"text": "disebabkan virus dengue."}]},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 8, "totalTokenCount": 48}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(server.url(), Duration::from_secs(5));
        let response = client.chat(request("demam berdarah")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            response.reply_text(),
            Some("Demam berdarah disebabkan virus dengue.")
        );
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.get("total_tokens"), Some(&48));
    }

    #[tokio::test]
    async fn test_chat_without_candidates_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), Duration::from_secs(5));
        let response = client.chat(request("apa kabar")).await.unwrap();

        assert_eq!(response.reply_text(), None);
        assert_eq!(response.block_reason.as_deref(), Some("SAFETY"));
    }

    #[tokio::test]
    async fn test_chat_maps_rejected_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), Duration::from_secs(5));
        let err = client.chat(request("tifus")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Credential(_)));
    }

    #[tokio::test]
    async fn test_chat_maps_unknown_model() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"models/gemini-1.5-flash is not found","status":"NOT_FOUND"}}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), Duration::from_secs(5));
        let err = client.chat(request("tifus")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = client_for(server.url(), Duration::from_secs(5));
        let err = client.chat(request("tifus")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_chat_slow_reply_times_out() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(1500));
                w.write_all(br#"{"candidates":[]}"#)
            })
            .create_async()
            .await;

        let client = client_for(server.url(), Duration::from_millis(300));
        let err = client.chat(request("tifus")).await.unwrap_err();
        assert_eq!(err, ProviderError::Timeout(Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn test_chat_unreachable_host_is_network_error() {
        let client = client_for("http://127.0.0.1:1".to_string(), Duration::from_secs(5));
        let err = client.chat(request("tifus")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
