//! Deterministic provider used by tests and offline mode

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::base::{ChatRequest, LLMProvider, LLMResponse, ProviderError, ProviderResult};

/// One canned outcome of a chat call
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    /// A successful call carrying no usable text
    Empty,
    Fail(ProviderError),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}

/// Provider that replays queued replies and records every request it sees.
///
/// Once the queue is exhausted it echoes the prompt back, which keeps the
/// offline chat surfaces usable without network access.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
    model: String,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            model: "scripted".to_string(),
        }
    }

    /// Provider with an empty queue that only echoes
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(&self, request: ChatRequest) -> ProviderResult<LLMResponse> {
        let prompt = request.prompt.clone();
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        match self.next_reply() {
            Some(ScriptedReply::Text(content)) => Ok(LLMResponse::text(content)),
            Some(ScriptedReply::Empty) => Ok(LLMResponse::default()),
            Some(ScriptedReply::Fail(error)) => Err(error),
            None => Ok(LLMResponse::text(format!("(offline) {}", prompt))),
        }
    }

    fn get_default_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::GenerationSettings;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest::new(Vec::new(), prompt, GenerationSettings::default())
    }

    #[tokio::test]
    async fn test_replays_queue_in_order() {
        let provider = ScriptedProvider::new([
            ScriptedReply::text("satu"),
            ScriptedReply::Empty,
            ScriptedReply::Fail(ProviderError::Network("down".to_string())),
        ]);

        let first = provider.chat(request("a")).await.unwrap();
        assert_eq!(first.reply_text(), Some("satu"));

        let second = provider.chat(request("b")).await.unwrap();
        assert_eq!(second.reply_text(), None);

        let third = provider.chat(request("c")).await.unwrap_err();
        assert_eq!(third, ProviderError::Network("down".to_string()));

        let prompts: Vec<String> = provider.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_exhausted_queue_echoes_prompt() {
        let provider = ScriptedProvider::offline();
        provider.push(ScriptedReply::text("queued"));

        tokio_test::block_on(async {
            assert_eq!(
                provider.chat(request("x")).await.unwrap().reply_text(),
                Some("queued")
            );
            assert_eq!(
                provider.chat(request("tifus")).await.unwrap().reply_text(),
                Some("(offline) tifus")
            );
        });
        assert_eq!(provider.call_count(), 2);
    }
}
