//! Transcript manager: mediates one session's transcript through the
//! request/response cycle with the remote model

use diagnosa_core::config::Config;
use diagnosa_core::utils::preview;
use diagnosa_core::{PrimingPair, Role, Session, Transcript, Turn};
use diagnosa_providers::{ChatRequest, GenerationSettings, LLMProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SubmitError;

/// Drives the append, submit and append-reply cycle for caller-owned sessions.
///
/// Holds no session state of its own; one manager serves every session.
pub struct TranscriptManager {
    provider: Arc<dyn LLMProvider>,
    settings: GenerationSettings,
    priming: PrimingPair,
}

impl TranscriptManager {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        settings: GenerationSettings,
        priming: PrimingPair,
    ) -> Self {
        Self {
            provider,
            settings,
            priming,
        }
    }

    /// Build a manager using the model and persona sections of `config`
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &Config) -> Self {
        Self::new(
            provider,
            GenerationSettings::from(&config.model),
            config.persona.priming_pair(),
        )
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn priming(&self) -> &PrimingPair {
        &self.priming
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Create the primed transcript if the session has none yet.
    ///
    /// Calling it again returns the existing transcript untouched.
    pub fn initialize<'a>(&self, session: &'a mut Session) -> &'a Transcript {
        if !session.is_initialized() {
            info!("Created transcript for session {}", session.id);
        }
        session.get_or_init(&self.priming)
    }

    /// Append a user turn, returning its index. The text is not validated.
    pub fn append_user_turn(&self, session: &mut Session, text: impl Into<String>) -> usize {
        session.get_or_init(&self.priming).push(Turn::user(text))
    }

    /// Send the transcript plus `text` to the model.
    ///
    /// On success the reply is appended as a model turn and returned. An
    /// empty reply or a fault leaves the transcript as it was.
    ///
    /// When the last turn is a user turn whose content equals `text`, that
    /// turn is dropped from the history so the model sees the prompt once.
    pub async fn submit(&self, session: &mut Session, text: &str) -> Result<String, SubmitError> {
        let history = {
            let transcript = session.get_or_init(&self.priming);
            let mut history = transcript.snapshot();
            // The pending user turn travels as the prompt, not as history.
            let pending = history
                .last()
                .is_some_and(|turn| turn.role == Role::User && turn.content == text);
            if pending {
                history.pop();
            } else {
                debug!(
                    "Submitting text that is not the last user turn of session {}",
                    session.id
                );
            }
            history
        };

        info!(
            "Submitting to {} for session {} ({} context turns): {}",
            self.settings.model,
            session.id,
            history.len(),
            preview(text, 60)
        );

        let request = ChatRequest::new(history, text, self.settings.clone());
        let response = match self.provider.chat(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = SubmitError::from(e);
                warn!(
                    "Submit failed for session {} ({}): {}",
                    session.id,
                    err.kind(),
                    err
                );
                return Err(err);
            }
        };

        let Some(reply) = response.reply_text().map(str::to_string) else {
            warn!(
                "Empty reply for session {} (finish: {:?}, blocked: {:?})",
                session.id, response.finish_reason, response.block_reason
            );
            return Err(SubmitError::EmptyReply);
        };

        let transcript = session.get_or_init(&self.priming);
        transcript.push(Turn::model(reply.clone()));
        let len = transcript.len();
        info!(
            "Reply appended to session {} (transcript length {})",
            session.id, len
        );

        Ok(reply)
    }

    /// Append `text` as a user turn and submit it, as every chat surface does per input
    pub async fn exchange(
        &self,
        session: &mut Session,
        text: impl Into<String>,
    ) -> Result<String, SubmitError> {
        let text = text.into();
        self.append_user_turn(session, text.clone());
        self.submit(session, &text).await
    }
}
