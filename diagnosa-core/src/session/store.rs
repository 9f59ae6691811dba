//! Session and transcript data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_PRIMING_QUESTION: &str = "Saya adalah seorang tenaga medis. Tuliskan penyakit yang perlu di diagnosis. Jawaban singkat dan jelas. Tolak pertanyaan selain tentang penyakit.";
const DEFAULT_PRIMING_ACK: &str = "Baik! Tuliskan penyakit yang perlu di diagnosis.";

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a model turn
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// The fixed seed turns establishing the assistant persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimingPair {
    /// User turn stating persona and constraints
    pub question: String,
    /// Model turn acknowledging it
    pub acknowledgement: String,
}

impl PrimingPair {
    pub fn new(question: impl Into<String>, acknowledgement: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            acknowledgement: acknowledgement.into(),
        }
    }

    /// The pair as the first two turns of a transcript
    pub fn turns(&self) -> [Turn; 2] {
        [
            Turn::user(self.question.clone()),
            Turn::model(self.acknowledgement.clone()),
        ]
    }
}

impl Default for PrimingPair {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMING_QUESTION, DEFAULT_PRIMING_ACK)
    }
}

/// Append-only ordered log of turns.
///
/// Turns can only be pushed; there is no API to edit, remove or reorder
/// them, so `turns()[i]` never changes once appended.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create a transcript seeded with the priming pair
    pub fn primed(priming: &PrimingPair) -> Self {
        Self {
            turns: priming.turns().to_vec(),
        }
    }

    /// Append a turn, returning its index
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Owned copy of the log as it is now, for building request payloads
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }
}

/// A user's conversation session.
///
/// Owned by whoever manages sessions (the web registry or the terminal
/// loop); the transcript is created lazily on first access.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier
    pub id: String,
    transcript: Option<Transcript>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Session {
    /// Create a new session with no transcript yet
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            transcript: None,
            created_at: now,
            last_active: now,
        }
    }

    /// Create a session with a random identifier
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn is_initialized(&self) -> bool {
        self.transcript.is_some()
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    /// Record activity on the session
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Time since the last recorded activity, zero if the clock went backwards
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_active).to_std().unwrap_or_default()
    }

    /// Return the transcript, seeding it with `priming` if it does not exist yet
    pub fn get_or_init(&mut self, priming: &PrimingPair) -> &mut Transcript {
        self.transcript
            .get_or_insert_with(|| Transcript::primed(priming))
    }
}
