//! LLM provider integrations for diagnosa
//!
//! This crate provides the provider abstraction, the Gemini chat client and a
//! scripted provider for tests and offline runs.

pub mod base;
pub mod gemini;
pub mod scripted;

pub use base::{
    ChatRequest, GenerationSettings, LLMProvider, LLMResponse, ProviderError, ProviderResult,
};
pub use gemini::{GeminiClient, DEFAULT_API_BASE};
pub use scripted::{ScriptedProvider, ScriptedReply};
