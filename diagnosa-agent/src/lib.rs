//! Conversation logic for diagnosa
//!
//! This crate provides the transcript manager and the tagged outcome of a
//! submission.

pub mod error;
pub mod transcript;

pub use error::SubmitError;
pub use transcript::TranscriptManager;
