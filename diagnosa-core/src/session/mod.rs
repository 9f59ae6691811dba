//! Conversation sessions and their transcripts
//!
//! Transcripts live only for the lifetime of the process; nothing here
//! touches the disk.

pub mod store;

pub use store::{PrimingPair, Role, Session, Transcript, Turn};
