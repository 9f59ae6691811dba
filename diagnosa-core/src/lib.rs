//! Core types for diagnosa
//!
//! This crate provides the conversation transcript model, configuration
//! loading and logging setup shared by the other diagnosa crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
pub use session::{PrimingPair, Role, Session, Transcript, Turn};
