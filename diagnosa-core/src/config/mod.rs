//! Configuration management
//!
//! Handles loading and validation of diagnosa configuration from files
//! and environment variables, and resolution of the model credential.

pub mod credential;
pub mod loader;
pub mod schema;
pub mod validate;

pub use credential::{resolve_credential, CREDENTIAL_NAME};
pub use loader::ConfigLoader;
pub use schema::*;
