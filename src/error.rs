//! Crate-level error types.
//!
//! Construction/config failures use [`EngineError`]; per-call backend
//! failures use [`crate::transcription::BackendError`]. Both are converted
//! into `anyhow::Error` at the wiring layer (see `src/bin/engine_demo.rs`),
//! matching the teacher's split between typed errors at library seams and
//! `anyhow::Result` at the application boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("backend initialization failed: {0}")]
    BackendInitFailed(String),

    #[error("consumer '{0}' is already registered")]
    DuplicateConsumer(String),
}
