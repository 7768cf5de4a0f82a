//! Speech backend contract (§4.5), mirroring the original
//! `AbstractTranscriptionBackend` ABC (`transcription/base.py`) as a Rust
//! trait object rather than an abstract base class.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::transcription::result::{TranscriptionResult, NO_SPEECH_DETECTED};

#[derive(Debug, Error, Clone)]
pub enum BackendError {
    #[error("backend call for chunk '{chunk_id}' exceeded its deadline")]
    DeadlineExceeded { chunk_id: String },

    #[error("backend unavailable for chunk '{chunk_id}': {detail}")]
    ServiceUnavailable { chunk_id: String, detail: String },

    #[error("backend API error for chunk '{chunk_id}': {detail}")]
    ApiError { chunk_id: String, detail: String },
}

impl BackendError {
    pub fn chunk_id(&self) -> &str {
        match self {
            BackendError::DeadlineExceeded { chunk_id }
            | BackendError::ServiceUnavailable { chunk_id, .. }
            | BackendError::ApiError { chunk_id, .. } => chunk_id,
        }
    }
}

/// A speech-to-text backend. The core treats this as opaque: everything
/// polymorphic about "how transcription actually happens" sits behind
/// this capability set.
pub trait SpeechBackend: Send + Sync {
    /// Idempotent one-time setup. Called once before use; `false` means
    /// the backend could not be made ready (fatal at startup, §7).
    fn initialize(&self) -> bool;

    /// Synchronous transcription of one chunk. Implementations must honor
    /// `deadline` internally and return `DeadlineExceeded` rather than
    /// blocking past it.
    fn transcribe(
        &self,
        chunk_id: &str,
        pcm: &[u8],
        deadline: Duration,
    ) -> Result<TranscriptionResult, BackendError>;

    /// Idempotent teardown.
    fn cleanup(&self);
}

/// Reference backend used by tests and the demo binary in place of a real
/// speech service. Always reports no speech detected, with zero
/// confidence, matching the contract's "zero hypotheses" case.
#[derive(Debug, Default)]
pub struct NullBackend {
    pub service_name: String,
}

impl NullBackend {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl SpeechBackend for NullBackend {
    fn initialize(&self) -> bool {
        true
    }

    fn transcribe(
        &self,
        chunk_id: &str,
        _pcm: &[u8],
        _deadline: Duration,
    ) -> Result<TranscriptionResult, BackendError> {
        Ok(TranscriptionResult {
            text: NO_SPEECH_DETECTED.to_string(),
            confidence: 0.0,
            processing_time_s: 0.0,
            wallclock_ts: Utc::now().timestamp_millis() as f64 / 1000.0,
            service_name: self.service_name.clone(),
            language: "en-US".to_string(),
            alternatives: None,
            chunk_id: chunk_id.to_string(),
            audio_start_s: 0.0,
            audio_end_s: 0.0,
            mode: String::new(),
            is_final: false,
            batch_id: None,
        })
    }

    fn cleanup(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_backend_reports_no_speech_detected() {
        let backend = NullBackend::new("null");
        assert!(backend.initialize());
        let result = backend
            .transcribe("c1", &[1, 2, 3], Duration::from_secs(2))
            .unwrap();
        assert!(result.is_no_speech());
        assert_eq!(result.confidence, 0.0);
    }
}
