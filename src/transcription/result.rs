//! `TranscriptionResult` — the message published on `transcription.<name>`
//! (§3), grounded on the original `TranscriptionResult` dataclass
//! (`models/transcription.py`).

use serde::{Deserialize, Serialize};

pub const NO_SPEECH_DETECTED: &str = "[NO_SPEECH_DETECTED]";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub confidence: f64,
    pub processing_time_s: f64,
    pub wallclock_ts: f64,
    pub service_name: String,
    pub language: String,
    pub alternatives: Option<Vec<String>>,
    pub chunk_id: String,
    pub audio_start_s: f64,
    pub audio_end_s: f64,
    pub mode: String,
    pub is_final: bool,
    pub batch_id: Option<String>,
}

impl TranscriptionResult {
    pub fn is_no_speech(&self) -> bool {
        self.text == NO_SPEECH_DETECTED
    }
}
