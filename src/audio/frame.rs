//! `AudioFrame` — the unit of audio delivered on the `audio.frame` bus (§3).

use serde::{Deserialize, Serialize};

/// One chunk of raw PCM audio published by a source.
///
/// `seq` is strictly increasing per source; `duration_ms` is derived from
/// `pcm.len()` at construction time rather than stored independently, so it
/// can never drift from the sample count it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFrame {
    pub chunk_id: String,
    pub pcm: Vec<u8>,
    pub timestamp_s: f64,
    pub seq: u64,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub duration_ms: f64,
    pub r#final: bool,
}

impl AudioFrame {
    /// Builds a frame, deriving `duration_ms` from `pcm` under the
    /// assumption of 16-bit signed samples (2 bytes/sample).
    pub fn new(
        chunk_id: impl Into<String>,
        pcm: Vec<u8>,
        timestamp_s: f64,
        seq: u64,
        sample_rate_hz: u32,
        channels: u16,
        is_final: bool,
    ) -> Self {
        let duration_ms = Self::derive_duration_ms(pcm.len(), sample_rate_hz, channels);
        Self {
            chunk_id: chunk_id.into(),
            pcm,
            timestamp_s,
            seq,
            sample_rate_hz,
            channels,
            duration_ms,
            r#final: is_final,
        }
    }

    fn derive_duration_ms(pcm_len: usize, sample_rate_hz: u32, channels: u16) -> f64 {
        let bytes_per_second = sample_rate_hz as f64 * channels as f64 * 2.0;
        if bytes_per_second <= 0.0 {
            return 0.0;
        }
        pcm_len as f64 / bytes_per_second * 1000.0
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_ms / 1000.0
    }

    /// Timestamp of the sample just past the end of this frame.
    pub fn end_timestamp_s(&self) -> f64 {
        self.timestamp_s + self.duration_s()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_derived_from_pcm_length() {
        let frame = AudioFrame::new("c1", vec![0u8; 2048], 0.0, 0, 16_000, 1, false);
        // 2048 bytes / (16000 * 1 * 2) * 1000 = 64ms
        assert!((frame.duration_ms - 64.0).abs() < 1e-9);
    }

    #[test]
    fn empty_final_frame_has_zero_duration() {
        let frame = AudioFrame::new("c-final", Vec::new(), 10.0, 5, 16_000, 1, true);
        assert_eq!(frame.duration_ms, 0.0);
        assert_eq!(frame.end_timestamp_s(), 10.0);
        assert!(frame.is_empty());
    }
}
