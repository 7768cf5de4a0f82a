//! `RollingAudioBuffer` — a bounded, time-addressable window of recent audio
//! (§4.2), grounded on the original `RollingAudioBuffer` (`buffer.py`):
//! append-evict-oldest on a byte budget, with a lock-guarded deque standing
//! in here as a `VecDeque<AudioFrame>` behind a `Mutex`.
//!
//! Not every consumer needs one — a consumer that triggers purely on
//! accumulated-chunk counts has no use for retrospective windowing. It
//! exists as a standalone building block for a consumer that wants periodic
//! retrospective windows (e.g. "transcribe the last 60s every 45s").

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::audio::clock::Clock;
use crate::audio::frame::AudioFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStats {
    pub frame_count: usize,
    pub byte_count: usize,
    pub oldest_timestamp_s: Option<f64>,
    pub newest_timestamp_s: Option<f64>,
    pub duration_s: f64,
}

struct Inner {
    frames: VecDeque<AudioFrame>,
    total_bytes: usize,
}

pub struct RollingAudioBuffer {
    capacity_bytes: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl RollingAudioBuffer {
    /// `capacity_bytes = sample_rate_hz * channels * 2 * capacity_s`.
    pub fn new(
        sample_rate_hz: u32,
        channels: u16,
        capacity_s: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity_bytes =
            (sample_rate_hz as f64 * channels as f64 * 2.0 * capacity_s).round() as usize;
        Self {
            capacity_bytes,
            clock,
            inner: Mutex::new(Inner {
                frames: VecDeque::new(),
                total_bytes: 0,
            }),
        }
    }

    /// Appends `frame`, evicting the oldest frames while over budget.
    pub fn add(&self, frame: AudioFrame) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_bytes += frame.pcm.len();
        inner.frames.push_back(frame);
        while inner.total_bytes > self.capacity_bytes {
            match inner.frames.pop_front() {
                Some(evicted) => inner.total_bytes -= evicted.pcm.len(),
                None => break,
            }
        }
    }

    /// Concatenated PCM (and covering timestamps) of frames falling in
    /// `[now - offset_s - dur_s, now - offset_s]`, or `None` if nothing
    /// falls in range.
    pub fn get_window(&self, dur_s: f64, offset_s: f64) -> Option<(Vec<u8>, f64, f64)> {
        let now = self.clock.now_s();
        let window_end = now - offset_s;
        let window_start = window_end - dur_s;

        let inner = self.inner.lock().unwrap();
        let mut pcm = Vec::new();
        let mut start_s: Option<f64> = None;
        let mut end_s: Option<f64> = None;

        for frame in inner.frames.iter() {
            if frame.timestamp_s < window_start || frame.timestamp_s > window_end {
                continue;
            }
            start_s = Some(start_s.map_or(frame.timestamp_s, |s| s.min(frame.timestamp_s)));
            end_s = Some(end_s.map_or(frame.end_timestamp_s(), |e| e.max(frame.end_timestamp_s())));
            pcm.extend_from_slice(&frame.pcm);
        }

        match (start_s, end_s) {
            (Some(s), Some(e)) => Some((pcm, s, e)),
            _ => None,
        }
    }

    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock().unwrap();
        let oldest = inner.frames.front().map(|f| f.timestamp_s);
        let newest = inner.frames.back().map(|f| f.end_timestamp_s());
        BufferStats {
            frame_count: inner.frames.len(),
            byte_count: inner.total_bytes,
            oldest_timestamp_s: oldest,
            newest_timestamp_s: newest,
            duration_s: match (oldest, newest) {
                (Some(o), Some(n)) => n - o,
                _ => 0.0,
            },
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.frames.clear();
        inner.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::FixedClock;

    fn frame(seq: u64, timestamp_s: f64, pcm: Vec<u8>) -> AudioFrame {
        AudioFrame::new(format!("c{seq}"), pcm, timestamp_s, seq, 16_000, 1, false)
    }

    #[test]
    fn evicts_oldest_frames_past_byte_budget() {
        let clock = Arc::new(FixedClock::new(0.0));
        // capacity = 16000 * 1 * 2 * 0.001s = 32 bytes
        let buf = RollingAudioBuffer::new(16_000, 1, 0.001, clock);
        buf.add(frame(0, 0.0, vec![0u8; 20]));
        buf.add(frame(1, 0.1, vec![0u8; 20]));
        let stats = buf.stats();
        assert_eq!(stats.frame_count, 1);
        assert_eq!(stats.byte_count, 20);
    }

    #[test]
    fn get_window_returns_none_when_nothing_in_range() {
        let clock = Arc::new(FixedClock::new(100.0));
        let buf = RollingAudioBuffer::new(16_000, 1, 60.0, clock);
        buf.add(frame(0, 0.0, vec![1, 2]));
        assert!(buf.get_window(1.0, 0.0).is_none());
    }

    #[test]
    fn get_window_concatenates_frames_in_range() {
        let clock = Arc::new(FixedClock::new(2.0));
        let buf = RollingAudioBuffer::new(16_000, 1, 60.0, clock);
        buf.add(frame(0, 0.0, vec![1, 2]));
        buf.add(frame(1, 1.0, vec![3, 4]));
        let (pcm, start, end) = buf.get_window(3.0, 0.0).unwrap();
        assert_eq!(pcm, vec![1, 2, 3, 4]);
        assert_eq!(start, 0.0);
        assert!(end > 1.0);
    }
}
