//! `FrameSource` — the core's trait for anything that produces an
//! `AudioFrame` stream onto the bus (§2 item 2), plus a reference
//! implementation (`SyntheticFrameSource`) that slices a provided PCM
//! buffer into evenly sized frames at a configurable pace. This is a
//! stand-in for a real microphone/network source, not a capture device —
//! wiring code and tests use it to drive the pipeline without hardware.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::info;

use crate::audio::frame::AudioFrame;
use crate::bus::EventBus;

/// Anything that can push a bounded `AudioFrame` stream onto a bus, ending
/// with exactly one `final = true` frame.
pub trait FrameSource: Send {
    /// Runs the source to completion, publishing frames on `topic`. Blocks
    /// until the final frame has been published.
    fn run(self: Box<Self>, bus: &EventBus<AudioFrame>, topic: &str);
}

/// Slices `pcm` into `frame_samples`-sized chunks of 16-bit mono samples,
/// publishing one frame every `frame_duration` of wall-clock time (or
/// immediately, if `pace` is `None`) and a trailing empty `final` frame.
pub struct SyntheticFrameSource {
    pcm: Vec<u8>,
    sample_rate_hz: u32,
    channels: u16,
    frame_samples: usize,
    chunk_id_prefix: String,
    pace: Option<Duration>,
}

impl SyntheticFrameSource {
    pub fn new(
        pcm: Vec<u8>,
        sample_rate_hz: u32,
        channels: u16,
        frame_samples: usize,
        chunk_id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            pcm,
            sample_rate_hz,
            channels,
            frame_samples,
            chunk_id_prefix: chunk_id_prefix.into(),
            pace: None,
        }
    }

    /// Publish frames at roughly real-time pace instead of all at once.
    pub fn with_pace(mut self, frame_duration: Duration) -> Self {
        self.pace = Some(frame_duration);
        self
    }
}

impl FrameSource for SyntheticFrameSource {
    fn run(self: Box<Self>, bus: &EventBus<AudioFrame>, topic: &str) {
        let bytes_per_frame = self.frame_samples * self.channels as usize * 2;
        let mut seq = 0u64;
        let mut timestamp_s = 0.0f64;
        let mut offset = 0usize;

        while offset < self.pcm.len() {
            let end = (offset + bytes_per_frame).min(self.pcm.len());
            let chunk = self.pcm[offset..end].to_vec();
            let frame = AudioFrame::new(
                format!("{}.{}", self.chunk_id_prefix, seq),
                chunk,
                timestamp_s,
                seq,
                self.sample_rate_hz,
                self.channels,
                false,
            );
            timestamp_s = frame.end_timestamp_s();
            bus.publish(topic, &frame);

            if let Some(pace) = self.pace {
                thread::sleep(pace);
            }
            offset = end;
            seq += 1;
        }

        let final_frame = AudioFrame::new(
            format!("{}.{}-final", self.chunk_id_prefix, seq),
            Vec::new(),
            timestamp_s,
            seq,
            self.sample_rate_hz,
            self.channels,
            true,
        );
        info!(
            "synthetic source '{}' emitting final frame at seq={}",
            self.chunk_id_prefix, seq
        );
        bus.publish(topic, &final_frame);
    }
}

/// Spawns `source.run` on its own thread, matching the one-source-thread
/// model of §5.
pub fn spawn_source(
    source: Box<dyn FrameSource>,
    bus: Arc<EventBus<AudioFrame>>,
    topic: impl Into<String>,
) -> JoinHandle<()> {
    let topic = topic.into();
    thread::spawn(move || {
        source.run(&bus, &topic);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn synthetic_source_emits_seq_ordered_frames_ending_in_final() {
        let bus: EventBus<AudioFrame> = EventBus::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = received.clone();
        bus.subscribe("audio.frame", move |f: &AudioFrame| {
            r.lock().unwrap().push(f.clone());
        });

        let pcm = vec![0u8; 10 * 4]; // 10 frames of 2 samples * 2 bytes
        let source = Box::new(SyntheticFrameSource::new(pcm, 16_000, 1, 2, "test"));
        source.run(&bus, "audio.frame");

        let frames = received.lock().unwrap();
        assert_eq!(frames.len(), 11); // 10 data frames + 1 final
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(f.seq, i as u64);
        }
        assert!(frames.last().unwrap().r#final);
        assert!(frames.last().unwrap().is_empty());
    }
}
