//! Concurrent audio dispatch engine for live voice transcription.
//!
//! An [`audio::FrameSource`] publishes [`audio::AudioFrame`]s onto an
//! [`bus::EventBus`]; one or more [`transcription::TranscriptionConsumer`]s
//! accumulate windows of frames and dispatch them to a bounded worker pool
//! that calls a [`transcription::SpeechBackend`]; [`transcription::ResultAggregator`]s
//! subscribe to the resulting [`transcription::TranscriptionResult`]s and
//! print periodic, audio-time-driven summaries. [`Engine`] wires all of
//! this together and owns the shutdown order.

pub mod audio;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod transcription;

pub use bus::EventBus;
pub use config::EngineConfig;
pub use engine::{result_topic, Engine, AUDIO_FRAME_TOPIC};
pub use error::EngineError;
