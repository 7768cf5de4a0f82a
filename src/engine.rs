//! Top-level wiring object: owns the buses, the consumers subscribed to
//! `audio.frame`, and the aggregators subscribed to each consumer's result
//! topic, and orchestrates the shutdown order from §5: stop the audio
//! source → shut down each consumer → shut down each aggregator.
//!
//! Grounded on the original `Server`/`TranscriptionService` wiring
//! (`main.py`, `services/transcription_service.py`): one process owning a
//! handful of long-lived collaborators, constructed once and torn down in
//! a fixed order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};

use crate::audio::frame::AudioFrame;
use crate::audio::source::{spawn_source, FrameSource};
use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::transcription::aggregator::ResultAggregator;
use crate::transcription::backend::SpeechBackend;
use crate::transcription::consumer::TranscriptionConsumer;
use crate::transcription::result::TranscriptionResult;
use crate::transcription::SummaryWriter;

pub const AUDIO_FRAME_TOPIC: &str = "audio.frame";

pub fn result_topic(consumer_name: &str) -> String {
    format!("transcription.{consumer_name}")
}

pub struct Engine {
    config: EngineConfig,
    frame_bus: Arc<EventBus<AudioFrame>>,
    result_bus: Arc<EventBus<TranscriptionResult>>,
    consumers: Mutex<HashMap<String, Arc<TranscriptionConsumer>>>,
    aggregators: Mutex<Vec<Arc<ResultAggregator>>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            frame_bus: Arc::new(EventBus::new()),
            result_bus: Arc::new(EventBus::new()),
            consumers: Mutex::new(HashMap::new()),
            aggregators: Mutex::new(Vec::new()),
        }
    }

    pub fn frame_bus(&self) -> &Arc<EventBus<AudioFrame>> {
        &self.frame_bus
    }

    pub fn result_bus(&self) -> &Arc<EventBus<TranscriptionResult>> {
        &self.result_bus
    }

    /// Builds and subscribes a consumer named `name` using the
    /// `consumers[name]` entry of the config (falling back to defaults if
    /// absent), backed by `backend`.
    pub fn add_consumer(
        &self,
        name: impl Into<String>,
        backend: Arc<dyn SpeechBackend>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        {
            let consumers = self.consumers.lock().unwrap();
            if consumers.contains_key(&name) {
                return Err(EngineError::DuplicateConsumer(name));
            }
        }

        if !backend.initialize() {
            return Err(EngineError::BackendInitFailed(name));
        }

        let consumer_config = self.config.consumers.get(&name).cloned().unwrap_or_default();
        let trigger_chunks = consumer_config.trigger_chunks(&self.config.audio);
        let queue_capacity = consumer_config.effective_queue_capacity();

        let consumer = TranscriptionConsumer::new(
            name.clone(),
            backend,
            trigger_chunks,
            consumer_config.max_workers,
            queue_capacity,
            self.config.backend.per_call_timeout(),
            self.result_bus.clone(),
            result_topic(&name),
        );
        consumer.start(self.frame_bus.clone(), AUDIO_FRAME_TOPIC);

        self.consumers.lock().unwrap().insert(name, consumer);
        Ok(())
    }

    /// Subscribes a new aggregator to the result topic of an already-added
    /// consumer.
    pub fn add_aggregator(
        &self,
        consumer_name: &str,
        writer: Arc<dyn SummaryWriter>,
    ) -> Result<(), EngineError> {
        if !self.consumers.lock().unwrap().contains_key(consumer_name) {
            return Err(EngineError::InvalidConfig(format!(
                "no consumer named '{consumer_name}'"
            )));
        }
        let aggregator = ResultAggregator::new(
            consumer_name,
            self.config.aggregator.print_step_s,
            writer,
        );
        aggregator.subscribe(self.result_bus.clone(), &result_topic(consumer_name));
        self.aggregators.lock().unwrap().push(aggregator);
        Ok(())
    }

    /// Runs `source` to completion on its own thread, publishing onto
    /// `audio.frame`. Blocks until the source has emitted its final frame.
    pub fn run_source_to_completion(&self, source: Box<dyn FrameSource>) {
        let handle = spawn_source(source, self.frame_bus.clone(), AUDIO_FRAME_TOPIC);
        if handle.join().is_err() {
            warn!("audio source thread panicked");
        }
    }

    /// Shuts down every consumer, then every aggregator, per §5's ordering.
    /// Returns `true` iff every consumer reported a clean shutdown.
    pub fn shutdown(&self, per_consumer_timeout: Duration) -> bool {
        info!("engine shutting down");
        let consumers: Vec<_> = self.consumers.lock().unwrap().values().cloned().collect();
        let mut all_clean = true;
        for consumer in consumers {
            if !consumer.shutdown(per_consumer_timeout) {
                all_clean = false;
            }
        }

        let aggregators: Vec<_> = self.aggregators.lock().unwrap().drain(..).collect();
        for aggregator in aggregators {
            aggregator.shutdown();
        }

        all_clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::SyntheticFrameSource;
    use crate::config::ConsumerConfig;
    use crate::transcription::{MemoryWriter, NullBackend};

    #[test]
    fn end_to_end_dispatches_and_aggregates() {
        let mut config = EngineConfig::default();
        config.consumers.insert(
            "realtime".to_string(),
            ConsumerConfig {
                window_seconds: 2.0,
                max_workers: 2,
                task_queue_capacity: 8,
            },
        );

        let engine = Engine::new(config);
        let backend = Arc::new(NullBackend::new("null"));
        engine.add_consumer("realtime", backend).unwrap();

        let writer = Arc::new(MemoryWriter::default());
        engine.add_aggregator("realtime", writer.clone()).unwrap();

        let pcm = vec![0u8; 1024 * 2 * 40]; // 40 frames of 1024 samples
        let source = Box::new(SyntheticFrameSource::new(pcm, 16_000, 1, 1024, "demo"));
        engine.run_source_to_completion(source);

        let clean = engine.shutdown(Duration::from_secs(5));
        assert!(clean);
        assert!(!writer.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn duplicate_consumer_name_is_rejected() {
        let engine = Engine::new(EngineConfig::default());
        engine
            .add_consumer("realtime", Arc::new(NullBackend::new("a")))
            .unwrap();
        let err = engine
            .add_consumer("realtime", Arc::new(NullBackend::new("b")))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateConsumer(_)));
    }
}
