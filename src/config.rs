//! Typed configuration recognised by the core (§6).
//!
//! Loading this from a YAML/TOML/env source is the out-of-scope
//! collaborator's job, mirroring the teacher's `Listen2MeConfig` loader
//! handing typed values to objects that never see the raw file. The core
//! only consumes the struct tree below, with defaults matching the
//! spec's audio format assumptions.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            channels: 1,
            frame_samples: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub window_seconds: f64,
    pub max_workers: usize,
    pub task_queue_capacity: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            window_seconds: 2.0,
            max_workers: 4,
            task_queue_capacity: 16,
        }
    }
}

impl ConsumerConfig {
    /// `trigger_chunks := round(sample_rate_hz / frame_samples * window_seconds)` (§6).
    pub fn trigger_chunks(&self, audio: &AudioConfig) -> usize {
        let chunks_per_second = audio.sample_rate_hz as f64 / audio.frame_samples as f64;
        (chunks_per_second * self.window_seconds).round().max(1.0) as usize
    }

    /// Bounded FIFO capacity. Falls back to the spec's recommended `max_workers * 4`
    /// when the configured capacity is left at zero.
    pub fn effective_queue_capacity(&self) -> usize {
        if self.task_queue_capacity == 0 {
            self.max_workers.saturating_mul(4).max(1)
        } else {
            self.task_queue_capacity
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub print_step_s: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { print_step_s: 5.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub per_call_timeout_s: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            per_call_timeout_s: 2.0,
        }
    }
}

impl BackendConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.per_call_timeout_s.max(0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub consumers: HashMap<String, ConsumerConfig>,
    pub aggregator: AggregatorConfig,
    pub backend: BackendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut consumers = HashMap::new();
        consumers.insert(
            "realtime".to_string(),
            ConsumerConfig {
                window_seconds: 2.0,
                ..ConsumerConfig::default()
            },
        );
        consumers.insert(
            "batch".to_string(),
            ConsumerConfig {
                window_seconds: 10.0,
                ..ConsumerConfig::default()
            },
        );
        Self {
            audio: AudioConfig::default(),
            consumers,
            aggregator: AggregatorConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trigger_chunks_match_spec_examples() {
        let audio = AudioConfig::default();
        let realtime = ConsumerConfig {
            window_seconds: 2.0,
            ..ConsumerConfig::default()
        };
        let batch = ConsumerConfig {
            window_seconds: 10.0,
            ..ConsumerConfig::default()
        };

        assert_eq!(realtime.trigger_chunks(&audio), 31);
        assert_eq!(batch.trigger_chunks(&audio), 156);
    }

    #[test]
    fn zero_capacity_falls_back_to_four_times_workers() {
        let consumer = ConsumerConfig {
            max_workers: 3,
            task_queue_capacity: 0,
            ..ConsumerConfig::default()
        };
        assert_eq!(consumer.effective_queue_capacity(), 12);
    }
}
