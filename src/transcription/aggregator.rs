//! `ResultAggregator` — collects results from one topic and prints
//! periodic summaries keyed on covered audio duration rather than
//! wall-clock time (§4.4), grounded on the original `CleanupAggregator`
//! (`transcription/cleanup_aggregator.py`) for the "step the threshold by
//! `print_step_s` while `covered >= next_print_s`" loop, and on
//! `TranscriptionAggregator.print_transcription_summary`
//! (`transcription/aggregator.py`) for the summary format.

use std::sync::{Arc, Mutex};

use log::info;

use crate::bus::{EventBus, SubscriptionId};
use crate::transcription::result::TranscriptionResult;

/// Where an aggregator's periodic and shutdown summaries go. `Stdout` is
/// the default; an in-memory variant lets tests assert on content without
/// capturing process stdout, mirroring the teacher's callback/writer
/// parameterisation of output-producing components (`result_callback`,
/// `progress_callback` in `whisper_engine.rs`).
pub trait SummaryWriter: Send + Sync {
    fn write(&self, summary: &str);
}

#[derive(Debug, Default)]
pub struct Stdout;

impl SummaryWriter for Stdout {
    fn write(&self, summary: &str) {
        println!("{summary}");
    }
}

/// Captures summaries in memory instead of printing them.
#[derive(Default)]
pub struct MemoryWriter {
    pub lines: Mutex<Vec<String>>,
}

impl SummaryWriter for MemoryWriter {
    fn write(&self, summary: &str) {
        self.lines.lock().unwrap().push(summary.to_string());
    }
}

struct State {
    results: Vec<TranscriptionResult>,
    cover_start_s: Option<f64>,
    cover_end_s: Option<f64>,
    next_print_s: f64,
}

struct Subscription {
    bus: Arc<EventBus<TranscriptionResult>>,
    topic: String,
    id: SubscriptionId,
}

pub struct ResultAggregator {
    name: String,
    print_step_s: f64,
    writer: Arc<dyn SummaryWriter>,
    state: Mutex<State>,
    subscription: Mutex<Option<Subscription>>,
}

impl ResultAggregator {
    pub fn new(name: impl Into<String>, print_step_s: f64, writer: Arc<dyn SummaryWriter>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            print_step_s: if print_step_s > 0.0 { print_step_s } else { 5.0 },
            writer,
            state: Mutex::new(State {
                results: Vec::new(),
                cover_start_s: None,
                cover_end_s: None,
                next_print_s: if print_step_s > 0.0 { print_step_s } else { 5.0 },
            }),
            subscription: Mutex::new(None),
        })
    }

    pub fn subscribe(self: &Arc<Self>, bus: Arc<EventBus<TranscriptionResult>>, topic: &str) {
        let aggregator = self.clone();
        let id = bus.subscribe(topic, move |result: &TranscriptionResult| {
            aggregator.on_result(result.clone());
        });
        *self.subscription.lock().unwrap() = Some(Subscription {
            bus,
            topic: topic.to_string(),
            id,
        });
    }

    fn on_result(&self, result: TranscriptionResult) {
        let summary = {
            let mut state = self.state.lock().unwrap();
            state.results.push(result);

            if let Some(r) = state.results.last() {
                state.cover_start_s = Some(match state.cover_start_s {
                    Some(s) => s.min(r.audio_start_s),
                    None => r.audio_start_s,
                });
                state.cover_end_s = Some(match state.cover_end_s {
                    Some(e) => e.max(r.audio_end_s),
                    None => r.audio_end_s,
                });
            }

            let mut should_print = false;
            if let (Some(start), Some(end)) = (state.cover_start_s, state.cover_end_s) {
                let covered = end - start;
                while covered >= state.next_print_s {
                    should_print = true;
                    state.next_print_s += self.print_step_s;
                }
            }

            if should_print {
                Some(render_summary(&self.name, &state.results, state.cover_end_s.unwrap_or(0.0) - state.cover_start_s.unwrap_or(0.0)))
            } else {
                None
            }
        };

        // Summary I/O happens outside the state lock.
        if let Some(summary) = summary {
            self.writer.write(&summary);
        }
    }

    /// Unsubscribes and prints one final summary, as §4.4 requires.
    pub fn shutdown(&self) {
        if let Some(sub) = self.subscription.lock().unwrap().take() {
            sub.bus.unsubscribe(&sub.topic, sub.id);
        }
        let summary = {
            let state = self.state.lock().unwrap();
            let covered = match (state.cover_start_s, state.cover_end_s) {
                (Some(s), Some(e)) => e - s,
                _ => 0.0,
            };
            render_summary(&self.name, &state.results, covered)
        };
        self.writer.write(&summary);
        info!("aggregator '{}' shut down", self.name);
    }
}

fn render_summary(name: &str, results: &[TranscriptionResult], covered_s: f64) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "=== {name}: {} result(s), {:.2}s covered ===",
        results.len(),
        covered_s
    ));
    for r in results {
        lines.push(format!("  [{:.2}] {}", r.confidence, r.text));
    }
    let text = results
        .iter()
        .filter(|r| !r.text.is_empty() && !r.is_no_speech())
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(format!("--- {text} ---"));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str, confidence: f64, start: f64, end: f64) -> TranscriptionResult {
        TranscriptionResult {
            text: text.to_string(),
            confidence,
            processing_time_s: 0.0,
            wallclock_ts: 0.0,
            service_name: "test".to_string(),
            language: "en-US".to_string(),
            alternatives: None,
            chunk_id: "c".to_string(),
            audio_start_s: start,
            audio_end_s: end,
            mode: "realtime".to_string(),
            is_final: false,
            batch_id: None,
        }
    }

    #[test]
    fn prints_once_per_print_step_of_covered_audio() {
        let writer = Arc::new(MemoryWriter::default());
        let aggregator = ResultAggregator::new("agg", 5.0, writer.clone());

        aggregator.on_result(result("hello", 0.9, 0.0, 3.0));
        assert!(writer.lines.lock().unwrap().is_empty());

        aggregator.on_result(result("world", 0.8, 3.0, 6.0));
        assert_eq!(writer.lines.lock().unwrap().len(), 1);

        aggregator.on_result(result("again", 0.7, 6.0, 11.0));
        assert_eq!(writer.lines.lock().unwrap().len(), 2);
    }

    #[test]
    fn shutdown_always_prints_a_final_summary() {
        let writer = Arc::new(MemoryWriter::default());
        let aggregator = ResultAggregator::new("agg", 5.0, writer.clone());
        aggregator.on_result(result("hi", 0.9, 0.0, 1.0));
        aggregator.shutdown();
        assert_eq!(writer.lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn summary_excludes_no_speech_detected_from_joined_text() {
        let writer = Arc::new(MemoryWriter::default());
        let aggregator = ResultAggregator::new("agg", 100.0, writer.clone());
        aggregator.on_result(result("[NO_SPEECH_DETECTED]", 0.0, 0.0, 1.0));
        aggregator.on_result(result("actual words", 0.9, 1.0, 2.0));
        aggregator.shutdown();
        let lines = writer.lines.lock().unwrap();
        assert!(lines[0].contains("--- actual words ---"));
    }
}
