//! `TranscriptionConsumer` — accumulates frames into windows and dispatches
//! them to a bounded worker pool (§4.3), grounded on the original
//! `TranscriptionAudioConsumer` (`transcription/consumers.py`): the same
//! accumulate/flush/dispatch contract, re-expressed with a plain-thread
//! worker pool over `crossbeam_channel` instead of a per-worker asyncio
//! event loop (the anti-pattern the redesign removes) feeding an
//! `async def _transcribe_buffer`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender};
use log::{error, info, warn};

use crate::audio::frame::AudioFrame;
use crate::audio::task::Task;
use crate::bus::{EventBus, SubscriptionId};
use crate::transcription::backend::SpeechBackend;
use crate::transcription::result::TranscriptionResult;

struct Accumulator {
    buffer: Vec<AudioFrame>,
    non_empty_count: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            non_empty_count: 0,
        }
    }
}

struct FrameSubscription {
    bus: Arc<EventBus<AudioFrame>>,
    topic: String,
    id: SubscriptionId,
}

/// Accumulates frames from one `audio.frame` subscription into fixed-size
/// windows, dispatching each flushed window to a bounded pool of worker
/// threads that call the backend and publish the decorated result.
pub struct TranscriptionConsumer {
    name: String,
    backend: Arc<dyn SpeechBackend>,
    trigger_chunks: usize,
    max_workers: usize,
    per_call_timeout: Duration,
    result_bus: Arc<EventBus<TranscriptionResult>>,
    result_topic: String,

    accum: Mutex<Accumulator>,
    task_tx: Sender<Option<Task>>,
    task_rx: Receiver<Option<Task>>,
    chunk_counter: AtomicU64,
    in_flight: AtomicUsize,
    shutting_down: AtomicBool,

    frame_subscription: Mutex<Option<FrameSubscription>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    done_rx: Mutex<Option<Receiver<()>>>,
    done_tx: Sender<()>,
}

impl TranscriptionConsumer {
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn SpeechBackend>,
        trigger_chunks: usize,
        max_workers: usize,
        queue_capacity: usize,
        per_call_timeout: Duration,
        result_bus: Arc<EventBus<TranscriptionResult>>,
        result_topic: impl Into<String>,
    ) -> Arc<Self> {
        let (task_tx, task_rx) = bounded(queue_capacity.max(1));
        let (done_tx, done_rx) = bounded(max_workers.max(1));
        Arc::new(Self {
            name: name.into(),
            backend,
            trigger_chunks: trigger_chunks.max(1),
            max_workers: max_workers.max(1),
            per_call_timeout,
            result_bus,
            result_topic: result_topic.into(),
            accum: Mutex::new(Accumulator::new()),
            task_tx,
            task_rx,
            chunk_counter: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
            frame_subscription: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            done_rx: Mutex::new(Some(done_rx)),
            done_tx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribes `on_frame` to `frame_topic` and spawns the worker pool.
    /// Call once per consumer lifetime.
    pub fn start(self: &Arc<Self>, frame_bus: Arc<EventBus<AudioFrame>>, frame_topic: &str) {
        let consumer = self.clone();
        let id = frame_bus.subscribe(frame_topic, move |frame: &AudioFrame| {
            consumer.on_frame(frame.clone());
        });
        *self.frame_subscription.lock().unwrap() = Some(FrameSubscription {
            bus: frame_bus,
            topic: frame_topic.to_string(),
            id,
        });

        let mut workers = self.workers.lock().unwrap();
        for worker_idx in 0..self.max_workers {
            let consumer = self.clone();
            workers.push(thread::spawn(move || consumer.worker_loop(worker_idx)));
        }
    }

    /// §4.3 on_frame contract.
    fn on_frame(&self, frame: AudioFrame) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }

        let task = {
            let mut accum = self.accum.lock().unwrap();
            let frame_non_empty = !frame.is_empty();
            let is_final = frame.r#final;
            accum.buffer.push(frame);
            if frame_non_empty {
                accum.non_empty_count += 1;
            }

            let should_flush =
                accum.non_empty_count >= self.trigger_chunks || (is_final && accum.non_empty_count > 0);
            if !should_flush {
                return;
            }

            let frames = std::mem::take(&mut accum.buffer);
            accum.non_empty_count = 0;
            Task::new(frames, is_final)
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        // Blocking send: natural backpressure onto the source thread.
        if self.task_tx.send(Some(task)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            warn!("consumer '{}': task queue closed, dropping flush", self.name);
        }
    }

    fn worker_loop(&self, worker_idx: usize) {
        loop {
            let task = match self.task_rx.recv() {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(_) => break,
            };
            self.process_task(task);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        info!("consumer '{}' worker {} exiting", self.name, worker_idx);
        let _ = self.done_tx.send(());
    }

    fn process_task(&self, task: Task) {
        if task.is_empty() {
            warn!("consumer '{}': skipping flush with empty pcm", self.name);
            return;
        }

        let counter = self.chunk_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let chunk_id = format!(
            "{}.{}-{}.{}{}",
            self.name,
            task.first_frame().chunk_id,
            task.last_frame().chunk_id,
            counter,
            if task.is_final { "-final" } else { "" }
        );

        match self
            .backend
            .transcribe(&chunk_id, &task.pcm_accum, self.per_call_timeout)
        {
            Ok(mut result) => {
                result.audio_start_s = task.first_frame().timestamp_s;
                result.audio_end_s = task.last_frame().end_timestamp_s();
                result.mode = self.name.clone();
                result.is_final = task.is_final;
                result.chunk_id = chunk_id;
                self.result_bus.publish(&self.result_topic, &result);
            }
            Err(err) => {
                error!(
                    "consumer '{}': backend call for chunk '{}' failed: {}",
                    self.name,
                    err.chunk_id(),
                    err
                );
            }
        }
    }

    /// §5 shutdown sequence: stop accepting frames, unsubscribe, drain the
    /// queue with a deadline, post one sentinel per worker, wait for each
    /// worker to signal exit, then clean up the backend.
    ///
    /// Returns `true` iff the queue drained and every worker signalled
    /// completion within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.shutting_down.store(true, Ordering::SeqCst);

        if let Some(sub) = self.frame_subscription.lock().unwrap().take() {
            sub.bus.unsubscribe(&sub.topic, sub.id);
        }

        let deadline = Instant::now() + timeout;
        let mut drained = false;
        loop {
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                drained = true;
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    "consumer '{}': shutdown timed out with {} task(s) still in flight",
                    self.name,
                    self.in_flight.load(Ordering::SeqCst)
                );
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }

        for _ in 0..self.max_workers {
            let _ = self.task_tx.send(None);
        }

        let done_rx = self.done_rx.lock().unwrap().take();
        let mut all_exited = true;
        if let Some(done_rx) = done_rx {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let per_worker = (remaining / self.max_workers as u32).max(Duration::from_millis(100));
            for _ in 0..self.max_workers {
                if done_rx.recv_timeout(per_worker).is_err() {
                    all_exited = false;
                }
            }
        }

        for handle in self.workers.lock().unwrap().drain(..) {
            let _ = handle.join();
        }

        self.backend.cleanup();
        drained && all_exited
    }
}
