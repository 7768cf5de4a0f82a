pub mod aggregator;
pub mod backend;
pub mod consumer;
pub mod result;

pub use aggregator::{MemoryWriter, ResultAggregator, Stdout, SummaryWriter};
pub use backend::{BackendError, NullBackend, SpeechBackend};
pub use consumer::TranscriptionConsumer;
pub use result::{TranscriptionResult, NO_SPEECH_DETECTED};
