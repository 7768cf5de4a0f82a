pub mod buffer;
pub mod clock;
pub mod frame;
pub mod source;
pub mod task;

pub use buffer::{BufferStats, RollingAudioBuffer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use frame::AudioFrame;
pub use source::{spawn_source, FrameSource, SyntheticFrameSource};
pub use task::Task;
