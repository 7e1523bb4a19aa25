pub mod job;
pub mod manager;

pub use job::{Job, Pipe, PipeStage, Transform};
pub use manager::{Call, Executor, LocalExecutor, RecordingExecutor};
