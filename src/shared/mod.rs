pub mod ids;
pub mod logging;

pub use ids::generate_run_id;
pub use logging::{
    FileLogSink, LogEvent, LogLevel, LogSink, Logger, MemoryLogSink, StderrLogSink,
};
