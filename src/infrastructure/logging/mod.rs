//! Leveled, multi-sink structured logging for application audit trails.
//!
//! Internal diagnostics use `tracing`; this logger is for events the
//! application wants persisted (API calls, business and security events).

pub mod entry;
pub mod logger;
pub mod sinks;

pub use entry::{ErrorInfo, LogContext, LogEntry, LogLevel, log_context};
pub use logger::{LoggerConfig, RemoteSinkConfig, RequestLogger, StructuredLogger};
pub use sinks::{ConsoleSink, FileSink, LogSink, RemoteSink};
