//! Task dispatcher and worker pool.
//!
//! This crate provides:
//! - The dispatcher: bounded concurrent claiming against the task backlog
//! - The per-task processing pipeline: fetch, compile, execute, upload
//! - Retry with exponential-backoff re-enqueue
//! - Cancellation propagation into in-flight engine processes
//! - Graceful shutdown

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod processor;
pub mod retry;

pub use config::WorkerConfig;
pub use dispatcher::Dispatcher;
pub use error::{WorkerError, WorkerResult};
pub use logging::TaskLogger;
pub use processor::{run_task, ProcessingContext};
