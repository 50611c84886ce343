//! Engine boundary for the Mixcut backend.
//!
//! This crate owns every interaction with the external transcoding engine:
//! - FFmpeg command building and process running with progress, timeout,
//!   and cancellation
//! - ffprobe media inspection
//! - stage execution behind the [`StageEngine`] trait seam
//! - per-task scratch workspace management

pub mod command;
pub mod engine;
pub mod error;
pub mod probe;
pub mod progress;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, ProgressCallback, StageContext, StageEngine};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use progress::EngineProgress;
pub use workspace::{sweep_orphaned, ScratchWorkspace};
