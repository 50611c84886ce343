//! Shared data models for the Mixcut backend.
//!
//! This crate provides Serde-serializable types for:
//! - Task records and the lifecycle state machine
//! - Declarative operation configurations (tagged union)
//! - Overlay positioning, styling, and animation specs
//! - Request validation
//! - Encoding configuration
//! - Operation log entries

pub mod animation;
pub mod config;
pub mod encoding;
pub mod log;
pub mod position;
pub mod style;
pub mod task;
pub mod validate;

// Re-export common types
pub use animation::{AnimationKind, AnimationSpec};
pub use config::{
    AudioOverlayConfig, AudioOverlayMode, CombinedConfig, JoinConfig, OperationConfig,
    OperationKind, SubtitleCue, SubtitlesConfig, TextOverlayConfig, VideoOverlayConfig,
    VideoOverlayShape,
};
pub use encoding::EncodingConfig;
pub use log::OperationLogEntry;
pub use position::{Anchor, Position};
pub use style::{Background, Border, FontWeight, Shadow, SubtitleStyle, TextStyle};
pub use task::{Task, TaskId, TaskSnapshot, TaskState};
pub use validate::ValidationError;
