//! Declarative operation configurations.
//!
//! Each operation type carries only the fields relevant to it; the set is a
//! serde-tagged union so requests stay self-describing on the wire. The
//! shared capability contract (validate, then compile) lives in
//! [`crate::validate`] and the filter compiler crate rather than a trait
//! hierarchy, keeping per-operation logic isolated and independently
//! testable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::animation::AnimationSpec;
use crate::position::Position;
use crate::style::{Background, Border, Shadow, SubtitleStyle, TextStyle};

/// Operation type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Join,
    AudioOverlay,
    TextOverlay,
    Subtitles,
    VideoOverlay,
    Combined,
}

impl OperationKind {
    pub const ALL: &'static [OperationKind] = &[
        OperationKind::Join,
        OperationKind::AudioOverlay,
        OperationKind::TextOverlay,
        OperationKind::Subtitles,
        OperationKind::VideoOverlay,
        OperationKind::Combined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Join => "join",
            OperationKind::AudioOverlay => "audio_overlay",
            OperationKind::TextOverlay => "text_overlay",
            OperationKind::Subtitles => "subtitles",
            OperationKind::VideoOverlay => "video_overlay",
            OperationKind::Combined => "combined",
        }
    }

    /// Minimum number of input references a task of this kind requires.
    pub fn min_inputs(&self) -> usize {
        match self {
            OperationKind::Join => 2,
            // Base media plus the overlaid audio/video track.
            OperationKind::AudioOverlay | OperationKind::VideoOverlay => 2,
            OperationKind::TextOverlay
            | OperationKind::Subtitles
            | OperationKind::Combined => 1,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = OperationKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "join" => Ok(OperationKind::Join),
            "audio_overlay" => Ok(OperationKind::AudioOverlay),
            "text_overlay" => Ok(OperationKind::TextOverlay),
            "subtitles" => Ok(OperationKind::Subtitles),
            "video_overlay" => Ok(OperationKind::VideoOverlay),
            "combined" => Ok(OperationKind::Combined),
            _ => Err(OperationKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown operation kind: {0}")]
pub struct OperationKindParseError(String);

/// Declarative configuration for one media transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationConfig {
    Join(JoinConfig),
    AudioOverlay(AudioOverlayConfig),
    TextOverlay(TextOverlayConfig),
    Subtitles(SubtitlesConfig),
    VideoOverlay(VideoOverlayConfig),
    Combined(CombinedConfig),
}

impl OperationConfig {
    /// The discriminant for this configuration.
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationConfig::Join(_) => OperationKind::Join,
            OperationConfig::AudioOverlay(_) => OperationKind::AudioOverlay,
            OperationConfig::TextOverlay(_) => OperationKind::TextOverlay,
            OperationConfig::Subtitles(_) => OperationKind::Subtitles,
            OperationConfig::VideoOverlay(_) => OperationKind::VideoOverlay,
            OperationConfig::Combined(_) => OperationKind::Combined,
        }
    }
}

/// Concatenate the task's input clips in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct JoinConfig {
    /// Crossfade duration between consecutive clips, in seconds.
    /// None or 0 means a hard cut.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<f64>,
}

/// How an overlaid audio track combines with the original audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioOverlayMode {
    /// Overlay replaces the original track entirely
    Replace,
    /// Overlay is mixed on top of the original track
    #[default]
    Mix,
}

impl AudioOverlayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioOverlayMode::Replace => "replace",
            AudioOverlayMode::Mix => "mix",
        }
    }
}

fn default_volume() -> f64 {
    1.0
}

/// Overlay an audio track onto the base media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioOverlayConfig {
    /// Replace or mix
    #[serde(default)]
    pub mode: AudioOverlayMode,
    /// Gain applied to the overlaid track (0.0-4.0)
    #[serde(default = "default_volume")]
    pub overlay_volume: f64,
    /// Gain applied to the original track when mixing (0.0-4.0)
    #[serde(default = "default_volume")]
    pub original_volume: f64,
    /// Offset into the base timeline where the overlay starts, in seconds
    #[serde(default)]
    pub offset: f64,
}

impl Default for AudioOverlayConfig {
    fn default() -> Self {
        Self {
            mode: AudioOverlayMode::default(),
            overlay_volume: default_volume(),
            original_volume: default_volume(),
            offset: 0.0,
        }
    }
}

/// Draw styled text onto the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextOverlayConfig {
    /// Text to render (1-1000 chars, non-empty after trimming)
    pub text: String,
    /// Placement on the frame
    #[serde(default)]
    pub position: Position,
    /// Font and color
    #[serde(default)]
    pub style: TextStyle,
    /// Filled box behind the text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    /// Outline around the glyphs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    /// Drop shadow behind the glyphs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
    /// Rotation in degrees (-360..=360)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Entrance/exit animation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationSpec>,
}

impl TextOverlayConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: Position::default(),
            style: TextStyle::default(),
            background: None,
            border: None,
            shadow: None,
            rotation: None,
            animation: None,
        }
    }
}

/// One timed subtitle cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleCue {
    /// Cue start time in seconds
    pub start: f64,
    /// Cue end time in seconds (must be > start)
    pub end: f64,
    /// Cue text
    pub text: String,
}

/// Burn timed subtitles into the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitlesConfig {
    /// Ordered cue list
    pub cues: Vec<SubtitleCue>,
    /// Rendering style
    #[serde(default)]
    pub style: SubtitleStyle,
}

/// Shape mask applied to a video overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoOverlayShape {
    #[default]
    Rectangle,
    Circle,
}

impl VideoOverlayShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoOverlayShape::Rectangle => "rectangle",
            VideoOverlayShape::Circle => "circle",
        }
    }
}

/// Composite a second video (picture-in-picture) onto the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoOverlayConfig {
    /// Overlay top-left x on the base frame
    pub x: i32,
    /// Overlay top-left y on the base frame
    pub y: i32,
    /// Overlay width in pixels (> 0)
    pub width: u32,
    /// Overlay height in pixels (> 0)
    pub height: u32,
    /// Shape mask
    #[serde(default)]
    pub shape: VideoOverlayShape,
    /// Outline around the overlay region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    /// Drop shadow behind the overlay region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
}

/// An ordered chain of operations over a shared base input.
///
/// Each entry consumes the visual output of the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CombinedConfig {
    pub operations: Vec<OperationConfig>,
}
