//! Animation specifications for overlay elements.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of overlay animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    /// Opacity ramps 0 -> 1 over the duration
    FadeIn,
    /// Opacity ramps 1 -> 0 over the duration
    FadeOut,
    /// Fade in over the first half, out over the second
    Fade,
    /// Element slides in from the right edge toward its target
    SlideLeft,
    /// Element slides in from the left edge toward its target
    SlideRight,
    /// Element slides in from the bottom edge toward its target
    SlideUp,
    /// Element slides in from the top edge toward its target
    SlideDown,
    /// Scale ramps 0 -> 1 over the duration
    ZoomIn,
    /// Scale ramps 1 -> 0 over the duration
    ZoomOut,
}

impl AnimationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationKind::FadeIn => "fade_in",
            AnimationKind::FadeOut => "fade_out",
            AnimationKind::Fade => "fade",
            AnimationKind::SlideLeft => "slide_left",
            AnimationKind::SlideRight => "slide_right",
            AnimationKind::SlideUp => "slide_up",
            AnimationKind::SlideDown => "slide_down",
            AnimationKind::ZoomIn => "zoom_in",
            AnimationKind::ZoomOut => "zoom_out",
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnimationKind {
    type Err = AnimationKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fade_in" => Ok(AnimationKind::FadeIn),
            "fade_out" => Ok(AnimationKind::FadeOut),
            "fade" => Ok(AnimationKind::Fade),
            "slide_left" => Ok(AnimationKind::SlideLeft),
            "slide_right" => Ok(AnimationKind::SlideRight),
            "slide_up" => Ok(AnimationKind::SlideUp),
            "slide_down" => Ok(AnimationKind::SlideDown),
            "zoom_in" => Ok(AnimationKind::ZoomIn),
            "zoom_out" => Ok(AnimationKind::ZoomOut),
            _ => Err(AnimationKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown animation kind: {0}")]
pub struct AnimationKindParseError(String);

/// A time-bounded animation applied to an overlay element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnimationSpec {
    /// Animation kind
    pub kind: AnimationKind,
    /// Animation duration in seconds (must be > 0)
    pub duration: f64,
    /// Delay before the animation starts, in seconds
    #[serde(default)]
    pub delay: f64,
}

impl AnimationSpec {
    pub fn new(kind: AnimationKind, duration: f64) -> Self {
        Self {
            kind,
            duration,
            delay: 0.0,
        }
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
}
