//! Compiled filter stages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::animation::AnimationExpr;

/// Kind of engine-addressable operation a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Concatenate clips in order
    Concat,
    /// Mix or replace the audio track
    AudioMix,
    /// Draw styled text onto the video
    DrawText,
    /// Burn a subtitle document into the video
    SubtitleBurn,
    /// Composite a second video onto the base
    Overlay,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Concat => "concat",
            StageKind::AudioMix => "audio_mix",
            StageKind::DrawText => "draw_text",
            StageKind::SubtitleBurn => "subtitle_burn",
            StageKind::Overlay => "overlay",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document the stage needs on disk next to the engine invocation,
/// e.g. a rendered subtitle file. The executor materializes it into the
/// task's scratch workspace and substitutes its path into the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Filename within the scratch workspace
    pub filename: String,
    /// Full file contents
    pub contents: String,
}

/// One compiled, engine-addressable operation.
///
/// Stages are produced only by the compiler and are immutable afterwards:
/// all parameters are already resolved, escaped, and encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStage {
    /// What the stage does
    pub kind: StageKind,
    /// Ready-to-embed filter fragment. A simple video-filter chain when
    /// `complex` is false, a labeled filter graph (output `[vout]` and/or
    /// `[aout]`) when true. Empty for Concat and SubtitleBurn, whose
    /// invocations depend on scratch-workspace paths the executor owns.
    pub filter: String,
    /// Whether `filter` is a multi-input labeled graph
    pub complex: bool,
    /// Indices into the task's input references consumed in addition to the
    /// running intermediate (e.g. the overlay track)
    pub extra_inputs: Vec<usize>,
    /// Document to materialize into the scratch workspace
    pub sidecar: Option<Sidecar>,
    /// Compiled time-parameterized expression when the stage is animated
    pub animation: Option<AnimationExpr>,
}

impl FilterStage {
    /// A plain single-input video-filter stage.
    pub fn simple(kind: StageKind, filter: impl Into<String>) -> Self {
        Self {
            kind,
            filter: filter.into(),
            complex: false,
            extra_inputs: Vec::new(),
            sidecar: None,
            animation: None,
        }
    }

    /// A labeled multi-input filter-graph stage.
    pub fn complex(kind: StageKind, filter: impl Into<String>) -> Self {
        Self {
            kind,
            filter: filter.into(),
            complex: true,
            extra_inputs: Vec::new(),
            sidecar: None,
            animation: None,
        }
    }

    pub fn with_extra_inputs(mut self, extra_inputs: Vec<usize>) -> Self {
        self.extra_inputs = extra_inputs;
        self
    }

    pub fn with_sidecar(mut self, filename: impl Into<String>, contents: impl Into<String>) -> Self {
        self.sidecar = Some(Sidecar {
            filename: filename.into(),
            contents: contents.into(),
        });
        self
    }
}
