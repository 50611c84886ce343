//! Filter compiler for the Mixcut backend.
//!
//! Converts a validated [`mixcut_models::OperationConfig`] into a flat,
//! ordered list of [`FilterStage`] values the engine boundary can execute:
//! position formulas, escaped text, encoded colors, and time-parameterized
//! animation expressions. Everything in this crate is a pure function of
//! its input.

pub mod animation;
pub mod ass;
pub mod color;
pub mod compile;
pub mod escape;
pub mod position;
pub mod stage;

pub use animation::{AnimatedParam, AnimationExpr};
pub use color::{decode_ass_color, drawtext_color, encode_ass_color};
pub use compile::{compile, FrameSpec};
pub use escape::{escape_filter_path, escape_filter_text};
pub use position::{estimate_text_size, resolve_position};
pub use stage::{FilterStage, Sidecar, StageKind};
