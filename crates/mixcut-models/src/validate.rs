//! Request validation.
//!
//! Bounds-checks and normalizes a raw [`OperationConfig`] before a task is
//! created. Validation is pure and fail-fast: the first violated constraint
//! rejects the whole request, and the error names the constraint.

use thiserror::Error;

use crate::animation::AnimationSpec;
use crate::config::{
    AudioOverlayConfig, CombinedConfig, JoinConfig, OperationConfig, OperationKind,
    SubtitlesConfig, TextOverlayConfig, VideoOverlayConfig,
};
use crate::style::{Background, Border, Shadow, SubtitleStyle, TextStyle};

/// Maximum overlay text length in characters.
pub const MAX_TEXT_LEN: usize = 1000;
/// Allowed font size range in points.
pub const FONT_SIZE_RANGE: (u32, u32) = (8, 200);
/// Allowed rotation range in degrees.
pub const ROTATION_RANGE: (f64, f64) = (-360.0, 360.0);
/// Allowed shadow offset range in pixels.
pub const SHADOW_OFFSET_RANGE: (i32, i32) = (-50, 50);
/// Maximum shadow blur radius.
pub const MAX_BLUR: u32 = 20;
/// Maximum volume gain.
pub const MAX_VOLUME: f64 = 4.0;

/// A rejected configuration, naming the violated constraint.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("text must be non-empty after trimming")]
    EmptyText,

    #[error("text length {0} exceeds maximum of {MAX_TEXT_LEN}")]
    TextTooLong(usize),

    #[error("font size {0} outside allowed range 8-200")]
    FontSizeOutOfRange(u32),

    #[error("{field} alpha {value} outside allowed range 0.0-1.0")]
    AlphaOutOfRange { field: &'static str, value: f64 },

    #[error("rotation {0} outside allowed range -360..360 degrees")]
    RotationOutOfRange(f64),

    #[error("shadow offset ({x}, {y}) outside allowed range -50..50")]
    ShadowOffsetOutOfRange { x: i32, y: i32 },

    #[error("shadow blur {0} exceeds maximum of {MAX_BLUR}")]
    BlurOutOfRange(u32),

    #[error("{field} color '{value}' is not a 6-hex-digit RGB string")]
    InvalidColor { field: &'static str, value: String },

    #[error("{field} volume {value} outside allowed range 0.0-4.0")]
    VolumeOutOfRange { field: &'static str, value: f64 },

    #[error("audio offset {0} must be non-negative")]
    NegativeOffset(f64),

    #[error("subtitle cue list must not be empty")]
    NoCues,

    #[error("subtitle cue {index} has empty text")]
    EmptyCueText { index: usize },

    #[error("subtitle cue {index} window invalid: start {start} must be before end {end}")]
    InvalidCueWindow { index: usize, start: f64, end: f64 },

    #[error("overlay dimensions {width}x{height} must be non-zero")]
    ZeroOverlayDimension { width: u32, height: u32 },

    #[error("join transition {0} must be non-negative")]
    NegativeTransition(f64),

    #[error("animation duration {0} must be positive")]
    NonPositiveAnimationDuration(f64),

    #[error("animation delay {0} must be non-negative")]
    NegativeAnimationDelay(f64),

    #[error("combined operation requires at least one sub-operation")]
    EmptyCombined,

    #[error("combined operations cannot be nested")]
    NestedCombined,

    #[error("sub-operation {index} invalid: {source}")]
    InvalidSubOperation {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("{kind} requires at least {required} input(s), got {given}")]
    NotEnoughInputs {
        kind: OperationKind,
        required: usize,
        given: usize,
    },
}

impl OperationConfig {
    /// Validate and normalize the configuration.
    ///
    /// Returns the normalized config (trimmed text, lowercased hex colors)
    /// or the first violated constraint.
    pub fn validate(self) -> Result<OperationConfig, ValidationError> {
        match self {
            OperationConfig::Join(c) => c.validate().map(OperationConfig::Join),
            OperationConfig::AudioOverlay(c) => c.validate().map(OperationConfig::AudioOverlay),
            OperationConfig::TextOverlay(c) => c.validate().map(OperationConfig::TextOverlay),
            OperationConfig::Subtitles(c) => c.validate().map(OperationConfig::Subtitles),
            OperationConfig::VideoOverlay(c) => c.validate().map(OperationConfig::VideoOverlay),
            OperationConfig::Combined(c) => c.validate().map(OperationConfig::Combined),
        }
    }
}

/// Check a 6-hex-digit RGB string (no leading '#').
fn check_color(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(value.to_ascii_lowercase())
    } else {
        Err(ValidationError::InvalidColor {
            field,
            value: value.to_string(),
        })
    }
}

fn check_alpha(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::AlphaOutOfRange { field, value })
    }
}

fn check_font_size(size: u32) -> Result<(), ValidationError> {
    if (FONT_SIZE_RANGE.0..=FONT_SIZE_RANGE.1).contains(&size) {
        Ok(())
    } else {
        Err(ValidationError::FontSizeOutOfRange(size))
    }
}

impl TextStyle {
    fn validate(mut self) -> Result<Self, ValidationError> {
        check_font_size(self.font_size)?;
        check_alpha("text", self.alpha)?;
        self.color = check_color("text", &self.color)?;
        Ok(self)
    }
}

impl Background {
    fn validate(mut self) -> Result<Self, ValidationError> {
        check_alpha("background", self.alpha)?;
        self.color = check_color("background", &self.color)?;
        Ok(self)
    }
}

impl Border {
    fn validate(mut self) -> Result<Self, ValidationError> {
        self.color = check_color("border", &self.color)?;
        Ok(self)
    }
}

impl Shadow {
    fn validate(mut self) -> Result<Self, ValidationError> {
        let (lo, hi) = SHADOW_OFFSET_RANGE;
        if !(lo..=hi).contains(&self.offset_x) || !(lo..=hi).contains(&self.offset_y) {
            return Err(ValidationError::ShadowOffsetOutOfRange {
                x: self.offset_x,
                y: self.offset_y,
            });
        }
        if self.blur > MAX_BLUR {
            return Err(ValidationError::BlurOutOfRange(self.blur));
        }
        check_alpha("shadow", self.alpha)?;
        self.color = check_color("shadow", &self.color)?;
        Ok(self)
    }
}

impl SubtitleStyle {
    fn validate(mut self) -> Result<Self, ValidationError> {
        check_font_size(self.font_size)?;
        check_alpha("subtitle", self.alpha)?;
        self.color = check_color("subtitle", &self.color)?;
        self.outline_color = check_color("outline", &self.outline_color)?;
        Ok(self)
    }
}

impl AnimationSpec {
    fn validate(self) -> Result<Self, ValidationError> {
        if self.duration <= 0.0 {
            return Err(ValidationError::NonPositiveAnimationDuration(self.duration));
        }
        if self.delay < 0.0 {
            return Err(ValidationError::NegativeAnimationDelay(self.delay));
        }
        Ok(self)
    }
}

impl JoinConfig {
    fn validate(self) -> Result<Self, ValidationError> {
        if let Some(t) = self.transition {
            if t < 0.0 {
                return Err(ValidationError::NegativeTransition(t));
            }
        }
        Ok(self)
    }
}

fn check_volume(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=MAX_VOLUME).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::VolumeOutOfRange { field, value })
    }
}

impl AudioOverlayConfig {
    fn validate(self) -> Result<Self, ValidationError> {
        check_volume("overlay", self.overlay_volume)?;
        check_volume("original", self.original_volume)?;
        if self.offset < 0.0 {
            return Err(ValidationError::NegativeOffset(self.offset));
        }
        Ok(self)
    }
}

impl TextOverlayConfig {
    fn validate(mut self) -> Result<Self, ValidationError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if trimmed.chars().count() > MAX_TEXT_LEN {
            return Err(ValidationError::TextTooLong(trimmed.chars().count()));
        }
        self.text = trimmed.to_string();

        self.style = self.style.validate()?;
        if let Some(bg) = self.background.take() {
            self.background = Some(bg.validate()?);
        }
        if let Some(border) = self.border.take() {
            self.border = Some(border.validate()?);
        }
        if let Some(shadow) = self.shadow.take() {
            self.shadow = Some(shadow.validate()?);
        }
        if let Some(rotation) = self.rotation {
            if !(ROTATION_RANGE.0..=ROTATION_RANGE.1).contains(&rotation) {
                return Err(ValidationError::RotationOutOfRange(rotation));
            }
        }
        if let Some(anim) = self.animation.take() {
            self.animation = Some(anim.validate()?);
        }
        Ok(self)
    }
}

impl SubtitlesConfig {
    fn validate(mut self) -> Result<Self, ValidationError> {
        if self.cues.is_empty() {
            return Err(ValidationError::NoCues);
        }
        for (index, cue) in self.cues.iter_mut().enumerate() {
            let trimmed = cue.text.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyCueText { index });
            }
            cue.text = trimmed.to_string();
            if cue.start < 0.0 || cue.end <= cue.start {
                return Err(ValidationError::InvalidCueWindow {
                    index,
                    start: cue.start,
                    end: cue.end,
                });
            }
        }
        self.style = self.style.validate()?;
        Ok(self)
    }
}

impl VideoOverlayConfig {
    fn validate(mut self) -> Result<Self, ValidationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::ZeroOverlayDimension {
                width: self.width,
                height: self.height,
            });
        }
        if let Some(border) = self.border.take() {
            self.border = Some(border.validate()?);
        }
        if let Some(shadow) = self.shadow.take() {
            self.shadow = Some(shadow.validate()?);
        }
        Ok(self)
    }
}

impl CombinedConfig {
    fn validate(self) -> Result<Self, ValidationError> {
        if self.operations.is_empty() {
            return Err(ValidationError::EmptyCombined);
        }
        let mut validated = Vec::with_capacity(self.operations.len());
        for (index, op) in self.operations.into_iter().enumerate() {
            if matches!(op, OperationConfig::Combined(_)) {
                return Err(ValidationError::NestedCombined);
            }
            let op = op
                .validate()
                .map_err(|source| ValidationError::InvalidSubOperation {
                    index,
                    source: Box::new(source),
                })?;
            validated.push(op);
        }
        Ok(Self {
            operations: validated,
        })
    }
}
