//! Style blocks for text, subtitle, and video overlays.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    48
}

fn default_white() -> String {
    "ffffff".to_string()
}

fn default_black() -> String {
    "000000".to_string()
}

fn default_alpha() -> f64 {
    1.0
}

fn default_border_width() -> u32 {
    2
}

/// Font weight for rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }

    /// Whether the subtitle renderer should set its bold flag.
    pub fn is_bold(&self) -> bool {
        matches!(self, FontWeight::Bold)
    }
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Text rendering style for text overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextStyle {
    /// Font family name
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in points (8-200)
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Font weight
    #[serde(default)]
    pub weight: FontWeight,
    /// Text color as 6 hex digits (no leading '#')
    #[serde(default = "default_white")]
    pub color: String,
    /// Opacity, 0.0 (invisible) to 1.0 (opaque)
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            weight: FontWeight::default(),
            color: default_white(),
            alpha: default_alpha(),
        }
    }
}

/// Filled box drawn behind overlay text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Background {
    /// Box color as 6 hex digits
    #[serde(default = "default_black")]
    pub color: String,
    /// Box opacity, 0.0-1.0
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Padding around the text in pixels
    #[serde(default)]
    pub padding: u32,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            color: default_black(),
            alpha: default_alpha(),
            padding: 0,
        }
    }
}

/// Outline drawn around overlay text or an overlay region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Border {
    /// Border color as 6 hex digits
    #[serde(default = "default_black")]
    pub color: String,
    /// Border width in pixels
    #[serde(default = "default_border_width")]
    pub width: u32,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            color: default_black(),
            width: default_border_width(),
        }
    }
}

/// Drop shadow behind overlay text or an overlay region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Shadow {
    /// Shadow color as 6 hex digits
    #[serde(default = "default_black")]
    pub color: String,
    /// Horizontal offset in pixels (-50..=50)
    #[serde(default)]
    pub offset_x: i32,
    /// Vertical offset in pixels (-50..=50)
    #[serde(default)]
    pub offset_y: i32,
    /// Blur radius (0..=20); applies to region shadows
    #[serde(default)]
    pub blur: u32,
    /// Shadow opacity, 0.0-1.0
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: default_black(),
            offset_x: 2,
            offset_y: 2,
            blur: 0,
            alpha: default_alpha(),
        }
    }
}

/// Style block for burned-in subtitles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleStyle {
    /// Font family name
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in points (8-200)
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Font weight
    #[serde(default)]
    pub weight: FontWeight,
    /// Primary text color as 6 hex digits
    #[serde(default = "default_white")]
    pub color: String,
    /// Text opacity, 0.0-1.0
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Outline color as 6 hex digits
    #[serde(default = "default_black")]
    pub outline_color: String,
    /// Outline thickness in pixels
    #[serde(default = "default_border_width")]
    pub outline_width: u32,
    /// Distance from the bottom frame edge in pixels
    #[serde(default = "default_subtitle_margin")]
    pub margin_bottom: u32,
}

fn default_subtitle_margin() -> u32 {
    40
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            weight: FontWeight::default(),
            color: default_white(),
            alpha: default_alpha(),
            outline_color: default_black(),
            outline_width: default_border_width(),
            margin_bottom: default_subtitle_margin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_style_defaults() {
        let style = TextStyle::default();
        assert_eq!(style.font_family, "Arial");
        assert_eq!(style.font_size, 48);
        assert_eq!(style.color, "ffffff");
        assert!((style.alpha - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let style: TextStyle = serde_json::from_str(r#"{"font_size": 72}"#).unwrap();
        assert_eq!(style.font_size, 72);
        assert_eq!(style.font_family, "Arial");
        assert_eq!(style.weight, FontWeight::Normal);
    }

    #[test]
    fn test_font_weight_bold() {
        assert!(FontWeight::Bold.is_bold());
        assert!(!FontWeight::Normal.is_bold());
    }
}
