//! Overlay positioning: absolute coordinates or named relative anchors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the nine named relative screen positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    /// All nine anchors.
    pub const ALL: &'static [Anchor] = &[
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::CenterLeft,
        Anchor::Center,
        Anchor::CenterRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::TopLeft => "top_left",
            Anchor::TopCenter => "top_center",
            Anchor::TopRight => "top_right",
            Anchor::CenterLeft => "center_left",
            Anchor::Center => "center",
            Anchor::CenterRight => "center_right",
            Anchor::BottomLeft => "bottom_left",
            Anchor::BottomCenter => "bottom_center",
            Anchor::BottomRight => "bottom_right",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = AnchorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both snake_case and kebab-case spellings.
        match s.to_lowercase().replace('-', "_").as_str() {
            "top_left" => Ok(Anchor::TopLeft),
            "top_center" => Ok(Anchor::TopCenter),
            "top_right" => Ok(Anchor::TopRight),
            "center_left" => Ok(Anchor::CenterLeft),
            "center" => Ok(Anchor::Center),
            "center_right" => Ok(Anchor::CenterRight),
            "bottom_left" => Ok(Anchor::BottomLeft),
            "bottom_center" => Ok(Anchor::BottomCenter),
            "bottom_right" => Ok(Anchor::BottomRight),
            _ => Err(AnchorParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown anchor: {0}")]
pub struct AnchorParseError(String);

/// Where an overlay element is placed on the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Position {
    /// Explicit top-left coordinates in pixels.
    Absolute { x: i32, y: i32 },
    /// Named anchor plus margins from the nearest frame edges.
    Relative {
        anchor: Anchor,
        #[serde(default)]
        margin_x: i32,
        #[serde(default)]
        margin_y: i32,
    },
}

impl Default for Position {
    fn default() -> Self {
        Position::Relative {
            anchor: Anchor::Center,
            margin_x: 0,
            margin_y: 0,
        }
    }
}

impl Position {
    /// Shorthand for an absolute position.
    pub fn absolute(x: i32, y: i32) -> Self {
        Position::Absolute { x, y }
    }

    /// Shorthand for an anchored position with margins.
    pub fn anchored(anchor: Anchor, margin_x: i32, margin_y: i32) -> Self {
        Position::Relative {
            anchor,
            margin_x,
            margin_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_parse() {
        assert_eq!("center".parse::<Anchor>().unwrap(), Anchor::Center);
        assert_eq!("top-left".parse::<Anchor>().unwrap(), Anchor::TopLeft);
        assert_eq!(
            "BOTTOM_RIGHT".parse::<Anchor>().unwrap(),
            Anchor::BottomRight
        );
        assert!("middle".parse::<Anchor>().is_err());
    }

    #[test]
    fn test_anchor_roundtrip() {
        for anchor in Anchor::ALL {
            assert_eq!(anchor.as_str().parse::<Anchor>().unwrap(), *anchor);
        }
    }

    #[test]
    fn test_position_serde() {
        let pos = Position::anchored(Anchor::BottomCenter, 10, 20);
        let json = serde_json::to_string(&pos).unwrap();
        assert!(json.contains("\"mode\":\"relative\""));
        assert!(json.contains("bottom_center"));
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pos);
    }
}
