//! Product silhouette, background and alignment anchors.

use serde::{Deserialize, Serialize};

/// The product being designed on. Read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Width of the editable area in pixels.
    pub editable_width: f64,
    /// Height of the editable area in pixels.
    pub editable_height: f64,
    /// Offset of the editable area from the top of the silhouette.
    #[serde(default)]
    pub editable_top: f64,
    /// Offset of the editable area from the left of the silhouette.
    #[serde(default)]
    pub editable_left: f64,
}

impl Product {
    /// A product whose editable area has the given size.
    #[must_use]
    pub const fn new(editable_width: f64, editable_height: f64) -> Self {
        Self {
            editable_width,
            editable_height,
            editable_top: 0.0,
            editable_left: 0.0,
        }
    }
}

impl Default for Product {
    fn default() -> Self {
        Self::new(400.0, 500.0)
    }
}

/// Background image stretched over the editable area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    /// Image asset reference.
    pub url: String,
}

impl Background {
    /// Create a background from an asset reference.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Horizontal placement derived from an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalEdge {
    /// Against the left edge.
    Left,
    /// Centered.
    Center,
    /// Against the right edge.
    Right,
}

/// Vertical placement derived from an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalEdge {
    /// Against the top edge.
    Top,
    /// Centered.
    Middle,
    /// Against the bottom edge.
    Bottom,
}

/// One of the nine named alignment targets within the editable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Top-left corner.
    TopLeft,
    /// Top edge, horizontally centered.
    Top,
    /// Top-right corner.
    TopRight,
    /// Left edge, vertically centered.
    Left,
    /// Exact middle.
    Center,
    /// Right edge, vertically centered.
    Right,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom edge, horizontally centered.
    Bottom,
    /// Bottom-right corner.
    BottomRight,
}

impl Anchor {
    /// All anchors, row by row.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Left,
        Self::Center,
        Self::Right,
        Self::BottomLeft,
        Self::Bottom,
        Self::BottomRight,
    ];

    /// Horizontal component of the anchor.
    #[must_use]
    pub const fn horizontal(self) -> HorizontalEdge {
        match self {
            Self::TopLeft | Self::Left | Self::BottomLeft => HorizontalEdge::Left,
            Self::TopRight | Self::Right | Self::BottomRight => HorizontalEdge::Right,
            Self::Top | Self::Center | Self::Bottom => HorizontalEdge::Center,
        }
    }

    /// Vertical component of the anchor.
    #[must_use]
    pub const fn vertical(self) -> VerticalEdge {
        match self {
            Self::TopLeft | Self::Top | Self::TopRight => VerticalEdge::Top,
            Self::BottomLeft | Self::Bottom | Self::BottomRight => VerticalEdge::Bottom,
            Self::Left | Self::Center | Self::Right => VerticalEdge::Middle,
        }
    }

    /// The kebab-case name used by hosts and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::Top => "top",
            Self::TopRight => "top-right",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::BottomLeft => "bottom-left",
            Self::Bottom => "bottom",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown anchor name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown anchor: {0}")]
pub struct ParseAnchorError(String);

impl std::str::FromStr for Anchor {
    type Err = ParseAnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.as_str() == name)
            .ok_or_else(|| ParseAnchorError(s.to_string()))
    }
}
