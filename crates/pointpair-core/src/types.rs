//! Shared types for the pointpair point model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Clamp a coordinate component into the unit interval `[0, 1]`.
///
/// `NaN` maps to `0.0`; infinities map to the nearest bound.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Reasons a string cannot be used as a [`PointId`].
///
/// Each rule is one the text format depends on: an id that breaks any
/// of them would not come back unchanged from a save/load cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPointId {
    /// The id is empty.
    #[error("point id is empty")]
    Empty,

    /// The id contains a line break.
    #[error("point id contains a line break")]
    LineBreak,

    /// The id has leading or trailing whitespace.
    #[error("point id has leading or trailing whitespace")]
    SurroundingWhitespace,

    /// The id starts with `#`, which marks comment lines.
    #[error("point id starts with '#'")]
    CommentPrefix,
}

/// Identifier of a point, unique within its owning store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PointId(String);

impl PointId {
    /// Validate and wrap an id string.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidPointId`] describing the first rule `id` breaks.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidPointId> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidPointId::Empty);
        }
        if id.contains(['\n', '\r']) {
            return Err(InvalidPointId::LineBreak);
        }
        if id.trim() != id {
            return Err(InvalidPointId::SurroundingWhitespace);
        }
        if id.starts_with('#') {
            return Err(InvalidPointId::CommentPrefix);
        }
        Ok(Self(id))
    }

    /// Wrap a string already known to satisfy the id rules.
    pub(crate) const fn from_trusted(id: String) -> Self {
        Self(id)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A compact label for lists and pair displays.
    ///
    /// Generated ids end in a random suffix after the last `_`; that
    /// suffix is the label. Other ids are cut to their first five
    /// characters.
    #[must_use]
    pub fn short_label(&self) -> &str {
        let tail = self
            .0
            .rsplit_once('_')
            .map_or(self.0.as_str(), |(_, tail)| tail);
        let tail = if tail.is_empty() { self.0.as_str() } else { tail };
        tail.char_indices()
            .nth(SHORT_LABEL_LEN)
            .map_or(tail, |(end, _)| &tail[..end])
    }
}

const SHORT_LABEL_LEN: usize = 5;

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PointId {
    type Error = InvalidPointId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PointId {
    type Error = InvalidPointId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PointId> for String {
    fn from(id: PointId) -> Self {
        id.0
    }
}

impl AsRef<str> for PointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An annotated point in normalized image coordinates.
///
/// `x` and `y` are fractions of the image width and height and always
/// lie in `[0, 1]`: every constructor and mutator clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointRecord")]
pub struct Point {
    id: PointId,
    x: f64,
    y: f64,
}

/// Serde proxy for [`Point`] so deserialized values are clamped too.
#[derive(Deserialize)]
struct PointRecord {
    id: PointId,
    x: f64,
    y: f64,
}

impl From<PointRecord> for Point {
    fn from(record: PointRecord) -> Self {
        Self::new(record.id, record.x, record.y)
    }
}

impl Point {
    /// Create a point, clamping both coordinates into `[0, 1]`.
    #[must_use]
    pub fn new(id: PointId, x: f64, y: f64) -> Self {
        Self {
            id,
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// The point's identifier.
    #[must_use]
    pub const fn id(&self) -> &PointId {
        &self.id
    }

    /// Normalized horizontal position (0 = left edge, 1 = right edge).
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Normalized vertical position (0 = top edge, 1 = bottom edge).
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Replace the coordinates, clamping into `[0, 1]`.
    pub(crate) fn set_position(&mut self, x: f64, y: f64) {
        self.x = clamp_unit(x);
        self.y = clamp_unit(y);
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rendered size of a display surface, in the same unit as click offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

impl SurfaceSize {
    /// Create a surface size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` when both sides are finite and strictly positive.
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A position on a display surface, measured from its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePos {
    /// Offset from the left edge.
    pub x: f64,
    /// Offset from the top edge.
    pub y: f64,
}

impl SurfacePos {
    /// Create a surface position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which of the two image slots a point, store, or selection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Image 1.
    First,
    /// Image 2.
    Second,
}

impl Side {
    /// Both sides in display order.
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "Image 1",
            Self::Second => "Image 2",
        }
    }
}

/// How an image is fitted into its display surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Aspect-preserving, letterboxed fit (`object-fit: contain`).
    #[default]
    Contain,
    /// The image is stretched to fill the surface exactly.
    Stretch,
}

/// Editor configuration shared by callers of the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Tag prepended to every generated point id.
    pub id_prefix: String,

    /// How images are fitted into their display surfaces.
    pub fit: FitMode,
}

impl EditorConfig {
    /// Default id prefix.
    pub const DEFAULT_ID_PREFIX: &'static str = "point_";
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            id_prefix: Self::DEFAULT_ID_PREFIX.to_owned(),
            fit: FitMode::default(),
        }
    }
}
