//! Coordinate mapping between display surfaces and normalized image space.
//!
//! Clicks arrive as offsets from the top-left corner of the clickable
//! surface. Two mappings are supported:
//!
//! - **Surface-relative**: the image fills the surface exactly, so a
//!   click maps to `offset / surface_size`.
//! - **Contain fit**: the image is scaled to fit inside the surface
//!   with its aspect ratio preserved and centered, leaving letterbox
//!   padding on one axis (`object-fit: contain`). Clicks map through
//!   the displayed sub-rectangle instead of the raw surface.
//!
//! [`Viewport`] picks the contain fit whenever the image's natural size
//! is known, and is used for both placing new points and drawing
//! existing ones so the two always agree.
//!
//! Degenerate geometry never fails: a surface with a non-positive side
//! maps every click to the image center.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, FitMode, Point, SurfacePos, SurfaceSize, clamp_unit};

/// Normalized coordinate returned for clicks on a degenerate surface.
pub const CENTER: (f64, f64) = (0.5, 0.5);

/// Map a click on a surface to a normalized `(x, y)`, clamped to `[0, 1]`.
///
/// Returns [`CENTER`] when the surface has a non-positive or non-finite
/// side.
#[must_use]
pub fn to_normalized(click: SurfacePos, surface: SurfaceSize) -> (f64, f64) {
    if !surface.is_usable() {
        return CENTER;
    }
    (
        clamp_unit(click.x / surface.width),
        clamp_unit(click.y / surface.height),
    )
}

/// Map a normalized point back to a position on a surface the image fills.
#[must_use]
pub fn to_display(point: &Point, surface: SurfaceSize) -> SurfacePos {
    SurfacePos::new(point.x() * surface.width, point.y() * surface.height)
}

/// The rectangle an image occupies inside its surface under a contain fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainFit {
    /// Uniform scale from natural image pixels to surface units.
    pub scale: f64,
    /// Left padding between the surface edge and the displayed image.
    pub offset_x: f64,
    /// Top padding between the surface edge and the displayed image.
    pub offset_y: f64,
    /// Displayed image width in surface units.
    pub width: f64,
    /// Displayed image height in surface units.
    pub height: f64,
}

impl ContainFit {
    /// Compute the contain fit of an image of `natural` size in `surface`.
    ///
    /// Returns `None` if either the surface or the image is degenerate.
    #[must_use]
    pub fn new(surface: SurfaceSize, natural: Dimensions) -> Option<Self> {
        if !surface.is_usable() || natural.is_degenerate() {
            return None;
        }
        let natural_w = f64::from(natural.width);
        let natural_h = f64::from(natural.height);
        let scale = (surface.width / natural_w).min(surface.height / natural_h);
        let width = natural_w * scale;
        let height = natural_h * scale;
        Some(Self {
            scale,
            offset_x: (surface.width - width) / 2.0,
            offset_y: (surface.height - height) / 2.0,
            width,
            height,
        })
    }

    /// Map a surface click to a normalized coordinate, clamped to `[0, 1]`.
    ///
    /// Clicks in the letterbox padding clamp to the nearest image edge.
    #[must_use]
    pub fn to_normalized(&self, click: SurfacePos) -> (f64, f64) {
        (
            clamp_unit((click.x - self.offset_x) / self.width),
            clamp_unit((click.y - self.offset_y) / self.height),
        )
    }

    /// Map a normalized point to its position on the surface.
    #[must_use]
    pub fn to_display(&self, point: &Point) -> SurfacePos {
        SurfacePos::new(
            point.x().mul_add(self.width, self.offset_x),
            point.y().mul_add(self.height, self.offset_y),
        )
    }
}

/// A display surface together with what is known about the image shown in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current rendered size of the surface.
    pub surface: SurfaceSize,
    /// Natural size of the displayed image, if known.
    pub image: Option<Dimensions>,
    /// How the image is fitted into the surface.
    pub fit: FitMode,
}

impl Viewport {
    /// A viewport where the image fills the surface exactly.
    #[must_use]
    pub const fn stretched(surface: SurfaceSize) -> Self {
        Self {
            surface,
            image: None,
            fit: FitMode::Stretch,
        }
    }

    /// A viewport with a letterboxed image of the given natural size.
    #[must_use]
    pub const fn contain(surface: SurfaceSize, image: Dimensions) -> Self {
        Self {
            surface,
            image: Some(image),
            fit: FitMode::Contain,
        }
    }

    /// The contain fit in effect, or `None` when mapping is surface-relative.
    #[must_use]
    pub fn contain_fit(&self) -> Option<ContainFit> {
        match (self.fit, self.image) {
            (FitMode::Contain, Some(natural)) => ContainFit::new(self.surface, natural),
            _ => None,
        }
    }

    /// Map a click to a normalized coordinate.
    #[must_use]
    pub fn to_normalized(&self, click: SurfacePos) -> (f64, f64) {
        self.contain_fit().map_or_else(
            || to_normalized(click, self.surface),
            |fit| fit.to_normalized(click),
        )
    }

    /// Map a normalized point to its position on the surface.
    #[must_use]
    pub fn to_display(&self, point: &Point) -> SurfacePos {
        self.contain_fit().map_or_else(
            || to_display(point, self.surface),
            |fit| fit.to_display(point),
        )
    }
}
