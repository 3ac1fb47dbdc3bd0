use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Width and height of a pixel rectangle (source frame or display surface).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
}

impl PixelSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Scale a normalized detector coordinate into source-frame pixels.
///
/// The horizontal mirror is applied to the normalized `x` before scaling.
#[inline]
pub fn normalized_to_source(p_norm: Point2<f64>, source: PixelSize, mirror: bool) -> Point2<f64> {
    let nx = if mirror { 1.0 - p_norm.x } else { p_norm.x };
    Point2::new(nx * source.width, p_norm.y * source.height)
}

/// "Fill and crop" placement of a source frame on a display surface.
///
/// The source is scaled uniformly so it covers the whole surface, then
/// centered; overflow on the longer axis is cropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    pub scale: f64,
    pub offset: Point2<f64>,
}

impl CoverFit {
    /// Returns `None` when either size is empty or non-finite.
    pub fn new(surface: PixelSize, source: PixelSize) -> Option<Self> {
        if !surface.is_valid() || !source.is_valid() {
            return None;
        }
        let scale = (surface.width / source.width).max(surface.height / source.height);
        let offset = Point2::new(
            (surface.width - source.width * scale) * 0.5,
            (surface.height - source.height * scale) * 0.5,
        );
        Some(Self { scale, offset })
    }

    /// Map a source-pixel point into surface pixels.
    #[inline]
    pub fn map(&self, p_source: Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.offset.x + p_source.x * self.scale,
            self.offset.y + p_source.y * self.scale,
        )
    }
}
