use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Canonical sheet rectangle `[0, width] x [0, height]`, origin top-left.
///
/// Zone geometry and hit-testing live in these units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetSpec {
    pub width: f64,
    pub height: f64,
}

impl Default for SheetSpec {
    fn default() -> Self {
        Self {
            width: 384.0,
            height: 288.0,
        }
    }
}

impl SheetSpec {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Sheet corners in TL, TR, BR, BL order.
    pub fn corners(&self) -> SheetCorners {
        SheetCorners {
            top_left: Point2::new(0.0, 0.0),
            top_right: Point2::new(self.width, 0.0),
            bottom_right: Point2::new(self.width, self.height),
            bottom_left: Point2::new(0.0, self.height),
        }
    }
}

/// Four corners of a quadrilateral with fixed roles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetCorners {
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub bottom_right: Point2<f64>,
    pub bottom_left: Point2<f64>,
}

impl SheetCorners {
    /// Corners as `[TL, TR, BR, BL]`.
    #[inline]
    pub fn to_array(&self) -> [Point2<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    #[inline]
    pub fn from_array(pts: [Point2<f64>; 4]) -> Self {
        Self {
            top_left: pts[0],
            top_right: pts[1],
            bottom_right: pts[2],
            bottom_left: pts[3],
        }
    }

    /// Apply `f` to every corner, keeping roles.
    pub fn map(&self, f: impl Fn(Point2<f64>) -> Point2<f64>) -> Self {
        Self::from_array(self.to_array().map(f))
    }
}
