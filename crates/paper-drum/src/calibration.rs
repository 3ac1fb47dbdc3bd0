use nalgebra::Point2;
use paper_drum_core::{
    sheet_homography, CornerResolveError, CoverFit, Homography, PixelSize, SheetCorners,
    SheetSpec,
};
use serde::Serialize;

/// Errors returned by [`crate::PadSession::calibrate`].
///
/// Every variant leaves the previous calibration in place.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("calibration unavailable: {0}")]
    Corners(#[from] CornerResolveError),
    #[error("invalid frame geometry (surface {surface:?}, source {source_size:?})")]
    InvalidGeometry {
        surface: PixelSize,
        source_size: PixelSize,
    },
    #[error("calibration unavailable: sheet corners are degenerate")]
    DegenerateCorners,
}

/// Perspective calibration of the display surface against the sheet.
///
/// The resolved corners are kept in normalized source coordinates (mirror
/// already applied), so the display-to-sheet transform can be re-derived
/// whenever the display or the source resolution changes. A calibration is
/// immutable; changes produce a new value that replaces the old one whole.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetCalibration {
    pub(crate) corners_norm: SheetCorners,
    pub(crate) display_corners: SheetCorners,
    pub(crate) surface: PixelSize,
    pub(crate) source: PixelSize,
    pub(crate) h_sheet_from_display: Homography,
}

impl SheetCalibration {
    /// Build the calibration for a given display surface and source frame.
    pub fn derive(
        corners_norm: SheetCorners,
        surface: PixelSize,
        source: PixelSize,
        sheet: &SheetSpec,
    ) -> Result<Self, CalibrationError> {
        let fit = CoverFit::new(surface, source)
            .ok_or(CalibrationError::InvalidGeometry {
                surface,
                source_size: source,
            })?;
        let display_corners = corners_norm
            .map(|p| fit.map(Point2::new(p.x * source.width, p.y * source.height)));
        let h_sheet_from_display = sheet_homography(&display_corners, sheet)
            .ok_or(CalibrationError::DegenerateCorners)?;
        Ok(Self {
            corners_norm,
            display_corners,
            surface,
            source,
            h_sheet_from_display,
        })
    }

    /// Same corners, re-derived for another surface/source pair.
    pub fn rederive(
        &self,
        surface: PixelSize,
        source: PixelSize,
        sheet: &SheetSpec,
    ) -> Result<Self, CalibrationError> {
        Self::derive(self.corners_norm, surface, source, sheet)
    }

    /// True if this calibration was derived for exactly these sizes.
    #[inline]
    pub fn matches(&self, surface: PixelSize, source: PixelSize) -> bool {
        self.surface == surface && self.source == source
    }

    #[inline]
    pub fn homography(&self) -> &Homography {
        &self.h_sheet_from_display
    }

    /// Sheet corners on the display surface, TL/TR/BR/BL.
    #[inline]
    pub fn display_corners(&self) -> &SheetCorners {
        &self.display_corners
    }

    /// Sheet corners in normalized source coordinates.
    #[inline]
    pub fn corners_normalized(&self) -> &SheetCorners {
        &self.corners_norm
    }

    #[inline]
    pub fn surface(&self) -> PixelSize {
        self.surface
    }

    #[inline]
    pub fn source(&self) -> PixelSize {
        self.source
    }
}
