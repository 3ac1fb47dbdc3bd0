//! Geometry core for the `paper-drum` workspace.
//!
//! This crate is purely geometric. It knows nothing about cameras, fingertip
//! detectors or audio; it maps points between the source frame, the display
//! surface and the canonical sheet, and it resolves four sheet corners from a
//! set of noisy corner candidates.

mod corners;
mod cover_fit;
mod homography;
mod logger;
mod sheet;

pub use corners::{resolve_sheet_corners, CornerCandidate, CornerResolveError, CornerResolveParams};
pub use cover_fit::{normalized_to_source, CoverFit, PixelSize};
pub use homography::{
    homography_from_4pt, map_display_to_sheet, sheet_homography, Homography, HOMOGENEOUS_EPS,
};
pub use sheet::{SheetCorners, SheetSpec};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
