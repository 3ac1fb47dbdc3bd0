//! Paper drum: fingertip over a printed sheet to drum pad hits.
//!
//! This crate wires the geometry of `paper-drum-core` and the trigger engine
//! of `paper-drum-pads` into one per-frame pipeline:
//!
//! 1. scale the detector's normalized fingertip to source pixels (mirroring
//!    first if configured),
//! 2. cover-fit it onto the display surface,
//! 3. map it into sheet units with the calibration homography, or a linear
//!    rescale while uncalibrated,
//! 4. feed the sheet position to the trigger engine.
//!
//! Calibration resolves the four sheet corners from raw corner candidates
//! and replaces the display-to-sheet transform as a whole.
//!
//! ## Quickstart
//!
//! ```
//! use nalgebra::Point2;
//! use paper_drum::{FrameInput, PadSessionConfig};
//! use paper_drum::core::PixelSize;
//!
//! let mut session = PadSessionConfig::default().build_session().unwrap();
//! let source = PixelSize::new(640.0, 480.0);
//! let out = session.process_frame(&FrameInput {
//!     t_ms: 0.0,
//!     source,
//!     tip: Some(Point2::new(0.5, 0.5)),
//! });
//! assert!(out.cursor.is_some());
//! assert!(out.triggers.is_empty());
//! ```
//!
//! ## API map
//! - `paper_drum::core`: cover-fit, homography, corner resolution, logging.
//! - `paper_drum::pads`: zones, trigger parameters and the trigger engine.
//! - [`PadSession`]: the frame pipeline and calibration state.
//! - [`PadSessionConfig`], [`ReplayTrace`], [`replay`]: JSON IO and replay.

mod calibration;
mod io;
mod session;

pub use paper_drum_core as core;
pub use paper_drum_pads as pads;

pub use calibration::{CalibrationError, SheetCalibration};
pub use io::{
    replay, CalibrationOutcome, PadConfigError, PadIoError, PadSessionConfig, ReplayReport,
    ReplayTrace, TraceEvent,
};
pub use session::{FrameInput, FrameOutput, PadSession, SessionParams};

pub use paper_drum_pads::{TriggerEvent, Zone};
