//! JSON configuration, replay traces and replay reports.

use crate::{CalibrationError, FrameInput, PadSession, SessionParams};
use nalgebra::Point2;
use paper_drum_core::{CornerCandidate, CornerResolveParams, PixelSize, SheetSpec};
use paper_drum_pads::{
    TriggerEngine, TriggerEvent, TriggerParams, TriggerParamsError, Zone, ZoneLayout,
    ZoneLayoutError,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum PadIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum PadConfigError {
    #[error(transparent)]
    Zones(#[from] ZoneLayoutError),
    #[error(transparent)]
    Trigger(#[from] TriggerParamsError),
    #[error("invalid sheet size {width} x {height}")]
    InvalidSheet { width: f64, height: f64 },
    #[error("invalid display surface size {width} x {height}")]
    InvalidSurface { width: f64, height: f64 },
    #[error("corner candidate cap must be at least 4 (got {0})")]
    InvalidCornerCap(usize),
}

fn default_surface() -> PixelSize {
    PixelSize::new(1280.0, 720.0)
}

/// Everything needed to build a [`PadSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadSessionConfig {
    pub sheet: SheetSpec,
    pub zones: Vec<Zone>,
    pub trigger: TriggerParams,
    pub corners: CornerResolveParams,
    pub mirror: bool,
    /// Initial display surface size.
    pub surface: PixelSize,
}

impl Default for PadSessionConfig {
    fn default() -> Self {
        Self {
            sheet: SheetSpec::default(),
            zones: ZoneLayout::acoustic_kit().zones().to_vec(),
            trigger: TriggerParams::default(),
            corners: CornerResolveParams::default(),
            mirror: false,
            surface: default_surface(),
        }
    }
}

impl PadSessionConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PadIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PadIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validate the zones against each other and the sheet.
    pub fn build_layout(&self) -> Result<ZoneLayout, PadConfigError> {
        if !self.sheet.is_valid() {
            return Err(PadConfigError::InvalidSheet {
                width: self.sheet.width,
                height: self.sheet.height,
            });
        }
        let layout = ZoneLayout::new(self.zones.clone())?;
        for name in layout.zones_outside(&self.sheet) {
            log::warn!("zone {name:?} extends past the sheet edge");
        }
        Ok(layout)
    }

    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            sheet: self.sheet,
            mirror: self.mirror,
            corners: self.corners,
        }
    }

    /// Build a ready-to-run session from this config.
    pub fn build_session(&self) -> Result<PadSession, PadConfigError> {
        if !self.surface.is_valid() {
            return Err(PadConfigError::InvalidSurface {
                width: self.surface.width,
                height: self.surface.height,
            });
        }
        if self.corners.max_candidates < 4 {
            return Err(PadConfigError::InvalidCornerCap(self.corners.max_candidates));
        }
        let engine = TriggerEngine::new(self.build_layout()?, self.trigger)?;
        Ok(PadSession::new(self.session_params(), self.surface, engine))
    }
}

/// One recorded input to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Frame(FrameInput),
    Calibrate {
        source: PixelSize,
        candidates: Vec<CornerCandidate>,
    },
    Resize {
        surface: PixelSize,
    },
    ClearCalibration,
}

/// A recorded session: detector frames interleaved with user actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayTrace {
    pub events: Vec<TraceEvent>,
}

impl ReplayTrace {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PadIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PadIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    /// Index of the `calibrate` event in the trace.
    pub event_index: usize,
    /// Display-to-sheet transform, when calibration succeeded.
    #[serde(default)]
    pub homography: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    #[serde(default)]
    pub config_path: Option<String>,
    #[serde(default)]
    pub trace_path: Option<String>,
    pub frames: usize,
    pub frames_with_tip: usize,
    pub triggers: Vec<TriggerEvent>,
    pub calibrations: Vec<CalibrationOutcome>,
    #[serde(default)]
    pub final_cursor: Option<Point2<f64>>,
    pub calibrated: bool,
}

impl ReplayReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PadIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PadIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn calibration_outcome(
    event_index: usize,
    res: Result<[[f64; 3]; 3], CalibrationError>,
) -> CalibrationOutcome {
    match res {
        Ok(h) => CalibrationOutcome {
            event_index,
            homography: Some(h),
            error: None,
        },
        Err(e) => CalibrationOutcome {
            event_index,
            homography: None,
            error: Some(e.to_string()),
        },
    }
}

/// Feed a recorded trace through `session`, in order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(session, trace), fields(events = trace.events.len()))
)]
pub fn replay(session: &mut PadSession, trace: &ReplayTrace) -> ReplayReport {
    let mut report = ReplayReport::default();

    for (index, event) in trace.events.iter().enumerate() {
        match event {
            TraceEvent::Frame(frame) => {
                let out = session.process_frame(frame);
                report.frames += 1;
                if frame.tip.is_some() {
                    report.frames_with_tip += 1;
                }
                report.triggers.extend(out.triggers);
            }
            TraceEvent::Calibrate { source, candidates } => {
                let res = session
                    .calibrate(*source, candidates)
                    .map(|c| c.homography().to_array());
                report.calibrations.push(calibration_outcome(index, res));
            }
            TraceEvent::Resize { surface } => session.resize_surface(*surface),
            TraceEvent::ClearCalibration => session.clear_calibration(),
        }
    }

    report.final_cursor = session.cursor();
    report.calibrated = session.is_calibrated();
    log::info!(
        "replayed {} frames: {} triggers, {} calibration attempts",
        report.frames,
        report.triggers.len(),
        report.calibrations.len()
    );
    report
}
