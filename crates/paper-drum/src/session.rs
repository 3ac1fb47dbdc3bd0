//! Per-frame pipeline: detector point -> display -> sheet -> pad hits.

use crate::calibration::{CalibrationError, SheetCalibration};
use log::{debug, info, warn};
use nalgebra::Point2;
use paper_drum_core::{
    map_display_to_sheet, normalized_to_source, resolve_sheet_corners, CornerCandidate,
    CornerResolveParams, CoverFit, PixelSize, SheetSpec,
};
use paper_drum_pads::{TriggerEngine, TriggerEvent};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Mapping settings that stay fixed for the lifetime of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    pub sheet: SheetSpec,
    /// Mirror the detector's x axis (front camera / selfie view).
    pub mirror: bool,
    pub corners: CornerResolveParams,
}

/// One detector callback.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub t_ms: f64,
    /// Current source-frame resolution.
    pub source: PixelSize,
    /// Normalized fingertip position, `None` when nothing was detected.
    #[serde(default)]
    pub tip: Option<Point2<f64>>,
}

/// Result of one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameOutput {
    pub t_ms: f64,
    /// Fingertip in sheet units, for overlays.
    pub cursor: Option<Point2<f64>>,
    pub triggers: Vec<TriggerEvent>,
}

impl FrameOutput {
    fn idle(t_ms: f64) -> Self {
        Self {
            t_ms,
            cursor: None,
            triggers: Vec::new(),
        }
    }
}

/// Owns everything between the detector and the audio output.
///
/// Frame processing and calibration both take `&mut self`, so a calibration
/// can never interleave with a trigger update and readers always see one
/// complete transform.
#[derive(Clone, Debug)]
pub struct PadSession {
    params: SessionParams,
    surface: PixelSize,
    calibration: Option<SheetCalibration>,
    engine: TriggerEngine,
    last_sheet: Option<Point2<f64>>,
    last_source: Option<PixelSize>,
}

impl PadSession {
    pub fn new(params: SessionParams, surface: PixelSize, engine: TriggerEngine) -> Self {
        Self {
            params,
            surface,
            calibration: None,
            engine,
            last_sheet: None,
            last_source: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    #[inline]
    pub fn surface(&self) -> PixelSize {
        self.surface
    }

    #[inline]
    pub fn engine(&self) -> &TriggerEngine {
        &self.engine
    }

    #[inline]
    pub fn calibration(&self) -> Option<&SheetCalibration> {
        self.calibration.as_ref()
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Last valid fingertip position in sheet units.
    #[inline]
    pub fn cursor(&self) -> Option<Point2<f64>> {
        self.last_sheet
    }

    /// Display surface was resized.
    pub fn resize_surface(&mut self, surface: PixelSize) {
        if !surface.is_valid() {
            warn!("ignoring invalid surface size {:?}", surface);
            return;
        }
        if surface == self.surface {
            return;
        }
        self.surface = surface;
        // Any display-to-sheet mapping depends on the surface size.
        self.engine.forget_motion();
        if let Some(source) = self.calibration.as_ref().map(|c| c.source()) {
            self.refresh_calibration(source);
        }
    }

    /// Drop the perspective correction and fall back to linear rescale.
    pub fn clear_calibration(&mut self) {
        if self.calibration.take().is_some() {
            info!("calibration cleared");
            self.engine.forget_motion();
        }
    }

    /// Calibrate from raw corner candidates in source-frame pixels.
    ///
    /// On failure the previous calibration (or the uncalibrated fallback)
    /// stays active.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, candidates), fields(candidates = candidates.len()))
    )]
    pub fn calibrate(
        &mut self,
        source: PixelSize,
        candidates: &[CornerCandidate],
    ) -> Result<&SheetCalibration, CalibrationError> {
        let calibration = self.derive_calibration(source, candidates).inspect_err(|e| {
            warn!("{e}; keeping previous calibration");
        })?;

        info!(
            "calibrated: display corners {:?}",
            calibration.display_corners().to_array()
        );
        self.engine.forget_motion();
        Ok(self.calibration.insert(calibration))
    }

    fn derive_calibration(
        &self,
        source: PixelSize,
        candidates: &[CornerCandidate],
    ) -> Result<SheetCalibration, CalibrationError> {
        if !source.is_valid() || !self.surface.is_valid() {
            return Err(CalibrationError::InvalidGeometry {
                surface: self.surface,
                source_size: source,
            });
        }

        let mirrored: Vec<CornerCandidate> = candidates
            .iter()
            .map(|c| {
                let mut c = *c;
                if self.params.mirror {
                    c.position.x = source.width - c.position.x;
                }
                c
            })
            .collect();

        let corners = resolve_sheet_corners(&mirrored, &self.params.corners)?;
        let corners_norm =
            corners.map(|p| Point2::new(p.x / source.width, p.y / source.height));
        SheetCalibration::derive(corners_norm, self.surface, source, &self.params.sheet)
    }

    // Re-derive the transform if the surface or source changed since the
    // calibration was made.
    fn refresh_calibration(&mut self, source: PixelSize) {
        let Some(current) = self.calibration.as_ref() else {
            return;
        };
        if current.matches(self.surface, source) {
            return;
        }
        match current.rederive(self.surface, source, &self.params.sheet) {
            Ok(next) => {
                debug!(
                    "calibration re-derived for surface {:?}, source {:?}",
                    self.surface, source
                );
                self.calibration = Some(next);
                self.engine.forget_motion();
            }
            Err(e) => warn!("{e}; keeping transform for the previous frame geometry"),
        }
    }

    /// Map a display-surface point into sheet units with the active
    /// transform (or the linear fallback).
    pub fn surface_to_sheet(&self, p_display: Point2<f64>) -> Option<Point2<f64>> {
        map_display_to_sheet(
            self.calibration.as_ref().map(|c| c.homography()),
            p_display,
            self.surface,
            &self.params.sheet,
        )
    }

    /// Inverse of [`PadSession::surface_to_sheet`], for drawing pads.
    pub fn sheet_to_surface(&self, p_sheet: Point2<f64>) -> Option<Point2<f64>> {
        match self.calibration.as_ref() {
            Some(c) => c.homography().inverse()?.apply(p_sheet),
            None => {
                let sheet = &self.params.sheet;
                if !self.surface.is_valid() || !sheet.is_valid() {
                    return None;
                }
                Some(Point2::new(
                    p_sheet.x / sheet.width * self.surface.width,
                    p_sheet.y / sheet.height * self.surface.height,
                ))
            }
        }
    }

    /// Run one frame through mapping and the trigger engine.
    ///
    /// Frames without a fingertip or with an unusable source size leave all
    /// state untouched.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn process_frame(&mut self, frame: &FrameInput) -> FrameOutput {
        let Some(tip) = frame.tip else {
            return FrameOutput::idle(frame.t_ms);
        };
        if !frame.source.is_valid() {
            return FrameOutput::idle(frame.t_ms);
        }

        if self.last_source.is_some_and(|prev| prev != frame.source) {
            debug!("source resolution changed to {:?}", frame.source);
            self.engine.forget_motion();
        }
        self.last_source = Some(frame.source);
        self.refresh_calibration(frame.source);

        let Some(fit) = CoverFit::new(self.surface, frame.source) else {
            return FrameOutput::idle(frame.t_ms);
        };
        let p_source = normalized_to_source(tip, frame.source, self.params.mirror);
        let p_display = fit.map(p_source);

        let p_sheet = match self.surface_to_sheet(p_display) {
            Some(p) => p,
            None => match self.last_sheet {
                Some(prev) => {
                    warn!(
                        "sheet mapping undefined at {:?}; reusing previous position",
                        p_display
                    );
                    prev
                }
                None => return FrameOutput::idle(frame.t_ms),
            },
        };

        let triggers = self.engine.update(p_sheet, frame.t_ms);
        self.last_sheet = Some(p_sheet);
        FrameOutput {
            t_ms: frame.t_ms,
            cursor: Some(p_sheet),
            triggers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use paper_drum_core::{Homography, SheetCorners};
    use paper_drum_pads::{PadPhase, TriggerParams, Zone, ZoneLayout};

    fn session(surface: PixelSize) -> PadSession {
        let layout = ZoneLayout::new(vec![Zone::new("A", 96.0, 144.0, 30.0)]).expect("layout");
        let engine = TriggerEngine::new(layout, TriggerParams::default()).expect("engine");
        PadSession::new(SessionParams::default(), surface, engine)
    }

    fn frame(t_ms: f64, source: PixelSize, tip: Option<(f64, f64)>) -> FrameInput {
        FrameInput {
            t_ms,
            source,
            tip: tip.map(|(x, y)| Point2::new(x, y)),
        }
    }

    #[test]
    fn uncalibrated_stroke_uses_linear_fallback() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);

        let first = s.process_frame(&frame(0.0, size, Some((0.125, 0.5))));
        assert_eq!(first.cursor, Some(Point2::new(48.0, 144.0)));
        assert!(first.triggers.is_empty());

        let second = s.process_frame(&frame(50.0, size, Some((0.25, 0.5))));
        assert_eq!(second.cursor, Some(Point2::new(96.0, 144.0)));
        assert_eq!(second.triggers.len(), 1);
        assert_relative_eq!(second.triggers[0].intensity, 1.0);
    }

    #[test]
    fn missing_tip_leaves_state_untouched() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        s.process_frame(&frame(0.0, size, Some((0.125, 0.5))));

        let out = s.process_frame(&frame(20.0, size, None));
        assert!(out.cursor.is_none());
        assert!(out.triggers.is_empty());
        assert_eq!(s.cursor(), Some(Point2::new(48.0, 144.0)));

        // The next detection measures velocity across the gap (100 ms).
        let out = s.process_frame(&frame(100.0, size, Some((0.25, 0.5))));
        assert_eq!(out.triggers.len(), 1);
        assert_relative_eq!(s.engine().last_motion().speed, 480.0, epsilon = 1e-9);
    }

    #[test]
    fn source_not_ready_is_skipped() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        let out = s.process_frame(&frame(0.0, PixelSize::new(0.0, 0.0), Some((0.5, 0.5))));
        assert!(out.cursor.is_none());
        assert!(s.cursor().is_none());
    }

    #[test]
    fn mirror_flips_the_fallback_mapping() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        s.params.mirror = true;
        let out = s.process_frame(&frame(0.0, size, Some((0.25, 0.5))));
        assert_eq!(out.cursor, Some(Point2::new(288.0, 144.0)));
    }

    #[test]
    fn vanishing_denominator_reuses_previous_position() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        // w = 1 - x / 384: undefined on the display column x = 384.
        let h = Homography::from_array([
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [-1.0 / 384.0, 0.0, 1.0],
        ]);
        let corners = SheetCorners::from_array([Point2::new(0.0, 0.0); 4]);
        s.calibration = Some(SheetCalibration {
            corners_norm: corners,
            display_corners: corners,
            surface: size,
            source: size,
            h_sheet_from_display: h,
        });

        let first = s.process_frame(&frame(0.0, size, Some((0.125, 0.5))));
        let prev = first.cursor.expect("mapped");

        let second = s.process_frame(&frame(20.0, size, Some((0.5, 0.5))));
        assert_eq!(second.cursor, Some(prev));
        assert!(second.triggers.is_empty());
        assert_eq!(s.engine().state("A").map(|st| st.phase), Some(PadPhase::Armed));
    }

    #[test]
    fn failed_calibration_keeps_fallback() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        let err = s
            .calibrate(size, &[CornerCandidate::new(1.0, 1.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Corners(_)));
        assert!(!s.is_calibrated());
    }

    #[test]
    fn invalid_surface_resize_is_ignored() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        s.resize_surface(PixelSize::new(-1.0, 10.0));
        assert_eq!(s.surface(), size);
    }

    fn session_with_pad(surface: PixelSize, pad: Zone) -> PadSession {
        let layout = ZoneLayout::new(vec![pad]).expect("layout");
        let engine = TriggerEngine::new(layout, TriggerParams::default()).expect("engine");
        PadSession::new(SessionParams::default(), surface, engine)
    }

    #[test]
    fn uncalibrated_resize_does_not_fire_a_still_fingertip() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session_with_pad(size, Zone::new("Top", 96.0, 5.0, 30.0));

        let before = s.process_frame(&frame(0.0, size, Some((0.25, 0.25))));
        assert_eq!(before.cursor, Some(Point2::new(96.0, 72.0)));

        // Wider surface crops the source vertically, so the same tip moves
        // to the top edge of the sheet.
        s.resize_surface(PixelSize::new(1536.0, 576.0));
        let after = s.process_frame(&frame(16.0, size, Some((0.25, 0.25))));
        let cursor = after.cursor.expect("mapped");
        assert_relative_eq!(cursor.x, 96.0, epsilon = 1e-9);
        assert_relative_eq!(cursor.y, 0.0, epsilon = 1e-9);
        assert!(after.triggers.is_empty());
        assert_eq!(s.engine().last_motion().speed, 0.0);
    }

    #[test]
    fn uncalibrated_source_change_does_not_fire_a_still_fingertip() {
        let surface = PixelSize::new(768.0, 576.0);
        let mut s = session_with_pad(surface, Zone::new("A", 96.0, 60.0, 20.0));

        let before = s.process_frame(&frame(0.0, surface, Some((0.25, 0.25))));
        assert_eq!(before.cursor, Some(Point2::new(96.0, 72.0)));

        let narrower = PixelSize::new(640.0, 576.0);
        let after = s.process_frame(&frame(16.0, narrower, Some((0.25, 0.25))));
        let cursor = after.cursor.expect("mapped");
        assert_relative_eq!(cursor.y, 57.6, epsilon = 1e-9);
        assert!(after.triggers.is_empty());

        // Same geometry again: motion is tracked normally.
        s.process_frame(&frame(32.0, narrower, Some((0.25, 0.25))));
        assert_eq!(s.engine().last_motion().speed, 0.0);
        assert!(s.engine().state("A").expect("state").inside);
    }

    #[test]
    fn resizing_to_the_same_size_keeps_motion() {
        let size = PixelSize::new(768.0, 576.0);
        let mut s = session(size);
        s.process_frame(&frame(0.0, size, Some((0.125, 0.5))));
        s.resize_surface(size);
        let out = s.process_frame(&frame(50.0, size, Some((0.25, 0.5))));
        assert_eq!(out.triggers.len(), 1);
    }

    #[test]
    fn fallback_overlay_round_trips() {
        let s = session(PixelSize::new(768.0, 576.0));
        let p = Point2::new(96.0, 144.0);
        let d = s.sheet_to_surface(p).expect("valid");
        assert_eq!(d, Point2::new(192.0, 288.0));
        assert_eq!(s.surface_to_sheet(d), Some(p));
    }
}
