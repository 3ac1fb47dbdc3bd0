use crate::{TriggerParams, TriggerParamsError, Zone, ZoneLayout};
use log::debug;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Hysteresis phase of one pad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadPhase {
    /// Ready to fire on the next fast hit.
    #[default]
    Armed,
    /// Fired; waits for the fingertip to leave or slow down.
    Cooling,
}

/// Per-pad state owned by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PadState {
    pub phase: PadPhase,
    pub last_trigger_ms: Option<f64>,
    /// Whether the last sample was inside the pad. Diagnostic only.
    pub inside: bool,
}

/// A pad hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub zone: String,
    /// In `[min_intensity, 1]`, derived from the fingertip speed.
    pub intensity: f64,
    pub t_ms: f64,
}

/// Fingertip motion between the previous and the current sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Motion {
    /// Sheet units per second.
    pub velocity: Vector2<f64>,
    pub speed: f64,
}

impl Motion {
    pub fn still() -> Self {
        Self {
            velocity: Vector2::zeros(),
            speed: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    position: Point2<f64>,
    t_ms: f64,
}

/// Turns a stream of sheet-space fingertip samples into pad hits.
///
/// Each pad fires when it is armed, the fingertip is inside it, moving faster
/// than `v_hit`, and the pad's last hit is more than `min_retrigger_ms` ago.
/// Firing puts the pad into cooling; it re-arms once the fingertip leaves the
/// pad or slows below `v_arm`. Pads are independent, so one sample may fire
/// several overlapping pads.
#[derive(Clone, Debug)]
pub struct TriggerEngine {
    layout: ZoneLayout,
    params: TriggerParams,
    // Parallel to `layout.zones()`.
    states: Vec<PadState>,
    last_sample: Option<Sample>,
    last_motion: Motion,
}

impl TriggerEngine {
    pub fn new(layout: ZoneLayout, params: TriggerParams) -> Result<Self, TriggerParamsError> {
        params.validate()?;
        let states = vec![PadState::default(); layout.len()];
        Ok(Self {
            layout,
            params,
            states,
            last_sample: None,
            last_motion: Motion::still(),
        })
    }

    #[inline]
    pub fn layout(&self) -> &ZoneLayout {
        &self.layout
    }

    #[inline]
    pub fn params(&self) -> &TriggerParams {
        &self.params
    }

    /// State of the named pad.
    pub fn state(&self, zone: &str) -> Option<&PadState> {
        self.layout.index_of(zone).map(|i| &self.states[i])
    }

    pub fn states(&self) -> impl Iterator<Item = (&Zone, &PadState)> {
        self.layout.zones().iter().zip(self.states.iter())
    }

    /// Motion computed by the most recent [`TriggerEngine::update`].
    #[inline]
    pub fn last_motion(&self) -> Motion {
        self.last_motion
    }

    /// Forget the previous sample so the next one has zero velocity.
    ///
    /// Pad phases and debounce timestamps are kept.
    pub fn forget_motion(&mut self) {
        self.last_sample = None;
        self.last_motion = Motion::still();
    }

    /// Return every pad to its initial state and forget motion.
    pub fn reset(&mut self) {
        self.states.fill(PadState::default());
        self.forget_motion();
    }

    fn motion_to(&self, position: Point2<f64>, t_ms: f64) -> Motion {
        let Some(prev) = self.last_sample else {
            return Motion::still();
        };
        let dt_s = (t_ms - prev.t_ms) / 1000.0;
        if dt_s <= 0.0 {
            return Motion::still();
        }
        let velocity = (position - prev.position) / dt_s;
        Motion {
            velocity,
            speed: velocity.norm(),
        }
    }

    /// Feed one sheet-space sample taken at `t_ms`; returns the pads hit.
    ///
    /// Non-finite samples are ignored and leave all state untouched.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn update(&mut self, position: Point2<f64>, t_ms: f64) -> Vec<TriggerEvent> {
        if !position.x.is_finite() || !position.y.is_finite() || !t_ms.is_finite() {
            debug!("ignoring non-finite sample {:?} @ {}", position, t_ms);
            return Vec::new();
        }

        let motion = self.motion_to(position, t_ms);
        let p = &self.params;
        let moving_down = !p.downward_only || motion.velocity.y > 0.0;

        let mut events = Vec::new();
        for (zone, state) in self.layout.zones().iter().zip(self.states.iter_mut()) {
            let inside = zone.contains(position);

            if !inside || motion.speed < p.v_arm {
                state.phase = PadPhase::Armed;
            }

            let debounced = state
                .last_trigger_ms
                .map_or(true, |last| t_ms - last > p.min_retrigger_ms);

            if state.phase == PadPhase::Armed
                && inside
                && motion.speed > p.v_hit
                && debounced
                && moving_down
            {
                let intensity = p.intensity(motion.speed);
                debug!(
                    "pad {:?} hit @ {:.1} ms: speed={:.1} intensity={:.3}",
                    zone.name, t_ms, motion.speed, intensity
                );
                events.push(TriggerEvent {
                    zone: zone.name.clone(),
                    intensity,
                    t_ms,
                });
                state.phase = PadPhase::Cooling;
                state.last_trigger_ms = Some(t_ms);
            }

            state.inside = inside;
        }

        self.last_sample = Some(Sample { position, t_ms });
        self.last_motion = motion;
        events
    }
}
