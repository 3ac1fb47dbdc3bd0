use serde::{Deserialize, Serialize};

/// Tunables of the trigger engine.
///
/// Speeds are in sheet units per second, times in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerParams {
    /// Speed above which an armed pad fires.
    pub v_hit: f64,
    /// Speed below which a cooling pad re-arms (leaving the pad also re-arms).
    pub v_arm: f64,
    /// Minimum time between two hits of the same pad.
    pub min_retrigger_ms: f64,
    /// Only fire while the fingertip moves down the sheet (`v.y > 0`).
    pub downward_only: bool,
    /// Floor of the reported intensity; the ceiling is 1.0.
    pub min_intensity: f64,
}

impl Default for TriggerParams {
    fn default() -> Self {
        Self {
            v_hit: 220.0,
            v_arm: 120.0,
            min_retrigger_ms: 100.0,
            downward_only: false,
            min_intensity: 0.15,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TriggerParamsError {
    #[error("v_hit must be positive and finite (got {0})")]
    InvalidHitSpeed(f64),
    #[error("v_arm must be in (0, v_hit] (got v_arm={v_arm}, v_hit={v_hit})")]
    InvalidArmSpeed { v_arm: f64, v_hit: f64 },
    #[error("min_retrigger_ms must be non-negative and finite (got {0})")]
    InvalidRetrigger(f64),
    #[error("min_intensity must be in [0, 1] (got {0})")]
    InvalidMinIntensity(f64),
}

impl TriggerParams {
    pub fn validate(&self) -> Result<(), TriggerParamsError> {
        if !self.v_hit.is_finite() || self.v_hit <= 0.0 {
            return Err(TriggerParamsError::InvalidHitSpeed(self.v_hit));
        }
        if !self.v_arm.is_finite() || self.v_arm <= 0.0 || self.v_arm > self.v_hit {
            return Err(TriggerParamsError::InvalidArmSpeed {
                v_arm: self.v_arm,
                v_hit: self.v_hit,
            });
        }
        if !self.min_retrigger_ms.is_finite() || self.min_retrigger_ms < 0.0 {
            return Err(TriggerParamsError::InvalidRetrigger(self.min_retrigger_ms));
        }
        if !(0.0..=1.0).contains(&self.min_intensity) {
            return Err(TriggerParamsError::InvalidMinIntensity(self.min_intensity));
        }
        Ok(())
    }

    /// Hit intensity for a given speed, `clamp(speed / v_hit, floor, 1)`.
    #[inline]
    pub fn intensity(&self, speed: f64) -> f64 {
        (speed / self.v_hit).clamp(self.min_intensity, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(TriggerParams::default().validate(), Ok(()));
    }

    #[test]
    fn arm_speed_above_hit_speed_is_rejected() {
        let p = TriggerParams {
            v_arm: 300.0,
            ..TriggerParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(TriggerParamsError::InvalidArmSpeed { .. })
        ));
    }

    #[test]
    fn intensity_is_clamped() {
        let p = TriggerParams::default();
        assert_relative_eq!(p.intensity(300.0), 1.0);
        assert_relative_eq!(p.intensity(110.0), 0.5);
        assert_relative_eq!(p.intensity(1.0), 0.15);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: TriggerParams =
            serde_json::from_str(r#"{"downward_only": true, "v_hit": 250.0}"#).expect("parse");
        assert!(p.downward_only);
        assert_relative_eq!(p.v_hit, 250.0);
        assert_relative_eq!(p.v_arm, 120.0);
        assert_relative_eq!(p.min_retrigger_ms, 100.0);
    }
}
