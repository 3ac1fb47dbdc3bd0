use nalgebra::Point2;
use paper_drum_core::SheetSpec;
use serde::{Deserialize, Serialize};

/// A circular pad printed on the sheet, in sheet units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub center: Point2<f64>,
    pub radius: f64,
}

impl Zone {
    pub fn new(name: impl Into<String>, x: f64, y: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            center: Point2::new(x, y),
            radius,
        }
    }

    /// Closed disc test: the rim counts as inside.
    #[inline]
    pub fn contains(&self, p: Point2<f64>) -> bool {
        (p - self.center).norm() <= self.radius
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ZoneLayoutError {
    #[error("zone name must not be empty (zone #{index})")]
    EmptyName { index: usize },
    #[error("duplicate zone name {name:?}")]
    DuplicateName { name: String },
    #[error("zone {name:?} has a non-finite center")]
    InvalidCenter { name: String },
    #[error("zone {name:?} has invalid radius {radius}")]
    InvalidRadius { name: String, radius: f64 },
}

/// Validated, immutable set of zones.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZoneLayout {
    zones: Vec<Zone>,
}

impl ZoneLayout {
    pub fn new(zones: Vec<Zone>) -> Result<Self, ZoneLayoutError> {
        for (index, zone) in zones.iter().enumerate() {
            if zone.name.trim().is_empty() {
                return Err(ZoneLayoutError::EmptyName { index });
            }
            if zones[..index].iter().any(|z| z.name == zone.name) {
                return Err(ZoneLayoutError::DuplicateName {
                    name: zone.name.clone(),
                });
            }
            if !zone.center.x.is_finite() || !zone.center.y.is_finite() {
                return Err(ZoneLayoutError::InvalidCenter {
                    name: zone.name.clone(),
                });
            }
            if !zone.radius.is_finite() || zone.radius <= 0.0 {
                return Err(ZoneLayoutError::InvalidRadius {
                    name: zone.name.clone(),
                    radius: zone.radius,
                });
            }
        }
        Ok(Self { zones })
    }

    /// Six-pad acoustic kit of the reference 384 x 288 sheet.
    pub fn acoustic_kit() -> Self {
        Self {
            zones: acoustic_kit_zones(),
        }
    }

    #[inline]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.zones.iter().position(|z| z.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Names of zones whose disc pokes outside `sheet`.
    ///
    /// Not an error: a pad printed at the margin is still hittable.
    pub fn zones_outside(&self, sheet: &SheetSpec) -> Vec<&str> {
        self.zones
            .iter()
            .filter(|z| {
                z.center.x - z.radius < 0.0
                    || z.center.y - z.radius < 0.0
                    || z.center.x + z.radius > sheet.width
                    || z.center.y + z.radius > sheet.height
            })
            .map(|z| z.name.as_str())
            .collect()
    }
}

pub(crate) fn acoustic_kit_zones() -> Vec<Zone> {
    vec![
        Zone::new("Kick", 64.0, 64.0, 34.0),
        Zone::new("Snare", 192.0, 64.0, 34.0),
        Zone::new("HiHat C", 320.0, 64.0, 30.0),
        Zone::new("Tom", 64.0, 180.0, 32.0),
        Zone::new("Clap", 192.0, 180.0, 32.0),
        Zone::new("HiHat O", 320.0, 180.0, 30.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acoustic_kit_is_valid_and_on_sheet() {
        let kit = ZoneLayout::acoustic_kit();
        assert_eq!(kit.len(), 6);
        assert_eq!(ZoneLayout::new(acoustic_kit_zones()).as_ref(), Ok(&kit));
        assert!(kit.zones_outside(&SheetSpec::default()).is_empty());
        assert_eq!(kit.index_of("Clap"), Some(4));
    }

    #[test]
    fn rim_counts_as_inside() {
        let z = Zone::new("A", 100.0, 100.0, 30.0);
        assert!(z.contains(Point2::new(70.0, 100.0)));
        assert!(z.contains(Point2::new(130.0, 100.0)));
        assert!(!z.contains(Point2::new(130.01, 100.0)));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ZoneLayout::new(vec![
            Zone::new("Kick", 10.0, 10.0, 5.0),
            Zone::new("Kick", 50.0, 10.0, 5.0),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ZoneLayoutError::DuplicateName {
                name: "Kick".to_string()
            }
        );
    }

    #[test]
    fn bad_geometry_rejected() {
        assert!(matches!(
            ZoneLayout::new(vec![Zone::new("A", 10.0, 10.0, 0.0)]),
            Err(ZoneLayoutError::InvalidRadius { .. })
        ));
        assert!(matches!(
            ZoneLayout::new(vec![Zone::new("A", f64::INFINITY, 10.0, 3.0)]),
            Err(ZoneLayoutError::InvalidCenter { .. })
        ));
        assert!(matches!(
            ZoneLayout::new(vec![Zone::new("  ", 1.0, 1.0, 1.0)]),
            Err(ZoneLayoutError::EmptyName { index: 0 })
        ));
    }

    #[test]
    fn margin_zone_is_reported() {
        let layout = ZoneLayout::new(vec![
            Zone::new("Edge", 10.0, 10.0, 20.0),
            Zone::new("Mid", 192.0, 144.0, 20.0),
        ])
        .expect("valid");
        assert_eq!(layout.zones_outside(&SheetSpec::default()), vec!["Edge"]);
    }
}
