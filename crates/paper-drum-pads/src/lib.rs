//! Pad zones and the hysteresis trigger engine.
//!
//! ## Quickstart
//!
//! ```
//! use nalgebra::Point2;
//! use paper_drum_pads::{TriggerEngine, TriggerParams, Zone, ZoneLayout};
//!
//! let layout = ZoneLayout::new(vec![Zone::new("A", 100.0, 100.0, 30.0)]).unwrap();
//! let mut engine = TriggerEngine::new(layout, TriggerParams::default()).unwrap();
//!
//! assert!(engine.update(Point2::new(70.0, 100.0), 0.0).is_empty());
//! let hits = engine.update(Point2::new(130.0, 100.0), 50.0);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].intensity, 1.0);
//! ```

mod engine;
mod params;
mod zone;

pub use engine::{Motion, PadPhase, PadState, TriggerEngine, TriggerEvent};
pub use params::{TriggerParams, TriggerParamsError};
pub use zone::{Zone, ZoneLayout, ZoneLayoutError};
