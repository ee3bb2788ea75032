//! Terrain derivatives used by the rooftop model

mod slope;

pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
