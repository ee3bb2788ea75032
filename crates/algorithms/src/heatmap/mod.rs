//! Hotspot heatmap
//!
//! A continuous suitability raster is cut into six value bands. Each band
//! is turned into a point set, smoothed with kernel density estimation,
//! weighted by its band index and brought back onto the study-area grid.
//! The six surfaces are then averaged.

mod builder;
mod synthesizer;

pub use builder::{BandState, HeatmapBandBuilder, MASK_NODATA};
pub use synthesizer::{HeatmapSynthesizer, HEATMAP_NODATA};

use crate::density::KdeParams;
use culexmap_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Band index, 1 to 6.
///
/// Bands 1..=5 select `b <= v < b + 1`; band 6 is open-ended and selects
/// `v >= 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HeatmapBand(u8);

impl HeatmapBand {
    pub const COUNT: u8 = 6;

    pub fn new(index: u8) -> Result<Self> {
        if (1..=Self::COUNT).contains(&index) {
            Ok(Self(index))
        } else {
            Err(Error::InvalidParameter {
                name: "band",
                value: index.to_string(),
                reason: "heatmap bands run from 1 to 6".into(),
            })
        }
    }

    /// Bands 1 through 6 in order
    pub fn all() -> impl Iterator<Item = HeatmapBand> {
        (1..=Self::COUNT).map(HeatmapBand)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn weight(self) -> f64 {
        self.0 as f64
    }

    pub fn contains(self, value: f64) -> bool {
        let low = self.0 as f64;
        if self.0 == Self::COUNT {
            value >= low
        } else {
            low <= value && value < low + 1.0
        }
    }

    /// Scratch file name, unique per band so concurrent builders never collide
    pub fn scratch_name(self) -> String {
        format!("heatmap_band{}.tif", self.0)
    }
}

impl fmt::Display for HeatmapBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "band {}", self.0)
    }
}

/// Parameters shared by all six band builders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapParams {
    pub kde: KdeParams,
    /// Resolution of the resampled band surfaces
    pub resolution: f64,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            kde: KdeParams::default(),
            resolution: 10.0,
        }
    }
}
