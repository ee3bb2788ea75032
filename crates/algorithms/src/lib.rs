//! # culexmap algorithms
//!
//! Raster operators behind the heat and mosquito-risk model.
//!
//! - **overlay**: table reclassification, band algebra, max-mosaic, no-data fill
//! - **density**: pixels-to-points, k-d tree, kernel density estimation
//! - **heatmap**: six-band hotspot heatmap builder and synthesizer
//! - **resample**: nearest-neighbour warp onto the study-area window
//! - **proximity**: Euclidean distance to target cells
//! - **zones**: regular zone grid, zonal sums and zone rasterization
//! - **terrain**: rooftop slope

pub mod density;
pub mod heatmap;
pub(crate) mod maybe_rayon;
pub mod overlay;
pub mod proximity;
pub mod resample;
pub mod terrain;
pub mod zones;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::density::{kernel_density, pixels_to_points, KdeParams, KernelShape, OutputValues, SamplePoint};
    pub use crate::heatmap::{HeatmapBand, HeatmapBandBuilder, HeatmapParams, HeatmapSynthesizer};
    pub use crate::overlay::{
        evaluate, fill_nodata, mosaic, reclassify, BandFormula, BandInputs, RangeBoundaries,
        ReclassEntry, ReclassTable, Unmatched,
    };
    pub use crate::proximity::proximity;
    pub use crate::resample::resample_to_window;
    pub use crate::zones::{rasterize_zones, zone_statistics, ZoneGrid, ZoneStats};
    pub use culexmap_core::prelude::*;
}
