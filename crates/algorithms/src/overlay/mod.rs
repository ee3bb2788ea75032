//! Weighted-overlay building blocks
//!
//! Every operator here reads co-registered rasters and returns a new one.

mod algebra;
mod fill;
mod mosaic;
mod reclassify;

pub use algebra::{evaluate, evaluate_with_report, AlgebraReport, Band, BandFormula, BandInputs};
pub use fill::{fill_nodata, FillNoData};
pub use mosaic::{mosaic, Mosaic};
pub use reclassify::{
    reclassify, reclassify_with_report, RangeBoundaries, ReclassEntry, ReclassReport, ReclassTable,
    Reclassify, ReclassifyParams, Unmatched,
};
