//! # culexmap core
//!
//! Raster types, georeferencing and GeoTIFF I/O shared by the culexmap
//! crates.
//!
//! - `Raster<T>`: georeferenced 2D grid with an optional no-data sentinel
//! - `GeoTransform`: affine pixel/map transform
//! - `Window`: the study-area extent every derived raster is forced onto
//! - `CRS`: spatial reference identifier

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement, Window};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement, Window};
    pub use crate::Algorithm;
}

/// Common shape of the raster operators.
///
/// Operators are pure: they read their input and produce a new value,
/// never mutating what they were given.
pub trait Algorithm {
    type Input;
    type Output;
    type Params;
    type Error: std::error::Error;

    /// Short operator name, used in log lines
    fn name(&self) -> &'static str;

    /// One-line description of what the operator does
    fn description(&self) -> &'static str;

    /// Run the operator
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;
}
