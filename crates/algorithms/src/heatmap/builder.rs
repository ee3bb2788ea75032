//! Per-band heatmap pipeline as an explicit state machine

use super::{HeatmapBand, HeatmapParams};
use crate::density::{kernel_density, pixels_to_points, select_value, SamplePoint};
use crate::overlay::fill_nodata;
use crate::resample::resample_to_window;
use culexmap_core::raster::{Raster, Window};
use culexmap_core::{Error, Result};
use std::time::Instant;
use tracing::{debug, warn};

/// Sentinel of the band masks
pub const MASK_NODATA: f64 = -9999.0;

/// Where a band is in its pipeline, carrying that step's product
#[derive(Debug, Clone)]
pub enum BandState {
    /// 1/0 mask of cells inside the band
    Thresholded(Raster<f64>),
    /// One point per valid mask cell
    Pointized(Vec<SamplePoint>),
    /// Points inside the band only
    Filtered(Vec<SamplePoint>),
    DensityEstimated(Raster<f64>),
    /// Density times the band index
    Scaled(Raster<f64>),
    Filled(Raster<f64>),
    /// Final surface on the window grid
    Resampled(Raster<f64>),
}

impl BandState {
    pub fn name(&self) -> &'static str {
        match self {
            BandState::Thresholded(_) => "thresholded",
            BandState::Pointized(_) => "pointized",
            BandState::Filtered(_) => "filtered",
            BandState::DensityEstimated(_) => "density_estimated",
            BandState::Scaled(_) => "scaled",
            BandState::Filled(_) => "filled",
            BandState::Resampled(_) => "resampled",
        }
    }
}

/// Runs one band from source raster to resampled surface
#[derive(Debug, Clone)]
pub struct HeatmapBandBuilder<'a> {
    band: HeatmapBand,
    params: &'a HeatmapParams,
    window: &'a Window,
}

impl<'a> HeatmapBandBuilder<'a> {
    pub fn new(band: HeatmapBand, params: &'a HeatmapParams, window: &'a Window) -> Self {
        Self { band, params, window }
    }

    pub fn band(&self) -> HeatmapBand {
        self.band
    }

    /// Entry transition: mask the source to this band.
    /// No-data source cells stay no-data in the mask.
    pub fn threshold(&self, source: &Raster<f64>) -> Result<BandState> {
        let (rows, cols) = source.shape();
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(match source.valid_f64(row, col) {
                    Some(v) if self.band.contains(v) => 1.0,
                    Some(_) => 0.0,
                    None => MASK_NODATA,
                });
            }
        }
        Ok(BandState::Thresholded(source.with_data(data, Some(MASK_NODATA))?))
    }

    /// Move one step forward
    pub fn advance(&self, state: BandState) -> Result<BandState> {
        let from = state.name();
        let next = match state {
            BandState::Thresholded(mask) => BandState::Pointized(pixels_to_points(&mask)),
            BandState::Pointized(points) => {
                let selected = select_value(points, 1.0);
                if selected.is_empty() {
                    warn!(band = self.band.index(), "no cells in band, density will be zero");
                }
                BandState::Filtered(selected)
            }
            BandState::Filtered(points) => {
                BandState::DensityEstimated(kernel_density(&points, &self.params.kde, self.window)?)
            }
            BandState::DensityEstimated(density) => {
                let weight = self.band.weight();
                let nodata = density.nodata();
                let data: Vec<f64> = density
                    .data()
                    .iter()
                    .map(|&v| if density.is_nodata(v) { v } else { v * weight })
                    .collect();
                BandState::Scaled(density.with_data(data, nodata)?)
            }
            BandState::Scaled(scaled) => BandState::Filled(fill_nodata(&scaled, 0.0)?),
            BandState::Filled(filled) => {
                BandState::Resampled(resample_to_window(&filled, self.window, self.params.resolution)?)
            }
            BandState::Resampled(_) => {
                return Err(Error::Algorithm(format!(
                    "heatmap {} is already resampled",
                    self.band
                )))
            }
        };
        debug!(band = self.band.index(), from, to = next.name(), "heatmap band transition");
        Ok(next)
    }

    /// Drive the band through every state and return its final surface
    pub fn run(&self, source: &Raster<f64>) -> Result<Raster<f64>> {
        let start = Instant::now();
        let mut state = self.threshold(source)?;
        loop {
            state = match state {
                BandState::Resampled(surface) => {
                    debug!(band = self.band.index(), elapsed = ?start.elapsed(), "heatmap band done");
                    return Ok(surface);
                }
                other => self.advance(other)?,
            };
        }
    }
}
