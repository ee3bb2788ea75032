//! Six-band heatmap synthesis

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::{HeatmapBand, HeatmapBandBuilder, HeatmapParams};
use crate::maybe_rayon::*;
use crate::overlay::{evaluate, BandFormula, BandInputs};
use culexmap_core::io::{read_geotiff, write_geotiff};
use culexmap_core::raster::{Raster, Window};
use culexmap_core::Result;
use tracing::{debug, info};

/// Sentinel of the averaged heatmap
pub const HEATMAP_NODATA: f64 = -9999.0;

fn mean_of_six(v: &[f64]) -> f64 {
    (v[0] + v[1] + v[2] + v[3] + v[4] + v[5]) / 6.0
}

const MEAN_OF_SIX: BandFormula = BandFormula::new("heatmap_mean", 6, mean_of_six);

/// Builds the six band surfaces concurrently and averages them.
///
/// With a scratch directory each band is written to its own
/// `heatmap_band{b}.tif`. With reuse enabled and all six files present,
/// the stored bands are read back instead of recomputed.
#[derive(Debug, Clone)]
pub struct HeatmapSynthesizer {
    params: HeatmapParams,
    window: Window,
    scratch: Option<PathBuf>,
    reuse: bool,
}

impl HeatmapSynthesizer {
    pub fn new(params: HeatmapParams, window: Window) -> Self {
        Self {
            params,
            window,
            scratch: None,
            reuse: false,
        }
    }

    pub fn with_scratch(mut self, dir: impl Into<PathBuf>, reuse: bool) -> Self {
        self.scratch = Some(dir.into());
        self.reuse = reuse;
        self
    }

    pub fn band_path(&self, band: HeatmapBand) -> Option<PathBuf> {
        self.scratch.as_ref().map(|dir| dir.join(band.scratch_name()))
    }

    /// Final surfaces of bands 1..=6, in band order
    pub fn build_bands(&self, source: &Raster<f64>) -> Result<Vec<Raster<f64>>> {
        if let Some(bands) = self.cached_bands()? {
            info!("reusing stored heatmap bands");
            return Ok(bands);
        }
        if let Some(dir) = &self.scratch {
            std::fs::create_dir_all(dir)?;
        }

        let bands: Vec<HeatmapBand> = HeatmapBand::all().collect();
        bands
            .into_par_iter()
            .map(|band| -> Result<Raster<f64>> {
                let surface = HeatmapBandBuilder::new(band, &self.params, &self.window).run(source)?;
                if let Some(path) = self.band_path(band) {
                    write_geotiff(&surface, &path)?;
                    debug!(band = band.index(), path = %path.display(), "heatmap band stored");
                }
                Ok(surface)
            })
            .collect()
    }

    /// Cell-wise mean of the six band surfaces
    pub fn synthesize(&self, source: &Raster<f64>) -> Result<Raster<f64>> {
        let start = Instant::now();
        let bands = self.build_bands(source)?;
        let refs: Vec<&Raster<f64>> = bands.iter().collect();
        let heatmap = evaluate(&MEAN_OF_SIX, &BandInputs::from_slice(&refs)?, HEATMAP_NODATA)?;
        info!(elapsed = ?start.elapsed(), "heatmap synthesized");
        Ok(heatmap)
    }

    fn cached_bands(&self) -> Result<Option<Vec<Raster<f64>>>> {
        if !self.reuse {
            return Ok(None);
        }
        let paths: Vec<PathBuf> = HeatmapBand::all().filter_map(|b| self.band_path(b)).collect();
        if paths.len() != HeatmapBand::COUNT as usize || !paths.iter().all(|p| p.exists()) {
            return Ok(None);
        }
        paths.iter().map(|p| self.read_band(p)).collect::<Result<Vec<_>>>().map(Some)
    }

    fn read_band(&self, path: &Path) -> Result<Raster<f64>> {
        let mut band: Raster<f64> = read_geotiff(path)?;
        self.window.ensure_aligned(&band, self.params.resolution)?;
        if band.crs().is_none() {
            band.set_crs(self.window.crs.clone());
        }
        Ok(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use culexmap_core::GeoTransform;

    fn source(value: f64) -> (Raster<f64>, Window) {
        let mut r = Raster::filled(3, 3, value);
        r.set_transform(GeoTransform::new(0.0, 30.0, 10.0, -10.0));
        let w = Window::from_reference(&r).unwrap();
        (r, w)
    }

    #[test]
    fn single_band_source_averages_to_a_third() {
        let (src, window) = source(2.0);
        let params = HeatmapParams::default();
        let synth = HeatmapSynthesizer::new(params, window.clone());

        let bands = synth.build_bands(&src).unwrap();
        assert_eq!(bands.len(), 6);
        for (i, band) in bands.iter().enumerate() {
            let nonzero = band.data().iter().any(|&v| v != 0.0);
            assert_eq!(nonzero, i == 1, "band {}", i + 1);
        }

        let heatmap = synth.synthesize(&src).unwrap();
        let density = HeatmapBandBuilder::new(HeatmapBand::new(2).unwrap(), &params, &window)
            .run(&src)
            .unwrap();
        for (h, d) in heatmap.data().iter().zip(density.data().iter()) {
            // band surface is already scaled by 2
            assert_relative_eq!(*h, d / 6.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn scratch_files_are_written_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let (src, window) = source(6.5);
        let synth = HeatmapSynthesizer::new(HeatmapParams::default(), window).with_scratch(dir.path(), true);

        let first = synth.synthesize(&src).unwrap();
        for band in HeatmapBand::all() {
            assert!(dir.path().join(band.scratch_name()).exists());
        }

        // A different source is ignored once all six bands are stored
        let (other, _) = source(1.0);
        let second = synth.synthesize(&other).unwrap();
        for (a, b) in first.data().iter().zip(second.data().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-6);
        }
    }
}
