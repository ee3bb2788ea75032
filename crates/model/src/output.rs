//! Writing model products
//!
//! Every product is written as a GeoTIFF into the output directory, next to
//! a `manifest.json` describing the window, the per-artifact statistics
//! and the stage timings of the run. Class products are Int32, the
//! continuous ones 32-bit float.

use std::fs;
use std::path::{Path, PathBuf};

use culexmap_core::io::{write_geotiff_as, SampleType};
use culexmap_core::raster::RasterStatistics;
use culexmap_core::Window;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::graph::StageTiming;
use crate::model::ModelOutputs;

pub const MANIFEST_NAME: &str = "manifest.json";

/// Products holding reclassified integer codes
pub const CLASS_ARTIFACTS: [&str; 2] = ["IUHD_final.tif", "heatmap_ovi_class.tif"];

pub fn sample_type(name: &str) -> SampleType {
    if CLASS_ARTIFACTS.contains(&name) {
        SampleType::Int32
    } else {
        SampleType::Float32
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
    pub cols: usize,
    pub sample_type: SampleType,
    pub statistics: RasterStatistics,
}

/// Summary written next to the rasters
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub window: Window,
    pub resolution: f64,
    pub artifacts: Vec<Artifact>,
    pub stages: Vec<StageTiming>,
}

/// Write every product into `dir`, creating it if needed
pub fn write_outputs(outputs: &ModelOutputs, dir: &Path) -> Result<Manifest> {
    fs::create_dir_all(dir)?;

    let mut artifacts = Vec::new();
    for (name, raster) in outputs.artifacts() {
        let path = dir.join(name);
        let sample_type = sample_type(name);
        write_geotiff_as(raster, &path, sample_type)?;
        let (rows, cols) = raster.shape();
        info!(path = %path.display(), rows, cols, ?sample_type, "wrote artifact");
        artifacts.push(Artifact {
            name: name.to_string(),
            path,
            rows,
            cols,
            sample_type,
            statistics: raster.statistics(),
        });
    }

    let manifest = Manifest {
        window: outputs.window.clone(),
        resolution: outputs.resolution,
        artifacts,
        stages: outputs.timings.clone(),
    };
    fs::write(dir.join(MANIFEST_NAME), serde_json::to_string_pretty(&manifest)?)?;
    Ok(manifest)
}
