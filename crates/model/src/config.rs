//! Run configuration
//!
//! A model run is described by one TOML file:
//!
//! ```toml
//! [inputs]
//! landcover = "nmd/landcover.tif"
//! dsm = "lidar/dsm.tif"
//! # ...
//!
//! [settings]
//! resolution = 10.0
//!
//! [heatmap]
//! radius = 400.0
//! kernel = "triweight"
//!
//! [output]
//! dir = "out"
//! ```
//!
//! Relative input and output paths are resolved against the directory
//! holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use culexmap_algorithms::density::KdeParams;
use culexmap_algorithms::heatmap::HeatmapParams;
use culexmap_core::CRS;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub inputs: InputPaths,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    pub output: OutputConfig,
}

/// Source layers, all expected in the model CRS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    /// Land cover clipped to the study area; defines the window
    pub landcover: PathBuf,
    pub manmade: PathBuf,
    pub powerlines: PathBuf,
    pub grazing: PathBuf,
    pub dsm: PathBuf,
    pub dem: PathBuf,
    pub cdsm: PathBuf,
    pub lai: PathBuf,
    pub height_0_5: PathBuf,
    pub height_5_45: PathBuf,
    /// Precomputed distance to the sea; derived from the land cover when absent
    #[serde(default)]
    pub ocean_distance: Option<PathBuf>,
    pub wall_height: PathBuf,
    pub industries: PathBuf,
    pub gardens: PathBuf,
    pub landuse_suitability: PathBuf,
    pub building_fai: PathBuf,
    pub vegetation_fai: PathBuf,
    pub vegetation_pai: PathBuf,
}

impl InputPaths {
    fn resolve_against(&mut self, base: &Path) {
        let paths = [
            &mut self.landcover,
            &mut self.manmade,
            &mut self.powerlines,
            &mut self.grazing,
            &mut self.dsm,
            &mut self.dem,
            &mut self.cdsm,
            &mut self.lai,
            &mut self.height_0_5,
            &mut self.height_5_45,
            &mut self.wall_height,
            &mut self.industries,
            &mut self.gardens,
            &mut self.landuse_suitability,
            &mut self.building_fai,
            &mut self.vegetation_fai,
            &mut self.vegetation_pai,
        ];
        for path in paths {
            resolve(path, base);
        }
        if let Some(path) = self.ocean_distance.as_mut() {
            resolve(path, base);
        }
    }
}

/// Model constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub epsg: u32,
    /// Cell size of every window-grid product
    pub resolution: f64,
    /// Side of the square zones used by the heat island and wind models
    pub grid_spacing: f64,
    /// Subtracted from the DEM before differencing it with the DSM
    pub dem_offset: f64,
    /// Minimum DSM-DEM difference counted as a building
    pub building_threshold: f64,
    pub ocean_max_distance: f64,
    pub ocean_landcover_code: f64,
    pub nodata: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            epsg: 3006,
            resolution: 10.0,
            grid_spacing: 100.0,
            dem_offset: 0.0,
            building_threshold: 0.5,
            ocean_max_distance: 30_000.0,
            ocean_landcover_code: 62.0,
            nodata: -9999.0,
        }
    }
}

impl Settings {
    pub fn crs(&self) -> CRS {
        CRS::from_epsg(self.epsg)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    #[serde(flatten)]
    pub kde: KdeParams,
    /// Directory of stored band surfaces, reused when all six are present
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Where heatmap bands are written when no cache is configured
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl ModelConfig {
    /// Read, resolve and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Make relative paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        self.inputs.resolve_against(base);
        resolve(&mut self.output.dir, base);
        if let Some(dir) = self.output.scratch_dir.as_mut() {
            resolve(dir, base);
        }
        if let Some(dir) = self.heatmap.cache_dir.as_mut() {
            resolve(dir, base);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.settings;
        if !(s.resolution > 0.0) {
            return Err(Error::InvalidConfig(format!("resolution must be positive, got {}", s.resolution)));
        }
        if !(s.grid_spacing > 0.0) {
            return Err(Error::InvalidConfig(format!("grid_spacing must be positive, got {}", s.grid_spacing)));
        }
        if !(s.ocean_max_distance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "ocean_max_distance must be positive, got {}",
                s.ocean_max_distance
            )));
        }
        self.heatmap
            .kde
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("heatmap: {}", e)))
    }

    pub fn heatmap_params(&self) -> HeatmapParams {
        HeatmapParams {
            kde: self.heatmap.kde,
            resolution: self.settings.resolution,
        }
    }
}

fn resolve(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use culexmap_algorithms::density::{KernelShape, OutputValues};

    const MINIMAL: &str = r#"
[inputs]
landcover = "lc.tif"
manmade = "manmade.tif"
powerlines = "powerlines.tif"
grazing = "grazing.tif"
dsm = "dsm.tif"
dem = "dem.tif"
cdsm = "cdsm.tif"
lai = "lai.tif"
height_0_5 = "h05.tif"
height_5_45 = "h545.tif"
wall_height = "walls.tif"
industries = "industries.tif"
gardens = "gardens.tif"
landuse_suitability = "lu.tif"
building_fai = "bfai.tif"
vegetation_fai = "vfai.tif"
vegetation_pai = "vpai.tif"

[output]
dir = "out"
"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = ModelConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.settings.epsg, 3006);
        assert_eq!(config.heatmap.kde.radius, 400.0);
        assert_eq!(config.heatmap.kde.kernel, KernelShape::Triweight);
        assert_eq!(config.heatmap.kde.output, OutputValues::Raw);
        assert!(config.inputs.ocean_distance.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn heatmap_section_overrides_kernel() {
        let text = format!(
            "{}\n[heatmap]\nradius = 250.0\nkernel = \"quartic\"\noutput = \"scaled\"\ncache_dir = \"bands\"\n",
            MINIMAL
        );
        let config = ModelConfig::from_toml(&text).unwrap();
        assert_eq!(config.heatmap.kde.radius, 250.0);
        assert_eq!(config.heatmap.kde.pixel_size, 10.0);
        assert_eq!(config.heatmap.kde.kernel, KernelShape::Quartic);
        assert_eq!(config.heatmap.kde.output, OutputValues::Scaled);
        assert_eq!(config.heatmap.cache_dir.as_deref(), Some(Path::new("bands")));
    }

    #[test]
    fn relative_paths_follow_config_dir() {
        let mut config = ModelConfig::from_toml(MINIMAL).unwrap();
        config.resolve_paths(Path::new("/data/run"));
        assert_eq!(config.inputs.dsm, PathBuf::from("/data/run/dsm.tif"));
        assert_eq!(config.output.dir, PathBuf::from("/data/run/out"));
    }

    #[test]
    fn rejects_non_positive_resolution() {
        let text = format!("{}\n[settings]\nresolution = 0.0\n", MINIMAL);
        let config = ModelConfig::from_toml(&text).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_input_is_a_parse_error() {
        let text = MINIMAL.replace("dsm = \"dsm.tif\"\n", "");
        assert!(matches!(ModelConfig::from_toml(&text), Err(Error::Config(_))));
    }
}
