//! Collaborators supplying source layers
//!
//! The model never opens files itself. Everything it consumes comes
//! through [`GeoServices`]: the study-area land cover, the clipped source
//! rasters, and the products of external tools (wall heights, urban
//! morphometry, rasterized vector layers). [`FileServices`] reads them
//! from GeoTIFFs named in the configuration.

use std::fmt;
use std::path::Path;

use culexmap_algorithms::resample::resample_to_window;
use culexmap_core::io::read_geotiff;
use culexmap_core::{Raster, Window, CRS};
use tracing::debug;

use crate::config::{InputPaths, Settings};
use crate::error::Result;

/// Raster sources clipped to the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLayer {
    Manmade,
    Powerlines,
    Grazing,
    Dsm,
    Dem,
    Cdsm,
    Lai,
    Height0To5,
    Height5To45,
}

impl SourceLayer {
    pub const ALL: [SourceLayer; 9] = [
        SourceLayer::Manmade,
        SourceLayer::Powerlines,
        SourceLayer::Grazing,
        SourceLayer::Dsm,
        SourceLayer::Dem,
        SourceLayer::Cdsm,
        SourceLayer::Lai,
        SourceLayer::Height0To5,
        SourceLayer::Height5To45,
    ];

    /// Layer name inside the task graph
    pub fn name(self) -> &'static str {
        match self {
            SourceLayer::Manmade => "manmade",
            SourceLayer::Powerlines => "powerlines",
            SourceLayer::Grazing => "grazing",
            SourceLayer::Dsm => "dsm",
            SourceLayer::Dem => "dem",
            SourceLayer::Cdsm => "cdsm",
            SourceLayer::Lai => "lai",
            SourceLayer::Height0To5 => "height_0_5",
            SourceLayer::Height5To45 => "height_5_45",
        }
    }

    /// Elevation models keep their own resolution; every other layer is
    /// brought onto the window grid.
    pub fn keeps_resolution(self) -> bool {
        matches!(self, SourceLayer::Dsm | SourceLayer::Dem | SourceLayer::Cdsm)
    }
}

impl fmt::Display for SourceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vector layers burnt onto the window grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorLayer {
    /// Industrial areas, burnt as 16
    Industries,
    /// 10 m buffers around detached houses, burnt as 15
    Gardens,
    /// Land-use suitability 0..9 per property map class
    LandUseSuitability,
}

impl VectorLayer {
    pub const ALL: [VectorLayer; 3] = [VectorLayer::Industries, VectorLayer::Gardens, VectorLayer::LandUseSuitability];

    pub fn name(self) -> &'static str {
        match self {
            VectorLayer::Industries => "industries",
            VectorLayer::Gardens => "gardens",
            VectorLayer::LandUseSuitability => "landuse_suitability",
        }
    }
}

/// Frontal and plan area indices on the window grid
#[derive(Debug, Clone)]
pub struct Morphometry {
    pub building_fai: Raster<f64>,
    pub vegetation_fai: Raster<f64>,
    pub vegetation_pai: Raster<f64>,
}

pub trait GeoServices: Send + Sync {
    /// Land cover of the study area; its extent becomes the window
    fn land_cover(&self) -> Result<Raster<f64>>;

    /// A source layer on `window`, at `resolution` unless it keeps its own
    fn source(&self, layer: SourceLayer, window: &Window, resolution: f64) -> Result<Raster<f64>>;

    /// Precomputed distance to the sea in metres, if one is available
    fn ocean_distance(&self, window: &Window, resolution: f64) -> Result<Option<Raster<f64>>>;

    /// Wall heights derived from the DSM, on the DSM grid
    fn wall_height(&self, dsm: &Raster<f64>, window: &Window) -> Result<Raster<f64>>;

    /// Urban morphometry over the zone grid, burnt onto the window grid
    fn morphometry(&self, window: &Window, resolution: f64) -> Result<Morphometry>;

    fn rasterize(&self, layer: VectorLayer, window: &Window, resolution: f64) -> Result<Raster<f64>>;
}

/// [`GeoServices`] over GeoTIFFs
#[derive(Debug, Clone)]
pub struct FileServices {
    paths: InputPaths,
    crs: CRS,
}

impl FileServices {
    pub fn new(paths: InputPaths, settings: &Settings) -> Self {
        Self {
            paths,
            crs: settings.crs(),
        }
    }

    fn read(&self, path: &Path) -> Result<Raster<f64>> {
        let mut raster: Raster<f64> = read_geotiff(path)?;
        if raster.crs().is_none() {
            raster.set_crs(Some(self.crs.clone()));
        }
        debug!(path = %path.display(), shape = ?raster.shape(), "read source");
        Ok(raster)
    }

    fn on_grid(&self, path: &Path, window: &Window, resolution: f64) -> Result<Raster<f64>> {
        let raster = self.read(path)?;
        Ok(resample_to_window(&raster, window, resolution)?)
    }

    fn clipped(&self, path: &Path, window: &Window) -> Result<Raster<f64>> {
        let raster = self.read(path)?;
        Ok(window.clip(&raster)?)
    }

    fn source_path(&self, layer: SourceLayer) -> &Path {
        let p = &self.paths;
        match layer {
            SourceLayer::Manmade => &p.manmade,
            SourceLayer::Powerlines => &p.powerlines,
            SourceLayer::Grazing => &p.grazing,
            SourceLayer::Dsm => &p.dsm,
            SourceLayer::Dem => &p.dem,
            SourceLayer::Cdsm => &p.cdsm,
            SourceLayer::Lai => &p.lai,
            SourceLayer::Height0To5 => &p.height_0_5,
            SourceLayer::Height5To45 => &p.height_5_45,
        }
    }
}

impl GeoServices for FileServices {
    fn land_cover(&self) -> Result<Raster<f64>> {
        self.read(&self.paths.landcover)
    }

    fn source(&self, layer: SourceLayer, window: &Window, resolution: f64) -> Result<Raster<f64>> {
        let path = self.source_path(layer);
        if layer.keeps_resolution() {
            self.clipped(path, window)
        } else {
            self.on_grid(path, window, resolution)
        }
    }

    fn ocean_distance(&self, window: &Window, resolution: f64) -> Result<Option<Raster<f64>>> {
        self.paths
            .ocean_distance
            .as_deref()
            .map(|path| self.on_grid(path, window, resolution))
            .transpose()
    }

    fn wall_height(&self, _dsm: &Raster<f64>, window: &Window) -> Result<Raster<f64>> {
        self.clipped(&self.paths.wall_height, window)
    }

    fn morphometry(&self, window: &Window, resolution: f64) -> Result<Morphometry> {
        Ok(Morphometry {
            building_fai: self.on_grid(&self.paths.building_fai, window, resolution)?,
            vegetation_fai: self.on_grid(&self.paths.vegetation_fai, window, resolution)?,
            vegetation_pai: self.on_grid(&self.paths.vegetation_pai, window, resolution)?,
        })
    }

    fn rasterize(&self, layer: VectorLayer, window: &Window, resolution: f64) -> Result<Raster<f64>> {
        let path = match layer {
            VectorLayer::Industries => &self.paths.industries,
            VectorLayer::Gardens => &self.paths.gardens,
            VectorLayer::LandUseSuitability => &self.paths.landuse_suitability,
        };
        self.on_grid(path, window, resolution)
    }
}
