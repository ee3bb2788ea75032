//! Model run
//!
//! [`Model::run`] derives the study-area window from the land cover,
//! gathers every source layer through the injected [`GeoServices`],
//! wires the heat island, oviposition and adult stages into one
//! [`TaskGraph`] and executes it.

use std::sync::Arc;
use std::time::Instant;

use culexmap_algorithms::zones::ZoneGrid;
use culexmap_core::{Raster, Window};
use tracing::{info, warn};

use crate::adult;
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::graph::{Layers, StageTiming, TaskGraph};
use crate::iuhd;
use crate::oviposition::{self, HeatmapStore};
use crate::services::{GeoServices, SourceLayer, VectorLayer};

/// Final products and the clipped elevation and leaf-area inputs
#[derive(Debug, Clone)]
pub struct ModelOutputs {
    pub window: Window,
    pub resolution: f64,
    /// Heat island intensity, classes 1..10
    pub iuhd: Arc<Raster<f64>>,
    /// Oviposition suitability composite
    pub oviposition: Arc<Raster<f64>>,
    /// Mean of the six hotspot band surfaces
    pub heatmap: Arc<Raster<f64>>,
    /// Heatmap in ten hotspot tiers
    pub heatmap_classes: Arc<Raster<f64>>,
    /// Adult habitat suitability composite
    pub adult: Arc<Raster<f64>>,
    pub dsm: Arc<Raster<f64>>,
    pub cdsm: Arc<Raster<f64>>,
    pub dem: Arc<Raster<f64>>,
    pub lai: Arc<Raster<f64>>,
    pub timings: Vec<StageTiming>,
}

impl ModelOutputs {
    /// Rasters to write, with their file names
    pub fn artifacts(&self) -> [(&'static str, &Raster<f64>); 9] {
        [
            ("IUHD_final.tif", &*self.iuhd),
            ("WMCA_ovi_iuhd.tif", &*self.oviposition),
            ("heatmap_ovi.tif", &*self.heatmap),
            ("heatmap_ovi_class.tif", &*self.heatmap_classes),
            ("WMCA_adult.tif", &*self.adult),
            ("clipdsm.tif", &*self.dsm),
            ("clipcdsm.tif", &*self.cdsm),
            ("clipdem.tif", &*self.dem),
            ("lai.tif", &*self.lai),
        ]
    }
}

pub struct Model<S> {
    config: ModelConfig,
    services: S,
}

impl<S: GeoServices> Model<S> {
    pub fn new(config: ModelConfig, services: S) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Land cover of the study area with its CRS filled in, and the window
    /// it defines. The land cover must already lie on the model grid.
    pub fn reference(&self) -> Result<(Raster<f64>, Window)> {
        let settings = &self.config.settings;
        let mut landcover = self.services.land_cover()?;
        if landcover.crs().is_none() {
            landcover.set_crs(Some(settings.crs()));
        }
        let window = Window::from_reference(&landcover)?;
        window.ensure_aligned(&landcover, settings.resolution)?;
        info!(projwin = %window.projwin(), shape = ?landcover.shape(), "study area window");
        Ok((landcover, window))
    }

    /// Every stage of the run. `ocean_seeded` tells whether the sea
    /// distance comes from the services or must be derived.
    pub fn graph(&self, window: &Window, ocean_seeded: bool, store: Option<HeatmapStore>) -> Result<TaskGraph> {
        let settings = &self.config.settings;
        let grid = ZoneGrid::covering(window, settings.grid_spacing)?;

        let mut graph = TaskGraph::new();
        graph.extend(iuhd::stages(settings, window, &grid));
        graph.extend(oviposition::stages(settings, window, self.config.heatmap_params(), store));
        if !ocean_seeded {
            graph.add(adult::ocean_distance_stage(settings));
        }
        graph.extend(adult::stages(settings, window, &grid));
        Ok(graph)
    }

    /// Source layers keyed by their graph names
    pub fn seeds(&self, landcover: Raster<f64>, window: &Window) -> Result<Layers> {
        let resolution = self.config.settings.resolution;
        let mut layers = Layers::new();
        let mut put = |name: &str, raster: Raster<f64>| {
            layers.insert(name.to_string(), Arc::new(raster));
        };

        for layer in SourceLayer::ALL {
            put(layer.name(), self.services.source(layer, window, resolution)?);
        }
        for layer in VectorLayer::ALL {
            put(layer.name(), self.services.rasterize(layer, window, resolution)?);
        }

        let morphometry = self.services.morphometry(window, resolution)?;
        put("building_fai", morphometry.building_fai);
        put("vegetation_fai", morphometry.vegetation_fai);
        put("vegetation_pai", morphometry.vegetation_pai);

        if let Some(distance) = self.services.ocean_distance(window, resolution)? {
            put("ocean_distance", distance);
        }
        put("landcover", landcover);

        let dsm = layers
            .get("dsm")
            .cloned()
            .ok_or_else(|| Error::InvalidConfig("no DSM among the source layers".into()))?;
        let walls = self.services.wall_height(&dsm, window)?;
        layers.insert("wall_height".to_string(), Arc::new(walls));
        Ok(layers)
    }

    /// Run the whole model
    pub fn run(&self) -> Result<ModelOutputs> {
        let start = Instant::now();
        let (landcover, window) = self.reference()?;
        let seeds = self.seeds(landcover, &window)?;
        let ocean_seeded = seeds.contains_key("ocean_distance");
        if !ocean_seeded {
            warn!("no sea distance layer, deriving it from the land cover");
        }

        // Keeps a temporary band directory alive until the graph has run
        let (store, _scratch) = self.heatmap_store()?;
        let graph = self.graph(&window, ocean_seeded, store)?;
        let run = graph.execute(seeds)?;

        let take = |name: &str| {
            run.layers.get(name).cloned().ok_or_else(|| Error::MissingInput {
                stage: "outputs".to_string(),
                input: name.to_string(),
            })
        };
        let outputs = ModelOutputs {
            window: window.clone(),
            resolution: self.config.settings.resolution,
            iuhd: take("iuhd")?,
            oviposition: take("oviposition")?,
            heatmap: take("heatmap")?,
            heatmap_classes: take("heatmap_classes")?,
            adult: take("adult")?,
            dsm: take("dsm")?,
            cdsm: take("cdsm")?,
            dem: take("dem")?,
            lai: take("lai")?,
            timings: run.timings,
        };
        info!(elapsed = ?start.elapsed(), stages = outputs.timings.len(), "model run complete");
        Ok(outputs)
    }

    fn heatmap_store(&self) -> Result<(Option<HeatmapStore>, Option<tempfile::TempDir>)> {
        if let Some(dir) = &self.config.heatmap.cache_dir {
            return Ok((Some(HeatmapStore { dir: dir.clone(), reuse: true }), None));
        }
        if let Some(dir) = &self.config.output.scratch_dir {
            return Ok((Some(HeatmapStore { dir: dir.clone(), reuse: false }), None));
        }
        let scratch = tempfile::Builder::new().prefix("culexmap-heatmap-").tempdir()?;
        let store = HeatmapStore {
            dir: scratch.path().to_path_buf(),
            reuse: false,
        };
        Ok((Some(store), Some(scratch)))
    }
}
