//! End-to-end model runs on a synthetic 400 m study area

use culexmap_core::{Raster, Window, CRS};
use culexmap_model::graph::Layers;
use culexmap_model::services::{GeoServices, Morphometry, SourceLayer, VectorLayer};
use culexmap_core::io::SampleType;
use culexmap_model::output::CLASS_ARTIFACTS;
use culexmap_model::{write_outputs, Error, Model, ModelConfig};

const CONFIG: &str = r#"
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

[settings]
resolution = 10.0
grid_spacing = 100.0

[heatmap]
radius = 50.0

[output]
dir = "out"
"#;

const ELEVATION: f64 = 10.0;
const BUILDING: f64 = 12.0;

/// Land cover on a 10 m grid, elevation models on 5 m.
///
/// A block of flat-roofed buildings sits in the north-west zone, trees
/// cover half of the north-east zone and the sea runs along the southern
/// edge.
struct Synthetic {
    window: Window,
    ocean: bool,
    landcover_cell: f64,
}

impl Synthetic {
    fn new() -> Self {
        Self {
            window: Window::new(500_000.0, 500_400.0, 6_600_000.0, 6_600_400.0, Some(CRS::from_epsg(3006))).unwrap(),
            ocean: false,
            landcover_cell: 10.0,
        }
    }

    fn plane(&self, resolution: f64, value: f64) -> Raster<f64> {
        self.window.raster(resolution, value).unwrap()
    }

    /// 5 m raster with `inside` on cells whose row and column fall in `rows` and `cols`
    fn block(&self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, inside: f64, outside: f64) -> Raster<f64> {
        let mut r = self.plane(5.0, outside);
        for row in rows {
            for col in cols.clone() {
                r.set(row, col, inside).unwrap();
            }
        }
        r
    }
}

impl GeoServices for Synthetic {
    fn land_cover(&self) -> culexmap_model::Result<Raster<f64>> {
        let mut lc = self.plane(self.landcover_cell, 51.0);
        let (rows, cols) = lc.shape();
        for row in 0..rows {
            for col in 0..cols {
                let code = if row >= rows - 2 {
                    62.0
                } else if row < 10 && col >= 30 {
                    115.0
                } else {
                    51.0
                };
                lc.set(row, col, code).unwrap();
            }
        }
        lc.set_nodata(Some(0.0));
        Ok(lc)
    }

    fn source(&self, layer: SourceLayer, _window: &Window, resolution: f64) -> culexmap_model::Result<Raster<f64>> {
        Ok(match layer {
            SourceLayer::Dem => self.plane(5.0, ELEVATION),
            SourceLayer::Dsm => self.block(2..18, 2..18, ELEVATION + BUILDING, ELEVATION),
            SourceLayer::Cdsm => self.block(0..10, 60..80, 6.0, 0.0),
            SourceLayer::Lai => self.plane(resolution, 2.5),
            SourceLayer::Height5To45 => self.plane(resolution, 8.0),
            _ => self.plane(resolution, 0.0),
        })
    }

    fn ocean_distance(&self, _window: &Window, resolution: f64) -> culexmap_model::Result<Option<Raster<f64>>> {
        Ok(self.ocean.then(|| self.plane(resolution, 1500.0)))
    }

    fn wall_height(&self, dsm: &Raster<f64>, _window: &Window) -> culexmap_model::Result<Raster<f64>> {
        // block perimeter carries the full building height
        let (rows, cols) = dsm.shape();
        let mut walls = dsm.like(0.0);
        for row in 2..18 {
            for col in 2..18 {
                if row == 2 || row == 17 || col == 2 || col == 17 {
                    walls.set(row, col, BUILDING).unwrap();
                }
            }
        }
        assert_eq!((rows, cols), (80, 80));
        Ok(walls)
    }

    fn morphometry(&self, _window: &Window, resolution: f64) -> culexmap_model::Result<Morphometry> {
        Ok(Morphometry {
            building_fai: self.plane(resolution, 0.3),
            vegetation_fai: self.plane(resolution, 0.2),
            vegetation_pai: self.plane(resolution, 0.1),
        })
    }

    fn rasterize(&self, layer: VectorLayer, _window: &Window, resolution: f64) -> culexmap_model::Result<Raster<f64>> {
        Ok(match layer {
            VectorLayer::Industries => self.plane(resolution, 0.0),
            VectorLayer::Gardens => self.plane(resolution, 15.0),
            VectorLayer::LandUseSuitability => self.plane(resolution, 5.0),
        })
    }
}

fn config() -> ModelConfig {
    ModelConfig::from_toml(CONFIG).unwrap()
}

#[test]
fn graph_wiring_is_complete() {
    let model = Model::new(config(), Synthetic::new());
    let (landcover, window) = model.reference().unwrap();
    let seeds: Layers = model.seeds(landcover, &window).unwrap();
    assert!(!seeds.contains_key("ocean_distance"));

    let graph = model.graph(&window, false, None).unwrap();
    let plan = graph.plan(seeds.keys().map(String::as_str)).unwrap();
    let planned: usize = plan.iter().map(Vec::len).sum();
    assert_eq!(planned, graph.len());

    let wave_of = |name: &str| plan.iter().position(|w| w.contains(&name)).unwrap();
    assert!(wave_of("iuhd") < wave_of("oviposition"));
    assert!(wave_of("oviposition") < wave_of("heatmap"));
    assert!(wave_of("heatmap_classes") < wave_of("adult_mca1"));
    assert_eq!(wave_of("adult"), plan.len() - 1);
}

#[test]
fn full_run_produces_every_product() {
    let model = Model::new(config(), Synthetic::new());
    let outputs = model.run().unwrap();

    for (name, raster) in &outputs.artifacts()[..5] {
        assert_eq!(raster.shape(), (40, 40), "{}", name);
    }
    assert_eq!(outputs.dsm.shape(), (80, 80));

    // heat island classes stay within 1..10
    for &v in outputs.iuhd.data().iter() {
        assert!((1.0..=10.0).contains(&v), "iuhd class {}", v);
    }
    // the built zone is warmer than the wooded one
    let built = outputs.iuhd.get(2, 2).unwrap();
    let wooded = outputs.iuhd.get(2, 35).unwrap();
    assert!(built > wooded, "built {} wooded {}", built, wooded);

    let heatmap_classes = outputs.heatmap_classes.statistics();
    assert!(heatmap_classes.valid_count > 0);
    assert!(outputs.adult.statistics().valid_count > 0);

    let stages: Vec<&str> = outputs.timings.iter().map(|t| t.stage.as_str()).collect();
    assert!(stages.contains(&"ocean_distance"));
}

#[test]
fn supplied_sea_distance_is_used() {
    let mut services = Synthetic::new();
    services.ocean = true;
    let outputs = Model::new(config(), services).run().unwrap();
    assert!(outputs.timings.iter().all(|t| t.stage != "ocean_distance"));
}

#[test]
fn outputs_and_manifest_written() {
    let dir = tempfile::tempdir().unwrap();
    let outputs = Model::new(config(), Synthetic::new()).run().unwrap();
    let manifest = write_outputs(&outputs, dir.path()).unwrap();

    assert_eq!(manifest.artifacts.len(), 9);
    for artifact in &manifest.artifacts {
        assert!(artifact.path.exists(), "{}", artifact.name);
    }
    let text = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["artifacts"].as_array().unwrap().len(), 9);
    assert_eq!(json["resolution"], 10.0);
    assert!(json["stages"].as_array().unwrap().len() > 40);
}

#[test]
fn class_products_written_as_integers() {
    let dir = tempfile::tempdir().unwrap();
    let outputs = Model::new(config(), Synthetic::new()).run().unwrap();
    let manifest = write_outputs(&outputs, dir.path()).unwrap();

    for artifact in &manifest.artifacts {
        let expected = if CLASS_ARTIFACTS.contains(&artifact.name.as_str()) {
            SampleType::Int32
        } else {
            SampleType::Float32
        };
        assert_eq!(artifact.sample_type, expected, "{}", artifact.name);
    }

    let file = std::fs::File::open(dir.path().join("IUHD_final.tif")).unwrap();
    let mut decoder = tiff::decoder::Decoder::new(file).unwrap();
    let tiff::decoder::DecodingResult::I32(classes) = decoder.read_image().unwrap() else {
        panic!("IUHD_final.tif is not Int32");
    };
    assert!(classes.iter().all(|c| (1..=10).contains(c)));

    let back: Raster<f64> = culexmap_core::io::read_geotiff(dir.path().join("IUHD_final.tif")).unwrap();
    assert_eq!(back.data(), outputs.iuhd.data());
}

#[test]
fn misaligned_land_cover_is_rejected() {
    let mut services = Synthetic::new();
    services.landcover_cell = 8.0;
    let err = Model::new(config(), services).run().unwrap_err();
    assert!(matches!(err, Error::Raster(culexmap_core::Error::Alignment { .. })), "{:?}", err);
}
