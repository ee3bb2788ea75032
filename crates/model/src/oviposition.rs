//! Oviposition suitability and its hotspot heatmap
//!
//! Flat roofs (slope under 8 degrees) are found on the DSM and burnt into
//! the land cover as code 129. Land cover and the merged land-use layers
//! are classified, averaged, and blended 9:1 with the heat island class.
//! The blend feeds the six-band heatmap, whose values are cut into ten
//! hotspot tiers.

use std::path::PathBuf;

use culexmap_algorithms::heatmap::{HeatmapParams, HeatmapSynthesizer};
use culexmap_algorithms::resample::resample_to_window;
use culexmap_algorithms::terrain::{slope, SlopeParams};
use culexmap_core::Window;

use crate::config::Settings;
use crate::formulas::{FLAT_ROOF, MEAN_OF_TWO, OVIPOSITION, ROOFTOP_MASK};
use crate::graph::Stage;
use crate::stages;
use crate::tables;

/// Sentinel of the rooftop slope layers
pub const ROOF_NODATA: f64 = 130.0;

/// Where heatmap bands go and whether stored ones may be reused
#[derive(Debug, Clone)]
pub struct HeatmapStore {
    pub dir: PathBuf,
    pub reuse: bool,
}

pub fn stages(settings: &Settings, window: &Window, heatmap: HeatmapParams, store: Option<HeatmapStore>) -> Vec<Stage> {
    let nodata = settings.nodata;
    let resolution = settings.resolution;
    let warp_window = window.clone();
    let mut synthesizer = HeatmapSynthesizer::new(heatmap, window.clone());
    if let Some(store) = store {
        synthesizer = synthesizer.with_scratch(store.dir, store.reuse);
    }

    vec![
        // rooftops
        Stage::new("roof_slope", &["dsm"], |inputs| {
            Ok(slope(inputs.first()?, SlopeParams::default())?)
        }),
        stages::formula("roof_mask", ROOFTOP_MASK, &["building_mask", "roof_slope"], ROOF_NODATA),
        Stage::new("roof_slope_resampled", &["roof_mask"], move |inputs| {
            Ok(resample_to_window(inputs.first()?, &warp_window, resolution)?)
        }),
        stages::formula("flat_roofs", FLAT_ROOF, &["roof_slope_resampled"], ROOF_NODATA),
        stages::reclass("rooftops", "flat_roofs", tables::rooftop(), nodata),
        // land use
        stages::merge(
            "land_use_merged",
            &["grazing", "manmade", "powerlines", "gardens", "industries"],
        ),
        stages::fill("land_use_filled", "land_use_merged", 0.0),
        stages::reclass("land_use_classes", "land_use_filled", tables::land_use(), nodata),
        // land cover
        stages::merge("land_cover_merged", &["landcover", "rooftops"]),
        stages::reclass("land_cover_classes", "land_cover_merged", tables::land_cover(), nodata),
        // composite
        stages::formula("lclu", MEAN_OF_TWO, &["land_use_classes", "land_cover_classes"], nodata),
        stages::formula("oviposition", OVIPOSITION, &["lclu", "iuhd"], nodata),
        Stage::new("heatmap", &["oviposition"], move |inputs| {
            Ok(synthesizer.synthesize(inputs.first()?)?)
        }),
        stages::reclass("heatmap_classes", "heatmap", tables::hotspot(), nodata),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use culexmap_core::Raster;

    use crate::graph::{Layers, TaskGraph};

    #[test]
    fn flat_roofs_become_code_129() {
        let window = Window::new(0.0, 100.0, 0.0, 100.0, None).unwrap();
        // flat roof in the west, a 45 degree roof in the east
        let mut dsm: Raster<f64> = window.raster(5.0, 20.0).unwrap();
        for row in 0..20 {
            for col in 10..20 {
                dsm.set(row, col, 20.0 + (col - 9) as f64 * 5.0).unwrap();
            }
        }
        let buildings = dsm.like(1.0);

        let mut seeds = Layers::new();
        seeds.insert("dsm".into(), Arc::new(dsm));
        seeds.insert("building_mask".into(), Arc::new(buildings));

        let rooftop_stages = stages(&Settings::default(), &window, HeatmapParams::default(), None)
            .into_iter()
            .take(5);
        let mut graph = TaskGraph::new();
        graph.extend(rooftop_stages);
        let run = graph.execute(seeds).unwrap();

        let rooftops = &run.layers["rooftops"];
        assert_eq!(rooftops.shape(), (10, 10));
        assert_eq!(rooftops.get(2, 2).unwrap(), 129.0);
        assert!(rooftops.is_nodata(rooftops.get(5, 8).unwrap()));
    }
}
