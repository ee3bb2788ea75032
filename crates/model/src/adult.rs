//! Adult mosquito habitat suitability
//!
//! Six classified factors are weighted into a first composite: leaf area
//! (shade and moisture), oviposition hotspots, urban land use, wind
//! exposure from the sea and the terrain, bird-rich vegetation cover and
//! vegetation height. Small-scale wind shelter from leaf area and frontal
//! areas and the NMD ground class are then added on top.

use culexmap_algorithms::proximity::proximity;
use culexmap_algorithms::zones::{rasterize_zones, zone_statistics, ZoneGrid};
use culexmap_core::{Raster, Window};

use crate::config::Settings;
use crate::error::Result;
use crate::formulas::{
    ADULT_COMPOSITE, ADULT_MCA1, FAI_CLAMP, LAI_FAI, MEAN_OF_TWO, METRES_TO_KM, PRODUCT, VEGETATION_INDICATOR,
    WIND_REDUCTION_OCEAN, WIND_TOPO,
};
use crate::graph::Stage;
use crate::stages;
use crate::tables;

/// Sentinel of the topographic wind surface; zones without elevation burn it
pub const WIND_TOPO_NODATA: f64 = 0.0;

/// Topographic wind speed `2.6 * (mean elevation / 2) ^ 0.2` per zone
pub fn wind_topo_surface(dem: &Raster<f64>, grid: &ZoneGrid, window: &Window, resolution: f64) -> Result<Raster<f64>> {
    let speeds: Vec<Option<f64>> = zone_statistics(dem, grid)
        .iter()
        .map(|z| z.mean().map(|m| WIND_TOPO.apply(&[m])).filter(|v| v.is_finite()))
        .collect();
    Ok(rasterize_zones(
        &speeds,
        grid,
        window,
        resolution,
        WIND_TOPO_NODATA,
        Some(WIND_TOPO_NODATA),
    )?)
}

/// Distance to the nearest sea cell of the land cover, for runs without a
/// precomputed distance layer
pub fn ocean_distance_stage(settings: &Settings) -> Stage {
    let code = settings.ocean_landcover_code;
    let max_distance = settings.ocean_max_distance;
    Stage::new("ocean_distance", &["landcover"], move |inputs| {
        Ok(proximity(inputs.first()?, code, max_distance)?)
    })
}

pub fn stages(settings: &Settings, window: &Window, grid: &ZoneGrid) -> Vec<Stage> {
    let nodata = settings.nodata;
    let resolution = settings.resolution;
    let window = window.clone();
    let grid = grid.clone();

    vec![
        // ground and leaf area
        stages::reclass("nmd_ground", "landcover", tables::nmd_ground(), nodata),
        stages::fill("lai_filled", "lai", 0.0),
        stages::reclass("lai_classes", "lai_filled", tables::lai(), nodata),
        stages::reclass("lai_suitability", "lai_classes", tables::no_zero(), nodata),
        // small-scale wind shelter
        stages::formula("building_fai_capped", FAI_CLAMP, &["building_fai"], nodata),
        stages::fill("building_fai_filled", "building_fai_capped", 0.0),
        stages::fill("vegetation_fai_filled", "vegetation_fai", 0.0),
        stages::formula(
            "lai_fai",
            LAI_FAI,
            &["lai_suitability", "vegetation_fai_filled", "building_fai_filled"],
            nodata,
        ),
        stages::reclass("lai_fai_classes", "lai_fai", tables::lai_fai(), nodata),
        stages::reclass("lai_fai_suitability", "lai_fai_classes", tables::no_zero(), nodata),
        // large-scale wind
        stages::fill("ocean_distance_filled", "ocean_distance", 0.0),
        stages::formula("ocean_km", METRES_TO_KM, &["ocean_distance_filled"], nodata),
        stages::formula("wind_reduction", WIND_REDUCTION_OCEAN, &["ocean_km"], nodata),
        stages::reclass(
            "wind_reduction_classes",
            "wind_reduction",
            tables::wind_reduction_ocean(),
            nodata,
        ),
        Stage::new("wind_topo", &["dem"], move |inputs| {
            wind_topo_surface(inputs.first()?, &grid, &window, resolution)
        }),
        stages::reclass("wind_height_classes", "wind_topo", tables::wind_speed_height(), nodata),
        stages::formula("wind", MEAN_OF_TWO, &["wind_height_classes", "wind_reduction_classes"], nodata),
        // vegetation
        stages::fill("height_0_5_filled", "height_0_5", 0.0),
        stages::fill("height_5_45_filled", "height_5_45", 0.0),
        stages::merge("object_heights", &["height_0_5_filled", "height_5_45_filled"]),
        stages::formula("vegetation_from_nmd", VEGETATION_INDICATOR, &["landcover"], nodata),
        stages::formula("vegetation_heights", PRODUCT, &["vegetation_from_nmd", "object_heights"], nodata),
        stages::reclass(
            "vegetation_height_classes",
            "vegetation_heights",
            tables::vegetation_height(),
            nodata,
        ),
        stages::reclass(
            "vegetation_height_suitability",
            "vegetation_height_classes",
            tables::no_zero(),
            nodata,
        ),
        stages::reclass("vegetation_pai_classes", "vegetation_pai", tables::vegetation_pai(), nodata),
        stages::fill("landuse_suitability_filled", "landuse_suitability", 0.0),
        // composites
        stages::formula(
            "adult_mca1",
            ADULT_MCA1,
            &[
                "lai_suitability",
                "heatmap_classes",
                "landuse_suitability_filled",
                "wind",
                "vegetation_pai_classes",
                "vegetation_height_suitability",
            ],
            nodata,
        ),
        stages::formula(
            "adult",
            ADULT_COMPOSITE,
            &["lai_fai_suitability", "nmd_ground", "adult_mca1"],
            nodata,
        ),
    ]
}
