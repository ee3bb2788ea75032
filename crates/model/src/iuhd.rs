//! Urban heat island intensity
//!
//! Per zone of the regular grid the model derives the wall area fraction,
//! the building plan area fraction and from those the height-to-width
//! ratio of the street canyon. The canyon warming
//! `7.54 + 3.97 ln(HW)` minus the cooling of vegetation cover gives the
//! heat island intensity (IUHD), which is burnt onto the window and
//! classified 1..10.
//!
//! Zone quantities are `Option<f64>`: a zone without valid cells, a zero
//! denominator or a logarithm of a non-positive ratio yields `None`, and
//! `None` propagates until it is explicitly replaced by 0.

use culexmap_algorithms::zones::{rasterize_zones, zone_statistics, ZoneGrid, ZoneStats};
use culexmap_core::{Raster, Window};
use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::formulas::{BUILDING_HEIGHT, POSITIVE_MASK};
use crate::graph::Stage;
use crate::stages;
use crate::tables;

/// Highest height-to-width ratio kept
pub const HW_CAP: f64 = 3.0;

/// `wasum * cellsize / area`
pub fn wall_area_fraction(walls: &ZoneStats, cell_size: f64, area: f64) -> Option<f64> {
    (walls.count > 0 && area > 0.0).then(|| walls.sum * cell_size / area)
}

/// `sum / count` of a 0/1 mask
pub fn plan_area_fraction(mask: &ZoneStats) -> Option<f64> {
    mask.mean()
}

/// `(wai * pai) / ((2 * pai) * (1 - pai))`
pub fn height_width_ratio(wai: Option<f64>, pai: Option<f64>) -> Option<f64> {
    let (wai, pai) = (wai?, pai?);
    let denominator = (2.0 * pai) * (1.0 - pai);
    (denominator != 0.0).then(|| (wai * pai) / denominator)
}

pub fn cap_height_width(hw: Option<f64>) -> Option<f64> {
    hw.map(|v| if v > HW_CAP { HW_CAP } else { v })
}

/// `(paiveg / 0.1) * 0.3`
pub fn vegetation_cooling(paiveg: Option<f64>) -> Option<f64> {
    paiveg.map(|p| (p / 0.1) * 0.3)
}

/// `7.54 + 3.97 * ln(hw)`, undefined for `hw <= 0`
pub fn canyon_warming(hw: Option<f64>) -> Option<f64> {
    hw.filter(|&v| v > 0.0).map(|v| 7.54 + 3.97 * v.ln())
}

/// Warming with undefined values and negatives replaced by 0
pub fn non_negative_warming(warming: Option<f64>) -> f64 {
    warming.unwrap_or(0.0).max(0.0)
}

/// Derived quantities of one zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ZoneHeat {
    pub wai: Option<f64>,
    pub pai: Option<f64>,
    pub hw: Option<f64>,
    pub hw_capped: Option<f64>,
    pub paiveg: Option<f64>,
    pub cooling: Option<f64>,
    pub warming: f64,
    pub iuhd: Option<f64>,
}

impl ZoneHeat {
    pub fn derive(walls: &ZoneStats, buildings: &ZoneStats, vegetation: &ZoneStats, cell_size: f64, area: f64) -> Self {
        let wai = wall_area_fraction(walls, cell_size, area);
        let pai = plan_area_fraction(buildings);
        let hw = height_width_ratio(wai, pai);
        let hw_capped = cap_height_width(hw);
        let paiveg = plan_area_fraction(vegetation);
        let cooling = vegetation_cooling(paiveg);
        let warming = non_negative_warming(canyon_warming(hw_capped));
        Self {
            wai,
            pai,
            hw,
            hw_capped,
            paiveg,
            cooling,
            warming,
            iuhd: cooling.map(|c| warming - c),
        }
    }
}

/// Per-zone heat island quantities from wall heights and the building and
/// vegetation masks. Wall area is counted in wall-height cells.
pub fn zone_heat(
    walls: &Raster<f64>,
    buildings: &Raster<f64>,
    vegetation: &Raster<f64>,
    grid: &ZoneGrid,
) -> Vec<ZoneHeat> {
    let wall_stats = zone_statistics(walls, grid);
    let building_stats = zone_statistics(buildings, grid);
    let vegetation_stats = zone_statistics(vegetation, grid);
    let cell_size = walls.cell_size();
    let area = grid.zone_area();

    wall_stats
        .iter()
        .zip(&building_stats)
        .zip(&vegetation_stats)
        .map(|((w, b), v)| ZoneHeat::derive(w, b, v, cell_size, area))
        .collect()
}

/// Burn the zone IUHD onto the window; undefined zones burn 0
pub fn iuhd_surface(zones: &[ZoneHeat], grid: &ZoneGrid, window: &Window, resolution: f64) -> Result<Raster<f64>> {
    let values: Vec<Option<f64>> = zones.iter().map(|z| z.iuhd).collect();
    let defined = values.iter().filter(|v| v.is_some()).count();
    debug!(zones = values.len(), defined, "iuhd zones");
    Ok(rasterize_zones(&values, grid, window, resolution, 0.0, None)?)
}

/// Stages from DSM, DEM, CDSM and wall heights to the classified `iuhd`
pub fn stages(settings: &Settings, window: &Window, grid: &ZoneGrid) -> Vec<Stage> {
    let nodata = settings.nodata;
    let resolution = settings.resolution;
    let window = window.clone();
    let grid = grid.clone();

    vec![
        stages::formula_with_constants(
            "building_height",
            BUILDING_HEIGHT,
            &["dsm", "dem"],
            vec![settings.dem_offset, settings.building_threshold],
            nodata,
        ),
        stages::formula("building_mask", POSITIVE_MASK, &["building_height"], nodata),
        stages::formula("vegetation_mask", POSITIVE_MASK, &["cdsm"], nodata),
        Stage::new(
            "iuhd_surface",
            &["wall_height", "building_mask", "vegetation_mask"],
            move |inputs| {
                let zones = zone_heat(
                    inputs.get("wall_height")?,
                    inputs.get("building_mask")?,
                    inputs.get("vegetation_mask")?,
                    &grid,
                );
                iuhd_surface(&zones, &grid, &window, resolution)
            },
        ),
        stages::reclass("iuhd", "iuhd_surface", tables::iuhd(), nodata),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stats(count: usize, sum: f64) -> ZoneStats {
        ZoneStats { count, sum }
    }

    #[test]
    fn canyon_ratio() {
        // 40 % built, wall fraction 0.6
        let hw = height_width_ratio(Some(0.6), Some(0.4)).unwrap();
        assert_relative_eq!(hw, 0.24 / 0.48);
        assert_eq!(height_width_ratio(Some(0.6), Some(0.0)), None);
        assert_eq!(height_width_ratio(Some(0.6), Some(1.0)), None);
        assert_eq!(height_width_ratio(None, Some(0.5)), None);
    }

    #[test]
    fn ratio_is_capped() {
        assert_eq!(cap_height_width(Some(7.5)), Some(3.0));
        assert_eq!(cap_height_width(Some(1.5)), Some(1.5));
        assert_eq!(cap_height_width(None), None);
    }

    #[test]
    fn warming_of_unit_ratio() {
        assert_relative_eq!(canyon_warming(Some(1.0)).unwrap(), 7.54);
        assert_eq!(canyon_warming(Some(0.0)), None);
        // ln of a small ratio drives the warming negative, clipped to 0
        assert_eq!(non_negative_warming(canyon_warming(Some(0.01))), 0.0);
        assert_eq!(non_negative_warming(None), 0.0);
    }

    #[test]
    fn unbuilt_zone_is_cooling_only() {
        let z = ZoneHeat::derive(&stats(100, 0.0), &stats(100, 0.0), &stats(100, 50.0), 1.0, 10_000.0);
        assert_eq!(z.pai, Some(0.0));
        assert_eq!(z.hw, None);
        assert_eq!(z.warming, 0.0);
        assert_relative_eq!(z.cooling.unwrap(), 1.5);
        assert_relative_eq!(z.iuhd.unwrap(), -1.5);
    }

    #[test]
    fn empty_zone_has_no_iuhd() {
        let z = ZoneHeat::derive(&stats(0, 0.0), &stats(0, 0.0), &stats(0, 0.0), 1.0, 10_000.0);
        assert_eq!(z.wai, None);
        assert_eq!(z.iuhd, None);
    }

    #[test]
    fn dense_zone() {
        // 5000 wall cells of 1 m, half the zone built, no trees
        let z = ZoneHeat::derive(&stats(10_000, 5000.0), &stats(10_000, 5000.0), &stats(10_000, 0.0), 1.0, 10_000.0);
        assert_relative_eq!(z.wai.unwrap(), 0.5);
        assert_relative_eq!(z.hw.unwrap(), 0.5);
        assert_relative_eq!(z.iuhd.unwrap(), 7.54 + 3.97 * 0.5_f64.ln());
    }
}
