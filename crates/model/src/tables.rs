//! Reclassification tables of the model
//!
//! Every table is upper-inclusive (`low < v <= high`) and keeps values
//! that match no row, except the rooftop collapse which blanks them.

use culexmap_algorithms::overlay::{ReclassTable, Unmatched};

fn table(rows: &[(f64, f64, f64)]) -> ReclassTable {
    ReclassTable::new(rows.iter().copied()).with_unmatched(Unmatched::KeepOriginal)
}

/// Raw heat island intensity into ten classes
pub fn iuhd() -> ReclassTable {
    table(&[
        (-3.0, -2.33, 1.0),
        (-2.33, -1.66, 2.0),
        (-1.66, -0.99, 3.0),
        (-0.99, -0.33, 4.0),
        (-0.33, 0.33, 5.0),
        (0.33, 1.0, 6.0),
        (1.0, 1.66, 7.0),
        (1.66, 2.33, 8.0),
        (2.33, 3.0, 9.0),
        (3.0, 100.0, 10.0),
    ])
}

/// NMD land cover (with flat roofs as 129) into oviposition suitability
pub fn land_cover() -> ReclassTable {
    table(&[
        (1.0, 2.0, 7.0),     // open wetland
        (2.0, 3.0, 4.0),     // arable land
        (40.0, 41.0, 2.0),   // non-vegetated open land
        (41.0, 42.0, 4.0),   // vegetated open land
        (50.0, 51.0, 1.0),   // buildings
        (51.0, 52.0, 3.0),   // other artificial surfaces
        (52.0, 53.0, 0.0),   // roads and railways
        (60.0, 61.0, 0.0),   // lakes and watercourses
        (61.0, 62.0, 0.0),   // sea
        (110.0, 111.0, 4.0), // pine
        (111.0, 112.0, 4.0), // spruce
        (112.0, 113.0, 4.0), // mixed coniferous
        (113.0, 114.0, 5.0), // mixed forest
        (114.0, 115.0, 5.0), // deciduous
        (115.0, 116.0, 6.0), // deciduous hardwood
        (116.0, 117.0, 6.0), // deciduous with hardwood
        (117.0, 118.0, 4.0), // temporarily non-forest
        (120.0, 121.0, 6.0), // pine on wetland
        (121.0, 122.0, 6.0), // spruce on wetland
        (122.0, 123.0, 6.0), // mixed coniferous on wetland
        (123.0, 124.0, 7.0), // mixed forest on wetland
        (124.0, 125.0, 7.0), // deciduous on wetland
        (125.0, 126.0, 9.0), // deciduous hardwood on wetland
        (126.0, 127.0, 8.0), // deciduous with hardwood on wetland
        (127.0, 128.0, 6.0), // temporarily non-forest on wetland
        (128.0, 129.0, 4.0), // flat roofs
    ])
}

/// Merged land-use codes (gardens 15, industries 16) into suitability
pub fn land_use() -> ReclassTable {
    table(&[
        (-1.0, 0.0, 5.0), // no specific land use
        (0.0, 1.0, 2.0),  // airport
        (1.0, 2.0, 5.0),  // cemetery
        (2.0, 3.0, 6.0),  // quarry
        (3.0, 4.0, 4.0),  // peat extraction
        (4.0, 5.0, 5.0),  // mining
        (5.0, 6.0, 5.0),  // grazing
        (6.0, 7.0, 5.0),  // power lines
        (7.0, 8.0, 9.0),  // allotment gardens
        (8.0, 9.0, 7.0),  // camping
        (9.0, 10.0, 6.0), // golf course
        (10.0, 11.0, 5.0),
        (11.0, 12.0, 2.0),
        (12.0, 13.0, 3.0),
        (13.0, 14.0, 6.0),
        (14.0, 15.0, 9.0), // residential gardens
        (15.0, 16.0, 5.0), // industry
    ])
}

/// NMD land cover into adult habitat suitability.
///
/// Each row snaps one integer code with a +-0.1 band, so fractional
/// values between codes fall through unchanged.
pub fn nmd_ground() -> ReclassTable {
    table(&[
        (1.9, 2.1, 6.0),
        (2.9, 3.1, 4.0),
        (40.9, 41.1, 3.0),
        (41.9, 42.1, 5.0),
        (50.9, 51.1, 0.0),
        (51.9, 52.1, 0.0),
        (52.9, 53.1, 0.0),
        (60.9, 61.1, 0.0),
        (61.9, 62.1, 0.0),
        (110.9, 111.1, 7.0),
        (111.9, 112.1, 7.0),
        (112.9, 113.1, 7.0),
        (113.9, 114.1, 7.0),
        (114.9, 115.1, 8.0),
        (115.9, 116.1, 8.0),
        (116.9, 117.1, 8.0),
        (117.9, 118.1, 5.0),
        (120.9, 121.1, 8.0),
        (121.9, 122.1, 8.0),
        (122.9, 123.1, 8.0),
        (123.9, 124.1, 8.0),
        (124.9, 125.1, 10.0),
        (125.9, 126.1, 10.0),
        (126.9, 127.1, 10.0),
        (127.9, 128.1, 6.0),
    ])
}

pub fn lai() -> ReclassTable {
    table(&[
        (0.0, 0.05, 1.0),
        (0.05, 0.5, 4.0),
        (0.5, 1.0, 5.0),
        (1.0, 1.5, 6.0),
        (1.5, 2.0, 7.0),
        (2.0, 2.5, 8.0),
        (2.5, 3.0, 9.0),
        (3.0, 100.0, 10.0),
    ])
}

/// Heatmap values into ten hotspot tiers of 200
pub fn hotspot() -> ReclassTable {
    table(&[
        (0.0, 200.0, 1.0),
        (200.0, 400.0, 2.0),
        (400.0, 600.0, 3.0),
        (600.0, 800.0, 4.0),
        (800.0, 1000.0, 5.0),
        (1000.0, 1200.0, 6.0),
        (1200.0, 1400.0, 7.0),
        (1400.0, 1600.0, 8.0),
        (1600.0, 1800.0, 9.0),
        (1800.0, 3000.0, 10.0),
    ])
}

pub fn vegetation_pai() -> ReclassTable {
    table(&[
        (0.0, 0.1, 1.0),
        (0.1, 0.2, 2.0),
        (0.2, 0.3, 3.0),
        (0.3, 0.4, 4.0),
        (0.4, 0.5, 5.0),
        (0.5, 0.6, 6.0),
        (0.6, 0.7, 7.0),
        (0.7, 0.8, 8.0),
        (0.8, 0.9, 9.0),
        (0.9, 1.0, 10.0),
    ])
}

/// Topographic wind speed (m/s) into shelter classes
pub fn wind_speed_height() -> ReclassTable {
    table(&[
        (0.0, 1.6482, 10.0),
        (1.6482, 2.1574, 9.0),
        (2.1574, 2.6666, 8.0),
        (2.6666, 3.1758, 7.0),
        (3.1758, 3.685, 6.0),
        (3.685, 4.1942, 5.0),
        (4.1942, 4.7034, 4.0),
        (4.7034, 5.2126, 3.0),
        (5.2126, 5.7218, 2.0),
        (5.7218, 100.0, 10.0),
    ])
}

pub fn vegetation_height() -> ReclassTable {
    table(&[
        (0.0, 5.0, 10.0),
        (5.0, 10.0, 9.0),
        (10.0, 20.0, 8.0),
        (20.0, 30.0, 7.0),
        (30.0, 100.0, 6.0),
    ])
}

pub fn lai_fai() -> ReclassTable {
    table(&[
        (0.0, 0.05, 1.0),
        (0.05, 0.5, 4.0),
        (0.5, 1.0, 5.0),
        (1.0, 1.5, 6.0),
        (1.5, 2.0, 7.0),
        (2.0, 2.5, 8.0),
        (2.5, 3.0, 9.0),
        (3.0, 100.0, 10.0),
    ])
}

/// Sea-driven wind reduction into shelter classes
pub fn wind_reduction_ocean() -> ReclassTable {
    table(&[
        (-1.0, 0.01, 1.0), // beyond the proximity limit
        (0.01, 1.82, 10.0),
        (1.82, 1.90, 9.0),
        (1.90, 1.99, 8.0),
        (1.99, 2.08, 7.0),
        (2.08, 2.16, 6.0),
        (2.16, 2.25, 5.0),
        (2.25, 2.34, 4.0),
        (2.34, 2.42, 3.0),
        (2.42, 2.51, 2.0),
        (2.51, 5.00, 1.0),
    ])
}

/// Lifts zero and near-zero classes to 1
pub fn no_zero() -> ReclassTable {
    table(&[(-10.0, 0.1, 1.0)])
}

/// Any slope 0..=90 becomes the flat-roof code 129; everything else no-data
pub fn rooftop() -> ReclassTable {
    ReclassTable::collapse(0.0, 90.0, 129.0)
}

/// Names accepted by [`by_name`]
pub const NAMES: [&str; 13] = [
    "iuhd",
    "land_cover",
    "land_use",
    "nmd_ground",
    "lai",
    "hotspot",
    "vegetation_pai",
    "wind_speed_height",
    "vegetation_height",
    "lai_fai",
    "wind_reduction_ocean",
    "no_zero",
    "rooftop",
];

/// Look a table up by name
pub fn by_name(name: &str) -> Option<ReclassTable> {
    let table = match name {
        "iuhd" => iuhd(),
        "land_cover" => land_cover(),
        "land_use" => land_use(),
        "nmd_ground" => nmd_ground(),
        "lai" => lai(),
        "hotspot" => hotspot(),
        "vegetation_pai" => vegetation_pai(),
        "wind_speed_height" => wind_speed_height(),
        "vegetation_height" => vegetation_height(),
        "lai_fai" => lai_fai(),
        "wind_reduction_ocean" => wind_reduction_ocean(),
        "no_zero" => no_zero(),
        "rooftop" => rooftop(),
        _ => return None,
    };
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves() {
        for name in NAMES {
            assert!(by_name(name).is_some(), "{}", name);
        }
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn iuhd_zero_is_neutral_class() {
        let t = iuhd();
        assert_eq!(t.lookup(0.0), Some(5.0));
        assert_eq!(t.lookup(0.33), Some(5.0));
        assert_eq!(t.lookup(0.34), Some(6.0));
        assert_eq!(t.lookup(7.54), Some(10.0));
    }

    #[test]
    fn land_cover_codes() {
        let t = land_cover();
        assert_eq!(t.lookup(2.0), Some(7.0));
        assert_eq!(t.lookup(51.0), Some(1.0));
        assert_eq!(t.lookup(62.0), Some(0.0));
        assert_eq!(t.lookup(125.0), Some(7.0));
        assert_eq!(t.lookup(129.0), Some(4.0));
        // codes 3..40 are not listed
        assert_eq!(t.lookup(20.0), None);
    }

    #[test]
    fn land_use_overlays() {
        let t = land_use();
        assert_eq!(t.lookup(0.0), Some(5.0));
        assert_eq!(t.lookup(15.0), Some(9.0));
        assert_eq!(t.lookup(16.0), Some(5.0));
    }

    #[test]
    fn nmd_ground_snap_gaps_are_kept() {
        let t = nmd_ground();
        assert_eq!(t.lookup(111.0), Some(7.0));
        assert_eq!(t.lookup(125.0), Some(10.0));
        assert_eq!(t.lookup(111.5), None);
    }

    #[test]
    fn hotspot_tiers() {
        let t = hotspot();
        assert_eq!(t.lookup(0.0), None);
        assert_eq!(t.lookup(150.0), Some(1.0));
        assert_eq!(t.lookup(200.0), Some(1.0));
        assert_eq!(t.lookup(200.5), Some(2.0));
        assert_eq!(t.lookup(2500.0), Some(10.0));
    }

    #[test]
    fn no_zero_lifts_zero_only() {
        let t = no_zero();
        assert_eq!(t.lookup(0.0), Some(1.0));
        assert_eq!(t.lookup(4.0), None);
    }

    #[test]
    fn rooftop_collapse_is_inclusive() {
        let t = rooftop();
        assert_eq!(t.lookup(0.0), Some(129.0));
        assert_eq!(t.lookup(90.0), Some(129.0));
        assert_eq!(t.lookup(130.0), None);
        assert_eq!(t.unmatched, Unmatched::NoData);
    }
}
