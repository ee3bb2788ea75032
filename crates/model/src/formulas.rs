//! Band formulas of the model
//!
//! Bands bind in order: `A` is the first input, `B` the second and so on.
//! Comparisons evaluate to 1 or 0.

use culexmap_algorithms::overlay::BandFormula;

fn flag(cond: bool) -> f64 {
    if cond {
        1.0
    } else {
        0.0
    }
}

/// NMD codes counted as vegetation
const VEGETATION_CODES: [f64; 18] = [
    2.0, 42.0, 111.0, 112.0, 113.0, 114.0, 115.0, 116.0, 117.0, 118.0, 121.0, 122.0, 123.0, 124.0, 125.0,
    126.0, 127.0, 128.0,
];

fn building_height(v: &[f64]) -> f64 {
    let h = v[0] - (v[1] - v[2]);
    if h < v[3] {
        0.0
    } else {
        h
    }
}

/// `A - (B - C)`, zeroed below `D`: DSM, DEM, DEM offset, threshold
pub const BUILDING_HEIGHT: BandFormula = BandFormula::new("building_height", 4, building_height);

/// `A > 0`
pub const POSITIVE_MASK: BandFormula = BandFormula::new("positive_mask", 1, |v| flag(v[0] > 0.0));

/// `(A == 0) * 100 + (A == 1) * B`: building mask, slope
pub const ROOFTOP_MASK: BandFormula = BandFormula::new("rooftop_mask", 2, |v| {
    flag(v[0] == 0.0) * 100.0 + flag(v[0] == 1.0) * v[1]
});

/// `(A < 8) * A + (A >= 8) * 130`
pub const FLAT_ROOF: BandFormula = BandFormula::new("flat_roof", 1, |v| {
    flag(v[0] < 8.0) * v[0] + flag(v[0] >= 8.0) * 130.0
});

/// `(A + B) / 2`
pub const MEAN_OF_TWO: BandFormula = BandFormula::new("mean_of_two", 2, |v| (v[0] + v[1]) / 2.0);

/// `A * 0.9 + B * 0.1`: land cover/use, heat island class
pub const OVIPOSITION: BandFormula = BandFormula::new("oviposition", 2, |v| v[0] * 0.9 + v[1] * 0.1);

/// 1 where `A` is a vegetated NMD code
pub const VEGETATION_INDICATOR: BandFormula = BandFormula::new("vegetation_indicator", 1, |v| {
    VEGETATION_CODES.iter().map(|&code| flag(v[0] == code)).sum()
});

/// `A * B`
pub const PRODUCT: BandFormula = BandFormula::new("product", 2, |v| v[0] * v[1]);

/// `A / 1000`
pub const METRES_TO_KM: BandFormula = BandFormula::new("metres_to_km", 1, |v| v[0] / 1000.0);

/// `min(A, 0.9)`
pub const FAI_CLAMP: BandFormula = BandFormula::new("fai_clamp", 1, |v| if v[0] > 0.9 { 0.9 } else { v[0] });

/// `(((A * 0.6) * B) + C) / 2`: LAI class, vegetation FAI, building FAI
pub const LAI_FAI: BandFormula = BandFormula::new("lai_fai", 3, |v| (((v[0] * 0.6) * v[1]) + v[2]) / 2.0);

/// `2.6 * 2.71828 ^ (-0.015 * A)`, A in km from the sea
pub const WIND_REDUCTION_OCEAN: BandFormula =
    BandFormula::new("wind_reduction_ocean", 1, |v| 2.6 * 2.71828_f64.powf(-0.015 * v[0]));

/// `2.6 * (A / 2) ^ 0.2`, A the mean elevation
pub const WIND_TOPO: BandFormula = BandFormula::new("wind_topo", 1, |v| 2.6 * (v[0] / 2.0).powf(0.2));

/// LAI, hotspots, land use, wind, vegetation PAI, vegetation height
pub const ADULT_MCA1: BandFormula = BandFormula::new("adult_mca1", 6, |v| {
    v[0] * 0.18 + v[1] * 0.18 + v[2] * 0.13 + v[3] * 0.13 + v[4] * 0.13 + v[5] * 0.1
});

/// `A * 0.1 + B * 0.05 + C`: LAI/FAI, NMD ground, first adult composite
pub const ADULT_COMPOSITE: BandFormula =
    BandFormula::new("adult_composite", 3, |v| v[0] * 0.1 + v[1] * 0.05 + v[2]);

pub const ALL: [BandFormula; 15] = [
    BUILDING_HEIGHT,
    POSITIVE_MASK,
    ROOFTOP_MASK,
    FLAT_ROOF,
    MEAN_OF_TWO,
    OVIPOSITION,
    VEGETATION_INDICATOR,
    PRODUCT,
    METRES_TO_KM,
    FAI_CLAMP,
    LAI_FAI,
    WIND_REDUCTION_OCEAN,
    WIND_TOPO,
    ADULT_MCA1,
    ADULT_COMPOSITE,
];

/// Look a formula up by its name
pub fn by_name(name: &str) -> Option<BandFormula> {
    ALL.iter().find(|f| f.name == name).copied()
}
