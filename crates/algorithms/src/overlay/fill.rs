//! No-data fill

use culexmap_core::raster::Raster;
use culexmap_core::{Algorithm, Error, Result};

/// Replace every no-data cell with `value`. The result has no sentinel.
pub fn fill_nodata(raster: &Raster<f64>, value: f64) -> Result<Raster<f64>> {
    let data: Vec<f64> = raster
        .data()
        .iter()
        .map(|&v| if raster.is_nodata(v) { value } else { v })
        .collect();
    raster.with_data(data, None)
}

/// No-data fill operator, parameterized by the fill value
#[derive(Debug, Clone, Default)]
pub struct FillNoData;

impl Algorithm for FillNoData {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = f64;
    type Error = Error;

    fn name(&self) -> &'static str {
        "FillNoData"
    }

    fn description(&self) -> &'static str {
        "Replace no-data cells with a fixed value"
    }

    fn execute(&self, input: Self::Input, value: f64) -> Result<Self::Output> {
        fill_nodata(&input, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_sentinel_and_nan() {
        let mut r = Raster::from_vec(vec![-9999.0, 2.0, f64::NAN, 0.5], 2, 2).unwrap();
        r.set_nodata(Some(-9999.0));
        let out = FillNoData.execute(r, 0.0).unwrap();
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![0.0, 2.0, 0.0, 0.5]);
        assert_eq!(out.nodata(), None);
    }
}
