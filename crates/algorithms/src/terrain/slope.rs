//! Slope of a surface model
//!
//! Horn (1981) 3x3 finite differences. Border cells and cells with a
//! no-data neighbour are left as no-data, matching slope tools run
//! without edge computation. The model feeds it the DSM to find flat
//! roofs.

use crate::maybe_rayon::*;
use culexmap_core::raster::Raster;
use culexmap_core::{Algorithm, Error, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    #[default]
    Degrees,
    Percent,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Vertical exaggeration applied to elevations
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
        }
    }
}

/// Slope operator
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Horn slope of a surface model, borders left as no-data"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Slope of `dem`.
///
/// ```text
/// a b c
/// d e f
/// g h i
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
/// ```
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let eight_cell_size = 8.0 * dem.cell_size();
    let z = params.z_factor;

    let cell = |row: usize, col: usize| dem.valid_f64(row, col).map(|v| v * z);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            if row == 0 || row + 1 >= rows {
                return row_data;
            }
            for col in 1..cols.saturating_sub(1) {
                let window = [
                    cell(row - 1, col - 1),
                    cell(row - 1, col),
                    cell(row - 1, col + 1),
                    cell(row, col - 1),
                    cell(row, col),
                    cell(row, col + 1),
                    cell(row + 1, col - 1),
                    cell(row + 1, col),
                    cell(row + 1, col + 1),
                ];
                let [Some(a), Some(b), Some(c), Some(d), Some(_), Some(f), Some(g), Some(h), Some(i)] = window else {
                    continue;
                };

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell_size;
                let rise = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

                row_data[col] = match params.units {
                    SlopeUnits::Degrees => rise.atan().to_degrees(),
                    SlopeUnits::Percent => rise * 100.0,
                };
            }
            row_data
        })
        .collect();

    dem.with_data(data, Some(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use culexmap_core::GeoTransform;

    fn plane(dx: f64) -> Raster<f64> {
        let mut dem = Raster::new(6, 6);
        dem.set_transform(GeoTransform::new(0.0, 12.0, 2.0, -2.0));
        for row in 0..6 {
            for col in 0..6 {
                dem.set(row, col, col as f64 * dx).unwrap();
            }
        }
        dem
    }

    #[test]
    fn flat_roof_has_zero_slope() {
        let result = slope(&plane(0.0), SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(2, 2).unwrap(), 0.0);
    }

    #[test]
    fn tilted_plane_degrees() {
        // 2 m rise per 2 m cell: 45 degrees
        let result = slope(&plane(2.0), SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(3, 3).unwrap(), 45.0, epsilon = 1e-9);

        let pct = slope(&plane(2.0), SlopeParams { units: SlopeUnits::Percent, z_factor: 1.0 }).unwrap();
        assert_relative_eq!(pct.get(3, 3).unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn borders_and_holes_are_nodata() {
        let mut dem = plane(1.0);
        dem.set_nodata(Some(-9999.0));
        dem.set(3, 3, -9999.0).unwrap();
        let result = slope(&dem, SlopeParams::default()).unwrap();

        assert!(result.is_nodata(result.get(0, 2).unwrap()));
        assert!(result.is_nodata(result.get(2, 5).unwrap()));
        assert!(result.is_nodata(result.get(2, 2).unwrap()));
        assert!(!result.is_nodata(result.get(1, 1).unwrap()));
    }
}
