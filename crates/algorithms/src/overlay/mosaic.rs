//! Max-mosaic of co-registered rasters

use crate::maybe_rayon::*;
use culexmap_core::raster::Raster;
use culexmap_core::{Algorithm, Error, Result};

/// Merge rasters by cell-wise maximum.
///
/// Each input's no-data cells count as 0 before combining, so the result
/// has no no-data. Inputs with disjoint non-zero footprints merge into
/// their union. All inputs must share one grid.
pub fn mosaic(rasters: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let Some(first) = rasters.first() else {
        return Err(Error::InvalidParameter {
            name: "rasters",
            value: "0".into(),
            reason: "mosaic needs at least one input".into(),
        });
    };

    let tolerance = first.cell_size() * 1e-6;
    for raster in &rasters[1..] {
        if raster.shape() != first.shape() {
            return Err(Error::SizeMismatch {
                er: first.rows(),
                ec: first.cols(),
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
        if !raster.same_grid(first, tolerance) {
            return Err(Error::Alignment {
                expected: format!("{:?}", first.transform().to_gdal()),
                actual: format!("{:?}", raster.transform().to_gdal()),
            });
        }
    }

    let (rows, cols) = first.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    rasters
                        .iter()
                        .map(|r| r.valid_f64(row, col).unwrap_or(0.0))
                        .fold(f64::NEG_INFINITY, f64::max)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    first.with_data(data, None)
}

/// Max-mosaic operator
#[derive(Debug, Clone, Default)]
pub struct Mosaic;

impl Algorithm for Mosaic {
    type Input = Vec<Raster<f64>>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Mosaic"
    }

    fn description(&self) -> &'static str {
        "Merge co-registered rasters by cell-wise maximum, no-data as zero"
    }

    fn execute(&self, input: Self::Input, _params: ()) -> Result<Self::Output> {
        let refs: Vec<&Raster<f64>> = input.iter().collect();
        mosaic(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use culexmap_core::GeoTransform;

    fn make_layer(values: Vec<f64>, nodata: Option<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        r.set_nodata(nodata);
        r
    }

    #[test]
    fn disjoint_footprints_union() {
        let gardens = make_layer(vec![15.0, 0.0, 0.0, 0.0], None);
        let industries = make_layer(vec![0.0, 0.0, 0.0, 16.0], None);
        let out = mosaic(&[&gardens, &industries]).unwrap();
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![15.0, 0.0, 0.0, 16.0]);
        assert_eq!(out.nodata(), None);
    }

    #[test]
    fn nodata_counts_as_zero() {
        let a = make_layer(vec![-9999.0, 3.0, -9999.0, 1.0], Some(-9999.0));
        let b = make_layer(vec![f64::NAN, 2.0, 5.0, 0.0], None);
        let out = mosaic(&[&a, &b]).unwrap();
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![0.0, 3.0, 5.0, 1.0]);
    }

    #[test]
    fn order_does_not_matter() {
        let a = make_layer(vec![1.0, -9999.0, 7.0, 2.0], Some(-9999.0));
        let b = make_layer(vec![4.0, 3.0, 0.0, 2.5], Some(0.0));
        let ab = mosaic(&[&a, &b]).unwrap();
        let ba = mosaic(&[&b, &a]).unwrap();
        assert_eq!(ab.data(), ba.data());
    }

    #[test]
    fn empty_or_mismatched_input_fails() {
        assert!(mosaic(&[]).is_err());
        let a = make_layer(vec![1.0; 4], None);
        let b = Raster::filled(3, 3, 1.0);
        assert!(mosaic(&[&a, &b]).is_err());
    }
}
