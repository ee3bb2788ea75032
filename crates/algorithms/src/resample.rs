//! Nearest-neighbour warp onto the study-area window

use crate::maybe_rayon::*;
use culexmap_core::raster::{Raster, Window};
use culexmap_core::{Error, Result};
use tracing::debug;

/// Resample `source` onto the window grid at `resolution`.
///
/// Each target cell takes the source cell under its centre. Target cells
/// outside the source get the source no-data value, or 0 when it has none.
/// The result keeps the source sentinel and takes the window's CRS.
pub fn resample_to_window(source: &Raster<f64>, window: &Window, resolution: f64) -> Result<Raster<f64>> {
    if !source.transform().is_valid() {
        return Err(Error::InvalidParameter {
            name: "source",
            value: format!("{:?}", source.transform().to_gdal()),
            reason: "geotransform cannot be inverted".into(),
        });
    }
    if let (Some(a), Some(b)) = (source.crs(), window.crs.as_ref()) {
        if !a.is_equivalent(b) {
            return Err(Error::CrsMismatch(a.to_string(), b.to_string()));
        }
    }

    let target = window.raster(resolution, 0.0)?;
    let (rows, cols) = target.shape();
    let transform = *target.transform();
    let outside = source.nodata().unwrap_or(0.0);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (x, y) = transform.pixel_to_geo(col, row);
                    match source.cell_at(x, y) {
                        Some((r, c)) => source.data()[(r, c)],
                        None => outside,
                    }
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    debug!(
        from = ?source.shape(),
        to = ?(rows, cols),
        resolution,
        "nearest-neighbour resample"
    );
    target.with_data(data, source.nodata())
}

#[cfg(test)]
mod tests {
    use super::*;
    use culexmap_core::{GeoTransform, CRS};

    fn coarse() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));
        r
    }

    #[test]
    fn upsample_replicates_cells() {
        let window = Window::new(0.0, 20.0, 0.0, 20.0, None).unwrap();
        let out = resample_to_window(&coarse(), &window, 5.0).unwrap();
        assert_eq!(out.shape(), (4, 4));
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(1, 1).unwrap(), 1.0);
        assert_eq!(out.get(0, 3).unwrap(), 2.0);
        assert_eq!(out.get(3, 0).unwrap(), 3.0);
        assert_eq!(out.get(3, 3).unwrap(), 4.0);
        assert!(window.ensure_aligned(&out, 5.0).is_ok());
    }

    #[test]
    fn outside_source_is_zero_or_nodata() {
        let window = Window::new(-10.0, 20.0, 0.0, 20.0, None).unwrap();
        let out = resample_to_window(&coarse(), &window, 10.0).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0.0);
        assert_eq!(out.get(0, 1).unwrap(), 1.0);

        let mut with_nd = coarse();
        with_nd.set_nodata(Some(-9999.0));
        let out = resample_to_window(&with_nd, &window, 10.0).unwrap();
        assert!(out.is_nodata(out.get(1, 0).unwrap()));
    }

    #[test]
    fn crs_mismatch_is_fatal() {
        let mut r = coarse();
        r.set_crs(Some(CRS::from_epsg(4326)));
        let window = Window::new(0.0, 20.0, 0.0, 20.0, Some(CRS::sweref99_tm())).unwrap();
        assert!(matches!(
            resample_to_window(&r, &window, 10.0),
            Err(Error::CrsMismatch(..))
        ));
    }
}
