//! Kernel density estimation over a point set

use super::kernel::{kernel_value, KernelShape, OutputValues};
use super::{KdTree, SamplePoint};
use crate::maybe_rayon::*;
use culexmap_core::raster::{GeoTransform, Raster, Window};
use culexmap_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sentinel carried by density surfaces; no cell is ever set to it
pub const KDE_NODATA: f64 = -9999.0;

/// Parameters for [`kernel_density`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdeParams {
    /// Search radius in map units
    pub radius: f64,
    /// Output cell size in map units
    pub pixel_size: f64,
    pub kernel: KernelShape,
    pub output: OutputValues,
    /// Triangular kernel decay
    pub decay: f64,
}

impl Default for KdeParams {
    fn default() -> Self {
        Self {
            radius: 400.0,
            pixel_size: 10.0,
            kernel: KernelShape::Triweight,
            output: OutputValues::Raw,
            decay: 0.0,
        }
    }
}

impl KdeParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.radius > 0.0) {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: self.radius.to_string(),
                reason: "must be positive".into(),
            });
        }
        if !(self.pixel_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "pixel_size",
                value: self.pixel_size.to_string(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Density surface of unweighted `points`.
///
/// The surface covers the points' bounding box grown by the radius, at
/// `pixel_size`. Each cell sums the kernel of every point within the
/// radius of its centre. An empty point set yields an all-zero surface on
/// `fallback` instead of failing.
pub fn kernel_density(points: &[SamplePoint], params: &KdeParams, fallback: &Window) -> Result<Raster<f64>> {
    params.validate()?;

    if points.is_empty() {
        warn!(window = %fallback, "no points for density estimation, using an all-zero surface");
        let mut empty = fallback.raster(params.pixel_size, 0.0)?;
        empty.set_nodata(Some(KDE_NODATA));
        return Ok(empty);
    }

    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    );
    let (min_x, min_y) = (min_x - params.radius, min_y - params.radius);
    let (max_x, max_y) = (max_x + params.radius, max_y + params.radius);

    let ps = params.pixel_size;
    let cols = (((max_x - min_x) / ps).ceil() + 1.0).max(1.0) as usize;
    let rows = (((max_y - min_y) / ps).ceil() + 1.0).max(1.0) as usize;
    let transform = GeoTransform::new(min_x, min_y + rows as f64 * ps, ps, -ps);

    debug!(points = points.len(), rows, cols, "kernel density grid");

    let tree = KdTree::build(points);
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = transform.pixel_to_geo(col, row);
                tree.for_each_within(x, y, params.radius, |_, dist_sq| {
                    *cell += kernel_value(params.kernel, params.output, dist_sq.sqrt(), params.radius, params.decay);
                });
            }
            row_data
        })
        .collect();

    let mut surface = Raster::from_vec(data, rows, cols)?;
    surface.set_transform(transform);
    surface.set_crs(fallback.crs.clone());
    surface.set_nodata(Some(KDE_NODATA));
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn window() -> Window {
        Window::new(0.0, 1000.0, 0.0, 1000.0, None).unwrap()
    }

    #[test]
    fn empty_points_give_zero_surface_on_window() {
        let surface = kernel_density(&[], &KdeParams::default(), &window()).unwrap();
        assert_eq!(surface.shape(), (100, 100));
        assert!(surface.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn single_point_peaks_at_its_cell() {
        let p = SamplePoint::new(505.0, 505.0, 1.0);
        let params = KdeParams { radius: 50.0, pixel_size: 10.0, ..Default::default() };
        let surface = kernel_density(&[p], &params, &window()).unwrap();

        // Extent 455..555 grown to 11 x 11 cells
        assert_eq!(surface.shape(), (11, 11));
        let (row, col) = surface.cell_at(505.0, 505.0).unwrap();
        let peak = surface.get(row, col).unwrap();
        let stats = surface.statistics();
        assert_relative_eq!(stats.max.unwrap(), peak);

        // Neighbouring cell centre sits 10 m away
        let (x, y) = surface.pixel_to_geo(col + 1, row);
        let d = ((x - 505.0).powi(2) + (y - 505.0).powi(2)).sqrt();
        let expected = kernel_value(KernelShape::Triweight, OutputValues::Raw, d, 50.0, 0.0);
        assert_relative_eq!(surface.get(row, col + 1).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn densities_add_up() {
        let params = KdeParams { radius: 30.0, ..Default::default() };
        let one = kernel_density(&[SamplePoint::new(100.0, 100.0, 1.0)], &params, &window()).unwrap();
        let two = kernel_density(
            &[SamplePoint::new(100.0, 100.0, 1.0), SamplePoint::new(100.0, 100.0, 1.0)],
            &params,
            &window(),
        )
        .unwrap();
        for (a, b) in one.data().iter().zip(two.data().iter()) {
            assert_relative_eq!(2.0 * a, *b);
        }
    }

    #[test]
    fn invalid_params_rejected() {
        let params = KdeParams { radius: 0.0, ..Default::default() };
        assert!(kernel_density(&[], &params, &window()).is_err());
    }
}
