//! Point sampling and kernel density estimation
//!
//! Cells become points at their centres, points are indexed in a k-d tree
//! and a kernel is summed over every point within the search radius of
//! each output cell.

mod kde;
mod kdtree;
mod kernel;

pub use kde::{kernel_density, KdeParams, KDE_NODATA};
pub use kdtree::KdTree;
pub use kernel::{kernel_value, KernelShape, OutputValues};

use culexmap_core::raster::Raster;
use serde::Serialize;

/// A point location carrying the value of the cell it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    #[inline]
    pub fn dist_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// One point per valid cell, at the cell centre, tagged with its value.
/// No-data cells produce no point.
pub fn pixels_to_points(raster: &Raster<f64>) -> Vec<SamplePoint> {
    let (rows, cols) = raster.shape();
    let mut points = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if let Some(v) = raster.valid_f64(row, col) {
                let (x, y) = raster.pixel_to_geo(col, row);
                points.push(SamplePoint::new(x, y, v));
            }
        }
    }
    points
}

/// Keep the points whose value equals `value`
pub fn select_value(points: Vec<SamplePoint>, value: f64) -> Vec<SamplePoint> {
    points.into_iter().filter(|p| p.value == value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use culexmap_core::GeoTransform;

    #[test]
    fn points_at_cell_centres_skip_nodata() {
        let mut r = Raster::from_vec(vec![1.0, 0.0, -9999.0, 1.0], 2, 2).unwrap();
        r.set_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0));
        r.set_nodata(Some(-9999.0));

        let points = pixels_to_points(&r);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], SamplePoint::new(105.0, 195.0, 1.0));
        assert_eq!(points[2], SamplePoint::new(115.0, 185.0, 1.0));

        let ones = select_value(points, 1.0);
        assert_eq!(ones.len(), 2);
    }
}
