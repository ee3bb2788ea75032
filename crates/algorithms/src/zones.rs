//! Regular zone grid
//!
//! Square zones of fixed spacing laid from the top-left corner of the
//! window. Zonal sums are taken over the cells whose centres fall in a
//! zone, and per-zone values can be burnt back onto the window grid.

use culexmap_core::raster::{Raster, Window};
use culexmap_core::{Error, Result};
use serde::Serialize;

/// Square zones covering a window, numbered row-major from the top-left
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGrid {
    origin_x: f64,
    origin_y: f64,
    spacing: f64,
    rows: usize,
    cols: usize,
}

impl ZoneGrid {
    /// Smallest grid of `spacing`-sized zones covering `window`.
    /// Zones on the right and bottom edges may overhang it.
    pub fn covering(window: &Window, spacing: f64) -> Result<Self> {
        if !(spacing > 0.0) {
            return Err(Error::InvalidParameter {
                name: "spacing",
                value: spacing.to_string(),
                reason: "must be positive".into(),
            });
        }
        let cols = (window.width() / spacing - 1e-9).ceil().max(1.0) as usize;
        let rows = (window.height() / spacing - 1e-9).ceil().max(1.0) as usize;
        Ok(Self {
            origin_x: window.min_x,
            origin_y: window.max_y,
            spacing,
            rows,
            cols,
        })
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Zone area in square map units
    pub fn zone_area(&self) -> f64 {
        self.spacing * self.spacing
    }

    /// Zone containing a map coordinate
    pub fn zone_of(&self, x: f64, y: f64) -> Option<usize> {
        let col = (x - self.origin_x) / self.spacing;
        let row = (self.origin_y - y) / self.spacing;
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        (col < self.cols && row < self.rows).then_some(row * self.cols + col)
    }
}

/// Count and sum of valid cells in one zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ZoneStats {
    pub count: usize,
    pub sum: f64,
}

impl ZoneStats {
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Count and sum of `raster` per zone, no-data skipped
pub fn zone_statistics(raster: &Raster<f64>, grid: &ZoneGrid) -> Vec<ZoneStats> {
    let mut stats = vec![ZoneStats::default(); grid.len()];
    let (rows, cols) = raster.shape();
    for row in 0..rows {
        for col in 0..cols {
            let Some(v) = raster.valid_f64(row, col) else {
                continue;
            };
            let (x, y) = raster.pixel_to_geo(col, row);
            if let Some(zone) = grid.zone_of(x, y) {
                stats[zone].count += 1;
                stats[zone].sum += v;
            }
        }
    }
    stats
}

/// Burn per-zone values onto the window grid at `resolution`.
///
/// `None` values burn `null_value`; cells outside every zone take
/// `nodata`, or `null_value` when there is no sentinel.
pub fn rasterize_zones(
    values: &[Option<f64>],
    grid: &ZoneGrid,
    window: &Window,
    resolution: f64,
    null_value: f64,
    nodata: Option<f64>,
) -> Result<Raster<f64>> {
    if values.len() != grid.len() {
        return Err(Error::InvalidParameter {
            name: "values",
            value: values.len().to_string(),
            reason: format!("expected one value per zone ({})", grid.len()),
        });
    }

    let template = window.raster(resolution, 0.0)?;
    let (rows, cols) = template.shape();
    let outside = nodata.unwrap_or(null_value);
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let (x, y) = template.pixel_to_geo(col, row);
            let v = match grid.zone_of(x, y) {
                Some(zone) => values[zone].unwrap_or(null_value),
                None => outside,
            };
            data.push(v);
        }
    }
    template.with_data(data, nodata)
}
