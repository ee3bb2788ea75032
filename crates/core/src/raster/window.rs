//! Study-area window
//!
//! The window is derived once from a reference raster and every later
//! fetch, clip and warp requests exactly this extent, so all derived
//! rasters land on one pixel grid.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extent plus target spatial reference of the study area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub crs: Option<CRS>,
}

impl Window {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64, crs: Option<CRS>) -> Result<Self> {
        let finite = [min_x, max_x, min_y, max_y].iter().all(|v| v.is_finite());
        if !finite || max_x <= min_x || max_y <= min_y {
            return Err(Error::InvalidWindow(format!(
                "extent ({}, {}, {}, {}) is empty or not finite",
                min_x, max_x, min_y, max_y
            )));
        }
        Ok(Self { min_x, max_x, min_y, max_y, crs })
    }

    /// Window covering a reference raster exactly.
    ///
    /// `min_x = origin_x`, `max_y = origin_y`,
    /// `max_x = min_x + pixel_width * cols`, `min_y = max_y + pixel_height * rows`.
    pub fn from_reference<T: RasterElement>(reference: &Raster<T>) -> Result<Self> {
        let (rows, cols) = reference.shape();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidWindow(format!(
                "reference raster has zero size ({} x {})",
                cols, rows
            )));
        }
        let gt = reference.transform();
        if !gt.is_valid() || !gt.is_north_up() {
            return Err(Error::InvalidWindow(format!(
                "reference geotransform {:?} is unusable",
                gt.to_gdal()
            )));
        }

        let min_x = gt.origin_x;
        let max_y = gt.origin_y;
        let max_x = min_x + gt.pixel_width * cols as f64;
        let min_y = max_y + gt.pixel_height * rows as f64;
        Self::new(min_x, max_x, min_y, max_y, reference.crs().cloned())
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// `gdal_translate -projwin` style string: `minx,maxx,miny,maxy [EPSG:n]`
    pub fn projwin(&self) -> String {
        match &self.crs {
            Some(crs) => format!(
                "{},{},{},{} [{}]",
                self.min_x, self.max_x, self.min_y, self.max_y, crs
            ),
            None => format!("{},{},{},{}", self.min_x, self.max_x, self.min_y, self.max_y),
        }
    }

    /// (rows, cols) of the window grid at `resolution`
    pub fn grid_shape(&self, resolution: f64) -> Result<(usize, usize)> {
        if !(resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: "must be positive".into(),
            });
        }
        let cols = (self.width() / resolution).round().max(1.0) as usize;
        let rows = (self.height() / resolution).round().max(1.0) as usize;
        Ok((rows, cols))
    }

    /// North-up transform of the window grid at `resolution`
    pub fn transform(&self, resolution: f64) -> GeoTransform {
        GeoTransform::new(self.min_x, self.max_y, resolution, -resolution)
    }

    /// Raster on the window grid with every cell set to `fill`
    pub fn raster<T: RasterElement>(&self, resolution: f64, fill: T) -> Result<Raster<T>> {
        let (rows, cols) = self.grid_shape(resolution)?;
        let mut raster = Raster::filled(rows, cols, fill);
        raster.set_transform(self.transform(resolution));
        raster.set_crs(self.crs.clone());
        Ok(raster)
    }

    /// Fail with `Error::Alignment` unless `raster` sits on the window grid
    pub fn ensure_aligned<T: RasterElement>(&self, raster: &Raster<T>, resolution: f64) -> Result<()> {
        let shape = self.grid_shape(resolution)?;
        let expected = self.transform(resolution);
        let tolerance = resolution * 1e-6;
        if raster.shape() == shape && raster.transform().approx_eq(&expected, tolerance) {
            return Ok(());
        }
        Err(Error::Alignment {
            expected: format!("{} x {} @ {:?}", shape.1, shape.0, expected.to_gdal()),
            actual: format!(
                "{} x {} @ {:?}",
                raster.cols(),
                raster.rows(),
                raster.transform().to_gdal()
            ),
        })
    }

    /// Clip by extent at the source resolution.
    ///
    /// The window edges are snapped to the nearest source cell boundary.
    /// Window cells outside the source take its no-data, or zero.
    pub fn clip<T: RasterElement>(&self, source: &Raster<T>) -> Result<Raster<T>> {
        let gt = source.transform();
        if !gt.is_valid() || !gt.is_north_up() {
            return Err(Error::InvalidWindow(format!(
                "cannot clip raster with geotransform {:?}",
                gt.to_gdal()
            )));
        }
        let (c0, r0) = gt.geo_to_pixel(self.min_x, self.max_y);
        let (c1, r1) = gt.geo_to_pixel(self.max_x, self.min_y);
        let (c0, r0) = (c0.round() as i64, r0.round() as i64);
        let cols = (c1.round() as i64 - c0).max(1) as usize;
        let rows = (r1.round() as i64 - r0).max(1) as usize;

        let fill = source.nodata().unwrap_or_else(T::zero);
        let mut out = Raster::filled(rows, cols, fill);
        let (src_rows, src_cols) = source.shape();
        for row in 0..rows {
            let sr = r0 + row as i64;
            if sr < 0 || sr >= src_rows as i64 {
                continue;
            }
            for col in 0..cols {
                let sc = c0 + col as i64;
                if sc < 0 || sc >= src_cols as i64 {
                    continue;
                }
                out.data_mut()[(row, col)] = source.data()[(sr as usize, sc as usize)];
            }
        }

        let (origin_x, origin_y) = gt.pixel_to_geo_corner(0, 0);
        out.set_transform(GeoTransform::new(
            origin_x + c0 as f64 * gt.pixel_width,
            origin_y + r0 as f64 * gt.pixel_height,
            gt.pixel_width,
            gt.pixel_height,
        ));
        out.set_crs(self.crs.clone().or_else(|| source.crs().cloned()));
        out.set_nodata(source.nodata());
        Ok(out)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.projwin())
    }
}
