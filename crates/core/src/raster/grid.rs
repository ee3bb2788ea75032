//! Georeferenced raster grid

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};
use serde::Serialize;

/// A georeferenced 2D grid of cells.
///
/// Data is stored row-major as `(row, col)`. Every stage of the engine
/// produces a new `Raster`; inputs are only borrowed.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Zero-filled raster with the default transform
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Zero-filled raster of another cell type sharing transform and CRS.
    ///
    /// The no-data sentinel is not carried over.
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Same grid and sentinel, every cell set to `fill_value`
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    /// Same grid, new cell values from a row-major vector
    pub fn with_data<U: RasterElement>(&self, data: Vec<U>, nodata: Option<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        let mut out = self.with_same_meta::<U>(rows, cols);
        *out.data_mut() =
            Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
        out.set_nodata(nodata);
        Ok(out)
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map bounds `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Centre of cell (col, row) in map coordinates
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// (row, col) of the cell containing a map coordinate, if inside the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Cell value as `f64`, `None` when it is no-data
    pub fn valid_f64(&self, row: usize, col: usize) -> Option<f64> {
        let v = self.data[(row, col)];
        if self.is_nodata(v) {
            None
        } else {
            v.to_f64()
        }
    }

    /// Same shape and transform within `tolerance` map units
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>, tolerance: f64) -> bool {
        self.shape() == other.shape() && self.transform.approx_eq(other.transform(), tolerance)
    }

    /// Convert every cell to `U`, keeping grid and sentinel
    pub fn convert<U: RasterElement>(&self) -> Raster<U> {
        let data = self.data.mapv(|v| v.to_f64().map(U::from_f64).unwrap_or_else(U::default_nodata));
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata.and_then(|nd| nd.to_f64()).map(U::from_f64),
        }
    }

    /// Min, max, mean and counts over valid cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut stats = RasterStatistics {
            min: None,
            max: None,
            mean: None,
            sum: 0.0,
            valid_count: 0,
            nodata_count: 0,
        };

        for &value in self.data.iter() {
            let v = match value.to_f64() {
                Some(v) if !self.is_nodata(value) => v,
                _ => {
                    stats.nodata_count += 1;
                    continue;
                }
            };
            stats.min = Some(stats.min.map_or(v, |m: f64| m.min(v)));
            stats.max = Some(stats.max.map_or(v, |m: f64| m.max(v)));
            stats.sum += v;
            stats.valid_count += 1;
        }

        if stats.valid_count > 0 {
            stats.mean = Some(stats.sum / stats.valid_count as f64);
        }
        stats
    }
}

/// Summary statistics of a raster's valid cells
#[derive(Debug, Clone, Serialize)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub sum: f64,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.shape(), (100, 200));
        assert_eq!(raster.len(), 20_000);
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let mut raster = Raster::from_vec(vec![1.0, 2.0, -9999.0, 5.0], 2, 2).unwrap();
        raster.set_nodata(Some(-9999.0));

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(5.0));
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.nodata_count, 1);
        assert_eq!(stats.mean, Some(8.0 / 3.0));
    }

    #[test]
    fn test_cell_at() {
        let mut raster: Raster<f64> = Raster::new(4, 3);
        raster.set_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0));

        assert_eq!(raster.cell_at(105.0, 195.0), Some((0, 0)));
        assert_eq!(raster.cell_at(125.0, 161.0), Some((3, 2)));
        assert_eq!(raster.cell_at(99.0, 195.0), None);
        assert_eq!(raster.cell_at(131.0, 195.0), None);
    }

    #[test]
    fn test_convert_keeps_sentinel() {
        let mut raster = Raster::from_vec(vec![0u8, 1, 2, 3], 2, 2).unwrap();
        raster.set_nodata(Some(0));
        let as_f64: Raster<f64> = raster.convert();
        assert_eq!(as_f64.nodata(), Some(0.0));
        assert_eq!(as_f64.get(1, 1).unwrap(), 3.0);
    }
}
