//! Proximity (distance transform)
//!
//! Exact Euclidean distance from every cell to the nearest target cell,
//! using the separable squared-distance transform of Felzenszwalb and
//! Huttenlocher (2012): one 1D lower-envelope pass down the columns, one
//! along the rows.

use crate::maybe_rayon::*;
use culexmap_core::raster::Raster;
use culexmap_core::{Error, Result};
use tracing::{debug, warn};

/// Sentinel of proximity rasters: cells farther than the maximum distance
pub const PROXIMITY_NODATA: f64 = 0.0;

const FAR: f64 = 1e20;

/// Distance in map units from each cell to the nearest valid cell equal
/// to `target`.
///
/// Distances above `max_distance` become [`PROXIMITY_NODATA`], as does
/// every cell when there is no target at all. Target cells themselves are
/// at distance 0, which shares the sentinel.
pub fn proximity(raster: &Raster<f64>, target: f64, max_distance: f64) -> Result<Raster<f64>> {
    if !(max_distance > 0.0) {
        return Err(Error::InvalidParameter {
            name: "max_distance",
            value: max_distance.to_string(),
            reason: "must be positive".into(),
        });
    }
    let (rows, cols) = raster.shape();
    let cell = raster.cell_size();

    let mut targets = 0usize;
    let seeds: Vec<f64> = raster
        .data()
        .indexed_iter()
        .map(|((row, col), _)| match raster.valid_f64(row, col) {
            Some(v) if v == target => {
                targets += 1;
                0.0
            }
            _ => FAR,
        })
        .collect();

    if targets == 0 {
        warn!(target, "no target cells for proximity, output is all no-data");
        return raster.with_data(vec![PROXIMITY_NODATA; rows * cols], Some(PROXIMITY_NODATA));
    }

    // Pass 1: squared distance along each column
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..rows).map(|row| seeds[row * cols + col]).collect();
            lower_envelope(&f)
        })
        .collect();

    // Pass 2: along each row over the column results
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let f: Vec<f64> = (0..cols).map(|col| columns[col][row]).collect();
            lower_envelope(&f)
                .into_iter()
                .map(|d2| {
                    let d = d2.sqrt() * cell;
                    if d > max_distance {
                        PROXIMITY_NODATA
                    } else {
                        d
                    }
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    debug!(targets, rows, cols, "proximity computed");
    raster.with_data(data, Some(PROXIMITY_NODATA))
}

/// 1D squared distance transform of sampled function `f`
fn lower_envelope(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![0.0; n];
    if n == 0 {
        return d;
    }
    let mut v = vec![0usize; n];
    let mut z = vec![0.0; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    let sq = |i: usize| (i * i) as f64;
    let intersect = |q: usize, p: usize| ((f[q] + sq(q)) - (f[p] + sq(p))) / (2.0 * (q as f64 - p as f64));
    for q in 1..n {
        // z[0] is -inf and f is finite, so k never underflows
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let offset = q as f64 - v[k] as f64;
        *out = offset * offset + f[v[k]];
    }
    d
}
