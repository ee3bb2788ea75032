//! Band algebra
//!
//! Evaluates a fixed per-cell expression over up to six co-registered
//! bands named `A`..`F`. Any no-data operand makes the cell no-data. A
//! non-finite result (division by zero, `ln` of a non-positive value) is
//! written as no-data and counted; guards belong upstream as explicit
//! formulas, not here.

use crate::maybe_rayon::*;
use culexmap_core::raster::Raster;
use culexmap_core::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Operand slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Band {
    pub const ALL: [Band; 6] = [Band::A, Band::B, Band::C, Band::D, Band::E, Band::F];

    fn index(self) -> usize {
        self as usize
    }
}

/// A named per-cell expression.
///
/// `expr` receives the operand values in slot order, `A` first, and
/// exactly `arity` of them.
#[derive(Clone, Copy)]
pub struct BandFormula {
    pub name: &'static str,
    pub arity: usize,
    pub expr: fn(&[f64]) -> f64,
}

impl BandFormula {
    pub const fn new(name: &'static str, arity: usize, expr: fn(&[f64]) -> f64) -> Self {
        Self { name, arity, expr }
    }

    /// Apply to plain values, no no-data handling
    pub fn apply(&self, values: &[f64]) -> f64 {
        (self.expr)(values)
    }
}

impl fmt::Debug for BandFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandFormula")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Operand rasters bound to slots `A`..`F`
#[derive(Debug, Clone, Default)]
pub struct BandInputs<'a> {
    slots: [Option<&'a Raster<f64>>; 6],
}

impl<'a> BandInputs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind rasters to consecutive slots starting at `A`
    pub fn from_slice(rasters: &[&'a Raster<f64>]) -> Result<Self> {
        if rasters.len() > 6 {
            return Err(Error::InvalidParameter {
                name: "bands",
                value: rasters.len().to_string(),
                reason: "at most six operands".into(),
            });
        }
        let mut inputs = Self::new();
        for (slot, raster) in Band::ALL.iter().zip(rasters) {
            inputs = inputs.with(*slot, raster);
        }
        Ok(inputs)
    }

    pub fn with(mut self, band: Band, raster: &'a Raster<f64>) -> Self {
        self.slots[band.index()] = Some(raster);
        self
    }

    pub fn get(&self, band: Band) -> Option<&'a Raster<f64>> {
        self.slots[band.index()]
    }
}

/// Cell counts from one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlgebraReport {
    pub evaluated: usize,
    pub nodata_in: usize,
    /// Cells whose result was NaN or infinite
    pub domain_faults: usize,
}

/// Evaluate `formula` cell by cell.
///
/// The first `formula.arity` slots must be bound and every bound raster
/// must share one grid. The output has `nodata_out` as its sentinel.
pub fn evaluate(formula: &BandFormula, inputs: &BandInputs<'_>, nodata_out: f64) -> Result<Raster<f64>> {
    evaluate_with_report(formula, inputs, nodata_out).map(|(out, _)| out)
}

/// [`evaluate`] plus per-run cell counts
pub fn evaluate_with_report(
    formula: &BandFormula,
    inputs: &BandInputs<'_>,
    nodata_out: f64,
) -> Result<(Raster<f64>, AlgebraReport)> {
    let operands = operands(formula, inputs)?;
    let first = operands[0];
    let (rows, cols) = first.shape();

    let row_results: Vec<(Vec<f64>, AlgebraReport)> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut report = AlgebraReport::default();
            let mut row_data = vec![nodata_out; cols];
            let mut values = vec![0.0; operands.len()];
            'cells: for (col, out) in row_data.iter_mut().enumerate() {
                for (value, raster) in values.iter_mut().zip(&operands) {
                    match raster.valid_f64(row, col) {
                        Some(v) => *value = v,
                        None => {
                            report.nodata_in += 1;
                            continue 'cells;
                        }
                    }
                }
                let result = formula.apply(&values);
                if result.is_finite() {
                    report.evaluated += 1;
                    *out = result;
                } else {
                    report.domain_faults += 1;
                }
            }
            (row_data, report)
        })
        .collect();

    let mut data = Vec::with_capacity(rows * cols);
    let mut report = AlgebraReport::default();
    for (row_data, r) in row_results {
        data.extend(row_data);
        report.evaluated += r.evaluated;
        report.nodata_in += r.nodata_in;
        report.domain_faults += r.domain_faults;
    }

    if report.domain_faults > 0 {
        warn!(
            formula = formula.name,
            cells = report.domain_faults,
            "formula produced non-finite values, written as no-data"
        );
    }

    let output = first.with_data(data, Some(nodata_out))?;
    Ok((output, report))
}

fn operands<'a>(formula: &BandFormula, inputs: &BandInputs<'a>) -> Result<Vec<&'a Raster<f64>>> {
    if formula.arity == 0 || formula.arity > 6 {
        return Err(Error::InvalidParameter {
            name: "arity",
            value: formula.arity.to_string(),
            reason: format!("formula {} must take 1 to 6 bands", formula.name),
        });
    }

    let mut operands = Vec::with_capacity(formula.arity);
    for band in &Band::ALL[..formula.arity] {
        match inputs.get(*band) {
            Some(raster) => operands.push(raster),
            None => {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: format!("{:?}", band),
                    reason: format!("formula {} needs band {:?}", formula.name, band),
                })
            }
        }
    }

    let first = operands[0];
    for raster in Band::ALL.iter().filter_map(|b| inputs.get(*b)) {
        if raster.shape() != first.shape() {
            return Err(Error::SizeMismatch {
                er: first.rows(),
                ec: first.cols(),
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
        if !raster.transform().approx_eq(first.transform(), first.cell_size() * 1e-6) {
            return Err(Error::Alignment {
                expected: format!("{:?}", first.transform().to_gdal()),
                actual: format!("{:?}", raster.transform().to_gdal()),
            });
        }
    }
    Ok(operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use culexmap_core::GeoTransform;

    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(3, 3, value);
        r.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        r
    }

    const WEIGHTED: BandFormula = BandFormula::new("weighted", 2, |v| v[0] * 0.9 + v[1] * 0.1);
    const LN: BandFormula = BandFormula::new("ln", 1, |v| v[0].ln());

    #[test]
    fn weighted_sum_of_constants() {
        let a = make_band(5.0);
        let b = make_band(3.0);
        let inputs = BandInputs::new().with(Band::A, &a).with(Band::B, &b);
        let out = evaluate(&WEIGHTED, &inputs, -9999.0).unwrap();
        for &v in out.data().iter() {
            assert_relative_eq!(v, 4.8, epsilon = 1e-12);
        }
    }

    #[test]
    fn nodata_operand_propagates() {
        let a = make_band(5.0);
        let mut b = make_band(3.0);
        b.set_nodata(Some(-1.0));
        b.set(1, 1, -1.0).unwrap();

        let inputs = BandInputs::from_slice(&[&a, &b]).unwrap();
        let (out, report) = evaluate_with_report(&WEIGHTED, &inputs, 130.0).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), 130.0);
        assert!(out.is_nodata(out.get(1, 1).unwrap()));
        assert_eq!(report.nodata_in, 1);
        assert_eq!(report.evaluated, 8);
    }

    #[test]
    fn domain_fault_is_nodata_and_counted() {
        let mut a = make_band(1.0);
        a.set(0, 0, 0.0).unwrap();
        a.set(0, 1, -2.0).unwrap();
        let inputs = BandInputs::new().with(Band::A, &a);

        let (out, report) = evaluate_with_report(&LN, &inputs, -9999.0).unwrap();
        assert_eq!(report.domain_faults, 2);
        assert_eq!(out.get(0, 0).unwrap(), -9999.0);
        assert_eq!(out.get(0, 1).unwrap(), -9999.0);
        assert_eq!(out.get(2, 2).unwrap(), 0.0);
    }

    #[test]
    fn missing_operand_is_rejected() {
        let a = make_band(1.0);
        let inputs = BandInputs::new().with(Band::A, &a);
        assert!(evaluate(&WEIGHTED, &inputs, -9999.0).is_err());
    }

    #[test]
    fn misaligned_operands_are_rejected() {
        let a = make_band(1.0);
        let mut b = make_band(1.0);
        b.set_transform(GeoTransform::new(10.0, 3.0, 1.0, -1.0));
        let inputs = BandInputs::from_slice(&[&a, &b]).unwrap();
        assert!(matches!(
            evaluate(&WEIGHTED, &inputs, -9999.0),
            Err(Error::Alignment { .. })
        ));

        let c = Raster::filled(2, 2, 1.0);
        let inputs = BandInputs::from_slice(&[&a, &c]).unwrap();
        assert!(matches!(
            evaluate(&WEIGHTED, &inputs, -9999.0),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
