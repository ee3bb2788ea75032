//! Stage constructors for the raster operators

use culexmap_algorithms::overlay::{evaluate, fill_nodata, mosaic, reclassify, BandFormula, BandInputs, ReclassTable};
use culexmap_core::Raster;

use crate::graph::Stage;

pub(crate) fn reclass(name: &str, input: &str, table: ReclassTable, nodata: f64) -> Stage {
    Stage::new(name, &[input], move |inputs| Ok(reclassify(inputs.first()?, &table, nodata)?))
}

pub(crate) fn formula(name: &str, formula: BandFormula, operands: &[&str], nodata: f64) -> Stage {
    Stage::new(name, operands, move |inputs| {
        let bands = BandInputs::from_slice(inputs.all())?;
        Ok(evaluate(&formula, &bands, nodata)?)
    })
}

/// Formula whose trailing operands are constants broadcast over the first input's grid
pub(crate) fn formula_with_constants(
    name: &str,
    formula: BandFormula,
    operands: &[&str],
    constants: Vec<f64>,
    nodata: f64,
) -> Stage {
    Stage::new(name, operands, move |inputs| {
        let first = inputs.first()?;
        let planes: Vec<Raster<f64>> = constants
            .iter()
            .map(|&c| {
                let mut plane = first.like(c);
                plane.set_nodata(None);
                plane
            })
            .collect();
        let mut operands: Vec<&Raster<f64>> = inputs.all().to_vec();
        operands.extend(planes.iter());
        let bands = BandInputs::from_slice(&operands)?;
        Ok(evaluate(&formula, &bands, nodata)?)
    })
}

pub(crate) fn fill(name: &str, input: &str, value: f64) -> Stage {
    Stage::new(name, &[input], move |inputs| Ok(fill_nodata(inputs.first()?, value)?))
}

pub(crate) fn merge(name: &str, layers: &[&str]) -> Stage {
    Stage::new(name, layers, |inputs| Ok(mosaic(inputs.all())?))
}
