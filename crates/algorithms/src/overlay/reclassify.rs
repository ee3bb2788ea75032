//! Table reclassification
//!
//! Maps each cell through an ordered list of `(low, high, code)` ranges.
//! Ranges may overlap: the first entry that contains the value wins.

use std::fmt;
use std::str::FromStr;

use crate::maybe_rayon::*;
use culexmap_core::raster::Raster;
use culexmap_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which range ends count as inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBoundaries {
    /// `low < v <= high`
    #[default]
    UpperInclusive,
    /// `low <= v < high`
    LowerInclusive,
    /// `low <= v <= high`
    BothInclusive,
    /// `low < v < high`
    BothExclusive,
}

impl RangeBoundaries {
    #[inline]
    pub fn contains(self, low: f64, high: f64, v: f64) -> bool {
        match self {
            RangeBoundaries::UpperInclusive => low < v && v <= high,
            RangeBoundaries::LowerInclusive => low <= v && v < high,
            RangeBoundaries::BothInclusive => low <= v && v <= high,
            RangeBoundaries::BothExclusive => low < v && v < high,
        }
    }
}

impl FromStr for RangeBoundaries {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "upper" | "upper_inclusive" => Ok(Self::UpperInclusive),
            "lower" | "lower_inclusive" => Ok(Self::LowerInclusive),
            "both" | "both_inclusive" => Ok(Self::BothInclusive),
            "none" | "both_exclusive" => Ok(Self::BothExclusive),
            _ => Err(Error::InvalidParameter {
                name: "boundaries",
                value: s.to_string(),
                reason: "expected upper, lower, both or none".into(),
            }),
        }
    }
}

/// What a valid cell matching no entry becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unmatched {
    /// Emit the output no-data value and count the cell as a gap
    #[default]
    NoData,
    /// Pass the input value through unchanged
    KeepOriginal,
}

impl FromStr for Unmatched {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nodata" | "no_data" => Ok(Self::NoData),
            "keep" | "keep_original" => Ok(Self::KeepOriginal),
            _ => Err(Error::InvalidParameter {
                name: "unmatched",
                value: s.to_string(),
                reason: "expected nodata or keep".into(),
            }),
        }
    }
}

/// One `(low, high) -> code` row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReclassEntry {
    pub low: f64,
    pub high: f64,
    pub code: f64,
}

impl ReclassEntry {
    pub fn new(low: f64, high: f64, code: f64) -> Self {
        Self { low, high, code }
    }
}

/// Ordered reclassification table with its boundary and unmatched policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclassTable {
    pub entries: Vec<ReclassEntry>,
    #[serde(default)]
    pub boundaries: RangeBoundaries,
    #[serde(default)]
    pub unmatched: Unmatched,
}

impl ReclassTable {
    /// Upper-inclusive table emitting no-data for unmatched cells
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        Self {
            entries: rows
                .into_iter()
                .map(|(low, high, code)| ReclassEntry::new(low, high, code))
                .collect(),
            boundaries: RangeBoundaries::default(),
            unmatched: Unmatched::default(),
        }
    }

    /// Single-range overwrite: every value in `[low, high]` becomes `code`,
    /// anything else becomes no-data.
    pub fn collapse(low: f64, high: f64, code: f64) -> Self {
        Self::new([(low, high, code)])
            .with_boundaries(RangeBoundaries::BothInclusive)
            .with_unmatched(Unmatched::NoData)
    }

    pub fn with_boundaries(mut self, boundaries: RangeBoundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_unmatched(mut self, unmatched: Unmatched) -> Self {
        self.unmatched = unmatched;
        self
    }

    /// Code of the first entry containing `v`
    pub fn lookup(&self, v: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| self.boundaries.contains(e.low, e.high, v))
            .map(|e| e.code)
    }

    /// Parse a plain-text table: one `low high code` triple per line,
    /// separated by whitespace or commas. `#` starts a comment.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            let parsed: std::result::Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
            match parsed {
                Ok(v) if v.len() == 3 => rows.push((v[0], v[1], v[2])),
                _ => {
                    return Err(Error::InvalidParameter {
                        name: "table",
                        value: line.to_string(),
                        reason: format!("line {} is not a `low high code` triple", lineno + 1),
                    })
                }
            }
        }
        Ok(Self::new(rows))
    }
}

impl fmt::Display for ReclassTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.entries {
            writeln!(f, "{} {} {}", e.low, e.high, e.code)?;
        }
        Ok(())
    }
}

/// Cell counts from one reclassification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclassReport {
    pub matched: usize,
    /// Valid cells no entry matched
    pub gaps: usize,
    /// Cells that were no-data on input
    pub nodata_in: usize,
}

impl ReclassReport {
    fn merge(self, other: ReclassReport) -> ReclassReport {
        ReclassReport {
            matched: self.matched + other.matched,
            gaps: self.gaps + other.gaps,
            nodata_in: self.nodata_in + other.nodata_in,
        }
    }
}

/// Reclassify a raster through `table`.
///
/// Input no-data cells become `nodata_out`. Unmatched valid cells follow
/// `table.unmatched`. The output carries `nodata_out` as its sentinel.
pub fn reclassify(raster: &Raster<f64>, table: &ReclassTable, nodata_out: f64) -> Result<Raster<f64>> {
    reclassify_with_report(raster, table, nodata_out).map(|(out, _)| out)
}

/// [`reclassify`] plus per-run cell counts.
///
/// Gaps under [`Unmatched::NoData`] are logged as a warning since they
/// usually point at an incomplete table.
pub fn reclassify_with_report(
    raster: &Raster<f64>,
    table: &ReclassTable,
    nodata_out: f64,
) -> Result<(Raster<f64>, ReclassReport)> {
    let (rows, cols) = raster.shape();

    let row_results: Vec<(Vec<f64>, ReclassReport)> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut report = ReclassReport::default();
            let mut row_data = vec![nodata_out; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(v) = raster.valid_f64(row, col) else {
                    report.nodata_in += 1;
                    continue;
                };
                match table.lookup(v) {
                    Some(code) => {
                        report.matched += 1;
                        *out = code;
                    }
                    None => {
                        report.gaps += 1;
                        if table.unmatched == Unmatched::KeepOriginal {
                            *out = v;
                        }
                    }
                }
            }
            (row_data, report)
        })
        .collect();

    let mut data = Vec::with_capacity(rows * cols);
    let mut report = ReclassReport::default();
    for (row_data, row_report) in row_results {
        data.extend(row_data);
        report = report.merge(row_report);
    }

    if report.gaps > 0 && table.unmatched == Unmatched::NoData {
        warn!(
            gaps = report.gaps,
            entries = table.entries.len(),
            "reclassification left cells unmatched, written as no-data"
        );
    }
    debug!(?report, "reclassified");

    let output = raster.with_data(data, Some(nodata_out))?;
    Ok((output, report))
}

/// Parameters for [`Reclassify`]
#[derive(Debug, Clone)]
pub struct ReclassifyParams {
    pub table: ReclassTable,
    pub nodata_out: f64,
}

/// Reclassification operator
#[derive(Debug, Clone, Default)]
pub struct Reclassify;

impl Algorithm for Reclassify {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ReclassifyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Reclassify"
    }

    fn description(&self) -> &'static str {
        "Map cell values through an ordered range-to-class table"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        reclassify(&input, &params.table, params.nodata_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use culexmap_core::GeoTransform;

    fn make_raster(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    fn iuhd_like() -> ReclassTable {
        ReclassTable::new([
            (-0.99, -0.33, 4.0),
            (-0.33, 0.33, 5.0),
            (0.33, 1.0, 6.0),
        ])
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let table = ReclassTable::new([(0.0, 10.0, 1.0), (5.0, 15.0, 2.0)]);
        let r = make_raster(vec![7.0, 12.0], 1, 2);
        let out = reclassify(&r, &table, -9999.0).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 1).unwrap(), 2.0);
    }

    #[test]
    fn upper_inclusive_boundaries() {
        let r = make_raster(vec![1.0, 0.33, 0.0], 1, 3);
        let out = reclassify(&r, &iuhd_like(), -9999.0).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 6.0);
        // 0.33 closes the previous range
        assert_eq!(out.get(0, 1).unwrap(), 5.0);
        assert_eq!(out.get(0, 2).unwrap(), 5.0);
    }

    #[test]
    fn boundary_policies() {
        let (lo, hi) = (1.0, 2.0);
        assert!(!RangeBoundaries::UpperInclusive.contains(lo, hi, 1.0));
        assert!(RangeBoundaries::UpperInclusive.contains(lo, hi, 2.0));
        assert!(RangeBoundaries::LowerInclusive.contains(lo, hi, 1.0));
        assert!(!RangeBoundaries::LowerInclusive.contains(lo, hi, 2.0));
        assert!(RangeBoundaries::BothInclusive.contains(lo, hi, 1.0));
        assert!(RangeBoundaries::BothInclusive.contains(lo, hi, 2.0));
        assert!(!RangeBoundaries::BothExclusive.contains(lo, hi, 1.0));
        assert!(!RangeBoundaries::BothExclusive.contains(lo, hi, 2.0));
    }

    #[test]
    fn gaps_become_nodata_and_are_counted() {
        let mut r = make_raster(vec![0.0, 5.0, -9999.0, 0.5], 2, 2);
        r.set_nodata(Some(-9999.0));
        let (out, report) = reclassify_with_report(&r, &iuhd_like(), -1.0).unwrap();

        assert_eq!(out.nodata(), Some(-1.0));
        assert_eq!(out.get(0, 1).unwrap(), -1.0);
        assert_eq!(out.get(1, 0).unwrap(), -1.0);
        assert_eq!(report, ReclassReport { matched: 2, gaps: 1, nodata_in: 1 });
    }

    #[test]
    fn keep_original_passes_unmatched_through() {
        let table = ReclassTable::new([(-10.0, 0.1, 1.0)]).with_unmatched(Unmatched::KeepOriginal);
        let r = make_raster(vec![0.0, 4.0, 7.0], 1, 3);
        let out = reclassify(&r, &table, -9999.0).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 1).unwrap(), 4.0);
        assert_eq!(out.get(0, 2).unwrap(), 7.0);
    }

    #[test]
    fn collapse_overwrites_range() {
        let table = ReclassTable::collapse(0.0, 90.0, 129.0);
        let r = make_raster(vec![0.0, 4.5, 90.0, 130.0], 1, 4);
        let out = reclassify(&r, &table, -9999.0).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 129.0);
        assert_eq!(out.get(0, 1).unwrap(), 129.0);
        assert_eq!(out.get(0, 2).unwrap(), 129.0);
        assert!(out.is_nodata(out.get(0, 3).unwrap()));
    }

    #[test]
    fn identity_table_is_idempotent() {
        let table = ReclassTable::new((1..=10).map(|c| (c as f64 - 0.5, c as f64 + 0.5, c as f64)));
        let r = make_raster(vec![1.0, 4.0, 10.0, 7.0], 2, 2);
        let once = reclassify(&r, &table, -9999.0).unwrap();
        let twice = reclassify(&once, &table, -9999.0).unwrap();
        assert_eq!(once.data(), twice.data());
        assert_eq!(once.data(), r.data());
    }

    #[test]
    fn parse_text_table() {
        let table = ReclassTable::parse("# iuhd\n-0.33 0.33 5\n0.33, 1.0, 6\n").unwrap();
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.lookup(0.0), Some(5.0));
        assert!(ReclassTable::parse("1 2").is_err());
    }

    #[test]
    fn operator_trait() {
        let r = make_raster(vec![0.5], 1, 1);
        let params = ReclassifyParams { table: iuhd_like(), nodata_out: -9999.0 };
        let out = Reclassify.execute(r, params).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 6.0);
    }
}
