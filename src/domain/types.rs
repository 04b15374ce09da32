//! Shared domain types.
//!
//! Series are stored as a start date plus a dense `Vec<f64>`: day `i` of a series is
//! `start + i` days. This makes gaps unrepresentable, so "missing" days always show up
//! as flat (repeated) values rather than absent rows.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which event count a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cases,
    Deaths,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::Deaths => "deaths",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return `date` shifted by `days` (may be negative).
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Cumulative counts for one area, one metric, on consecutive days.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaSeries {
    pub area: String,
    pub start: NaiveDate,
    pub values: Vec<f64>,
}

impl AreaSeries {
    pub fn new(area: impl Into<String>, start: NaiveDate, values: Vec<f64>) -> Self {
        Self {
            area: area.into(),
            start,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        shift_days(self.start, index as i64)
    }

    /// Last date covered by the series (`None` when empty).
    pub fn end(&self) -> Option<NaiveDate> {
        self.values.len().checked_sub(1).map(|i| self.date_at(i))
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        let offset = offset as usize;
        (offset < self.values.len()).then_some(offset)
    }

    /// Cumulative value on `date`.
    ///
    /// Dates before the series start read as `0` (nothing had been counted yet);
    /// dates after the end are `None`.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        if date < self.start {
            return Some(0.0);
        }
        self.index_of(date).map(|i| self.values[i])
    }

    /// Keep values up to and including `cutoff`.
    pub fn truncate_to(&self, cutoff: NaiveDate) -> AreaSeries {
        let keep = if cutoff < self.start {
            0
        } else {
            (((cutoff - self.start).num_days() + 1) as usize).min(self.values.len())
        };
        AreaSeries {
            area: self.area.clone(),
            start: self.start,
            values: self.values[..keep].to_vec(),
        }
    }
}

/// Smoothed cumulative trend for one area.
///
/// Covers a suffix of the source series' dates (leading zero days are dropped).
/// The last value always equals the source's last actual value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSeries {
    pub start: NaiveDate,
    pub values: Vec<f64>,
    /// `false` when the raw cumulative values were returned unchanged.
    pub smoothed: bool,
}

impl SmoothedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        shift_days(self.start, index as i64)
    }

    /// The trailing `n_train` values (or all of them when shorter).
    pub fn training_window(&self, n_train: usize) -> &[f64] {
        let skip = self.values.len().saturating_sub(n_train);
        &self.values[skip..]
    }

    /// Values spread over `len` days starting at `table_start`, zero before `start`.
    pub fn padded_to(&self, table_start: NaiveDate, len: usize) -> Vec<f64> {
        let offset = (self.start - table_start).num_days().max(0) as usize;
        let mut out = vec![0.0; len];
        for (i, v) in self.values.iter().enumerate() {
            if let Some(slot) = out.get_mut(offset + i) {
                *slot = *v;
            }
        }
        out
    }
}

/// One group/metric table: area -> date -> value, on a shared daily date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTable {
    pub start: NaiveDate,
    pub len: usize,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl DateTable {
    pub fn new(start: NaiveDate, len: usize) -> Self {
        Self {
            start,
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Add (or replace) an area column; its length must match the table.
    pub fn insert(&mut self, area: impl Into<String>, values: Vec<f64>) -> Result<(), AppError> {
        let area = area.into();
        if values.len() != self.len {
            return Err(AppError::alignment(format!(
                "Column '{area}' has {} values, table expects {}.",
                values.len(),
                self.len
            )));
        }
        self.columns.insert(area, values);
        Ok(())
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        shift_days(self.start, index as i64)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.len.checked_sub(1).map(|i| self.date_at(i))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len).map(|i| self.date_at(i))
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        (offset >= 0 && (offset as usize) < self.len).then_some(offset as usize)
    }

    pub fn areas(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn get(&self, area: &str) -> Option<&[f64]> {
        self.columns.get(area).map(Vec::as_slice)
    }

    pub fn series(&self, area: &str) -> Option<AreaSeries> {
        self.columns
            .get(area)
            .map(|values| AreaSeries::new(area, self.start, values.clone()))
    }

    /// Every area as an `AreaSeries`, in table (area-name) order.
    pub fn all_series(&self) -> Vec<AreaSeries> {
        self.columns
            .iter()
            .map(|(area, values)| AreaSeries::new(area.clone(), self.start, values.clone()))
            .collect()
    }

    /// Fail unless `other` covers the same dates and the same areas.
    pub fn ensure_aligned(&self, other: &DateTable, context: &str) -> Result<(), AppError> {
        if self.start != other.start || self.len != other.len {
            return Err(AppError::alignment(format!(
                "{context}: date ranges differ ({} +{}d vs {} +{}d).",
                self.start, self.len, other.start, other.len
            )));
        }
        if !self.columns.keys().eq(other.columns.keys()) {
            let missing: Vec<&str> = self
                .areas()
                .filter(|a| !other.columns.contains_key(*a))
                .chain(other.areas().filter(|a| !self.columns.contains_key(*a)))
                .collect();
            return Err(AppError::alignment(format!(
                "{context}: area sets differ (unmatched: {}).",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Fitted generalized-logistic parameters for one area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Upper asymptote.
    pub l: f64,
    /// Horizontal shift, in days from the start of the training window.
    pub x0: f64,
    /// Growth rate.
    pub k: f64,
    /// Asymmetry exponent (> 0).
    pub v: f64,
    /// Lower asymptote (vertical shift).
    pub s: f64,
}

impl ParameterSet {
    pub const LEN: usize = 5;

    pub fn to_array(self) -> [f64; 5] {
        [self.l, self.x0, self.k, self.v, self.s]
    }

    pub fn from_array(p: [f64; 5]) -> Self {
        Self {
            l: p[0],
            x0: p[1],
            k: p[2],
            v: p[3],
            s: p[4],
        }
    }
}

/// Search interval and starting point for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
    pub initial: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64, initial: f64) -> Self {
        Self {
            lower,
            upper,
            initial,
        }
    }

    pub fn contains_initial(&self) -> bool {
        self.lower <= self.initial && self.initial <= self.upper
    }
}

/// Box constraints for a single fit, in `ParameterSet` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsSpec {
    pub l: Bound,
    pub x0: Bound,
    pub k: Bound,
    pub v: Bound,
    pub s: Bound,
}

impl BoundsSpec {
    fn all(&self) -> [Bound; 5] {
        [self.l, self.x0, self.k, self.v, self.s]
    }

    pub fn lower(&self) -> [f64; 5] {
        self.all().map(|b| b.lower)
    }

    pub fn upper(&self) -> [f64; 5] {
        self.all().map(|b| b.upper)
    }

    pub fn initial(&self) -> [f64; 5] {
        self.all().map(|b| b.initial)
    }

    pub fn is_valid(&self) -> bool {
        self.all().iter().all(|b| b.lower <= b.upper && b.contains_initial())
    }
}

/// Result of one bounded least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub params: ParameterSet,
    pub converged: bool,
    pub iterations: usize,
    /// Half the sum of squared residuals at `params`.
    pub cost: f64,
}

/// Forecast daily deltas and their cumulative reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// First forecast date (the day after the cutoff).
    pub start: NaiveDate,
    pub daily: Vec<f64>,
    pub cumulative: Vec<f64>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.daily.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}

/// Historical derived/driver ratio for one area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioEstimate {
    pub derived_total: f64,
    pub driver_total: f64,
    pub ratio: f64,
    pub fallback_used: bool,
}

/// What the repairer changed in one series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Number of points replaced by interpolation.
    pub repaired: usize,
    /// Points still violating monotonicity after repair (0 on success).
    pub remaining_violations: usize,
    pub anomaly: Option<String>,
}
