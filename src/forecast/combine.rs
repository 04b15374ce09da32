//! Assembly of per-area results into output tables.
//!
//! All tables of one model share a layout:
//!
//! - `smoothed`, and the actual halves of the combined tables, cover
//!   `table start ..= cutoff`
//! - `daily` / `cumulative` forecasts cover `cutoff + 1 ..= cutoff + n_pred`
//! - combined tables cover `table start ..= cutoff + n_pred`

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DateTable, FitOutcome, Forecast, RatioEstimate, SmoothedSeries, shift_days};
use crate::error::AppError;
use crate::math::daily_from_cumulative;

/// Per-area model parameters, as reported in the parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParamRow {
    /// `None` when the area had too little history to fit.
    Logistic { fit: Option<FitOutcome> },
    Ratio { estimate: RatioEstimate },
}

pub type ParamTable = BTreeMap<String, ParamRow>;

/// Everything one model run hands to downstream consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTables {
    pub smoothed: DateTable,
    pub params: ParamTable,
    pub daily: DateTable,
    pub cumulative: DateTable,
    pub combined_daily: DateTable,
    pub combined_cumulative: DateTable,
    pub combined_daily_smoothed: DateTable,
    pub combined_cumulative_smoothed: DateTable,
}

/// One area's contribution to `ModelTables`.
pub struct TableInput<'a> {
    pub area: &'a str,
    /// Actual cumulative values from the table start through the cutoff.
    pub known: &'a [f64],
    pub smoothed: &'a SmoothedSeries,
    pub forecast: &'a Forecast,
    pub params: ParamRow,
}

/// Concatenate actual cumulative values with a forecast.
///
/// Returns `(daily, cumulative)`; the first daily value is the first cumulative
/// value itself.
pub fn combine_actual_with_forecast(known: &[f64], forecast: &Forecast) -> (Vec<f64>, Vec<f64>) {
    let mut cumulative = Vec::with_capacity(known.len() + forecast.len());
    cumulative.extend_from_slice(known);
    cumulative.extend_from_slice(&forecast.cumulative);
    let daily = daily_from_cumulative(&cumulative);
    (daily, cumulative)
}

/// Build the output tables of one model run.
pub fn assemble_tables<'a>(
    start: NaiveDate,
    cutoff: NaiveDate,
    n_pred: usize,
    inputs: impl IntoIterator<Item = TableInput<'a>>,
) -> Result<ModelTables, AppError> {
    let known_len = (cutoff - start).num_days() + 1;
    if known_len <= 0 {
        return Err(AppError::alignment(format!(
            "Cutoff {cutoff} precedes the table start {start}."
        )));
    }
    let known_len = known_len as usize;
    let forecast_start = shift_days(cutoff, 1);

    let mut tables = ModelTables {
        smoothed: DateTable::new(start, known_len),
        params: ParamTable::new(),
        daily: DateTable::new(forecast_start, n_pred),
        cumulative: DateTable::new(forecast_start, n_pred),
        combined_daily: DateTable::new(start, known_len + n_pred),
        combined_cumulative: DateTable::new(start, known_len + n_pred),
        combined_daily_smoothed: DateTable::new(start, known_len + n_pred),
        combined_cumulative_smoothed: DateTable::new(start, known_len + n_pred),
    };

    for input in inputs {
        let area = input.area;
        if input.known.len() != known_len {
            return Err(AppError::alignment(format!(
                "'{area}': {} actual values through {cutoff}, expected {known_len}.",
                input.known.len()
            )));
        }
        if input.forecast.start != forecast_start || input.forecast.len() != n_pred {
            return Err(AppError::alignment(format!(
                "'{area}': forecast covers {} +{}d, expected {forecast_start} +{n_pred}d.",
                input.forecast.start,
                input.forecast.len()
            )));
        }

        let smoothed = input.smoothed.padded_to(start, known_len);
        let (daily, cumulative) = combine_actual_with_forecast(input.known, input.forecast);
        let (daily_s, cumulative_s) = combine_actual_with_forecast(&smoothed, input.forecast);

        tables.smoothed.insert(area, smoothed)?;
        tables.daily.insert(area, input.forecast.daily.clone())?;
        tables.cumulative.insert(area, input.forecast.cumulative.clone())?;
        tables.combined_daily.insert(area, daily)?;
        tables.combined_cumulative.insert(area, cumulative)?;
        tables.combined_daily_smoothed.insert(area, daily_s)?;
        tables.combined_cumulative_smoothed.insert(area, cumulative_s)?;
        tables.params.insert(area.to_string(), input.params);
    }

    Ok(tables)
}
