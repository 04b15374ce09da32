//! Primary model: repaired, smoothed cumulative series extrapolated with a fitted
//! generalized logistic.
//!
//! Per area the stages are:
//!
//! 1. repair monotonicity over the full history
//! 2. truncate to the cutoff and smooth
//! 3. take the trailing `n_train` smoothed values as the training window
//! 4. estimate bounds and fit (skipped when the window is shorter than `min_obs`)
//! 5. evaluate the curve past the window, round the daily increments, and
//!    accumulate them onto the last actual value
//!
//! Areas are independent and are processed in parallel.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info};
use rayon::prelude::*;

use crate::domain::{
    AreaSeries, BoundsSpec, DateTable, FitOutcome, Forecast, ForecastConfig, Metric,
    ParameterSet, RepairReport, SmoothedSeries, shift_days,
};
use crate::error::AppError;
use crate::fit::{estimate_bounds, fit_logistic};
use crate::forecast::combine::{ModelTables, ParamRow, TableInput, assemble_tables};
use crate::math::round_half_even;
use crate::models::predict;
use crate::series::{SmoothOptions, repair_cumulative, smooth_cumulative};

/// Everything computed for one area by the primary model.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaResult {
    pub area: String,
    /// Repaired cumulative series, truncated to the cutoff before repair.
    pub actual: AreaSeries,
    /// Number of `actual` values (all on or before the cutoff).
    pub known_len: usize,
    pub last_actual: f64,
    pub smoothed: SmoothedSeries,
    pub train_len: usize,
    /// `None` when the area was skipped.
    pub bounds: Option<BoundsSpec>,
    pub fit: Option<FitOutcome>,
    pub forecast: Forecast,
    pub repair: RepairReport,
}

impl AreaResult {
    pub fn known(&self) -> &[f64] {
        &self.actual.values[..self.known_len]
    }

    pub fn skipped(&self) -> bool {
        self.fit.is_none()
    }

    pub fn converged(&self) -> Option<bool> {
        self.fit.as_ref().map(|f| f.converged)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryOutput {
    pub group: String,
    pub metric: Metric,
    pub cutoff: NaiveDate,
    pub areas: BTreeMap<String, AreaResult>,
    pub tables: ModelTables,
}

/// Round raw increments and accumulate them onto `last_actual`.
///
/// With `floor_negative` set, negative rounded increments are clamped to zero.
pub fn reconstruct_cumulative(
    start: NaiveDate,
    last_actual: f64,
    raw_deltas: &[f64],
    floor_negative: bool,
) -> Forecast {
    let daily: Vec<f64> = raw_deltas
        .iter()
        .map(|&d| {
            let r = round_half_even(d);
            if floor_negative { r.max(0.0) } else { r }
        })
        .collect();

    let mut acc = last_actual;
    let cumulative = daily
        .iter()
        .map(|d| {
            acc += d;
            acc
        })
        .collect();

    Forecast {
        start,
        daily,
        cumulative,
    }
}

/// Extend a fitted curve `n_pred` days past a training window of `train_len` points.
///
/// Without parameters (the area was skipped) the forecast is flat: zero increments
/// and a cumulative equal to `last_actual`.
pub fn forecast_from_params(
    params: Option<&ParameterSet>,
    train_len: usize,
    n_pred: usize,
    last_actual: f64,
    start: NaiveDate,
    floor_negative: bool,
) -> Forecast {
    let raw: Vec<f64> = match params {
        Some(p) => {
            // x = train_len - 1 is the last training day; the first increment is
            // the step from it to the first forecast day.
            let origin = train_len.saturating_sub(1) as f64;
            let curve: Vec<f64> = (0..=n_pred).map(|i| predict(origin + i as f64, p)).collect();
            curve.windows(2).map(|w| w[1] - w[0]).collect()
        }
        None => vec![0.0; n_pred],
    };
    reconstruct_cumulative(start, last_actual, &raw, floor_negative)
}

pub(crate) fn smooth_options(config: &ForecastConfig) -> SmoothOptions {
    SmoothOptions {
        n_smooth: config.n_smooth,
        min_obs: config.min_obs,
        robust_iters: config.lowess_iters,
    }
}

/// Run the primary model on one area's raw cumulative series.
pub fn run_area(series: &AreaSeries, config: &ForecastConfig) -> AreaResult {
    // Later corrections must not reach back into the known window.
    let (actual, repair) = repair_cumulative(&series.truncate_to(config.cutoff));
    let known_len = actual.len();
    let last_actual = actual.last().unwrap_or(0.0);
    let forecast_start = shift_days(config.cutoff, 1);

    let smoothed = smooth_cumulative(&actual, &smooth_options(config));
    let train = smoothed.training_window(config.n_train);
    let train_len = train.len();

    let (bounds, fit) = if train_len < config.min_obs {
        debug!(
            "'{}': {train_len} training points (< {}), skipping fit",
            series.area, config.min_obs
        );
        (None, None)
    } else {
        let bounds = estimate_bounds(train, config.l_horizon_min, config.l_horizon_max);
        let fit = fit_logistic(train, &bounds, &config.solver);
        (Some(bounds), Some(fit))
    };

    let forecast = forecast_from_params(
        fit.as_ref().map(|f| &f.params),
        train_len,
        config.n_pred,
        last_actual,
        forecast_start,
        config.floor_negative_deltas,
    );

    AreaResult {
        area: series.area.clone(),
        actual,
        known_len,
        last_actual,
        smoothed,
        train_len,
        bounds,
        fit,
        forecast,
        repair,
    }
}

/// Run the primary model over every area of `table`.
pub fn run_primary(
    group: &str,
    metric: Metric,
    table: &DateTable,
    config: &ForecastConfig,
) -> Result<PrimaryOutput, AppError> {
    config.validate()?;
    if table.index_of(config.cutoff).is_none() {
        return Err(AppError::input(format!(
            "{group}/{metric}: cutoff {} is outside the table dates.",
            config.cutoff
        )));
    }

    let series = table.all_series();
    let results: Vec<AreaResult> = series.par_iter().map(|s| run_area(s, config)).collect();

    let tables = assemble_tables(
        table.start,
        config.cutoff,
        config.n_pred,
        results.iter().map(|r| TableInput {
            area: &r.area,
            known: r.known(),
            smoothed: &r.smoothed,
            forecast: &r.forecast,
            params: ParamRow::Logistic { fit: r.fit },
        }),
    )?;

    let skipped = results.iter().filter(|r| r.skipped()).count();
    let unconverged = results.iter().filter(|r| r.converged() == Some(false)).count();
    info!(
        "{group}/{metric}: {} areas, {skipped} skipped, {unconverged} fits not converged",
        results.len()
    );

    let areas = results.into_iter().map(|r| (r.area.clone(), r)).collect();

    Ok(PrimaryOutput {
        group: group.to_string(),
        metric,
        cutoff: config.cutoff,
        areas,
        tables,
    })
}
