//! Secondary model: a derived metric forecast as a lagged multiple of the
//! driver metric's forecast.
//!
//! For each area the ratio of derived to driver events is estimated over a
//! `period`-day window, where the driver window ends `lag` days before the
//! derived one. The forecast for day `d` is the driver's smoothed daily value on
//! `d - lag` times that ratio, stabilized by repeated centered rolling means,
//! rounded, and accumulated onto the last actual derived value.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{info, warn};
use rayon::prelude::*;

use crate::domain::{
    AreaSeries, DateTable, Forecast, ForecastConfig, Metric, RatioConfig, RatioEstimate,
    RepairReport, SmoothedSeries, shift_days,
};
use crate::error::AppError;
use crate::forecast::combine::{ModelTables, ParamRow, TableInput, assemble_tables};
use crate::forecast::primary::{PrimaryOutput, reconstruct_cumulative, smooth_options};
use crate::math::repeated_rolling_mean;
use crate::series::{repair_cumulative, smooth_cumulative};

#[derive(Debug, Clone, PartialEq)]
pub struct RatioAreaResult {
    pub area: String,
    /// Repaired derived series, truncated to the cutoff before repair.
    pub actual: AreaSeries,
    pub known_len: usize,
    pub smoothed: SmoothedSeries,
    pub estimate: RatioEstimate,
    pub forecast: Forecast,
    pub repair: RepairReport,
}

impl RatioAreaResult {
    pub fn known(&self) -> &[f64] {
        &self.actual.values[..self.known_len]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioOutput {
    pub group: String,
    pub metric: Metric,
    pub driver: Metric,
    pub cutoff: NaiveDate,
    pub areas: BTreeMap<String, RatioAreaResult>,
    pub tables: ModelTables,
}

fn value_or_nan(series: &AreaSeries, date: NaiveDate) -> f64 {
    series.value_on(date).unwrap_or(f64::NAN)
}

/// Derived/driver ratio over the window ending at `cutoff` (driver lagged by `lag`).
///
/// Falls back to `fallback` whenever the driver total is not strictly positive or
/// the ratio is not finite.
pub fn estimate_ratio(
    driver: &AreaSeries,
    derived: &AreaSeries,
    cutoff: NaiveDate,
    lag: u32,
    period: u32,
    fallback: f64,
) -> RatioEstimate {
    let period = i64::from(period);
    let derived_total =
        value_or_nan(derived, cutoff) - value_or_nan(derived, shift_days(cutoff, -period));

    let driver_end = shift_days(cutoff, -i64::from(lag));
    let driver_total =
        value_or_nan(driver, driver_end) - value_or_nan(driver, shift_days(driver_end, -period));

    let ratio = derived_total / driver_total;
    if driver_total > 0.0 && ratio.is_finite() {
        RatioEstimate {
            derived_total,
            driver_total,
            ratio,
            fallback_used: false,
        }
    } else {
        RatioEstimate {
            derived_total,
            driver_total,
            ratio: fallback,
            fallback_used: true,
        }
    }
}

/// Driver values for the `n_pred` days starting at `cutoff + 1 - lag`.
///
/// `driver` is indexed from `driver_start`; days outside it read as zero.
pub fn lagged_driver_window(
    driver: &[f64],
    driver_start: NaiveDate,
    cutoff: NaiveDate,
    lag: u32,
    n_pred: usize,
) -> Vec<f64> {
    let first = shift_days(cutoff, 1 - i64::from(lag));
    let offset = (first - driver_start).num_days();
    (0..n_pred as i64)
        .map(|i| {
            let idx = offset + i;
            if idx < 0 {
                0.0
            } else {
                driver.get(idx as usize).copied().unwrap_or(0.0)
            }
        })
        .collect()
}

/// Derived forecast from a lagged driver window and a ratio.
pub fn derived_forecast(
    lagged_driver: &[f64],
    ratio: f64,
    last_actual: f64,
    start: NaiveDate,
    cfg: &RatioConfig,
) -> Forecast {
    let candidate: Vec<f64> = lagged_driver.iter().map(|v| v * ratio).collect();
    let stabilized = repeated_rolling_mean(&candidate, cfg.smoothing_window, cfg.smoothing_passes);
    reconstruct_cumulative(start, last_actual, &stabilized, false)
}

/// Run the ratio model for one group.
///
/// `driver` is the primary model's output for the same group; `derived` is the raw
/// cumulative table of the derived metric. Both must cover the same areas and dates.
pub fn run_ratio_model(
    driver: &PrimaryOutput,
    driver_table: &DateTable,
    derived_metric: Metric,
    derived: &DateTable,
    config: &ForecastConfig,
    ratio_cfg: &RatioConfig,
) -> Result<RatioOutput, AppError> {
    config.validate()?;
    ratio_cfg.validate()?;
    driver_table.ensure_aligned(derived, &format!("{}/{derived_metric}", driver.group))?;
    if driver.cutoff != config.cutoff {
        return Err(AppError::alignment(format!(
            "{}: driver forecast cutoff {} differs from {}.",
            driver.group, driver.cutoff, config.cutoff
        )));
    }

    let combined = &driver.tables.combined_daily_smoothed;
    let forecast_start = shift_days(config.cutoff, 1);
    let smooth = smooth_options(config);

    let mut work = Vec::with_capacity(driver.areas.len());
    for series in derived.all_series() {
        let Some(driver_area) = driver.areas.get(&series.area) else {
            return Err(AppError::alignment(format!(
                "{}: area '{}' has no {} forecast.",
                driver.group, series.area, driver.metric
            )));
        };
        let Some(driver_daily) = combined.get(&series.area) else {
            return Err(AppError::alignment(format!(
                "{}: area '{}' missing from the combined {} table.",
                driver.group, series.area, driver.metric
            )));
        };
        work.push((series, driver_area, driver_daily));
    }

    let results: Vec<RatioAreaResult> = work
        .par_iter()
        .map(|(series, driver_area, driver_daily)| {
            let (actual, repair) = repair_cumulative(&series.truncate_to(config.cutoff));
            let known_len = actual.len();
            let last_actual = actual.last().unwrap_or(0.0);
            let smoothed = smooth_cumulative(&actual, &smooth);

            let estimate = estimate_ratio(
                &driver_area.actual,
                &actual,
                config.cutoff,
                ratio_cfg.lag,
                ratio_cfg.period,
                ratio_cfg.fallback_ratio,
            );
            let window = lagged_driver_window(
                driver_daily,
                combined.start,
                config.cutoff,
                ratio_cfg.lag,
                config.n_pred,
            );
            let forecast =
                derived_forecast(&window, estimate.ratio, last_actual, forecast_start, ratio_cfg);

            RatioAreaResult {
                area: series.area.clone(),
                actual,
                known_len,
                smoothed,
                estimate,
                forecast,
                repair,
            }
        })
        .collect();

    let tables = assemble_tables(
        derived.start,
        config.cutoff,
        config.n_pred,
        results.iter().map(|r| TableInput {
            area: &r.area,
            known: r.known(),
            smoothed: &r.smoothed,
            forecast: &r.forecast,
            params: ParamRow::Ratio {
                estimate: r.estimate,
            },
        }),
    )?;

    let fallbacks: Vec<&str> = results
        .iter()
        .filter(|r| r.estimate.fallback_used)
        .map(|r| r.area.as_str())
        .collect();
    if !fallbacks.is_empty() {
        warn!(
            "{}/{derived_metric}: fallback ratio {} used for {} areas",
            driver.group,
            ratio_cfg.fallback_ratio,
            fallbacks.len()
        );
    }
    info!(
        "{}/{derived_metric}: {} areas forecast from lagged {}",
        driver.group,
        results.len(),
        driver.metric
    );

    let areas = results.into_iter().map(|r| (r.area.clone(), r)).collect();

    Ok(RatioOutput {
        group: driver.group.clone(),
        metric: derived_metric,
        driver: driver.metric,
        cutoff: config.cutoff,
        areas,
        tables,
    })
}
