//! Run configuration as understood by the pipeline.
//!
//! Derived from CLI flags (see `app::forecast_config_from_args`), and also written
//! verbatim into the JSON run manifest so a run can be reproduced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Minimum number of points needed to smooth or fit a series.
pub const MIN_OBS: usize = 15;

/// Ratio used when the driver window has no events.
pub const DEFAULT_FALLBACK_RATIO: f64 = 0.01;

/// Termination settings for the bounded least-squares solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub max_iters: usize,
    /// Relative cost-reduction tolerance.
    pub ftol: f64,
    /// Relative step-size tolerance.
    pub xtol: f64,
    /// Projected-gradient tolerance.
    pub gtol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
        }
    }
}

/// Settings for the primary (curve-fitted) model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Last date treated as known.
    pub cutoff: NaiveDate,
    /// Number of trailing smoothed points used for fitting.
    pub n_train: usize,
    /// LOWESS window, in points.
    pub n_smooth: usize,
    /// Forecast horizon, in days.
    pub n_pred: usize,
    /// Days of continued growth assumed for the lower L bound.
    pub l_horizon_min: u32,
    /// Days of continued growth assumed for the upper L bound.
    pub l_horizon_max: u32,
    pub min_obs: usize,
    /// LOWESS robustness passes.
    pub lowess_iters: usize,
    pub solver: SolverOptions,
    /// Clamp negative model deltas to zero before accumulating.
    pub floor_negative_deltas: bool,
}

impl ForecastConfig {
    pub fn new(cutoff: NaiveDate) -> Self {
        Self {
            cutoff,
            n_train: 60,
            n_smooth: 15,
            n_pred: 30,
            l_horizon_min: 5,
            l_horizon_max: 50,
            min_obs: MIN_OBS,
            lowess_iters: 3,
            solver: SolverOptions::default(),
            floor_negative_deltas: false,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.n_train == 0 || self.n_smooth == 0 || self.n_pred == 0 {
            return Err(AppError::input(
                "n_train, n_smooth and n_pred must all be > 0.",
            ));
        }
        if self.l_horizon_min >= self.l_horizon_max {
            return Err(AppError::input(format!(
                "L horizons must satisfy n1 < n2 (got {} and {}).",
                self.l_horizon_min, self.l_horizon_max
            )));
        }
        if self.min_obs < 2 {
            return Err(AppError::input("min_obs must be >= 2."));
        }
        if self.solver.max_iters == 0 {
            return Err(AppError::input("Solver max_iters must be > 0."));
        }
        let tols = [self.solver.ftol, self.solver.xtol, self.solver.gtol];
        if tols.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
            return Err(AppError::input("Solver tolerances must be finite and >= 0."));
        }
        Ok(())
    }
}

/// Settings for the ratio-derived (secondary) model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioConfig {
    /// Days between a driver event and the derived event.
    pub lag: u32,
    /// Length of the ratio estimation window, in days.
    pub period: u32,
    pub fallback_ratio: f64,
    /// Centered rolling-mean window applied to the derived forecast.
    pub smoothing_window: usize,
    /// How many times the rolling mean is applied.
    pub smoothing_passes: usize,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            lag: 15,
            period: 30,
            fallback_ratio: DEFAULT_FALLBACK_RATIO,
            smoothing_window: 14,
            smoothing_passes: 5,
        }
    }
}

impl RatioConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.period == 0 {
            return Err(AppError::input("Ratio period must be > 0."));
        }
        if self.smoothing_window == 0 {
            return Err(AppError::input("Ratio smoothing window must be > 0."));
        }
        if !(self.fallback_ratio.is_finite() && self.fallback_ratio >= 0.0) {
            return Err(AppError::input("Fallback ratio must be finite and >= 0."));
        }
        Ok(())
    }
}
