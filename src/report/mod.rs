//! Reporting utilities: per-area diagnostics, rankings, and formatted terminal output.

use crate::domain::Metric;
use crate::forecast::{PrimaryOutput, RatioOutput};

pub mod format;

pub use format::*;

/// What happened to one area during a model run.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaDiagnostics {
    pub area: String,
    pub repaired_points: usize,
    pub anomaly: Option<String>,
    /// Primary model only: the fit was skipped for lack of history.
    pub skipped: bool,
    /// Primary model only: `None` when skipped.
    pub converged: Option<bool>,
    /// Ratio model only.
    pub ratio: Option<f64>,
    pub ratio_fallback: bool,
    pub last_actual: f64,
    /// Forecast cumulative total minus the last actual value.
    pub forecast_increase: f64,
}

/// Aggregate diagnostics for one group/metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub group: String,
    pub metric: Metric,
    pub areas: usize,
    pub repaired_points: usize,
    pub skipped: usize,
    pub unconverged: usize,
    pub ratio_fallbacks: usize,
    pub top: Vec<AreaDiagnostics>,
}

fn increase(last_actual: f64, cumulative: &[f64]) -> f64 {
    cumulative.last().map(|c| c - last_actual).unwrap_or(0.0)
}

pub fn primary_diagnostics(output: &PrimaryOutput) -> Vec<AreaDiagnostics> {
    output
        .areas
        .values()
        .map(|r| AreaDiagnostics {
            area: r.area.clone(),
            repaired_points: r.repair.repaired,
            anomaly: r.repair.anomaly.clone(),
            skipped: r.skipped(),
            converged: r.converged(),
            ratio: None,
            ratio_fallback: false,
            last_actual: r.last_actual,
            forecast_increase: increase(r.last_actual, &r.forecast.cumulative),
        })
        .collect()
}

pub fn ratio_diagnostics(output: &RatioOutput) -> Vec<AreaDiagnostics> {
    output
        .areas
        .values()
        .map(|r| {
            let last_actual = r.known().last().copied().unwrap_or(0.0);
            AreaDiagnostics {
                area: r.area.clone(),
                repaired_points: r.repair.repaired,
                anomaly: r.repair.anomaly.clone(),
                skipped: false,
                converged: None,
                ratio: Some(r.estimate.ratio),
                ratio_fallback: r.estimate.fallback_used,
                last_actual,
                forecast_increase: increase(last_actual, &r.forecast.cumulative),
            }
        })
        .collect()
}

/// The `top_n` areas with the largest forecast increase (ties by area name).
pub fn rank_by_increase(diagnostics: &[AreaDiagnostics], top_n: usize) -> Vec<AreaDiagnostics> {
    let mut sorted = diagnostics.to_vec();
    sorted.sort_by(|a, b| {
        b.forecast_increase
            .partial_cmp(&a.forecast_increase)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.area.cmp(&b.area))
    });
    sorted.truncate(top_n);
    sorted
}

pub fn summarize(
    group: &str,
    metric: Metric,
    diagnostics: &[AreaDiagnostics],
    top_n: usize,
) -> ModelSummary {
    ModelSummary {
        group: group.to_string(),
        metric,
        areas: diagnostics.len(),
        repaired_points: diagnostics.iter().map(|d| d.repaired_points).sum(),
        skipped: diagnostics.iter().filter(|d| d.skipped).count(),
        unconverged: diagnostics.iter().filter(|d| d.converged == Some(false)).count(),
        ratio_fallbacks: diagnostics.iter().filter(|d| d.ratio_fallback).count(),
        top: rank_by_increase(diagnostics, top_n),
    }
}
