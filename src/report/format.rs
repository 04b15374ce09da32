//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline code never prints and output changes stay
//! localized.

use crate::app::pipeline::RunOutput;
use crate::report::{ModelSummary, primary_diagnostics, ratio_diagnostics, summarize};

/// Areas listed per group/metric in the summary.
pub const SUMMARY_TOP_N: usize = 10;

/// Format the full run summary: settings, then one block per group and metric.
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();
    let cfg = &run.config;

    out.push_str("=== epicast - cumulative count forecast ===\n");
    out.push_str(&format!(
        "Cutoff: {} | horizon={}d | train={}d | smooth={}pts\n",
        cfg.cutoff, cfg.n_pred, cfg.n_train, cfg.n_smooth
    ));
    out.push_str(&format!(
        "Ratio model: lag={}d period={}d fallback={}\n",
        run.ratio.lag, run.ratio.period, run.ratio.fallback_ratio
    ));

    for group in &run.groups {
        let cases = summarize(
            &group.group,
            group.cases.metric,
            &primary_diagnostics(&group.cases),
            SUMMARY_TOP_N,
        );
        let deaths = summarize(
            &group.group,
            group.deaths.metric,
            &ratio_diagnostics(&group.deaths),
            SUMMARY_TOP_N,
        );
        out.push('\n');
        out.push_str(&format_model_summary(&cases));
        out.push('\n');
        out.push_str(&format_model_summary(&deaths));
    }

    out
}

pub fn format_model_summary(s: &ModelSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("[{}/{}] areas={}\n", s.group, s.metric, s.areas));
    out.push_str(&format!(
        "repaired points={} | skipped fits={} | not converged={} | ratio fallbacks={}\n",
        s.repaired_points, s.skipped, s.unconverged, s.ratio_fallbacks
    ));

    out.push_str(format!("{:<24} {:>12} {:>12} {:>10}", "area", "last", "increase", "note").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<12} {:-<12} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for d in &s.top {
        let note = if d.skipped {
            "skipped".to_string()
        } else if d.converged == Some(false) {
            "no-conv".to_string()
        } else if d.ratio_fallback {
            "fallback".to_string()
        } else if let Some(r) = d.ratio {
            format!("r={r:.4}")
        } else {
            String::new()
        };
        out.push_str(
            format!(
                "{:<24} {:>12.0} {:>12.0} {:>10}",
                truncate(&d.area, 24),
                d.last_actual,
                d.forecast_increase,
                note
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
