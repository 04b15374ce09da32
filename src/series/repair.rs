//! Monotonicity repair for cumulative series.
//!
//! Raw cumulative feeds occasionally go down: a day is over-reported and later
//! corrected, or a cell is blank. A point is flagged when:
//!
//! - it is not finite, or
//! - it is below the running maximum of the valid points before it, or
//! - it exceeds the series' final value (the latest total is authoritative, so an
//!   earlier spike above it is the defect, not everything that follows).
//!
//! Flagged runs are refilled by linear interpolation between their valid neighbours
//! (rounded to whole counts), or flat-filled from the single neighbour at either end.

use log::{debug, warn};

use crate::domain::{AreaSeries, RepairReport};
use crate::math::round_half_even;

/// Flag every point that breaks monotonicity (see module docs).
pub fn flag_invalid(values: &[f64]) -> Vec<bool> {
    let Some(cap) = values.iter().rev().copied().find(|v| v.is_finite()) else {
        return vec![true; values.len()];
    };

    let mut running_max = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            let invalid = !v.is_finite() || v > cap || v < running_max;
            if !invalid {
                running_max = v;
            }
            invalid
        })
        .collect()
}

/// Count points strictly below the maximum of everything before them.
pub fn count_violations(values: &[f64]) -> usize {
    let mut running_max = f64::NEG_INFINITY;
    let mut count = 0;
    for &v in values {
        if !v.is_finite() || v < running_max {
            count += 1;
        } else {
            running_max = v;
        }
    }
    count
}

/// Return a monotone non-decreasing copy of `series`, plus what was changed.
///
/// Never fails: a series without a single finite value is returned unchanged and
/// the problem is reported in `RepairReport::anomaly`.
pub fn repair_cumulative(series: &AreaSeries) -> (AreaSeries, RepairReport) {
    let flags = flag_invalid(&series.values);
    let repaired = flags.iter().filter(|f| **f).count();

    if repaired == 0 {
        return (series.clone(), RepairReport::default());
    }

    let anchors: Vec<usize> = flags
        .iter()
        .enumerate()
        .filter_map(|(i, f)| (!f).then_some(i))
        .collect();

    if anchors.is_empty() {
        let message = format!("'{}': no valid value to repair from", series.area);
        warn!("{message}");
        return (
            series.clone(),
            RepairReport {
                repaired: 0,
                remaining_violations: count_violations(&series.values),
                anomaly: Some(message),
            },
        );
    }

    let values = fill_from_anchors(&series.values, &anchors);
    let remaining_violations = count_violations(&values);
    let anomaly = if remaining_violations > 0 {
        let message = format!(
            "'{}': {remaining_violations} points still non-monotone after repair",
            series.area
        );
        warn!("{message}");
        Some(message)
    } else {
        None
    };

    debug!("'{}': repaired {repaired} non-monotone points", series.area);

    (
        AreaSeries::new(series.area.clone(), series.start, values),
        RepairReport {
            repaired,
            remaining_violations,
            anomaly,
        },
    )
}

/// Rebuild every non-anchor point from the anchors around it.
fn fill_from_anchors(values: &[f64], anchors: &[usize]) -> Vec<f64> {
    let mut out = values.to_vec();
    let first = anchors[0];
    let last = anchors[anchors.len() - 1];

    for v in &mut out[..first] {
        *v = values[first];
    }
    for v in &mut out[last + 1..] {
        *v = values[last];
    }

    for pair in anchors.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (va, vb) = (values[a], values[b]);
        let span = (b - a) as f64;
        for i in (a + 1)..b {
            let t = (i - a) as f64 / span;
            let interp = round_half_even(va + t * (vb - va));
            out[i] = interp.clamp(va, vb);
        }
    }

    out
}
