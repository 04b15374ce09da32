//! Trend extraction for cumulative series.
//!
//! The smoother works on daily deltas rather than on the cumulative curve itself:
//!
//! 1. drop leading zero days, keeping the last one as an anchor
//! 2. difference (the first delta is the first cumulative value)
//! 3. LOWESS over the deltas (`lowess` crate, tricube kernel, bisquare robustness)
//!    with `frac = n_smooth / len`, clipped at zero
//! 4. accumulate, then rescale so the final value matches the last actual total
//!
//! Short series (fewer than `min_obs` deltas) and series whose smoothed total is
//! exactly zero are returned as their raw cumulative values.

use log::{debug, warn};
use lowess::prelude::*;

use crate::domain::{AreaSeries, SmoothedSeries};
use crate::math::{cumulative_from_daily, daily_from_cumulative};

#[derive(Debug, Clone, Copy)]
pub struct SmoothOptions {
    /// LOWESS window size, in points.
    pub n_smooth: usize,
    pub min_obs: usize,
    pub robust_iters: usize,
}

/// Index of the last leading zero, or 0 when the series does not start at zero.
fn first_kept_index(values: &[f64]) -> usize {
    match values.first() {
        Some(v) if *v == 0.0 => match values.iter().position(|v| *v != 0.0) {
            Some(first_nonzero) => first_nonzero - 1,
            None => values.len() - 1,
        },
        _ => 0,
    }
}

/// LOWESS trend of `y` on `0..y.len()`, clipped at zero.
///
/// Every point gets its own local fit (no delta interpolation, no boundary padding).
fn lowess_trend(
    y: &[f64],
    n_smooth: usize,
    robust_iters: usize,
) -> Result<Vec<f64>, LowessError> {
    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    let frac = (n_smooth as f64 / y.len() as f64).min(1.0);
    let model = Lowess::new()
        .fraction(frac)
        .iterations(robust_iters)
        .weight_function(Tricube)
        .robustness_method(Bisquare)
        .delta(0.0)
        .boundary_policy(NoBoundary)
        .adapter(Batch)
        .build()?;
    let fit = model.fit(&x, y)?;
    Ok(fit.y.into_iter().map(|v| v.max(0.0)).collect())
}

/// Smooth a repaired cumulative series.
pub fn smooth_cumulative(series: &AreaSeries, opts: &SmoothOptions) -> SmoothedSeries {
    let start_idx = first_kept_index(&series.values);
    let kept = &series.values[start_idx..];
    let start = series.date_at(start_idx);

    let raw = || SmoothedSeries {
        start,
        values: kept.to_vec(),
        smoothed: false,
    };

    let deltas = daily_from_cumulative(kept);
    if deltas.len() < opts.min_obs {
        return raw();
    }

    let trend = match lowess_trend(&deltas, opts.n_smooth, opts.robust_iters) {
        Ok(trend) => trend,
        Err(e) => {
            warn!("'{}': LOWESS failed ({e}), keeping raw series", series.area);
            return raw();
        }
    };

    let mut values = cumulative_from_daily(0.0, &trend);
    let last_smoothed = values[values.len() - 1];
    if last_smoothed == 0.0 {
        debug!("'{}': smoothed total is zero, keeping raw series", series.area);
        return raw();
    }

    let last_actual = kept[kept.len() - 1];
    let factor = last_actual / last_smoothed;
    for v in &mut values {
        *v *= factor;
    }
    // Pin exactly; the product above can be off by an ulp.
    let n = values.len();
    values[n - 1] = last_actual;

    SmoothedSeries {
        start,
        values,
        smoothed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MIN_OBS;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn opts() -> SmoothOptions {
        SmoothOptions {
            n_smooth: 15,
            min_obs: MIN_OBS,
            robust_iters: 3,
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 2, 1).unwrap()
    }

    fn noisy_cumulative(days: usize, leading_zeros: usize) -> Vec<f64> {
        let mut out = vec![0.0; leading_zeros];
        let mut total = 0.0;
        for i in 0..days {
            let trend = 5.0 + 2.0 * i as f64;
            let noise = if i % 3 == 0 { 9.0 } else { -3.0 };
            total += (trend + noise).max(0.0);
            out.push(total);
        }
        out
    }

    fn grid(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn trend_reproduces_a_straight_line() {
        let y: Vec<f64> = grid(30).iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = lowess_trend(&y, 9, 3).unwrap();
        for (f, t) in fit.iter().zip(&y) {
            assert_abs_diff_eq!(f, t, epsilon = 1e-6);
        }
    }

    #[test]
    fn trend_robustness_suppresses_an_outlier() {
        let mut y: Vec<f64> = grid(40)
            .iter()
            .map(|v| 10.0 + 0.5 * v + 0.3 * (1.7 * v).sin())
            .collect();
        y[20] = 500.0;
        let plain = lowess_trend(&y, 12, 0).unwrap();
        let robust = lowess_trend(&y, 12, 3).unwrap();
        let truth = 10.0 + 0.5 * 20.0;
        assert!((robust[20] - truth).abs() < (plain[20] - truth).abs());
        assert!((robust[20] - truth).abs() < 1.0);
    }

    #[test]
    fn trend_reduces_alternating_noise() {
        let y: Vec<f64> = (0..50).map(|i| 100.0 + if i % 2 == 0 { 20.0 } else { -20.0 }).collect();
        let fit = lowess_trend(&y, 15, 0).unwrap();
        for v in &fit[10..40] {
            assert!((v - 100.0).abs() < 5.0, "got {v}");
        }
    }

    #[test]
    fn trend_is_clipped_at_zero() {
        let y: Vec<f64> = (0..30).map(|i| 30.0 - 2.0 * i as f64).collect();
        let fit = lowess_trend(&y, 10, 0).unwrap();
        assert!(fit.iter().all(|v| *v >= 0.0));
        assert_eq!(fit[29], 0.0);
    }

    #[test]
    fn window_wider_than_series_uses_every_point() {
        let y = vec![0.0, 10.0, 10.0, 15.0, 20.0, 25.0];
        assert_eq!(lowess_trend(&y, 15, 3).unwrap().len(), 6);
    }

    #[test]
    fn short_series_is_returned_raw() {
        let values = vec![1.0, 3.0, 3.0, 8.0, 12.0];
        let s = AreaSeries::new("A", start(), values.clone());
        let out = smooth_cumulative(&s, &opts());
        assert!(!out.smoothed);
        assert_eq!(out.values, values);
        assert_eq!(out.start, start());
    }

    #[test]
    fn leading_zeros_keep_one_anchor() {
        let values = noisy_cumulative(40, 10);
        let s = AreaSeries::new("A", start(), values.clone());
        let out = smooth_cumulative(&s, &opts());
        assert_eq!(out.start, s.date_at(9));
        assert_eq!(out.len(), 41);
        assert!(out.smoothed);
    }

    #[test]
    fn final_value_matches_actual_exactly() {
        let values = noisy_cumulative(60, 3);
        let s = AreaSeries::new("A", start(), values.clone());
        let out = smooth_cumulative(&s, &opts());
        assert_eq!(out.last(), s.last());
        assert!(out.values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn all_zero_series_is_a_single_anchor() {
        let s = AreaSeries::new("A", start(), vec![0.0; 30]);
        let out = smooth_cumulative(&s, &opts());
        assert_eq!(out.values, vec![0.0]);
        assert!(!out.smoothed);
    }

    #[test]
    fn short_series_after_dropping_zeros_is_raw() {
        let mut values = vec![0.0; 40];
        values.extend([2.0, 5.0, 9.0]);
        let s = AreaSeries::new("A", start(), values);
        let out = smooth_cumulative(&s, &opts());
        assert_eq!(out.values, vec![0.0, 2.0, 5.0, 9.0]);
        assert!(!out.smoothed);
    }
}
