//! Sequence helpers shared by the smoother, forecaster and ratio model.

/// First differences, with the first element kept as-is (implicit zero before it).
pub fn daily_from_cumulative(cumulative: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    cumulative
        .iter()
        .map(|&c| {
            let d = c - prev;
            prev = c;
            d
        })
        .collect()
}

/// Running sum starting from `base`.
pub fn cumulative_from_daily(base: f64, daily: &[f64]) -> Vec<f64> {
    let mut acc = base;
    daily
        .iter()
        .map(|&d| {
            acc += d;
            acc
        })
        .collect()
}

/// Round to the nearest integer, ties to even.
///
/// Matches the rounding used by array libraries, so `0.5 -> 0` and `1.5 -> 2`.
pub fn round_half_even(v: f64) -> f64 {
    v.round_ties_even()
}

/// Centered rolling mean with partial windows at both edges.
///
/// For an even `window` the extra point sits on the left: position `i` averages
/// `[i - window/2, i + (window-1)/2]`.
pub fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window <= 1 || n == 0 {
        return values.to_vec();
    }
    let before = window / 2;
    let after = (window - 1) / 2;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(n - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64
        })
        .collect()
}

/// Apply `centered_rolling_mean` `passes` times.
pub fn repeated_rolling_mean(values: &[f64], window: usize, passes: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..passes {
        out = centered_rolling_mean(&out, window);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_and_cumulative_are_inverse() {
        let cum = [3.0, 5.0, 5.0, 9.0];
        let daily = daily_from_cumulative(&cum);
        assert_eq!(daily, vec![3.0, 2.0, 0.0, 4.0]);
        assert_eq!(cumulative_from_daily(0.0, &daily), cum.to_vec());
    }

    #[test]
    fn rounding_is_ties_to_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(8.9), 9.0);
        assert_eq!(round_half_even(-1.5), -2.0);
    }

    #[test]
    fn centered_mean_even_window_leans_left() {
        let v = [1.0, 2.0, 3.0, 4.0];
        // window 2: position i averages [i-1, i]
        assert_eq!(centered_rolling_mean(&v, 2), vec![1.0, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn centered_mean_odd_window_uses_partial_edges() {
        let v = [3.0, 6.0, 9.0, 12.0];
        assert_eq!(centered_rolling_mean(&v, 3), vec![4.5, 6.0, 9.0, 10.5]);
    }

    #[test]
    fn repeated_mean_preserves_constants() {
        let v = vec![7.0; 20];
        let out = repeated_rolling_mean(&v, 14, 5);
        assert!(out.iter().all(|x| (x - 7.0).abs() < 1e-12));
    }
}
