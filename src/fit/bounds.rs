//! Parameter bounds and starting point for one logistic fit.
//!
//! Only the upper asymptote depends on the data: it is bracketed by assuming the
//! latest day-over-day growth continues for `n1` (lower) or `n2` (upper) more days.
//! The remaining parameters use fixed boxes in units of days from the start of the
//! training window.

use crate::domain::{Bound, BoundsSpec};

pub const X0_BOUNDS: (f64, f64, f64) = (-50.0, 50.0, 0.0);
pub const K_BOUNDS: (f64, f64, f64) = (0.01, 0.5, 0.1);
pub const V_BOUNDS: (f64, f64, f64) = (0.01, 2.0, 0.1);
/// Headroom above the last value for the lower-asymptote box.
pub const S_EPS: f64 = 0.01;

/// Latest growth factor `y[n-1] / y[n-2]`, or `None` when undefined.
pub fn last_growth(train: &[f64]) -> Option<f64> {
    let n = train.len();
    if n < 2 {
        return None;
    }
    let growth = train[n - 1] / train[n - 2];
    growth.is_finite().then_some(growth)
}

/// Bounds and initial guess for a training window.
pub fn estimate_bounds(train: &[f64], n1: u32, n2: u32) -> BoundsSpec {
    let last = train.last().copied().unwrap_or(0.0);

    let l = match last_growth(train) {
        Some(growth) => {
            let l_min = last * growth.powi(n1 as i32);
            let l_max = last * growth.powi(n2 as i32) + 1.0;
            if l_min.is_finite() && l_max.is_finite() {
                Bound::new(l_min, l_max, l_min + (l_max - l_min) / 2.0)
            } else {
                Bound::new(0.0, 1.0, 0.0)
            }
        }
        None => Bound::new(0.0, 1.0, 0.0),
    };

    let s_max = last + S_EPS;

    BoundsSpec {
        l,
        x0: Bound::new(X0_BOUNDS.0, X0_BOUNDS.1, X0_BOUNDS.2),
        k: Bound::new(K_BOUNDS.0, K_BOUNDS.1, K_BOUNDS.2),
        v: Bound::new(V_BOUNDS.0, V_BOUNDS.1, V_BOUNDS.2),
        s: Bound::new(0.0, s_max, s_max / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn l_bounds_follow_growth() {
        let train = [100.0, 110.0];
        let b = estimate_bounds(&train, 5, 50);
        let g: f64 = 1.1;
        assert_relative_eq!(b.l.lower, 110.0 * g.powi(5), max_relative = 1e-12);
        assert_relative_eq!(b.l.upper, 110.0 * g.powi(50) + 1.0, max_relative = 1e-12);
        assert_relative_eq!(b.l.initial, (b.l.lower + b.l.upper) / 2.0, max_relative = 1e-12);
        assert!(b.is_valid());
    }

    #[test]
    fn fixed_boxes_contain_their_guesses() {
        let b = estimate_bounds(&[10.0, 12.0, 15.0], 5, 50);
        assert_eq!((b.x0.lower, b.x0.upper, b.x0.initial), (-50.0, 50.0, 0.0));
        assert_eq!((b.k.lower, b.k.upper, b.k.initial), (0.01, 0.5, 0.1));
        assert_eq!((b.v.lower, b.v.upper, b.v.initial), (0.01, 2.0, 0.1));
        assert_relative_eq!(b.s.upper, 15.01);
        assert_relative_eq!(b.s.initial, 7.505);
        for bound in [b.l, b.x0, b.k, b.v, b.s] {
            assert!(bound.contains_initial());
        }
    }

    #[test]
    fn zero_previous_value_collapses_l() {
        let b = estimate_bounds(&[0.0, 0.0, 5.0], 5, 50);
        assert_eq!((b.l.lower, b.l.upper, b.l.initial), (0.0, 1.0, 0.0));
        assert!(b.is_valid());

        let flat = estimate_bounds(&[0.0, 0.0], 5, 50);
        assert_eq!(flat.l, Bound::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn flat_series_still_has_ordered_l() {
        let b = estimate_bounds(&[500.0, 500.0, 500.0], 5, 50);
        assert_eq!(b.l.lower, 500.0);
        assert_eq!(b.l.upper, 501.0);
        assert!(b.is_valid());
    }
}
