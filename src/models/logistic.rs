//! Generalized logistic curve with vertical and horizontal shift.
//!
//! ```text
//! f(x) = (L - s) / (1 + exp(-k (x - x0)))^(1/v) + s
//! ```
//!
//! Parameters are passed in `ParameterSet` order: `[L, x0, k, v, s]`.
//!
//! Numerical notes:
//! - `u^(-1/v)` is evaluated as `exp(-ln(u) / v)` with `ln(u) = ln_1p(exp(-k(x - x0)))`,
//!   which stays finite for the small `v` values the bounds allow (down to 0.01).

use crate::domain::ParameterSet;

/// Returns `(ln u, u^(-1/v), exp(-k(x - x0)))` for the shared sub-expressions.
fn parts(x: f64, p: &[f64; 5]) -> (f64, f64, f64) {
    let [_, x0, k, v, _] = *p;
    let e = (-k * (x - x0)).exp();
    let ln_u = e.ln_1p();
    let pow = (-ln_u / v).exp();
    (ln_u, pow, e)
}

/// Evaluate `f(x)` for raw parameters.
pub fn predict_raw(x: f64, p: &[f64; 5]) -> f64 {
    let (_, pow, _) = parts(x, p);
    (p[0] - p[4]) * pow + p[4]
}

/// Evaluate `f(x)`.
pub fn predict(x: f64, params: &ParameterSet) -> f64 {
    predict_raw(x, &params.to_array())
}

/// Fill `out` with `∂f/∂p` at `x`, in `[L, x0, k, v, s]` order.
pub fn fill_jacobian_row(x: f64, p: &[f64; 5], out: &mut [f64; 5]) {
    let [l, x0, k, v, s] = *p;
    let (ln_u, pow, e) = parts(x, p);
    let u = 1.0 + e;

    // ∂f/∂u = -(L - s)/v * u^(-1/v - 1)
    let df_du = -(l - s) / v * pow / u;

    out[0] = pow;
    out[1] = df_du * k * e;
    out[2] = df_du * -(x - x0) * e;
    out[3] = (l - s) * pow * ln_u / (v * v);
    out[4] = 1.0 - pow;
}
