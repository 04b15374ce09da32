//! Bounded nonlinear least squares for the generalized logistic.
//!
//! Given a training window `y_0 .. y_{n-1}` (indexed `x = 0 .. n-1`) and a
//! `BoundsSpec`, we minimize
//!
//! ```text
//! cost(p) = ½ Σ (y_i - f(x_i; p))²   subject to  lower ≤ p ≤ upper
//! ```
//!
//! with a projected Levenberg–Marquardt iteration:
//!
//! - Marquardt scaling: the damping term uses the running max of the Jacobian
//!   column norms, so parameters of very different magnitude (L vs k) are treated
//!   evenly.
//! - Active set: a parameter sitting on a bound whose descent direction points
//!   outward is frozen for that step; the step is solved on the remaining columns.
//! - Every candidate is projected back onto the box before its cost is evaluated.
//!
//! The iteration stops on relative cost reduction (`ftol`), relative step size
//! (`xtol`), a vanishing projected gradient (`gtol`), or `max_iters`. The terminal
//! iterate is always returned; `converged` tells the caller which case it was.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{BoundsSpec, FitOutcome, ParameterSet, SolverOptions};
use crate::math::solve_damped_step;
use crate::models::{fill_jacobian_row, predict_raw};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// Residuals `y - f`, Jacobian `∂f/∂p` and cost at `p`.
struct Evaluation {
    residuals: DVector<f64>,
    jacobian: DMatrix<f64>,
    cost: f64,
}

fn evaluate(y: &[f64], p: &[f64; 5]) -> Evaluation {
    let n = y.len();
    let mut residuals = DVector::<f64>::zeros(n);
    let mut jacobian = DMatrix::<f64>::zeros(n, 5);
    let mut row = [0.0; 5];
    for (i, &yi) in y.iter().enumerate() {
        let x = i as f64;
        residuals[i] = yi - predict_raw(x, p);
        fill_jacobian_row(x, p, &mut row);
        for (j, g) in row.iter().enumerate() {
            jacobian[(i, j)] = *g;
        }
    }
    let cost = 0.5 * residuals.norm_squared();
    Evaluation {
        residuals,
        jacobian,
        cost,
    }
}

fn cost_at(y: &[f64], p: &[f64; 5]) -> f64 {
    let sse: f64 = y
        .iter()
        .enumerate()
        .map(|(i, &yi)| {
            let r = yi - predict_raw(i as f64, p);
            r * r
        })
        .sum();
    0.5 * sse
}

fn project(p: &[f64; 5], lower: &[f64; 5], upper: &[f64; 5]) -> [f64; 5] {
    let mut out = *p;
    for j in 0..5 {
        out[j] = out[j].clamp(lower[j], upper[j]);
    }
    out
}

fn norm(v: &[f64; 5]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Fit the generalized logistic to `train` within `bounds`.
pub fn fit_logistic(train: &[f64], bounds: &BoundsSpec, opts: &SolverOptions) -> FitOutcome {
    let lower = bounds.lower();
    let upper = bounds.upper();
    let mut p = project(&bounds.initial(), &lower, &upper);

    let mut eval = evaluate(train, &p);
    let mut lambda = LAMBDA_INIT;
    let mut scale = [0.0_f64; 5];
    let mut converged = false;
    let mut iterations = 0;

    if !eval.cost.is_finite() {
        debug!("non-finite cost at the initial guess; returning it unchanged");
        return outcome(p, false, 0, eval.cost);
    }

    while iterations < opts.max_iters {
        iterations += 1;

        if eval.cost == 0.0 {
            converged = true;
            break;
        }

        // Descent direction for the parameters is +Jᵀr (cost gradient is -Jᵀr).
        let descent = eval.jacobian.transpose() * &eval.residuals;
        let r_norm = eval.residuals.norm();

        let mut free = Vec::with_capacity(5);
        let mut max_cos = 0.0_f64;
        for j in 0..5 {
            let col_norm = eval.jacobian.column(j).norm();
            scale[j] = scale[j].max(col_norm).max(1e-12);

            let pinned_low = p[j] <= lower[j] && descent[j] <= 0.0;
            let pinned_high = p[j] >= upper[j] && descent[j] >= 0.0;
            if lower[j] == upper[j] || pinned_low || pinned_high {
                continue;
            }
            free.push(j);
            if col_norm > 0.0 && r_norm > 0.0 {
                max_cos = max_cos.max((descent[j] / (col_norm * r_norm)).abs());
            }
        }

        if free.is_empty() || max_cos <= opts.gtol {
            converged = true;
            break;
        }

        let jac_free = eval.jacobian.select_columns(free.iter());
        let scale_free: Vec<f64> = free.iter().map(|&j| scale[j]).collect();

        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let Some(step) = solve_damped_step(&jac_free, &eval.residuals, &scale_free, lambda) else {
                lambda *= 10.0;
                continue;
            };

            let mut candidate = p;
            for (idx, &j) in free.iter().enumerate() {
                candidate[j] += step[idx];
            }
            let candidate = project(&candidate, &lower, &upper);
            let new_cost = cost_at(train, &candidate);

            if new_cost.is_finite() && new_cost < eval.cost {
                let reduction = (eval.cost - new_cost) / eval.cost;
                let mut dp = [0.0; 5];
                for j in 0..5 {
                    dp[j] = candidate[j] - p[j];
                }
                let small_step = norm(&dp) <= opts.xtol * (norm(&p) + opts.xtol);

                p = candidate;
                eval = evaluate(train, &p);
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                accepted = true;

                if reduction <= opts.ftol || small_step {
                    converged = true;
                }
                break;
            }

            lambda *= 10.0;
        }

        if converged {
            break;
        }
        if !accepted {
            // No damping level produced a decrease: we are at a (possibly poor)
            // stationary point of the projected problem.
            break;
        }
    }

    if !converged {
        debug!(
            "logistic fit stopped without converging after {iterations} iterations (cost={:.4e})",
            eval.cost
        );
    }

    outcome(p, converged, iterations, eval.cost)
}

fn outcome(p: [f64; 5], converged: bool, iterations: usize, cost: f64) -> FitOutcome {
    FitOutcome {
        params: ParameterSet::from_array(p),
        converged,
        iterations,
        cost,
    }
}
