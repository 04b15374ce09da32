//! Synthetic epidemic data generation.
//!
//! Each area follows its own generalized logistic curve for cumulative cases:
//!
//! - daily cases are Poisson draws around the curve's day-over-day increase
//! - a few days carry a reporting correction, a cumulative value below the
//!   previous day's, so the repairer has something to do
//! - daily deaths are Poisson draws around a per-area fatality ratio times the
//!   cases reported `DEATH_LAG` days earlier
//!
//! Output is fully determined by the seed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::app::pipeline::GroupInput;
use crate::domain::{DateTable, ParameterSet};
use crate::error::AppError;
use crate::models::predict;

/// Days between an infection being reported and the resulting death.
pub const DEATH_LAG: usize = 15;
/// Per-day probability of a downward reporting correction.
const DIP_PROB: f64 = 0.03;

/// First day of demo datasets.
pub fn demo_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 22).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub group: String,
    pub seed: u64,
    pub areas: usize,
    pub days: usize,
    pub start: NaiveDate,
}

/// True per-area curve behind one generated area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTruth {
    pub curve: ParameterSet,
    pub fatality_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub input: GroupInput,
    pub truth: BTreeMap<String, AreaTruth>,
}

fn poisson_draw(rng: &mut StdRng, mean: f64) -> Result<f64, AppError> {
    if !(mean.is_finite() && mean > 0.0) {
        return Ok(0.0);
    }
    let dist = Poisson::new(mean)
        .map_err(|e| AppError::numeric(format!("Poisson distribution error: {e}")))?;
    Ok(dist.sample(rng))
}

fn random_curve(rng: &mut StdRng, days: usize) -> ParameterSet {
    let days = days as f64;
    ParameterSet {
        l: rng.gen_range(2_000.0..50_000.0),
        x0: rng.gen_range(0.4 * days..0.9 * days),
        k: rng.gen_range(0.06..0.2),
        v: rng.gen_range(0.5..1.5),
        s: 0.0,
    }
}

/// Generate a cases/deaths pair of tables for one synthetic group.
pub fn generate_sample(opts: &SampleOptions) -> Result<SampleData, AppError> {
    if opts.areas == 0 {
        return Err(AppError::input("Sample area count must be > 0."));
    }
    if opts.days < 2 {
        return Err(AppError::input("Sample must span at least 2 days."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut cases = DateTable::new(opts.start, opts.days);
    let mut deaths = DateTable::new(opts.start, opts.days);
    let mut truth = BTreeMap::new();

    for i in 0..opts.areas {
        let area = format!("Area {:02}", i + 1);
        let curve = random_curve(&mut rng, opts.days);
        let fatality_ratio = rng.gen_range(0.005..0.03);

        let mut daily_cases = Vec::with_capacity(opts.days);
        let mut prev_level = 0.0;
        for t in 0..opts.days {
            let level = predict(t as f64, &curve);
            daily_cases.push(poisson_draw(&mut rng, level - prev_level)?);
            prev_level = level;
        }

        let mut cumulative_cases = Vec::with_capacity(opts.days);
        let mut total = 0.0;
        for (t, d) in daily_cases.iter().enumerate() {
            total += d;
            let reported = if t > 10 && total > 100.0 && rng.gen_bool(DIP_PROB) {
                (total * rng.gen_range(0.90..0.99)).floor()
            } else {
                total
            };
            cumulative_cases.push(reported);
        }

        let mut cumulative_deaths = Vec::with_capacity(opts.days);
        let mut total = 0.0;
        for t in 0..opts.days {
            if t >= DEATH_LAG {
                total += poisson_draw(&mut rng, fatality_ratio * daily_cases[t - DEATH_LAG])?;
            }
            cumulative_deaths.push(total);
        }

        cases.insert(area.as_str(), cumulative_cases)?;
        deaths.insert(area.as_str(), cumulative_deaths)?;
        truth.insert(
            area,
            AreaTruth {
                curve,
                fatality_ratio,
            },
        );
    }

    Ok(SampleData {
        input: GroupInput {
            group: opts.group.clone(),
            cases,
            deaths,
        },
        truth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::count_violations;

    fn opts(seed: u64) -> SampleOptions {
        SampleOptions {
            group: "demo".to_string(),
            seed,
            areas: 4,
            days: 120,
            start: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        }
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate_sample(&opts(7)).unwrap();
        let b = generate_sample(&opts(7)).unwrap();
        assert_eq!(a.input, b.input);
        let c = generate_sample(&opts(8)).unwrap();
        assert_ne!(a.input.cases, c.input.cases);
    }

    #[test]
    fn tables_share_dates_and_areas() {
        let s = generate_sample(&opts(1)).unwrap();
        s.input.cases.ensure_aligned(&s.input.deaths, "sample").unwrap();
        assert_eq!(s.input.cases.columns.len(), 4);
        assert_eq!(s.truth.len(), 4);
        assert!(s.input.cases.columns.contains_key("Area 01"));
    }

    #[test]
    fn deaths_start_after_lag_and_never_decrease() {
        let s = generate_sample(&opts(3)).unwrap();
        for values in s.input.deaths.columns.values() {
            assert!(values[..DEATH_LAG].iter().all(|v| *v == 0.0));
            assert_eq!(count_violations(values), 0);
        }
    }

    #[test]
    fn rejects_empty_sample() {
        let mut o = opts(1);
        o.areas = 0;
        assert_eq!(generate_sample(&o).unwrap_err().exit_code(), 2);
    }
}
