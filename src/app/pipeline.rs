//! Shared forecast pipeline used by both the `forecast` and `demo` commands.
//!
//! Per group: cases table -> primary model -> deaths ratio model. Every input is
//! validated before any group is computed, so a bad table fails the run up front.

use std::path::Path;

use log::info;

use crate::domain::{DateTable, ForecastConfig, Metric, RatioConfig};
use crate::error::AppError;
use crate::forecast::{PrimaryOutput, RatioOutput, run_primary, run_ratio_model};
use crate::io::ingest::read_wide_csv;

/// Raw cumulative tables for one reporting group (e.g. `world`).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInput {
    pub group: String,
    pub cases: DateTable,
    pub deaths: DateTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutput {
    pub group: String,
    pub cases: PrimaryOutput,
    pub deaths: RatioOutput,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub config: ForecastConfig,
    pub ratio: RatioConfig,
    pub groups: Vec<GroupOutput>,
}

/// Load `{group}_cases.csv` and `{group}_deaths.csv` from `dir` for each group.
pub fn load_group_inputs(dir: &Path, groups: &[String]) -> Result<Vec<GroupInput>, AppError> {
    groups
        .iter()
        .map(|group| {
            let cases = read_wide_csv(&dir.join(format!("{group}_{}.csv", Metric::Cases)))?;
            let deaths = read_wide_csv(&dir.join(format!("{group}_{}.csv", Metric::Deaths)))?;
            Ok(GroupInput {
                group: group.clone(),
                cases,
                deaths,
            })
        })
        .collect()
}

/// Check every precondition the models rely on, for every group.
pub fn validate_inputs(
    inputs: &[GroupInput],
    config: &ForecastConfig,
    ratio: &RatioConfig,
) -> Result<(), AppError> {
    config.validate()?;
    ratio.validate()?;
    if inputs.is_empty() {
        return Err(AppError::input("No groups to forecast."));
    }
    for input in inputs {
        input
            .cases
            .ensure_aligned(&input.deaths, &format!("{}: cases vs deaths", input.group))?;
        if input.cases.columns.is_empty() {
            return Err(AppError::input(format!("{}: table has no areas.", input.group)));
        }
        if input.cases.index_of(config.cutoff).is_none() {
            return Err(AppError::input(format!(
                "{}: cutoff {} is outside the data ({} .. {}).",
                input.group,
                config.cutoff,
                input.cases.start,
                input
                    .cases
                    .end()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "empty".to_string()),
            )));
        }
    }
    Ok(())
}

/// Execute the full pipeline over already-loaded inputs.
pub fn run_pipeline(
    inputs: &[GroupInput],
    config: &ForecastConfig,
    ratio: &RatioConfig,
) -> Result<RunOutput, AppError> {
    validate_inputs(inputs, config, ratio)?;

    let mut groups = Vec::with_capacity(inputs.len());
    for input in inputs {
        info!("{}: forecasting from cutoff {}", input.group, config.cutoff);
        let cases = run_primary(&input.group, Metric::Cases, &input.cases, config)?;
        let deaths =
            run_ratio_model(&cases, &input.cases, Metric::Deaths, &input.deaths, config, ratio)?;
        groups.push(GroupOutput {
            group: input.group.clone(),
            cases,
            deaths,
        });
    }

    Ok(RunOutput {
        config: config.clone(),
        ratio: ratio.clone(),
        groups,
    })
}
