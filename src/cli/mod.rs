//! Command-line parsing for the epidemic forecaster.
//!
//! Argument parsing and command dispatch stay separate from the modeling code.
//! Every model flag can also be set through an `EPICAST_*` environment variable
//! (a `.env` file in the working directory is loaded first).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "epicast",
    version,
    about = "Cumulative case/death forecaster (generalized logistic + lagged ratio)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Forecast every area of `{group}_cases.csv` / `{group}_deaths.csv` in a directory.
    Forecast(ForecastArgs),
    /// Generate a synthetic dataset and forecast it (no input files needed).
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Directory holding the `{group}_{cases,deaths}.csv` tables.
    #[arg(long, env = "EPICAST_DATA_DIR", value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Last date treated as known (YYYY-MM-DD).
    #[arg(long, env = "EPICAST_CUTOFF")]
    pub cutoff: NaiveDate,

    /// Groups to forecast.
    #[arg(long, env = "EPICAST_GROUPS", value_delimiter = ',', default_value = "world,usa")]
    pub groups: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of synthetic areas.
    #[arg(long, default_value_t = 12)]
    pub areas: usize,

    /// Number of days of synthetic history.
    #[arg(long, default_value_t = 150)]
    pub days: usize,

    /// Cutoff as a day offset into the synthetic history (defaults to the last day).
    #[arg(long)]
    pub cutoff_day: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Write every output table (CSV) and a run manifest (JSON) into this directory.
    #[arg(long, env = "EPICAST_OUT_DIR", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Do not print the run summary.
    #[arg(long)]
    pub quiet: bool,
}

/// Model settings shared by every command.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Trailing smoothed days used to fit the curve.
    #[arg(long, env = "EPICAST_N_TRAIN", default_value_t = 60)]
    pub n_train: usize,

    /// LOWESS window, in points.
    #[arg(long, env = "EPICAST_N_SMOOTH", default_value_t = 15)]
    pub n_smooth: usize,

    /// Forecast horizon in days.
    #[arg(long, env = "EPICAST_N_PRED", default_value_t = 30)]
    pub n_pred: usize,

    /// Growth-continuation days for the lower bound of the upper asymptote.
    #[arg(long, env = "EPICAST_L_MIN_DAYS", default_value_t = 5)]
    pub l_min_days: u32,

    /// Growth-continuation days for the upper bound of the upper asymptote.
    #[arg(long, env = "EPICAST_L_MAX_DAYS", default_value_t = 50)]
    pub l_max_days: u32,

    /// Minimum training points required to fit an area.
    #[arg(long, env = "EPICAST_MIN_OBS", default_value_t = crate::domain::MIN_OBS)]
    pub min_obs: usize,

    /// LOWESS robustness passes.
    #[arg(long, env = "EPICAST_LOWESS_ITERS", default_value_t = 3)]
    pub lowess_iters: usize,

    /// Solver iteration cap.
    #[arg(long, env = "EPICAST_MAX_ITERS", default_value_t = 200)]
    pub max_iters: usize,

    /// Clamp negative forecast increments to zero.
    #[arg(long, env = "EPICAST_FLOOR_NEGATIVE")]
    pub floor_negative: bool,

    /// Days between a case and the resulting death.
    #[arg(long, env = "EPICAST_LAG", default_value_t = 15)]
    pub lag: u32,

    /// Ratio estimation window, in days.
    #[arg(long, env = "EPICAST_PERIOD", default_value_t = 30)]
    pub period: u32,

    /// Ratio used when the case window total is not positive.
    #[arg(long, env = "EPICAST_FALLBACK_RATIO", default_value_t = crate::domain::DEFAULT_FALLBACK_RATIO)]
    pub fallback_ratio: f64,

    /// Rolling-mean window applied to the deaths forecast.
    #[arg(long, env = "EPICAST_RATIO_WINDOW", default_value_t = 14)]
    pub ratio_window: usize,

    /// Rolling-mean passes applied to the deaths forecast.
    #[arg(long, env = "EPICAST_RATIO_PASSES", default_value_t = 5)]
    pub ratio_passes: usize,
}
