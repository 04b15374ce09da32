//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - loads (or generates) the input tables
//! - runs the forecast pipeline
//! - prints the summary and writes optional outputs

use std::path::Path;

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, DemoArgs, ForecastArgs, ModelArgs, OutputArgs};
use crate::domain::{ForecastConfig, RatioConfig, SolverOptions, shift_days};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `epicast` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is not an error.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Forecast(args) => handle_forecast(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let (config, ratio) = configs_from_args(args.cutoff, &args.model);
    let inputs = pipeline::load_group_inputs(&args.data_dir, &args.groups)?;
    let run = pipeline::run_pipeline(&inputs, &config, &ratio)?;
    emit(&run, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let opts = crate::data::SampleOptions {
        group: "demo".to_string(),
        seed: args.seed,
        areas: args.areas,
        days: args.days,
        start: crate::data::demo_start(),
    };
    let cutoff_day = args.cutoff_day.unwrap_or(args.days.saturating_sub(1));
    let cutoff = shift_days(opts.start, cutoff_day as i64);

    let sample = crate::data::generate_sample(&opts)?;
    info!(
        "demo: {} areas x {} days, seed {}",
        opts.areas, opts.days, opts.seed
    );

    let (config, ratio) = configs_from_args(cutoff, &args.model);
    let run = pipeline::run_pipeline(&[sample.input], &config, &ratio)?;
    emit(&run, &args.output)
}

fn emit(run: &pipeline::RunOutput, output: &OutputArgs) -> Result<(), AppError> {
    if !output.quiet {
        println!("{}", crate::report::format_run_summary(run));
    }
    if let Some(dir) = &output.out_dir {
        write_outputs(dir, run)?;
        info!("outputs written to '{}'", dir.display());
    }
    Ok(())
}

/// Write every table of every group plus the JSON manifest into `dir`.
pub fn write_outputs(dir: &Path, run: &pipeline::RunOutput) -> Result<(), AppError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AppError::input(format!("Failed to create output dir '{}': {e}", dir.display()))
    })?;
    for group in &run.groups {
        crate::io::export::write_model_tables(
            dir,
            &format!("{}_{}", group.group, group.cases.metric),
            &group.cases.tables,
        )?;
        crate::io::export::write_model_tables(
            dir,
            &format!("{}_{}", group.group, group.deaths.metric),
            &group.deaths.tables,
        )?;
    }
    crate::io::params::write_params_json(&dir.join("run.json"), run)
}

pub fn configs_from_args(cutoff: chrono::NaiveDate, args: &ModelArgs) -> (ForecastConfig, RatioConfig) {
    let config = ForecastConfig {
        cutoff,
        n_train: args.n_train,
        n_smooth: args.n_smooth,
        n_pred: args.n_pred,
        l_horizon_min: args.l_min_days,
        l_horizon_max: args.l_max_days,
        min_obs: args.min_obs,
        lowess_iters: args.lowess_iters,
        solver: SolverOptions {
            max_iters: args.max_iters,
            ..SolverOptions::default()
        },
        floor_negative_deltas: args.floor_negative,
    };
    let ratio = RatioConfig {
        lag: args.lag,
        period: args.period,
        fallback_ratio: args.fallback_ratio,
        smoothing_window: args.ratio_window,
        smoothing_passes: args.ratio_passes,
    };
    (config, ratio)
}
