//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - series and table containers (`AreaSeries`, `DateTable`)
//! - fit inputs/outputs (`BoundsSpec`, `ParameterSet`, `FitOutcome`)
//! - forecast outputs (`Forecast`, `RatioEstimate`)
//! - run configuration (`ForecastConfig`, `RatioConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
