//! Forecast models and output assembly.
//!
//! - `primary`: logistic extrapolation of each area's smoothed cumulative series
//! - `ratio`: a derived metric forecast from the lagged primary forecast
//! - `combine`: actual + forecast tables shared by both models

pub mod combine;
pub mod primary;
pub mod ratio;

pub use combine::*;
pub use primary::*;
pub use ratio::*;
