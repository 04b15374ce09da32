//! `epicast` library crate.
//!
//! The binary (`epicast`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - each stage (repair, smoothing, fitting, forecasting) can be used on its own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod series;
