//! Growth-curve model implementations.
//!
//! Models are implemented as small, pure functions so that the fitter and the
//! forecaster can share them without carrying any state.

pub mod logistic;

pub use logistic::*;
