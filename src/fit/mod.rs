//! Curve fitting.
//!
//! Responsibilities:
//!
//! - derive per-area parameter bounds and a starting point from the training window
//! - run the bounded least-squares fit of the generalized logistic

pub mod bounds;
pub mod fitter;

pub use bounds::*;
pub use fitter::*;
