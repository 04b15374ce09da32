//! Mathematical utilities: linear least squares and sequence helpers.

pub mod ols;
pub mod seq;

pub use ols::*;
pub use seq::*;
