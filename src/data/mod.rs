//! Data sources.
//!
//! - `sample`: deterministic synthetic cases/deaths tables

pub mod sample;

pub use sample::*;
