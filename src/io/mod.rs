//! Input/output helpers.
//!
//! - wide CSV ingest + validation (`ingest`)
//! - table and parameter CSV exports (`export`)
//! - run manifest JSON read/write (`params`)

pub mod export;
pub mod ingest;
pub mod params;

pub use export::*;
pub use ingest::*;
pub use params::*;
