//! Per-area series preparation: monotonicity repair and trend smoothing.

pub mod repair;
pub mod smooth;

pub use repair::*;
pub use smooth::*;
