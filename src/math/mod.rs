//! Numerical building blocks: rescaling, least squares, fit statistics, filters.

pub mod filter;
pub mod normalize;
pub mod ols;
pub mod stats;

pub use normalize::*;
pub use ols::*;
pub use stats::*;
