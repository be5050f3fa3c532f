//! Curve construction: channel registration and synthetic tests.

pub mod merge;
pub mod sample;

pub use merge::{linear_merge, merge};
pub use sample::{SampleSpec, TensileSample, generate_tensile_sample};
