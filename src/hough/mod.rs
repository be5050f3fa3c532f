//! Hough transform of a normalized stress-strain cloud.
//!
//! - `space`: the `(theta, r)` vote accumulator
//! - `peak`: resampling, smoothing and windowed peak search

pub mod peak;
pub mod space;

pub use peak::{locate_peak, resample, smooth};
pub use space::HoughSpace;
