//! Elastic region fitting.
//!
//! Responsibilities:
//!
//! - approximate the elastic region (Hough transform or two picked points)
//! - refine the approximation by iterative masked regression
//! - perturb the inlier mask when the refinement stalls

pub mod approximate;
pub mod perturb;
pub mod refine;

pub use approximate::*;
pub use perturb::*;
pub use refine::*;
