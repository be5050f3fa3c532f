//! Mechanical property model.
//!
//! Properties are small, pure functions of the merged curve and the elastic
//! fit so the pipeline and the report can call them without holding a model.

pub mod mechanical;

pub use mechanical::*;
