//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and merged time series (`Series`, `MergedCurve`)
//! - configuration (`AnalysisConfig` and its parts)
//! - fit outputs (`ElasticRegionEstimate`, `FitResult`)

pub mod types;

pub use types::*;
