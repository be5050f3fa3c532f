//! Input/output helpers.
//!
//! - CSV ingest of one test channel (`ingest`)
//! - JSON report and per-point CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
