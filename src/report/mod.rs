//! Reporting: formatted terminal output of an analysis.

pub mod format;

pub use format::*;
