//! `tensile-props` library crate.
//!
//! Mechanical properties of a material from a tensile test: the strain and
//! stress channels are merged onto one time grid, the linear-elastic segment
//! is approximated (Hough transform or two picked points) and refined by
//! iterative masked regression, and the 0.2% offset yield, ultimate stress,
//! ductility and toughness follow from the fitted modulus and onset.
//!
//! The binary (`tensile`) is a thin wrapper around this library so the
//! analysis is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hough;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
