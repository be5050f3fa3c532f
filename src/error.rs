//! Error types.
//!
//! Two layers:
//!
//! - `MechError`: the domain taxonomy raised by the analysis core (merge,
//!   normalization, fitting, derived properties).
//! - `AppError`: what the binary reports, an exit code plus a message.
//!
//! Every `MechError` converts into an `AppError` so `?` works across the
//! boundary in `app`.

use thiserror::Error;

/// Which elastic field a precondition or reassignment error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElasticField {
    Modulus,
    Onset,
}

impl std::fmt::Display for ElasticField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElasticField::Modulus => write!(f, "elastic modulus"),
            ElasticField::Onset => write!(f, "elastic onset"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum MechError {
    /// Degenerate transform domain (e.g. normalization with `upper == lower`).
    #[error("domain error: {0}")]
    Domain(String),

    #[error(
        "insufficient overlap between strain and stress time ranges: [{lower}, {upper}] holds {points} point(s)"
    )]
    InsufficientOverlap { lower: f64, upper: f64, points: usize },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("the {field} must be set before the {property} can be calculated")]
    Precondition {
        field: ElasticField,
        property: &'static str,
    },

    /// Local to one refinement iteration; only surfaces wrapped in
    /// `RefinementFailed`.
    #[error("degenerate regression: {0}")]
    RegressionDegenerate(String),

    #[error("elastic refinement failed: no usable regression in {iterations} iteration(s) ({source})")]
    RefinementFailed {
        iterations: usize,
        #[source]
        source: Box<MechError>,
    },

    #[error("the {field} was already set; clear it before assigning a new value")]
    Reassignment { field: ElasticField },

    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("the 0.2% offset line never crosses the measured curve")]
    YieldNotFound,
}

impl MechError {
    /// Exit code used by the binary for this class of failure.
    ///
    /// - 2: bad input or configuration
    /// - 3: not enough data to analyze
    /// - 4: numerical failure during fitting
    pub fn exit_code(&self) -> u8 {
        match self {
            MechError::InvalidSeries(_) | MechError::InvalidParameter(_) => 2,
            MechError::InsufficientOverlap { .. } | MechError::InsufficientData(_) => 3,
            MechError::Domain(_)
            | MechError::Precondition { .. }
            | MechError::RegressionDegenerate(_)
            | MechError::RefinementFailed { .. }
            | MechError::Reassignment { .. }
            | MechError::YieldNotFound => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<MechError> for AppError {
    fn from(err: MechError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_message_names_the_missing_field() {
        let err = MechError::Precondition {
            field: ElasticField::Modulus,
            property: "yield stress",
        };
        let msg = err.to_string();
        assert!(msg.contains("elastic modulus"), "got: {msg}");
        assert!(msg.contains("yield stress"), "got: {msg}");
    }

    #[test]
    fn mech_errors_map_to_exit_codes() {
        let app: AppError = MechError::InsufficientData("empty".into()).into();
        assert_eq!(app.exit_code(), 3);
        let app: AppError = MechError::InvalidParameter("nq".into()).into();
        assert_eq!(app.exit_code(), 2);
        let app: AppError = MechError::YieldNotFound.into();
        assert_eq!(app.exit_code(), 4);
    }
}
