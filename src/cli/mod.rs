//! Command-line parsing for the tensile-test analyzer.
//!
//! Argument parsing and command dispatch stay separate from the analysis
//! code; `app` turns these structs into an `AnalysisConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{MergeGrid, OptimizeOn, PerturbationKind};

pub mod picker;

pub use picker::StdinPointPicker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tensile", version, about = "Mechanical properties from tensile test data")]
pub struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a strain channel and a stress channel recorded as CSV.
    Analyze(AnalyzeArgs),
    /// Generate a synthetic tensile test and analyze it.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Strain channel CSV (`time` + strain column).
    #[arg(long, value_name = "CSV")]
    pub strain: PathBuf,

    /// Stress channel CSV (`time` + stress column).
    #[arg(long, value_name = "CSV")]
    pub stress: PathBuf,

    /// Value column in the strain CSV.
    #[arg(long, default_value = "strain")]
    pub strain_column: String,

    /// Value column in the stress CSV.
    #[arg(long, default_value = "stress")]
    pub stress_column: String,

    /// Pick the elastic segment by hand instead of the Hough transform.
    #[arg(long)]
    pub manual: bool,

    /// With --manual: keep points within RTOL * max|stress| of the picked
    /// line instead of the points between the picks.
    #[arg(long, value_name = "RTOL", requires = "manual")]
    pub band: Option<f64>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Seed of the synthetic sample noise.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Options shared by every analysis command.
///
/// Unset options keep the value from `--config` (or the built-in default).
#[derive(Debug, Args, Clone)]
pub struct AnalysisArgs {
    /// JSON analysis configuration file.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Time grid of the merged curve.
    #[arg(long, value_enum)]
    pub grid: Option<MergeGrid>,

    /// Hough angle bins.
    #[arg(long)]
    pub nq: Option<usize>,

    /// Hough distance bins.
    #[arg(long)]
    pub nr: Option<usize>,

    /// Strain measurement error used by the refinement.
    #[arg(long)]
    pub error_tolerance: Option<f64>,

    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Metric minimized by the refinement.
    #[arg(long, value_enum)]
    pub optimize_on: Option<OptimizeOn>,

    /// Mask perturbation when an iteration does not improve.
    #[arg(long, value_enum)]
    pub perturbation: Option<PerturbationKind>,

    /// Seed of the refinement perturbation.
    #[arg(long)]
    pub refine_seed: Option<u64>,

    /// Write a JSON report.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Write the merged curve with inlier flags as CSV.
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Render an ASCII stress-strain plot.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_parses_paths_and_overrides() {
        let cli = Cli::try_parse_from([
            "tensile", "analyze", "--strain", "e.csv", "--stress", "s.csv", "--grid", "union", "--optimize-on",
            "r-squared", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.strain, PathBuf::from("e.csv"));
        assert_eq!(args.strain_column, "strain");
        assert_eq!(args.analysis.grid, Some(MergeGrid::Union));
        assert_eq!(args.analysis.optimize_on, Some(OptimizeOn::RSquared));
        assert_eq!(args.analysis.max_iterations, None);
        assert!(!args.manual);
    }

    #[test]
    fn band_requires_manual() {
        let res = Cli::try_parse_from(["tensile", "analyze", "--strain", "e", "--stress", "s", "--band", "0.01"]);
        assert!(res.is_err());
        let cli = Cli::try_parse_from([
            "tensile", "analyze", "--strain", "e", "--stress", "s", "--manual", "--band", "0.01",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.band, Some(0.01));
    }

    #[test]
    fn demo_defaults() {
        let cli = Cli::try_parse_from(["tensile", "demo"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.seed, 7);
        assert!(!args.analysis.plot);
        assert_eq!(args.analysis.width, 100);
    }
}
