//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module:
//! - parses CLI arguments and initializes logging
//! - resolves the analysis configuration (file, then flags)
//! - loads or generates the two channels
//! - runs the pipeline, prints the report/plot and writes exports

use std::fs::File;
use std::io;
use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalysisArgs, AnalyzeArgs, Command, DemoArgs, StdinPointPicker};
use crate::data::SampleSpec;
use crate::domain::{AnalysisConfig, ManualSelection};
use crate::error::AppError;
use crate::fit::{HoughApproximator, ManualApproximator};
use crate::io::{AnalysisReport, load_series, write_points_csv, write_report_json};

pub mod pipeline;

use pipeline::AnalysisOutput;

/// Entry point for the `tensile` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.analysis)?;

    let strain = load_series(&args.strain, &args.strain_column)?;
    let stress = load_series(&args.stress, &args.stress_column)?;
    for data in [&strain, &stress] {
        info!(
            column = %data.value_column,
            rows_read = data.rows_read,
            rows_used = data.rows_used,
            "loaded channel"
        );
    }

    let output = if args.manual {
        let selection = match args.band {
            Some(rtol) => ManualSelection::Band { rtol },
            None => ManualSelection::StrainBounds,
        };
        let picker = StdinPointPicker::new(args.analysis.width, args.analysis.height);
        let mut approximator = ManualApproximator::new(picker, selection);
        pipeline::analyze(&strain.series, &stress.series, &config, &mut approximator)?
    } else {
        let mut approximator = HoughApproximator::new(config.hough);
        pipeline::analyze(&strain.series, &stress.series, &config, &mut approximator)?
    };

    present(&output, &config, &args.analysis)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.analysis)?;
    let spec = SampleSpec {
        seed: args.seed,
        ..SampleSpec::default()
    };
    let (sample, output) = pipeline::analyze_sample(&spec, &config)?;
    info!(
        modulus = sample.spec.modulus,
        onset = sample.spec.onset,
        offset_yield = sample.spec.offset_yield_stress(),
        "synthetic sample ground truth"
    );
    present(&output, &config, &args.analysis)
}

/// Print the report (and plot), then write the requested exports.
fn present(output: &AnalysisOutput, config: &AnalysisConfig, args: &AnalysisArgs) -> Result<(), AppError> {
    let curve = output.model.curve();
    println!(
        "{}",
        crate::report::format_analysis(curve, &output.estimate, &output.fit, &output.summary)
    );

    let inliers = output.curve_inliers();
    if args.plot {
        let plot = crate::plot::render_stress_strain(
            curve,
            Some((output.fit.modulus, output.fit.intercept)),
            Some(&inliers),
            args.width,
            args.height,
        );
        println!("{plot}");
    }

    if let Some(path) = &args.export_json {
        let report = AnalysisReport::new(config, &output.estimate, &output.fit, &output.summary);
        write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote JSON report");
    }
    if let Some(path) = &args.export_csv {
        write_points_csv(path, curve, &inliers)?;
        info!(path = %path.display(), "wrote point CSV");
    }
    Ok(())
}

/// Configuration from `--config` (or defaults), overridden by explicit flags.
pub fn analysis_config_from_args(args: &AnalysisArgs) -> Result<AnalysisConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(grid) = args.grid {
        config.merge.grid = grid;
    }
    if let Some(nq) = args.nq {
        config.hough.nq = nq;
    }
    if let Some(nr) = args.nr {
        config.hough.nr = nr;
    }
    if let Some(tol) = args.error_tolerance {
        config.refine.error_tolerance = tol;
    }
    if let Some(n) = args.max_iterations {
        config.refine.max_iterations = n;
    }
    if let Some(target) = args.optimize_on {
        config.refine.optimize_on = target;
    }
    if let Some(kind) = args.perturbation {
        config.refine.perturbation = kind;
    }
    if let Some(seed) = args.refine_seed {
        config.refine.seed = seed;
    }

    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<AnalysisConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open config '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid config JSON '{}': {e}", path.display())))
}
