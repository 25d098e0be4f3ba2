//! parcost CLI: estimate, validate, and explain parfor plan documents.

use clap::{Parser, Subcommand, ValueEnum};
use parcost_core::config::EstimatorConfig;
use parcost_core::hash::hash_plan;
use parcost_core::plan::{ExecType, Measure};
use parcost_estimator::{
    explain_estimates, parse_plan_document, CostEstimator, Fallback, ParsedPlan, PlanConfig,
    TableLeafModel,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parcost")]
#[command(about = "Cost estimates (time, memory) for parfor plan trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MeasureArg {
    ExecTime,
    Memory,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExecTypeArg {
    InProcess,
    Distributed,
}

impl From<MeasureArg> for Measure {
    fn from(m: MeasureArg) -> Self {
        match m {
            MeasureArg::ExecTime => Measure::ExecTime,
            MeasureArg::Memory => Measure::MemoryUsage,
        }
    }
}

impl From<ExecTypeArg> for ExecType {
    fn from(et: ExecTypeArg) -> Self {
        match et {
            ExecTypeArg::InProcess => ExecType::InProcess,
            ExecTypeArg::Distributed => ExecType::Distributed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate one measure for a plan document
    Estimate {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        /// Measure to estimate
        #[arg(short, long, value_enum, default_value_t = MeasureArg::ExecTime)]
        measure: MeasureArg,

        /// Price every leaf as if it ran under this execution type
        #[arg(long, value_enum)]
        force: Option<ExecTypeArg>,

        /// Trip count for loops without one (overrides env and document config)
        #[arg(long)]
        iterations: Option<u64>,

        /// Fail on leaves without a profiled cost instead of using defaults
        #[arg(long)]
        strict: bool,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate a plan document (syntax and structure)
    Validate {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Show the plan tree with per-node estimates (EXPLAIN)
    Explain {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        /// Measure to annotate each node with
        #[arg(short, long, value_enum, default_value_t = MeasureArg::ExecTime)]
        measure: MeasureArg,

        /// Price every leaf as if it ran under this execution type
        #[arg(long, value_enum)]
        force: Option<ExecTypeArg>,

        /// Trip count for loops without one (overrides env and document config)
        #[arg(long)]
        iterations: Option<u64>,

        /// Fail on leaves without a profiled cost instead of using defaults
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Debug, Serialize)]
struct EstimateReport {
    measure: Measure,
    forced: Option<ExecType>,
    estimate: f64,
    plan_hash: String,
    nodes: usize,
    depth: usize,
    /// Only reported for memory estimates of plans with a memory budget.
    fits_cm: Option<bool>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            plan,
            measure,
            force,
            iterations,
            strict,
            json,
        } => {
            if let Err(e) = run_estimate(
                &plan,
                measure.into(),
                force.map(Into::into),
                iterations,
                strict,
                json,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { plan } => {
            if let Err(e) = validate_plan(&plan) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Plan is valid");
        }
        Commands::Explain {
            plan,
            measure,
            force,
            iterations,
            strict,
        } => {
            if let Err(e) = explain_plan(
                &plan,
                measure.into(),
                force.map(Into::into),
                iterations,
                strict,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load(path: &PathBuf) -> Result<ParsedPlan, Box<dyn std::error::Error>> {
    let src = fs::read_to_string(path)?;
    let parsed = parse_plan_document(&src)?;
    tracing::debug!(
        path = %path.display(),
        nodes = parsed.tree.size(),
        leaf_costs = parsed.leaf_costs.len(),
        "loaded plan"
    );
    Ok(parsed)
}

/// Env defaults, then the fields the document sets, then CLI overrides.
fn resolve_config(
    mut cfg: EstimatorConfig,
    doc: &PlanConfig,
    iterations: Option<u64>,
) -> Result<EstimatorConfig, parcost_core::Error> {
    doc.apply_to(&mut cfg);
    if let Some(n) = iterations {
        cfg.default_iterations = n;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_estimator(
    parsed: &ParsedPlan,
    iterations: Option<u64>,
    strict: bool,
) -> Result<CostEstimator<TableLeafModel>, parcost_core::Error> {
    let cfg = resolve_config(EstimatorConfig::from_env(), &parsed.config, iterations)?;
    let fallback = if strict {
        Fallback::Fail
    } else {
        Fallback::DefaultEstimate
    };
    let model = parsed.leaf_model(&cfg, fallback)?;
    CostEstimator::with_config(model, cfg)
}

fn build_report(
    parsed: &ParsedPlan,
    estimator: &CostEstimator<TableLeafModel>,
    measure: Measure,
    forced: Option<ExecType>,
) -> Result<EstimateReport, parcost_core::Error> {
    let estimate = estimator.estimate_tree(measure, &parsed.tree, forced)?;
    let fits_cm = match (measure, parsed.tree.cm) {
        (Measure::MemoryUsage, Some(cm)) => Some(estimate <= cm as f64),
        _ => None,
    };
    Ok(EstimateReport {
        measure,
        forced,
        estimate,
        plan_hash: hash_plan(&parsed.tree.root).to_hex(),
        nodes: parsed.tree.size(),
        depth: parsed.tree.depth(),
        fits_cm,
    })
}

fn run_estimate(
    path: &PathBuf,
    measure: Measure,
    forced: Option<ExecType>,
    iterations: Option<u64>,
    strict: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load(path)?;
    let estimator = build_estimator(&parsed, iterations, strict)?;
    let report = build_report(&parsed, &estimator, measure, forced)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("✓ {} estimate: {:.3}", report.measure, report.estimate);
    if let Some(et) = report.forced {
        println!("  Forced exec type: {}", et);
    }
    println!("  Nodes: {} (depth {})", report.nodes, report.depth);
    println!("  Plan hash: {}", report.plan_hash);
    if let Some(fits) = report.fits_cm {
        println!("  Fits memory budget: {}", if fits { "yes" } else { "no" });
    }
    Ok(())
}

fn validate_plan(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let _ = load(path)?;
    Ok(())
}

fn explain_plan(
    path: &PathBuf,
    measure: Measure,
    forced: Option<ExecType>,
    iterations: Option<u64>,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load(path)?;
    let estimator = build_estimator(&parsed, iterations, strict)?;
    print!(
        "{}",
        explain_estimates(&estimator, measure, &parsed.tree, forced)?
    );
    Ok(())
}
