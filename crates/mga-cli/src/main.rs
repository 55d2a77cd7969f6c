mod model_file;
mod report;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use mga_core::{LpModel, Mga, MgaConfig, OptimizationModel, Sense, Target};
use tracing::{error, info};

use crate::model_file::ModelFile;

#[derive(Parser)]
#[command(name = "mga")]
#[command(about = "Modeling-to-generate-alternatives sampling for LP investment models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a model file for errors
    Check {
        /// The JSON model file
        file: PathBuf,
    },
    /// Solve the cost-minimal baseline and print the investments
    Solve {
        /// The JSON model file
        file: PathBuf,
    },
    /// Sample near-optimal alternatives, one per label
    Run {
        /// The JSON model file
        file: PathBuf,
        /// Fractional cost premium allowed above the optimum
        #[arg(short, long, default_value_t = 0.1)]
        slack: f64,
        /// Component label whose investment is optimised; repeat for more samples
        #[arg(short, long = "label", required = true)]
        labels: Vec<String>,
        /// Direction in which the labelled investment is pushed (min or max)
        #[arg(long, default_value = "max")]
        sense: Sense,
        /// Maximum number of alternative solves in flight (0 = all CPUs)
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
        /// Time limit for each solve, in seconds
        #[arg(long)]
        time_limit_secs: Option<f64>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
    Csv,
}

fn main() {
    // Logs go to stderr so json/csv output stays clean; RUST_LOG overrides the level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Check { file } => check(&file),
        Commands::Solve { file } => solve(&file),
        Commands::Run {
            file,
            slack,
            labels,
            sense,
            threads,
            time_limit_secs,
            format,
        } => {
            let mut config = MgaConfig::new(slack).with_sense(sense).with_threads(threads);
            if let Some(secs) = time_limit_secs {
                let limit = Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("invalid time limit {}", secs))?;
                config = config.with_time_limit(limit);
            }
            let targets: Vec<Target> = labels.into_iter().map(Target::from).collect();
            sample(&file, config, &targets, format)
        }
    }
}

fn load_model(path: &Path) -> Result<(ModelFile, LpModel)> {
    let file = ModelFile::load(path)?;
    let problem = file
        .to_problem()
        .with_context(|| format!("building model from '{}'", path.display()))?;
    Ok((file, LpModel::new(problem)))
}

fn check(path: &Path) -> Result<()> {
    let (file, model) = load_model(path)?;

    println!("✓ {} is valid", path.display());
    if let Some(name) = &file.name {
        println!("  model {}", name);
    }
    println!("  {} variables", model.problem().num_variables());
    println!("  {} investment variables", file.investment_count());
    println!("  {} constraints", model.problem().num_constraints());
    Ok(())
}

fn solve(path: &Path) -> Result<()> {
    let (_, mut model) = load_model(path)?;

    info!("Solving for global optimum");
    let report = model.solve(None);
    if !report.is_optimal() {
        bail!("baseline solve failed ({}): {}", report.status, report.detail);
    }

    println!("Status: OPTIMAL");
    println!("Total cost: {:.4}", report.objective_value);
    println!();
    println!("Investments:");
    for var in model.investment_variables() {
        let value = var.value.unwrap_or_default();
        println!("  {:30} {:12.4}  ({})", var.id, value, var.component);
    }
    Ok(())
}

fn sample(path: &Path, config: MgaConfig, targets: &[Target], format: Format) -> Result<()> {
    let (_, model) = load_model(path)?;

    let run = Mga::new(config)
        .run(&model, targets)
        .context("MGA sampling failed")?;

    match format {
        Format::Pretty => report::print_pretty(&run),
        Format::Json => println!("{}", serde_json::to_string_pretty(&run)?),
        Format::Csv => report::write_csv(&run.samples.table(), io::stdout().lock())?,
    }
    Ok(())
}
