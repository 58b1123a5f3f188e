//! Layoutcheck CLI - Main Entry Point
//!
//! Exit status: 0 when every report is clean, 1 when any report has
//! violations, 2 when the run could not complete.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use layoutcheck_cli::commands::{plan, run, specs, viewports};
use layoutcheck_cli::output::OutputFormat;

/// Layoutcheck - responsive layout assertions across viewports
#[derive(Parser)]
#[command(name = "layoutcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Run file (default: ./layoutcheck.yaml when present)
    #[arg(long, short = 'c', global = true, env = "LAYOUTCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Output format for listings
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios across viewports and print one JSON report per snapshot
    Run(run::RunArgs),

    /// Show the scenario x viewport plan without running it
    Plan(plan::PlanArgs),

    /// List viewport presets and groups
    Viewports(viewports::ViewportsArgs),

    /// List built-in specs
    Specs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries reports, so logs go to stderr
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => run::execute(args, config).await,
        Commands::Plan(args) => plan::execute(args, config, cli.format).map(|_| false),
        Commands::Viewports(args) => viewports::execute(args, config, cli.format).map(|_| false),
        Commands::Specs => specs::execute(cli.format).map(|_| false),
    };

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    ExitCode::from(layoutcheck_cli::exit_status(&result))
}
