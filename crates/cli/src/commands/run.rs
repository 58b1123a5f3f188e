//! `layoutcheck run`

use anyhow::{Context, Result};
use clap::Args;
use layoutcheck_runner::{LayoutRunner, ReportWriter};
use std::path::Path;
use tracing::info;

use super::{load_config, RunOverrides};
use crate::builtin;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,
}

/// Run every planned scenario and viewport; returns whether any report had violations
pub async fn execute(args: RunArgs, config_path: Option<&Path>) -> Result<bool> {
    let config = load_config(config_path, &args.overrides)?;
    let pretty = config.pretty;
    let runner = LayoutRunner::prepare(config, builtin::registry()?)?;

    let work_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let outcome = runner.run_with_playwright(work_dir).await?;

    let stdout = std::io::stdout();
    let dirty = ReportWriter::new(stdout.lock(), pretty).write_all(outcome.reports())?;

    if dirty {
        info!(
            "{} violation(s) across {} report(s)",
            outcome.violation_count(),
            outcome.reports().count()
        );
    } else {
        info!("All {} report(s) clean", outcome.reports().count());
    }
    Ok(dirty)
}
