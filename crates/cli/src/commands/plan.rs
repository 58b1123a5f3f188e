//! `layoutcheck plan`

use anyhow::Result;
use clap::Args;
use layoutcheck_runner::LayoutRunner;
use std::path::Path;

use super::{load_config, RunOverrides};
use crate::builtin;
use crate::output::{print_list, OutputFormat};

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,
}

/// Print the scenario x viewport plan without opening a browser
pub fn execute(args: PlanArgs, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path, &args.overrides)?;
    let runner = LayoutRunner::prepare(config, builtin::registry()?)?;
    print_list(runner.plan().entries(), format);
    Ok(())
}
