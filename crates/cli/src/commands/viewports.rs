//! `layoutcheck viewports`

use anyhow::Result;
use clap::Args;
use std::path::Path;

use super::{load_config, RunOverrides};
use crate::output::{print_list, NamedList, OutputFormat};

#[derive(Args)]
pub struct ViewportsArgs {
    /// List groups instead of presets
    #[arg(long)]
    pub groups: bool,

    /// Expand the configured viewport tokens instead of listing the catalog
    #[arg(long)]
    pub resolve: bool,

    #[command(flatten)]
    pub overrides: RunOverrides,
}

pub fn execute(args: ViewportsArgs, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path, &args.overrides)?;

    if args.resolve {
        print_list(&config.resolve_viewports()?, format);
        return Ok(());
    }

    let catalog = config.catalog()?;
    if args.groups {
        let groups: Vec<NamedList> = catalog
            .groups()
            .iter()
            .map(|(name, members)| NamedList {
                name: name.clone(),
                members: members.clone(),
            })
            .collect();
        print_list(&groups, format);
    } else {
        print_list(catalog.presets(), format);
    }
    Ok(())
}
