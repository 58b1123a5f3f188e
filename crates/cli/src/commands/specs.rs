//! `layoutcheck specs`

use anyhow::Result;

use crate::builtin;
use crate::output::{print_list, Described, OutputFormat};

pub fn execute(format: OutputFormat) -> Result<()> {
    let registry = builtin::registry()?;
    let descriptions = builtin::describe();
    let specs: Vec<Described> = registry
        .spec_names()
        .map(|name| Described {
            name: name.to_string(),
            description: descriptions
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, d)| d.to_string())
                .unwrap_or_default(),
        })
        .collect();
    print_list(&specs, format);
    Ok(())
}
