//! Output formatting for listings
//!
//! Layout reports are written by the runner's `ReportWriter`; this module only
//! renders the informational listings (viewports, plan, specs).

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use layoutcheck_runner::{PlanEntry, Viewport};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for Viewport {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Width", "Height", "Class"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.width.to_string(),
            self.height.to_string(),
            self.class().to_string(),
        ]
    }
}

impl TableDisplay for PlanEntry {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Scenario", "Viewport", "Size", "Class"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.scenario.clone(),
            self.viewport.name.clone(),
            format!("{}x{}", self.viewport.width, self.viewport.height),
            self.viewport.class().to_string(),
        ]
    }
}

/// A named list of members, such as a viewport group
#[derive(Debug, Clone, Serialize)]
pub struct NamedList {
    pub name: String,
    pub members: Vec<String>,
}

impl TableDisplay for NamedList {
    fn headers() -> Vec<&'static str> {
        vec!["Group", "Members"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.members.join(", ")]
    }
}

/// Name plus description
#[derive(Debug, Clone, Serialize)]
pub struct Described {
    pub name: String,
    pub description: String,
}

impl TableDisplay for Described {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.description.clone()]
    }
}

/// Render a list of items
pub fn render_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                return "No items found.".to_string();
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_default(),
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    println!("{}", render_list(items, format));
}
