//! CLI command implementations

pub mod plan;
pub mod run;
pub mod specs;
pub mod viewports;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use layoutcheck_runner::{BrowserKind, RunConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::builtin;

/// Run file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG: &str = "layoutcheck.yaml";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BrowserArg {
    Chromium,
    Firefox,
    Webkit,
}

impl From<BrowserArg> for BrowserKind {
    fn from(arg: BrowserArg) -> Self {
        match arg {
            BrowserArg::Chromium => BrowserKind::Chromium,
            BrowserArg::Firefox => BrowserKind::Firefox,
            BrowserArg::Webkit => BrowserKind::Webkit,
        }
    }
}

/// Flags that override the run file
#[derive(Debug, Clone, Default, Args)]
pub struct RunOverrides {
    /// Viewport tokens: preset, group or name=WIDTHxHEIGHT
    #[arg(long, value_delimiter = ',')]
    pub viewports: Vec<String>,

    /// Scenario to run (repeatable; default: all)
    #[arg(long = "scenario", short = 's')]
    pub scenarios: Vec<String>,

    /// Number of parallel workers
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Directory to serve
    #[arg(long, conflicts_with = "base_url")]
    pub serve: Option<PathBuf>,

    /// Already running site
    #[arg(long, env = "LAYOUTCHECK_BASE_URL")]
    pub base_url: Option<String>,

    /// Preferred port for the static server
    #[arg(long)]
    pub port: Option<u16>,

    /// Browser engine
    #[arg(long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Pretty-print each report
    #[arg(long)]
    pub pretty: bool,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut RunConfig) {
        if !self.viewports.is_empty() {
            config.viewports = self.viewports.clone();
        }
        if !self.scenarios.is_empty() {
            config.scenarios = self.scenarios.clone();
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if let Some(dir) = &self.serve {
            config.serve_dir = Some(dir.clone());
            config.base_url = None;
        }
        if let Some(url) = &self.base_url {
            config.base_url = Some(url.clone());
            config.serve_dir = None;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(browser) = self.browser {
            config.browser = browser.into();
        }
        if self.headed {
            config.headless = false;
        }
        if self.pretty {
            config.pretty = true;
        }
    }
}

/// Load the run file, fall back to defaults, apply overrides and make sure
/// at least one scenario exists
pub fn load_config(path: Option<&Path>, overrides: &RunOverrides) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load run file {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => RunConfig::load(DEFAULT_CONFIG)
            .with_context(|| format!("Failed to load run file {}", DEFAULT_CONFIG))?,
        None => {
            debug!("No run file, using defaults");
            RunConfig::default()
        }
    };

    overrides.apply(&mut config);
    if config.scripts.is_empty() {
        config.scripts.push(builtin::default_script());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = RunConfig::from_yaml("base_url: http://localhost:3000\nviewports: [all]\n").unwrap();
        let overrides = RunOverrides {
            viewports: vec!["mobile".into(), "kiosk=1080x1920".into()],
            serve: Some(PathBuf::from("dist")),
            browser: Some(BrowserArg::Firefox),
            workers: Some(2),
            headed: true,
            ..Default::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.viewports, ["mobile", "kiosk=1080x1920"]);
        assert_eq!(config.serve_dir, Some(PathBuf::from("dist")));
        assert_eq!(config.base_url, None);
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert_eq!(config.workers, Some(2));
        assert!(!config.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = RunConfig::from_yaml("viewports: [phones]\nworkers: 3\n").unwrap();
        RunOverrides::default().apply(&mut config);
        assert_eq!(config.viewports, ["phones"]);
        assert_eq!(config.workers, Some(3));
        assert!(config.headless);
    }

    #[test]
    fn test_load_config_adds_default_script() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "serve_dir: public\nscenarios: [root]").unwrap();

        let config = load_config(Some(file.path()), &RunOverrides::default()).unwrap();
        assert_eq!(config.scripts.len(), 1);
        assert_eq!(config.scripts[0].name, "root");
        assert_eq!(config.scenarios, ["root"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/layoutcheck.yaml")), &RunOverrides::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load run file"));
    }
}
