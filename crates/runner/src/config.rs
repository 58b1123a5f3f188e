//! Run configuration loaded from YAML
//!
//! ```yaml
//! serve_dir: dist
//! port: 4173
//! viewports: [phones, desktop, kiosk=1080x1920]
//! scenarios: [home]
//! scripts:
//!   - name: home
//!     steps:
//!       - action: navigate
//!         path: /
//!       - action: snapshot
//!         name: landing
//!         spec: page-frame
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{RunnerError, RunnerResult};
use crate::playwright::BrowserKind;
use crate::scenario::ScenarioScript;
use crate::viewport::{Viewport, ViewportCatalog};

/// Everything a run needs besides the registered specs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Already running site; when set nothing is served
    pub base_url: Option<String>,

    /// Directory served by the built-in static server
    pub serve_dir: Option<PathBuf>,

    /// Preferred port for the static server
    pub port: u16,

    /// Successive ports tried when the preferred one is taken
    pub port_attempts: usize,

    /// Viewport tokens: preset, group or name=WIDTHxHEIGHT
    pub viewports: Vec<String>,

    /// Extra presets added to the built-in catalog
    pub presets: Vec<Viewport>,

    /// Extra groups added to the built-in catalog
    pub groups: BTreeMap<String, Vec<String>>,

    /// Scenarios to run; empty means all
    pub scenarios: Vec<String>,

    /// Worker override; defaults to the CPU count
    pub workers: Option<usize>,

    pub browser: BrowserKind,

    pub headless: bool,

    pub timeout_ms: u64,

    /// Pretty-print each report
    pub pretty: bool,

    /// Scenarios declared as step lists
    pub scripts: Vec<ScenarioScript>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            serve_dir: None,
            port: 4173,
            port_attempts: 10,
            viewports: vec!["common".to_string()],
            presets: Vec::new(),
            groups: BTreeMap::new(),
            scenarios: Vec::new(),
            workers: None,
            browser: BrowserKind::Chromium,
            headless: true,
            timeout_ms: 30_000,
            pretty: false,
            scripts: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml(yaml: &str) -> RunnerResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Built-in catalog extended with the configured presets and groups
    pub fn catalog(&self) -> RunnerResult<ViewportCatalog> {
        let mut catalog = self
            .presets
            .iter()
            .cloned()
            .fold(ViewportCatalog::default(), ViewportCatalog::with_preset);
        for (name, members) in &self.groups {
            catalog = catalog.with_group(name, members.clone())?;
        }
        Ok(catalog)
    }

    /// Expand the viewport tokens against [`RunConfig::catalog`]
    pub fn resolve_viewports(&self) -> RunnerResult<Vec<Viewport>> {
        self.catalog()?.expand(&self.viewports)
    }

    /// Checks that need no registry or browser
    pub fn validate(&self) -> RunnerResult<()> {
        if self.base_url.is_some() && self.serve_dir.is_some() {
            return Err(RunnerError::InvalidConfig(
                "base_url and serve_dir are mutually exclusive".to_string(),
            ));
        }
        if self.port_attempts == 0 {
            return Err(RunnerError::InvalidConfig(
                "port_attempts must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(RunnerError::InvalidConfig("workers must be at least 1".to_string()));
        }
        if let Some(preset) = self.presets.iter().find(|p| p.width == 0 || p.height == 0) {
            return Err(RunnerError::InvalidViewport {
                token: preset.name.clone(),
                reason: "dimensions must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = RunConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.port, 4173);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_document() {
        let config = RunConfig::from_yaml(
            r#"
serve_dir: dist
port: 5000
viewports: [handhelds, kiosk=1080x1920]
presets:
  - { name: watch, width: 200, height: 240 }
groups:
  handhelds: [watch, mobile]
workers: 2
browser: webkit
pretty: true
scripts:
  - name: home
    steps:
      - action: navigate
        path: /
"#,
        )
        .unwrap();

        assert_eq!(config.serve_dir, Some(PathBuf::from("dist")));
        assert_eq!(config.browser, BrowserKind::Webkit);
        assert_eq!(config.scripts[0].name, "home");

        let names: Vec<_> = config
            .resolve_viewports()
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, ["watch", "mobile", "kiosk"]);
    }

    #[test]
    fn test_validation() {
        let both = RunConfig {
            base_url: Some("http://localhost:3000".into()),
            serve_dir: Some("dist".into()),
            ..Default::default()
        };
        assert!(matches!(both.validate(), Err(RunnerError::InvalidConfig(_))));

        let zero = RunConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let bad_group = RunConfig {
            groups: BTreeMap::from([("mine".to_string(), vec!["nope".to_string()])]),
            ..Default::default()
        };
        assert!(matches!(
            bad_group.resolve_viewports(),
            Err(RunnerError::InvalidViewport { .. })
        ));
    }
}
