//! Scenario scripts and the runtime they drive

use async_trait::async_trait;
use layoutcheck_engine::{evaluate, EvaluationContext, LayoutReport, LayoutSpec, ViewportClass};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::registry::Registry;
use crate::session::Page;
use crate::viewport::Viewport;

/// A user journey that navigates and takes layout snapshots
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, runtime: &mut ScenarioRuntime<'_>) -> RunnerResult<()>;
}

/// Per-snapshot tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    /// Defaults to the viewport name
    #[serde(default)]
    pub view_tag: Option<String>,
    /// Overrides the class derived from the measured view width
    #[serde(default)]
    pub viewport_class: Option<ViewportClass>,
}

/// Handle given to a scenario for one plan entry
pub struct ScenarioRuntime<'a> {
    scenario: &'a str,
    viewport: &'a Viewport,
    page: &'a mut dyn Page,
    reports: Vec<LayoutReport>,
}

impl<'a> ScenarioRuntime<'a> {
    pub fn new(scenario: &'a str, viewport: &'a Viewport, page: &'a mut dyn Page) -> Self {
        Self {
            scenario,
            viewport,
            page,
            reports: Vec::new(),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewport
    }

    pub async fn navigate(&mut self, path: &str) -> RunnerResult<()> {
        debug!("[{} @ {}] navigate {}", self.scenario, self.viewport.name, path);
        self.page.navigate(path).await
    }

    /// Measure the page as it is now and evaluate `spec` against it
    pub async fn snapshot(
        &mut self,
        name: &str,
        spec: &LayoutSpec,
        options: SnapshotOptions,
    ) -> RunnerResult<&LayoutReport> {
        let measurement = self.page.measure(spec).await?;

        let mut cx = EvaluationContext::from_measurement(&measurement).named(self.scenario, name);
        cx.view_tag = Some(options.view_tag.unwrap_or_else(|| self.viewport.name.clone()));
        cx.viewport_class = options.viewport_class;

        let report = evaluate(spec, &measurement.store, cx);
        debug!("{}", report.summary());

        self.reports.push(report);
        Ok(&self.reports[self.reports.len() - 1])
    }

    pub fn into_reports(self) -> Vec<LayoutReport> {
        self.reports
    }
}

/// One step of a YAML-declared scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Navigate to a path relative to the base URL
    Navigate { path: String },

    /// Measure and evaluate a registered spec
    Snapshot {
        name: String,
        spec: String,
        #[serde(default)]
        view_tag: Option<String>,
        #[serde(default)]
        viewport_class: Option<ViewportClass>,
    },
}

/// A scenario declared in the run file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScript {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub steps: Vec<ScriptStep>,
}

enum CompiledStep {
    Navigate(String),
    Snapshot {
        name: String,
        spec: Arc<LayoutSpec>,
        options: SnapshotOptions,
    },
}

/// A [`ScenarioScript`] whose spec keys have been resolved
pub struct ScriptedScenario {
    name: String,
    steps: Vec<CompiledStep>,
}

impl ScriptedScenario {
    /// Resolve every spec key against `registry`; unknown keys fail here, not at run time
    pub fn compile(script: &ScenarioScript, registry: &Registry) -> RunnerResult<Self> {
        if script.steps.is_empty() {
            return Err(RunnerError::InvalidConfig(format!(
                "scenario '{}' has no steps",
                script.name
            )));
        }

        let steps = script
            .steps
            .iter()
            .map(|step| {
                Ok(match step {
                    ScriptStep::Navigate { path } => CompiledStep::Navigate(path.clone()),
                    ScriptStep::Snapshot {
                        name,
                        spec,
                        view_tag,
                        viewport_class,
                    } => CompiledStep::Snapshot {
                        name: name.clone(),
                        spec: registry.spec(spec)?,
                        options: SnapshotOptions {
                            view_tag: view_tag.clone(),
                            viewport_class: *viewport_class,
                        },
                    },
                })
            })
            .collect::<RunnerResult<Vec<_>>>()?;

        Ok(Self {
            name: script.name.clone(),
            steps,
        })
    }
}

#[async_trait]
impl Scenario for ScriptedScenario {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, runtime: &mut ScenarioRuntime<'_>) -> RunnerResult<()> {
        for step in &self.steps {
            match step {
                CompiledStep::Navigate(path) => runtime.navigate(path).await?,
                CompiledStep::Snapshot { name, spec, options } => {
                    runtime.snapshot(name, spec, options.clone()).await?;
                }
            }
        }
        Ok(())
    }
}
