//! Named specs and scenarios available to a run

use layoutcheck_engine::LayoutSpec;
use std::sync::Arc;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::scenario::{Scenario, ScenarioScript, ScriptedScenario};

/// Specs and scenarios, in registration order
#[derive(Default)]
pub struct Registry {
    specs: Vec<(String, Arc<LayoutSpec>)>,
    scenarios: Vec<Arc<dyn Scenario>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_spec(&mut self, name: impl Into<String>, spec: LayoutSpec) -> RunnerResult<()> {
        let name = name.into();
        if self.specs.iter().any(|(n, _)| *n == name) {
            return Err(RunnerError::InvalidConfig(format!(
                "spec '{}' registered twice",
                name
            )));
        }
        debug!("Registered spec {} ({} factories)", name, spec.factory_count());
        self.specs.push((name, Arc::new(spec)));
        Ok(())
    }

    pub fn register_scenario(&mut self, scenario: Arc<dyn Scenario>) -> RunnerResult<()> {
        if self.scenarios.iter().any(|s| s.name() == scenario.name()) {
            return Err(RunnerError::InvalidConfig(format!(
                "scenario '{}' registered twice",
                scenario.name()
            )));
        }
        debug!("Registered scenario {}", scenario.name());
        self.scenarios.push(scenario);
        Ok(())
    }

    /// Compile a declared script against the specs registered so far
    pub fn register_script(&mut self, script: &ScenarioScript) -> RunnerResult<()> {
        let scenario = ScriptedScenario::compile(script, self)?;
        self.register_scenario(Arc::new(scenario))
    }

    pub fn spec(&self, name: &str) -> RunnerResult<Arc<LayoutSpec>> {
        self.specs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec.clone())
            .ok_or_else(|| RunnerError::UnknownSpec(name.to_string()))
    }

    pub fn scenario(&self, name: &str) -> RunnerResult<Arc<dyn Scenario>> {
        self.scenarios
            .iter()
            .find(|s| s.name() == name)
            .cloned()
            .ok_or_else(|| RunnerError::UnknownScenario(name.to_string()))
    }

    pub fn spec_names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|(n, _)| n.as_str())
    }

    pub fn scenario_names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.name())
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
