//! Scenario x viewport execution scheduler
//!
//! ```text
//! Plan::build(registry, selection, viewports)
//!   -> [ (home, mobile), (home, desktop), (about, mobile), ... ]   scenario-major
//!
//! Scheduler::run(plan, registry, browser)
//!   worker 0..W:  loop { i = cursor++ ; open page ; scenario ; close ; slots[i] = result }
//!   first error:  abort flag set, in-flight items drain, error returned
//! ```

use futures::future::join_all;
use layoutcheck_engine::LayoutReport;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::registry::Registry;
use crate::scenario::ScenarioRuntime;
use crate::session::Browser;
use crate::viewport::Viewport;

/// Lifecycle of one plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::Queued => "queued",
            ItemState::Running => "running",
            ItemState::Succeeded => "succeeded",
            ItemState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One (scenario, viewport) unit of work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub index: usize,
    pub scenario: String,
    pub viewport: Viewport,
}

/// Flat, ordered list of independent plan entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    entries: Vec<PlanEntry>,
}

impl Plan {
    /// Expand scenarios x viewports, scenario-major.
    ///
    /// An empty `selection` means every registered scenario. Repeated names in
    /// `selection` keep their first position.
    pub fn build<S: AsRef<str>>(
        registry: &Registry,
        selection: &[S],
        viewports: &[Viewport],
    ) -> RunnerResult<Self> {
        if registry.is_empty() {
            return Err(RunnerError::EmptyRegistry);
        }
        if viewports.is_empty() {
            return Err(RunnerError::InvalidConfig("no viewports selected".to_string()));
        }

        let mut scenarios: Vec<String> = Vec::new();
        if selection.is_empty() {
            scenarios.extend(registry.scenario_names().map(String::from));
        } else {
            for name in selection {
                let scenario = registry.scenario(name.as_ref())?;
                if !scenarios.iter().any(|s| s == scenario.name()) {
                    scenarios.push(scenario.name().to_string());
                }
            }
        }

        let entries = scenarios
            .iter()
            .flat_map(|scenario| viewports.iter().map(move |viewport| (scenario, viewport)))
            .enumerate()
            .map(|(index, (scenario, viewport))| PlanEntry {
                index,
                scenario: scenario.clone(),
                viewport: viewport.clone(),
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one succeeded plan entry; a failed entry aborts the run instead
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub entry: PlanEntry,
    pub duration_ms: u64,
    pub reports: Vec<LayoutReport>,
}

/// Bounded-concurrency plan executor
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    workers: Option<usize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the CPU-derived worker count
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Worker count for a plan of `plan_len` entries, always within `[1, plan_len]`
    pub fn worker_count(&self, plan_len: usize) -> usize {
        self.workers
            .unwrap_or_else(num_cpus::get)
            .clamp(1, plan_len.max(1))
    }

    /// Run every entry and return results in plan order.
    ///
    /// The first failing entry stops further claims; entries already running
    /// finish before its error is returned.
    pub async fn run(
        &self,
        plan: &Plan,
        registry: &Registry,
        browser: &dyn Browser,
    ) -> RunnerResult<Vec<ItemResult>> {
        let total = plan.len();
        let workers = self.worker_count(total);
        info!("Running {} plan entries on {} worker(s)", total, workers);

        let cursor = AtomicUsize::new(0);
        let aborted = AtomicBool::new(false);
        let first_error: Mutex<Option<RunnerError>> = Mutex::new(None);
        let slots: Vec<Mutex<Option<ItemResult>>> = (0..total).map(|_| Mutex::new(None)).collect();

        for entry in plan.entries() {
            debug!("[{}] {} @ {}: {}", entry.index, entry.scenario, entry.viewport.name, ItemState::Queued);
        }

        let (cursor, aborted, first_error, slots) = (&cursor, &aborted, &first_error, &slots);
        let pool = (0..workers).map(|worker| async move {
            loop {
                if aborted.load(Ordering::SeqCst) {
                    debug!("Worker {} stopping after abort", worker);
                    break;
                }
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(entry) = plan.entries().get(index) else {
                    break;
                };

                match run_entry(entry, registry, browser).await {
                    Ok(result) => *slots[index].lock() = Some(result),
                    Err(e) => {
                        error!(
                            "[{}] {} @ {}: {} - {}",
                            entry.index,
                            entry.scenario,
                            entry.viewport.name,
                            ItemState::Failed,
                            e
                        );
                        aborted.store(true, Ordering::SeqCst);
                        let mut first = first_error.lock();
                        if first.is_none() {
                            *first = Some(e);
                        }
                    }
                }
            }
        });
        join_all(pool).await;

        if let Some(e) = first_error.lock().take() {
            let finished = slots.iter().filter(|s| s.lock().is_some()).count();
            warn!("Run aborted: {} of {} entries finished", finished, total);
            return Err(e);
        }

        Ok(slots.iter().filter_map(|slot| slot.lock().take()).collect())
    }
}

async fn run_entry(
    entry: &PlanEntry,
    registry: &Registry,
    browser: &dyn Browser,
) -> RunnerResult<ItemResult> {
    let start = Instant::now();
    let scenario = registry.scenario(&entry.scenario)?;
    debug!("[{}] {} @ {}: {}", entry.index, entry.scenario, entry.viewport, ItemState::Running);

    let mut page = browser.open_page(&entry.viewport).await?;
    let outcome = {
        let mut runtime = ScenarioRuntime::new(&entry.scenario, &entry.viewport, page.as_mut());
        scenario.run(&mut runtime).await.map(|()| runtime.into_reports())
    };
    if let Err(e) = page.close().await {
        warn!("[{}] failed to close page: {}", entry.index, e);
    }
    let reports = outcome?;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "[{}] {} @ {}: {} ({} report(s), {} ms)",
        entry.index,
        entry.scenario,
        entry.viewport.name,
        ItemState::Succeeded,
        reports.len(),
        duration_ms
    );

    Ok(ItemResult {
        entry: entry.clone(),
        duration_ms,
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioScript, ScriptStep};
    use layoutcheck_engine::LayoutSpec;

    fn registry(names: &[&str]) -> Registry {
        let mut registry = Registry::new();
        registry.register_spec("frame", LayoutSpec::build(|_| {})).unwrap();
        for name in names {
            registry
                .register_script(&ScenarioScript {
                    name: name.to_string(),
                    description: String::new(),
                    steps: vec![ScriptStep::Navigate { path: "/".into() }],
                })
                .unwrap();
        }
        registry
    }

    fn viewports() -> Vec<Viewport> {
        vec![Viewport::new("mobile", 375, 812), Viewport::new("desktop", 1280, 800)]
    }

    #[test]
    fn test_plan_is_scenario_major() {
        let plan = Plan::build(&registry(&["home", "about"]), &[] as &[&str], &viewports()).unwrap();
        let order: Vec<_> = plan
            .entries()
            .iter()
            .map(|e| (e.index, e.scenario.as_str(), e.viewport.name.as_str()))
            .collect();
        assert_eq!(
            order,
            [
                (0, "home", "mobile"),
                (1, "home", "desktop"),
                (2, "about", "mobile"),
                (3, "about", "desktop"),
            ]
        );
    }

    #[test]
    fn test_plan_selection() {
        let registry = registry(&["home", "about", "blog"]);
        let plan = Plan::build(&registry, &["blog", "home", "blog"], &viewports()[..1]).unwrap();
        let names: Vec<_> = plan.entries().iter().map(|e| e.scenario.as_str()).collect();
        assert_eq!(names, ["blog", "home"]);
    }

    #[test]
    fn test_plan_config_errors() {
        let empty = Registry::new();
        assert!(matches!(
            Plan::build(&empty, &[] as &[&str], &viewports()),
            Err(RunnerError::EmptyRegistry)
        ));

        let registry = registry(&["home"]);
        assert!(matches!(
            Plan::build(&registry, &["nope"], &viewports()),
            Err(RunnerError::UnknownScenario(_))
        ));
        assert!(matches!(
            Plan::build(&registry, &[] as &[&str], &[]),
            Err(RunnerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_worker_count_clamped() {
        assert_eq!(Scheduler::new().with_workers(Some(8)).worker_count(3), 3);
        assert_eq!(Scheduler::new().with_workers(Some(0)).worker_count(3), 1);
        assert_eq!(Scheduler::new().with_workers(Some(2)).worker_count(5), 2);
        assert_eq!(Scheduler::new().with_workers(Some(4)).worker_count(0), 1);

        let derived = Scheduler::new().worker_count(1000);
        assert!(derived >= 1 && derived <= 1000);
    }
}
