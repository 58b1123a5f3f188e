//! Run orchestration: validate, serve, launch, schedule

use layoutcheck_engine::LayoutReport;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::RunConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::playwright::{PlaywrightBrowser, PlaywrightConfig};
use crate::registry::Registry;
use crate::scheduler::{ItemResult, Plan, Scheduler};
use crate::server::StaticServer;
use crate::session::Browser;

/// Everything produced by one run, in plan order
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub items: Vec<ItemResult>,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn reports(&self) -> impl Iterator<Item = &LayoutReport> {
        self.items.iter().flat_map(|item| item.reports.iter())
    }

    pub fn violation_count(&self) -> usize {
        self.reports().map(|r| r.violations.len()).sum()
    }

    pub fn has_violations(&self) -> bool {
        self.reports().any(|r| !r.is_clean())
    }
}

/// A validated run, ready to execute
pub struct LayoutRunner {
    config: RunConfig,
    registry: Registry,
    plan: Plan,
}

impl LayoutRunner {
    /// Register configured scripts and build the plan.
    ///
    /// Every configuration error surfaces here, before any session opens.
    pub fn prepare(config: RunConfig, mut registry: Registry) -> RunnerResult<Self> {
        config.validate()?;
        for script in &config.scripts {
            registry.register_script(script)?;
        }
        let viewports = config.resolve_viewports()?;
        let plan = Plan::build(&registry, &config.scenarios, &viewports)?;

        info!(
            "Prepared {} scenario(s) x {} viewport(s) = {} plan entries",
            plan.len() / viewports.len().max(1),
            viewports.len(),
            plan.len()
        );
        Ok(Self {
            config,
            registry,
            plan,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Execute the plan against an already launched browser
    pub async fn run(&self, browser: &dyn Browser) -> RunnerResult<RunOutcome> {
        let start = Instant::now();
        let items = Scheduler::new()
            .with_workers(self.config.workers)
            .run(&self.plan, &self.registry, browser)
            .await?;

        let outcome = RunOutcome {
            items,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Run finished: {} report(s), {} violation(s) ({} ms)",
            outcome.reports().count(),
            outcome.violation_count(),
            outcome.duration_ms
        );
        Ok(outcome)
    }

    /// Serve (if configured), launch Playwright once and execute the plan
    pub async fn run_with_playwright(&self, work_dir: PathBuf) -> RunnerResult<RunOutcome> {
        let (base_url, server) = match (&self.config.base_url, &self.config.serve_dir) {
            (Some(url), _) => (url.clone(), None),
            (None, Some(dir)) => {
                let server = StaticServer::bind(dir, self.config.port, self.config.port_attempts).await?;
                (server.base_url(), Some(server))
            }
            (None, None) => {
                return Err(RunnerError::InvalidConfig(
                    "either base_url or serve_dir is required".to_string(),
                ))
            }
        };

        let browser = PlaywrightBrowser::launch(PlaywrightConfig {
            base_url,
            browser: self.config.browser,
            headless: self.config.headless,
            timeout_ms: self.config.timeout_ms,
            work_dir,
        })
        .await;
        let outcome = match browser {
            Ok(browser) => {
                let outcome = self.run(&browser).await;
                browser.shutdown().await;
                outcome
            }
            Err(e) => Err(e),
        };

        if let Some(server) = server {
            server.stop().await;
        }
        outcome
    }
}
