//! Layoutcheck runner
//!
//! This crate drives layout specs through real pages:
//! - Expands scenarios x viewports into a flat, ordered plan
//! - Runs the plan with a bounded pool of workers sharing one cursor
//! - Serves built output from a static directory when asked to
//! - Measures pages through Playwright and evaluates specs on the results
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     LayoutRunner (async)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  prepare(RunConfig, Registry) -> Plan         (fail fast)   │
//! │  run_with_playwright()                                       │
//! │    ├── StaticServer::bind(dir, port, attempts)              │
//! │    ├── PlaywrightBrowser::launch()              (once)       │
//! │    └── Scheduler::run(plan) -> [ItemResult]  (plan order)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  per plan entry                                              │
//! │    open_page(viewport) -> Scenario::run(runtime)            │
//! │      ├── navigate(path)                                     │
//! │      └── snapshot(name, spec) -> measure -> evaluate        │
//! │    close page                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod playwright;
pub mod registry;
pub mod runner;
pub mod scenario;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod viewport;

pub use config::RunConfig;
pub use error::{RunnerError, RunnerResult};
pub use output::ReportWriter;
pub use playwright::{BrowserKind, PlaywrightBrowser, PlaywrightConfig};
pub use registry::Registry;
pub use runner::{LayoutRunner, RunOutcome};
pub use scenario::{Scenario, ScenarioRuntime, ScenarioScript, ScriptStep, ScriptedScenario, SnapshotOptions};
pub use scheduler::{ItemResult, ItemState, Plan, PlanEntry, Scheduler};
pub use server::StaticServer;
pub use session::{Browser, Page};
pub use viewport::{Viewport, ViewportCatalog};
