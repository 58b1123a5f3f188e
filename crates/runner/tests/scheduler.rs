//! Scheduler behavior against an in-memory browser
//!
//! Run with: cargo test --package layoutcheck-runner --test scheduler

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use layoutcheck_engine::range::lte;
use layoutcheck_engine::relations::width_is;
use layoutcheck_engine::{ElemSnapshot, FrameRect, LayoutSpec, Measurement, SnapshotStore, ViewportClass};
use layoutcheck_runner::{
    Browser, ItemResult, Page, Plan, Registry, RunnerError, RunnerResult, Scenario, ScenarioRuntime, Scheduler,
    SnapshotOptions, Viewport,
};

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    finished: Mutex<Vec<String>>,
}

/// Pages render one full-width header; narrower viewports answer later
struct MemoryBrowser {
    counters: Arc<Counters>,
}

struct MemoryPage {
    viewport: Viewport,
    path: String,
    counters: Arc<Counters>,
}

#[async_trait]
impl Browser for MemoryBrowser {
    async fn open_page(&self, viewport: &Viewport) -> RunnerResult<Box<dyn Page>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryPage {
            viewport: viewport.clone(),
            path: String::new(),
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl Page for MemoryPage {
    async fn navigate(&mut self, path: &str) -> RunnerResult<()> {
        if path == "/boom" {
            tokio::time::sleep(Duration::from_millis(10)).await;
            return Err(RunnerError::Navigation {
                path: path.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.path = path.to_string();
        Ok(())
    }

    async fn measure(&mut self, spec: &LayoutSpec) -> RunnerResult<Measurement> {
        let width = self.viewport.width as f64;
        tokio::time::sleep(Duration::from_millis(2000 / self.viewport.width as u64 * 10)).await;

        let mut store = SnapshotStore::new();
        for decl in spec.elements() {
            store.insert(
                decl.key.clone(),
                vec![ElemSnapshot::visible_at(
                    decl.selector.label(),
                    FrameRect::new(0.0, 0.0, width, 60.0),
                )],
            );
        }
        let view = ElemSnapshot::visible_at(
            "view",
            FrameRect::new(0.0, 0.0, width, self.viewport.height as f64),
        );
        Ok(Measurement {
            store,
            view: view.clone(),
            canvas: view,
        })
    }

    async fn close(&mut self) -> RunnerResult<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters
            .finished
            .lock()
            .push(format!("{}{}", self.viewport.name, self.path));
        Ok(())
    }
}

struct Visit {
    name: String,
    path: &'static str,
    spec: Arc<LayoutSpec>,
}

#[async_trait]
impl Scenario for Visit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, runtime: &mut ScenarioRuntime<'_>) -> RunnerResult<()> {
        runtime.navigate(self.path).await?;
        runtime
            .snapshot("page", &self.spec, SnapshotOptions::default())
            .await?;
        Ok(())
    }
}

/// Header may be at most 320px wide, but only on mobile
fn header_spec() -> LayoutSpec {
    LayoutSpec::build(|b| {
        let header = b.el("header");
        b.must_ref(move |ctx| match ctx.viewport_class {
            ViewportClass::Mobile => vec![width_is(&header, lte(320.0))],
            ViewportClass::Tablet | ViewportClass::Desktop => vec![],
        });
    })
}

fn registry(scenarios: &[(&str, &'static str)]) -> Registry {
    let mut registry = Registry::new();
    registry.register_spec("header", header_spec()).unwrap();
    let spec = registry.spec("header").unwrap();
    for &(name, path) in scenarios {
        registry
            .register_scenario(Arc::new(Visit {
                name: name.to_string(),
                path,
                spec: spec.clone(),
            }))
            .unwrap();
    }
    registry
}

fn viewports() -> Vec<Viewport> {
    vec![
        Viewport::new("mobile-s", 320, 568),
        Viewport::new("mobile", 375, 812),
        Viewport::new("tablet", 768, 1024),
        Viewport::new("desktop", 1280, 800),
    ]
}

fn browser() -> (MemoryBrowser, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    (
        MemoryBrowser {
            counters: counters.clone(),
        },
        counters,
    )
}

async fn results_for(registry: &Registry, plan: &Plan, browser: &MemoryBrowser) -> Vec<ItemResult> {
    Scheduler::new()
        .with_workers(Some(2))
        .run(plan, registry, browser)
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn results_follow_plan_order_not_completion_order() {
    let registry = registry(&[("home", "/"), ("about", "/about"), ("blog", "/blog")]);
    let plan = Plan::build(&registry, &[] as &[&str], &viewports()).unwrap();
    let (browser, counters) = browser();

    for workers in [12, 3, 1] {
        let results = Scheduler::new()
            .with_workers(Some(workers))
            .run(&plan, &registry, &browser)
            .await
            .unwrap();

        assert_eq!(results.len(), plan.len());
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.entry, plan.entries()[i]);
            assert_eq!(result.reports.len(), 1);
            assert_eq!(result.reports[0].scenario_name, result.entry.scenario);
            assert_eq!(result.reports[0].view_tag.as_deref(), Some(result.entry.viewport.name.as_str()));
        }
    }

    let json = serde_json::to_value(&results_for(&registry, &plan, &browser).await[0]).unwrap();
    let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, ["duration_ms", "entry", "reports"]);

    // wide viewports answer first, so completion order differs from plan order
    let finished = counters.finished.lock().clone();
    assert_ne!(finished[..4], ["mobile-s/", "mobile/", "tablet/", "desktop/"][..]);
    assert_eq!(counters.opened.load(Ordering::SeqCst), 4 * 12);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 4 * 12);
}

#[tokio::test(start_paused = true)]
async fn responsive_branching_per_viewport() {
    let registry = registry(&[("home", "/")]);
    let plan = Plan::build(&registry, &["home"], &viewports()).unwrap();
    let (browser, _) = browser();

    let results = Scheduler::new()
        .with_workers(Some(2))
        .run(&plan, &registry, &browser)
        .await
        .unwrap();

    let violations: Vec<usize> = results.iter().map(|r| r.reports[0].violations.len()).collect();
    assert_eq!(violations, [0, 1, 0, 0]);

    let report = &results[1].reports[0];
    assert_eq!(report.viewport_class, ViewportClass::Mobile);
    assert_eq!(report.violations[0].constraint, "width_is");
}

#[tokio::test(start_paused = true)]
async fn single_worker_stops_after_first_error() {
    let registry = registry(&[("broken", "/boom"), ("home", "/")]);
    let plan = Plan::build(&registry, &[] as &[&str], &viewports()).unwrap();
    let (browser, counters) = browser();

    let err = Scheduler::new()
        .with_workers(Some(1))
        .run(&plan, &registry, &browser)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Navigation { ref path, .. } if path == "/boom"));
    assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn in_flight_work_drains_after_abort() {
    let registry = registry(&[("home", "/"), ("broken", "/boom")]);
    let viewports = [Viewport::new("mobile-s", 320, 568), Viewport::new("desktop", 1280, 800)];
    let plan = Plan::build(&registry, &["home", "broken"], &viewports).unwrap();
    let (browser, counters) = browser();

    let err = Scheduler::new()
        .with_workers(Some(2))
        .run(&plan, &registry, &browser)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Navigation { .. }));
    // worker 0 is still measuring (home, mobile-s) when worker 1 fails on
    // (broken, mobile-s); it finishes that entry but claims nothing after it
    let finished = counters.finished.lock().clone();
    assert_eq!(finished, ["desktop/", "mobile-s", "mobile-s/"]);
    assert_eq!(counters.opened.load(Ordering::SeqCst), 3);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 3);
}
