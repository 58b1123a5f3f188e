//! Snapshot resolution and spec evaluation

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::constraint::{GroupTarget, Target};
use crate::error::Result;
use crate::geometry::{Elem, ElemSnapshot, Group};
use crate::report::LayoutReport;
use crate::spec::{ElemRef, GroupRef, LayoutSpec, RefKey, SelectorDescriptor, CANVAS_KEY, VIEW_KEY};
use crate::viewport::{ViewSize, ViewportClass};

/// Measurements keyed by reference key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotStore {
    entries: BTreeMap<RefKey, Vec<ElemSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RefKey, snapshots: Vec<ElemSnapshot>) {
        self.entries.insert(key, snapshots);
    }

    pub fn get(&self, key: &RefKey) -> &[ElemSnapshot] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the measurement collaborator returns for one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub store: SnapshotStore,
    pub view: ElemSnapshot,
    pub canvas: ElemSnapshot,
}

impl Measurement {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-evaluation resolver with memoized element and group lookups
pub struct Scope<'a> {
    spec: &'a LayoutSpec,
    store: &'a SnapshotStore,
    view: Arc<Elem>,
    canvas: Arc<Elem>,
    elems: RefCell<HashMap<RefKey, Arc<Elem>>>,
    groups: RefCell<HashMap<RefKey, Arc<Group>>>,
}

impl<'a> Scope<'a> {
    pub fn new(
        spec: &'a LayoutSpec,
        store: &'a SnapshotStore,
        view: ElemSnapshot,
        canvas: ElemSnapshot,
    ) -> Self {
        Self {
            spec,
            store,
            view: Arc::new(Elem::new(view)),
            canvas: Arc::new(Elem::new(canvas)),
            elems: RefCell::new(HashMap::new()),
            groups: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve to the first stored entry, or a placeholder when there is none
    pub fn elem(&self, r: &ElemRef) -> Arc<Elem> {
        let key = r.key();
        match key.as_str() {
            VIEW_KEY => return self.view.clone(),
            CANVAS_KEY => return self.canvas.clone(),
            _ => {}
        }

        if let Some(elem) = self.elems.borrow().get(key) {
            return elem.clone();
        }

        let elem = match self.store.get(key).first() {
            Some(snapshot) => Elem::new(snapshot.clone()),
            None => Elem::placeholder(self.spec.label(key)),
        };
        let elem = Arc::new(elem);
        self.elems.borrow_mut().insert(key.clone(), elem.clone());
        elem
    }

    /// Resolve to every stored entry in order, or an empty group
    pub fn group(&self, r: &GroupRef) -> Arc<Group> {
        let key = r.key();
        if let Some(group) = self.groups.borrow().get(key) {
            return group.clone();
        }

        let group = match self.spec.descriptor(key) {
            Some(SelectorDescriptor::View) => Group::new("view", vec![self.view.clone()]),
            Some(SelectorDescriptor::Canvas) => Group::new("canvas", vec![self.canvas.clone()]),
            _ => Group::from_snapshots(self.spec.label(key), self.store.get(key)),
        };
        let group = Arc::new(group);
        self.groups.borrow_mut().insert(key.clone(), group.clone());
        group
    }

    pub fn resolve(&self, target: &Target) -> Arc<Elem> {
        match target {
            Target::Ref(r) => self.elem(r),
            Target::Resolved(elem) => elem.clone(),
        }
    }

    pub fn resolve_group(&self, target: &GroupTarget) -> Arc<Group> {
        match target {
            GroupTarget::Ref(r) => self.group(r),
            GroupTarget::Resolved(group) => group.clone(),
        }
    }

    pub fn view(&self) -> Arc<Elem> {
        self.view.clone()
    }

    pub fn canvas(&self) -> Arc<Elem> {
        self.canvas.clone()
    }
}

/// Runtime data available to `must_ref` factories
pub struct RuntimeContext<'a> {
    pub scope: &'a Scope<'a>,
    pub view_size: ViewSize,
    pub viewport_class: ViewportClass,
    pub scenario_name: &'a str,
    pub snapshot_name: &'a str,
    pub view_tag: Option<&'a str>,
}

impl<'a> RuntimeContext<'a> {
    pub fn elem(&self, r: &ElemRef) -> Arc<Elem> {
        self.scope.elem(r)
    }

    pub fn group(&self, r: &GroupRef) -> Arc<Group> {
        self.scope.group(r)
    }
}

/// Inputs for one evaluation besides the spec and the store
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub view: ElemSnapshot,
    pub canvas: ElemSnapshot,
    pub scenario_name: String,
    pub snapshot_name: String,
    pub view_tag: Option<String>,
    /// Overrides the class derived from the view width
    pub viewport_class: Option<ViewportClass>,
}

impl EvaluationContext {
    pub fn new(view: ElemSnapshot, canvas: ElemSnapshot) -> Self {
        Self {
            view,
            canvas,
            ..Default::default()
        }
    }

    pub fn from_measurement(measurement: &Measurement) -> Self {
        Self::new(measurement.view.clone(), measurement.canvas.clone())
    }

    pub fn named(mut self, scenario: impl Into<String>, snapshot: impl Into<String>) -> Self {
        self.scenario_name = scenario.into();
        self.snapshot_name = snapshot.into();
        self
    }
}

/// Evaluate a spec against one measurement store
pub fn evaluate(spec: &LayoutSpec, store: &SnapshotStore, cx: EvaluationContext) -> LayoutReport {
    let view_size = ViewSize {
        width: cx.view.bbox.width,
        height: cx.view.bbox.height,
    };
    let viewport_class = cx
        .viewport_class
        .unwrap_or_else(|| ViewportClass::from_width(view_size.width));

    let scope = Scope::new(spec, store, cx.view, cx.canvas);
    let runtime = RuntimeContext {
        scope: &scope,
        view_size,
        viewport_class,
        scenario_name: &cx.scenario_name,
        snapshot_name: &cx.snapshot_name,
        view_tag: cx.view_tag.as_deref(),
    };

    let violations: Vec<_> = spec
        .factories()
        .iter()
        .flat_map(|factory| factory(&runtime).check_all(&scope))
        .collect();

    debug!(
        "Evaluated {} factories for {}/{}: {} violation(s)",
        spec.factory_count(),
        cx.scenario_name,
        cx.snapshot_name,
        violations.len()
    );

    LayoutReport {
        scenario_name: cx.scenario_name,
        snapshot_name: cx.snapshot_name,
        view_tag: cx.view_tag,
        view_size,
        viewport_class,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::geometry::FrameRect;
    use crate::range::{between, eq};
    use crate::relations::{below, count_is, visible, width_is};
    use crate::violation::Violation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame(width: f64, height: f64) -> ElemSnapshot {
        ElemSnapshot::visible_at("view", FrameRect::new(0.0, 0.0, width, height))
    }

    fn rect(selector: &str, top: f64, height: f64) -> ElemSnapshot {
        ElemSnapshot::visible_at(selector, FrameRect::new(0.0, top, 200.0, height))
    }

    #[test]
    fn test_header_menu_gap() {
        let mut menu_top = 70.0;
        let spec = LayoutSpec::build(|b| {
            let header = b.el("header");
            let menu = b.el(".menu");
            b.must(below(&menu, &header, between(0.0, 16.0)));
        });

        let header_key = spec.elements()[0].key.clone();
        let menu_key = spec.elements()[1].key.clone();

        let mut results = Vec::new();
        for _ in 0..2 {
            let mut store = SnapshotStore::new();
            store.insert(header_key.clone(), vec![rect("header", 0.0, 60.0)]);
            store.insert(menu_key.clone(), vec![rect(".menu", menu_top, 40.0)]);
            results.push(evaluate(&spec, &store, EvaluationContext::new(frame(1280.0, 800.0), frame(1280.0, 2000.0))));
            menu_top = 90.0;
        }

        assert!(results[0].violations.is_empty());
        assert_eq!(results[1].violations.len(), 1);
        assert_eq!(results[1].violations[0].detail_f64("diff"), Some(30.0));
    }

    #[test]
    fn test_missing_refs_resolve_to_placeholders() {
        let spec = LayoutSpec::build(|b| {
            let banner = b.el(".banner");
            let cards = b.group(".card");
            b.must(count_is(&cards, eq(0.0)));
            b.must(visible(&banner));
        });
        let store = SnapshotStore::new();
        let report = evaluate(&spec, &store, EvaluationContext::new(frame(800.0, 600.0), frame(800.0, 600.0)));

        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].constraint, "visible");
        assert!(report.violations[0].message.contains(".banner"));
    }

    #[test]
    fn test_frame_descriptors_resolve_to_frames() {
        let spec = LayoutSpec::build(|b| {
            let view = b.el(SelectorDescriptor::View);
            let canvas = b.el(SelectorDescriptor::Canvas);
            let views = b.group(SelectorDescriptor::View);
            b.must(visible(&view));
            b.must(width_is(&canvas, eq(800.0)));
            b.must(count_is(&views, eq(1.0)));
        });
        let store = SnapshotStore::new();
        let report = evaluate(&spec, &store, EvaluationContext::new(frame(800.0, 600.0), frame(800.0, 2400.0)));
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn test_resolution_is_memoized() {
        let mut refs = None;
        let spec = LayoutSpec::build(|b| refs = Some((b.el(".logo"), b.group("li"))));
        let (logo, items) = refs.unwrap();

        let mut store = SnapshotStore::new();
        store.insert(logo.key().clone(), vec![rect(".logo", 0.0, 10.0), rect(".logo", 50.0, 10.0)]);
        store.insert(items.key().clone(), vec![rect("li", 0.0, 10.0), rect("li", 20.0, 10.0)]);

        let scope = Scope::new(&spec, &store, frame(100.0, 100.0), frame(100.0, 100.0));
        let first = scope.elem(&logo);
        assert!(Arc::ptr_eq(&first, &scope.elem(&logo)));
        assert_eq!(first.top(), 0.0);

        let group = scope.group(&items);
        assert!(Arc::ptr_eq(&group, &scope.group(&items)));
        assert_eq!(group.len(), 2);
        assert_eq!(group.items()[1].top(), 20.0);
    }

    #[test]
    fn test_factories_run_in_order_and_results_concatenate() {
        let spec = LayoutSpec::build(|b| {
            b.must(Constraint::new("first", |_| vec![Violation::new("first", "a")]));
            b.must(vec![
                Constraint::new("second", |_| vec![Violation::new("second", "b")]),
                Constraint::new("third", |_| vec![Violation::new("third", "c")]),
            ]);
        });
        let store = SnapshotStore::new();
        let report = evaluate(&spec, &store, EvaluationContext::new(frame(100.0, 100.0), frame(100.0, 100.0)));
        let names: Vec<_> = report.violations.iter().map(|v| v.constraint.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_must_ref_branches_on_viewport_class() {
        let spec = LayoutSpec::build(|b| {
            let sidebar = b.el("aside");
            b.must_ref(move |ctx| match ctx.viewport_class {
                ViewportClass::Mobile => width_is(&sidebar, eq(0.0)),
                ViewportClass::Tablet | ViewportClass::Desktop => width_is(&sidebar, eq(200.0)),
            });
        });
        let key = spec.elements()[0].key.clone();
        let mut store = SnapshotStore::new();
        store.insert(key, vec![rect("aside", 0.0, 500.0)]);

        let desktop = evaluate(&spec, &store, EvaluationContext::new(frame(1280.0, 800.0), frame(1280.0, 800.0)));
        assert!(desktop.violations.is_empty());
        assert_eq!(desktop.viewport_class, ViewportClass::Desktop);

        let mobile = evaluate(&spec, &store, EvaluationContext::new(frame(375.0, 800.0), frame(375.0, 800.0)));
        assert_eq!(mobile.violations.len(), 1);

        let mut forced = EvaluationContext::new(frame(375.0, 800.0), frame(375.0, 800.0));
        forced.viewport_class = Some(ViewportClass::Tablet);
        let forced = evaluate(&spec, &store, forced);
        assert_eq!(forced.viewport_class, ViewportClass::Tablet);
        assert!(forced.violations.is_empty());
    }

    #[test]
    fn test_spec_is_reusable_across_stores() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let spec = LayoutSpec::build(move |b| {
            b.must_ref(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Vec::<Constraint>::new()
            });
        });
        let store = SnapshotStore::new();
        for _ in 0..3 {
            evaluate(&spec, &store, EvaluationContext::new(frame(10.0, 10.0), frame(10.0, 10.0)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_report_tags() {
        let spec = LayoutSpec::build(|_| {});
        let store = SnapshotStore::new();
        let mut cx = EvaluationContext::new(frame(390.0, 844.0), frame(390.0, 3000.0)).named("checkout", "summary");
        cx.view_tag = Some("iphone".into());
        let report = evaluate(&spec, &store, cx);

        assert_eq!(report.scenario_name, "checkout");
        assert_eq!(report.snapshot_name, "summary");
        assert_eq!(report.view_tag.as_deref(), Some("iphone"));
        assert_eq!(report.view_size, ViewSize { width: 390.0, height: 844.0 });
    }

    #[test]
    fn test_measurement_payload() {
        let json = r#"{
            "store": {
                "el-1": [{ "selector": "h1", "box": { "left": 0, "top": 0, "width": 100, "height": 20 }, "visible": true }],
                "group-2": []
            },
            "view": { "selector": "view", "box": { "left": 0, "top": 0, "width": 1280, "height": 720 } },
            "canvas": { "selector": "canvas", "box": { "left": 0, "top": 0, "width": 1280, "height": 4000 } }
        }"#;
        let m = Measurement::from_json(json).unwrap();
        assert_eq!(m.store.get(&RefKey::new("el-1")).len(), 1);
        assert!(m.store.get(&RefKey::new("group-2")).is_empty());
        assert!(m.store.get(&RefKey::new("el-9")).is_empty());
        assert_eq!(m.canvas.bbox.height, 4000.0);

        assert!(Measurement::from_json("{").is_err());
    }
}
