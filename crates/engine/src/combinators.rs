//! Quantifiers over groups
//!
//! Each combinator takes a group and a closure that builds the per-element
//! constraint(s). The closure receives the already resolved element, so the
//! same cached instance is shared with any other constraint that touches it.

use serde_json::json;
use std::sync::Arc;

use crate::constraint::{Constraint, Constraints, GroupTarget, Target};
use crate::evaluate::Scope;
use crate::geometry::Elem;
use crate::violation::Violation;

fn check_item<F, C>(scope: &Scope<'_>, predicate: &F, elem: &Arc<Elem>) -> Vec<Violation>
where
    F: Fn(Target) -> C,
    C: Into<Constraints>,
{
    let constraints: Constraints = predicate(Target::Resolved(elem.clone())).into();
    constraints.check_all(scope)
}

/// Every element must satisfy `predicate`; violations are re-namespaced `for_all[i].`
pub fn for_all<F, C>(group: impl Into<GroupTarget>, predicate: F) -> Constraint
where
    F: Fn(Target) -> C + Send + Sync + 'static,
    C: Into<Constraints>,
{
    let group = group.into();
    Constraint::new("for_all", move |scope| {
        let g = scope.resolve_group(&group);
        g.items()
            .iter()
            .enumerate()
            .flat_map(|(i, elem)| {
                let prefix = format!("for_all[{}]", i);
                check_item(scope, &predicate, elem)
                    .into_iter()
                    .map(move |v| v.nested(&prefix))
            })
            .collect()
    })
}

/// At least one element must satisfy `predicate`.
///
/// Stops at the first element with zero violations. Otherwise reports one
/// `exists` violation carrying every element's violations. An empty group fails.
pub fn exists<F, C>(group: impl Into<GroupTarget>, predicate: F) -> Constraint
where
    F: Fn(Target) -> C + Send + Sync + 'static,
    C: Into<Constraints>,
{
    let group = group.into();
    Constraint::new("exists", move |scope| {
        let g = scope.resolve_group(&group);
        let mut failures = Vec::with_capacity(g.len());
        for (i, elem) in g.items().iter().enumerate() {
            let violations = check_item(scope, &predicate, elem);
            if violations.is_empty() {
                return vec![];
            }
            failures.push(json!({ "index": i, "selector": elem.selector(), "violations": violations }));
        }

        vec![Violation::new(
            "exists",
            format!(
                "none of the {} element(s) matching `{}` satisfies the condition",
                g.len(),
                g.selector()
            ),
        )
        .with_details(json!({ "items": failures }))]
    })
}

/// No element may satisfy `predicate`.
///
/// Fails with `none[i]` at the first element producing zero violations. An
/// empty group passes.
pub fn none<F, C>(group: impl Into<GroupTarget>, predicate: F) -> Constraint
where
    F: Fn(Target) -> C + Send + Sync + 'static,
    C: Into<Constraints>,
{
    let group = group.into();
    Constraint::new("none", move |scope| {
        let g = scope.resolve_group(&group);
        for (i, elem) in g.items().iter().enumerate() {
            if check_item(scope, &predicate, elem).is_empty() {
                return vec![Violation::new(
                    format!("none[{}]", i),
                    format!(
                        "element {} matching `{}` satisfies a condition it must not",
                        i,
                        g.selector()
                    ),
                )
                .with_details(json!({ "index": i, "selector": elem.selector() }))];
            }
        }
        vec![]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{evaluate, EvaluationContext, SnapshotStore};
    use crate::geometry::{ElemSnapshot, FrameRect, Group};
    use crate::range::{gte, lte};
    use crate::relations::tests::{check, el};
    use crate::relations::{inside, visible, width_is};
    use crate::spec::LayoutSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn group(widths: &[f64]) -> Group {
        let items = widths
            .iter()
            .enumerate()
            .map(|(i, w)| Arc::new(el(".tile", 0.0, i as f64 * 50.0, *w, 40.0)))
            .collect();
        Group::new(".tile", items)
    }

    #[test]
    fn test_for_all_prefixes_index() {
        let tiles = group(&[100.0, 300.0, 100.0, 400.0]);
        let v = check(&for_all(tiles, |t| width_is(t, lte(200.0))));
        let names: Vec<_> = v.iter().map(|v| v.constraint.as_str()).collect();
        assert_eq!(names, ["for_all[1].width_is", "for_all[3].width_is"]);
    }

    #[test]
    fn test_for_all_accepts_many_per_element() {
        let container = el(".grid", 0.0, 0.0, 250.0, 1000.0);
        let tiles = group(&[100.0, 300.0]);
        let v = check(&for_all(tiles, move |t| {
            vec![visible(t.clone()), inside(t, container.clone(), None)]
        }));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].constraint, "for_all[1].inside.right");
    }

    #[test]
    fn test_exists_and_none_when_every_element_matches() {
        let tiles = group(&[100.0, 120.0, 140.0]);
        assert!(check(&exists(tiles.clone(), |t| width_is(t, gte(50.0)))).is_empty());

        let v = check(&none(tiles, |t| width_is(t, gte(50.0))));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].constraint, "none[0]");
    }

    #[test]
    fn test_exists_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let tiles = group(&[300.0, 100.0, 100.0, 100.0]);
        let v = check(&exists(tiles, move |t| {
            counter.fetch_add(1, Ordering::SeqCst);
            width_is(t, lte(200.0))
        }));
        assert!(v.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exists_reports_single_aggregate_failure() {
        let tiles = group(&[300.0, 400.0]);
        let v = check(&exists(tiles, |t| width_is(t, lte(200.0))));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].constraint, "exists");

        let items = v[0].details.as_ref().unwrap()["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["index"], 1);
        assert_eq!(items[1]["violations"][0]["constraint"], "width_is");
    }

    #[test]
    fn test_none_passes_when_nothing_matches() {
        let tiles = group(&[300.0, 400.0]);
        assert!(check(&none(tiles, |t| width_is(t, lte(200.0)))).is_empty());
    }

    #[test]
    fn test_empty_group_asymmetry() {
        let empty = Group::new(".tile", vec![]);
        let v = check(&exists(empty.clone(), |t| visible(t)));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].constraint, "exists");

        assert!(check(&none(empty.clone(), |t| visible(t))).is_empty());
        assert!(check(&for_all(empty, |t| visible(t))).is_empty());
    }

    #[test]
    fn test_combinators_share_resolved_instances() {
        let handed_out: Arc<Mutex<Vec<Arc<Elem>>>> = Arc::default();
        let cached: Arc<Mutex<Vec<Arc<Elem>>>> = Arc::default();
        let (record_item, record_cache) = (handed_out.clone(), cached.clone());

        let mut cards_ref = None;
        let spec = LayoutSpec::build(|b| {
            let cards = b.group(".card");
            cards_ref = Some(cards.clone());
            b.must(for_all(&cards, move |t| {
                if let Target::Resolved(e) = &t {
                    record_item.lock().unwrap().push(e.clone());
                }
                visible(t)
            }));
            b.must_ref(move |ctx| {
                record_cache.lock().unwrap().extend(ctx.group(&cards).items().iter().cloned());
                Vec::<Constraint>::new()
            });
        });

        let mut store = SnapshotStore::new();
        store.insert(
            cards_ref.unwrap().key().clone(),
            vec![ElemSnapshot::visible_at(".card", FrameRect::new(0.0, 0.0, 10.0, 10.0))],
        );
        let view = ElemSnapshot::visible_at("view", FrameRect::new(0.0, 0.0, 800.0, 600.0));
        let report = evaluate(&spec, &store, EvaluationContext::new(view.clone(), view));
        assert!(report.violations.is_empty());

        let handed_out = handed_out.lock().unwrap();
        let cached = cached.lock().unwrap();
        assert_eq!(handed_out.len(), 1);
        assert!(Arc::ptr_eq(&handed_out[0], &cached[0]));
    }
}
