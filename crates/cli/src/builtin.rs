//! Built-in page-frame specs
//!
//! These cover layout defects that apply to almost any page, so a run works
//! without any project-specific specs.

use layoutcheck_engine::combinators::for_all;
use layoutcheck_engine::range::{gte, lte};
use layoutcheck_engine::relations::{height_is, inside, visible, width_is, Edges};
use layoutcheck_engine::{Constraint, Elem, Group, LayoutSpec, ViewportClass};
use layoutcheck_runner::{Registry, RunnerResult, ScenarioScript, ScriptStep};
use std::sync::Arc;

pub const PAGE_FRAME: &str = "page-frame";
pub const TAP_TARGETS: &str = "tap-targets";
pub const MEDIA_FIT: &str = "media-fit";

/// Smallest comfortable touch target height in CSS pixels
pub const MIN_TAP_HEIGHT: f64 = 24.0;

/// Body is rendered and the page never scrolls sideways
pub fn page_frame() -> LayoutSpec {
    LayoutSpec::build(|b| {
        let body = b.el("body");
        let canvas = b.canvas();
        b.must(visible(&body));
        b.must_ref(move |ctx| width_is(&canvas, lte(ctx.view_size.width)));
    })
}

/// Visible controls are tall enough to tap on touch-sized viewports
pub fn tap_targets() -> LayoutSpec {
    LayoutSpec::build(|b| {
        let controls = b.group("a, button, input, select, textarea");
        b.must_ref(move |ctx| -> Vec<Constraint> {
            match ctx.viewport_class {
                ViewportClass::Desktop => vec![],
                ViewportClass::Mobile | ViewportClass::Tablet => {
                    let shown: Vec<Arc<Elem>> = ctx
                        .group(&controls)
                        .items()
                        .iter()
                        .filter(|e| e.is_visible())
                        .cloned()
                        .collect();
                    let shown = Group::new("visible controls", shown);
                    vec![for_all(shown, |c| height_is(c, gte(MIN_TAP_HEIGHT)))]
                }
            }
        });
    })
}

/// Media never extends past the left or right edge of the viewport
pub fn media_fit() -> LayoutSpec {
    LayoutSpec::build(|b| {
        let media = b.group("img, video, iframe, canvas, svg");
        let view = b.view();
        let horizontal = Edges::all(gte(f64::MIN)).left(gte(0.0)).right(gte(0.0));
        b.must(for_all(&media, move |m| inside(m, &view, Some(horizontal))));
    })
}

/// Name and one-line description of every built-in spec
pub fn describe() -> [(&'static str, &'static str); 3] {
    [
        (PAGE_FRAME, "body is visible and the page has no horizontal overflow"),
        (TAP_TARGETS, "visible controls are at least 24px tall on mobile and tablet"),
        (MEDIA_FIT, "images, video and embeds stay within the viewport width"),
    ]
}

/// Registry holding every built-in spec
pub fn registry() -> RunnerResult<Registry> {
    let mut registry = Registry::new();
    registry.register_spec(PAGE_FRAME, page_frame())?;
    registry.register_spec(TAP_TARGETS, tap_targets())?;
    registry.register_spec(MEDIA_FIT, media_fit())?;
    Ok(registry)
}

/// Scenario used when the run file declares none: snapshot `/` with every built-in spec
pub fn default_script() -> ScenarioScript {
    let mut steps = vec![ScriptStep::Navigate { path: "/".to_string() }];
    steps.extend(describe().iter().map(|(name, _)| ScriptStep::Snapshot {
        name: name.to_string(),
        spec: name.to_string(),
        view_tag: None,
        viewport_class: None,
    }));
    ScenarioScript {
        name: "root".to_string(),
        description: "Built-in checks against /".to_string(),
        steps,
    }
}
