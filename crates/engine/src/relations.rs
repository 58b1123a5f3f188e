//! Relation constructors
//!
//! Every function here returns a [`Constraint`] whose operands are resolved
//! through the evaluation [`Scope`](crate::Scope) when it is checked. Relations
//! that compare geometry report `<name>.present` instead of measuring an
//! element that was not found on the page.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::constraint::{Constraint, GroupTarget, Target};
use crate::geometry::Elem;
use crate::range::{gte, Range};
use crate::violation::Violation;

fn require_present(name: &str, elems: &[&Elem]) -> Option<Violation> {
    let missing: Vec<&str> = elems
        .iter()
        .filter(|e| !e.is_present())
        .map(|e| e.selector())
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(
        Violation::new(
            format!("{}.present", name),
            format!("`{}` not found on the page", missing.join("`, `")),
        )
        .with_details(json!({ "missing": missing })),
    )
}

// Positional relations

/// Which side of `b` the element `a` sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::Left => "left of",
            Direction::Right => "right of",
        }
    }

    /// Signed gap between `a` and `b` in this direction; negative means overlap
    pub fn gap(&self, a: &Elem, b: &Elem) -> f64 {
        match self {
            Direction::Above => b.top() - a.bottom(),
            Direction::Below => a.top() - b.bottom(),
            Direction::Left => b.left() - a.right(),
            Direction::Right => a.left() - b.right(),
        }
    }
}

fn positional(name: &'static str, direction: Direction, a: Target, b: Target, range: Range) -> Constraint {
    Constraint::new(name, move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present(name, &[&*ea, &*eb]) {
            return vec![v];
        }

        let diff = direction.gap(&ea, &eb);
        if range.test(diff) {
            return vec![];
        }
        vec![Violation::new(
            name,
            format!(
                "`{}` should be {} `{}` by {}, but the gap is {}",
                ea.selector(),
                direction.phrase(),
                eb.selector(),
                range,
                diff
            ),
        )
        .with_details(json!({ "diff": diff, "expected": range }))]
    })
}

/// `a.top - b.bottom` must satisfy `range`
pub fn below(a: impl Into<Target>, b: impl Into<Target>, range: Range) -> Constraint {
    positional("below", Direction::Below, a.into(), b.into(), range)
}

/// `b.top - a.bottom` must satisfy `range`
pub fn above(a: impl Into<Target>, b: impl Into<Target>, range: Range) -> Constraint {
    positional("above", Direction::Above, a.into(), b.into(), range)
}

/// `b.left - a.right` must satisfy `range`
pub fn left_of(a: impl Into<Target>, b: impl Into<Target>, range: Range) -> Constraint {
    positional("left_of", Direction::Left, a.into(), b.into(), range)
}

/// `a.left - b.right` must satisfy `range`
pub fn right_of(a: impl Into<Target>, b: impl Into<Target>, range: Range) -> Constraint {
    positional("right_of", Direction::Right, a.into(), b.into(), range)
}

/// `a` must sit next to `b` in every listed direction.
///
/// An overlap in a requested direction is reported as `near.<dir>.overlap`,
/// separately from an out-of-range gap (`near.<dir>.gap`).
pub fn near(
    a: impl Into<Target>,
    b: impl Into<Target>,
    directions: impl IntoIterator<Item = (Direction, Range)>,
) -> Constraint {
    let (a, b) = (a.into(), b.into());
    let directions: Vec<(Direction, Range)> = directions.into_iter().collect();

    Constraint::new("near", move |scope| {
        if directions.is_empty() {
            return vec![Violation::new("near", "near() requires at least one direction")];
        }
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present("near", &[&*ea, &*eb]) {
            return vec![v];
        }

        let mut violations = Vec::new();
        for (direction, range) in &directions {
            let diff = direction.gap(&ea, &eb);
            if diff < 0.0 {
                violations.push(
                    Violation::new(
                        format!("near.{}.overlap", direction.as_str()),
                        format!(
                            "`{}` overlaps `{}` by {} where it should be {} it",
                            ea.selector(),
                            eb.selector(),
                            -diff,
                            direction.phrase()
                        ),
                    )
                    .with_details(json!({ "direction": direction, "diff": diff })),
                );
            } else if !range.test(diff) {
                violations.push(
                    Violation::new(
                        format!("near.{}.gap", direction.as_str()),
                        format!(
                            "`{}` should be {} `{}` by {}, but the gap is {}",
                            ea.selector(),
                            direction.phrase(),
                            eb.selector(),
                            range,
                            diff
                        ),
                    )
                    .with_details(json!({ "direction": direction, "diff": diff, "expected": range })),
                );
            }
        }
        violations
    })
}

// Containment

/// Per-edge ranges for [`inside`]; unset edges default to `>= 0`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: Option<Range>,
    pub right: Option<Range>,
    pub bottom: Option<Range>,
    pub left: Option<Range>,
}

impl Edges {
    pub fn all(range: Range) -> Self {
        Self {
            top: Some(range),
            right: Some(range),
            bottom: Some(range),
            left: Some(range),
        }
    }

    pub fn top(mut self, range: Range) -> Self {
        self.top = Some(range);
        self
    }

    pub fn right(mut self, range: Range) -> Self {
        self.right = Some(range);
        self
    }

    pub fn bottom(mut self, range: Range) -> Self {
        self.bottom = Some(range);
        self
    }

    pub fn left(mut self, range: Range) -> Self {
        self.left = Some(range);
        self
    }
}

/// `a` must lie within `b`.
///
/// Edge gaps are measured inward: `top = a.top - b.top`, `right = b.right - a.right`,
/// and so on. Negative ranges allow `a` to bleed past an edge.
pub fn inside(a: impl Into<Target>, b: impl Into<Target>, edges: Option<Edges>) -> Constraint {
    let (a, b) = (a.into(), b.into());
    let edges = edges.unwrap_or_default();
    let default = gte(0.0);
    let ranges = [
        ("top", edges.top.unwrap_or(default)),
        ("right", edges.right.unwrap_or(default)),
        ("bottom", edges.bottom.unwrap_or(default)),
        ("left", edges.left.unwrap_or(default)),
    ];

    Constraint::new("inside", move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present("inside", &[&*ea, &*eb]) {
            return vec![v];
        }

        ranges
            .iter()
            .filter_map(|(edge, range)| {
                let diff = match *edge {
                    "top" => ea.top() - eb.top(),
                    "right" => eb.right() - ea.right(),
                    "bottom" => eb.bottom() - ea.bottom(),
                    _ => ea.left() - eb.left(),
                };
                if range.test(diff) {
                    return None;
                }
                Some(
                    Violation::new(
                        format!("inside.{}", edge),
                        format!(
                            "`{}` {} edge is {} from `{}`, expected {}",
                            ea.selector(),
                            edge,
                            diff,
                            eb.selector(),
                            range
                        ),
                    )
                    .with_details(json!({ "edge": edge, "diff": diff, "expected": range })),
                )
            })
            .collect()
    })
}

// Alignment

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    CenterX,
    CenterY,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Top => "top",
            Alignment::Bottom => "bottom",
            Alignment::CenterX => "center_x",
            Alignment::CenterY => "center_y",
        }
    }

    fn value(&self, elem: &Elem) -> f64 {
        match self {
            Alignment::Left => elem.left(),
            Alignment::Right => elem.right(),
            Alignment::Top => elem.top(),
            Alignment::Bottom => elem.bottom(),
            Alignment::CenterX => elem.center_x(),
            Alignment::CenterY => elem.center_y(),
        }
    }
}

/// The chosen edge or center line of `a` and `b` must differ by at most `tolerance`
pub fn aligned(a: impl Into<Target>, b: impl Into<Target>, alignment: Alignment, tolerance: f64) -> Constraint {
    let (a, b) = (a.into(), b.into());
    let name = format!("aligned.{}", alignment.as_str());

    Constraint::new(name.clone(), move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present(&name, &[&*ea, &*eb]) {
            return vec![v];
        }
        let diff = (alignment.value(&ea) - alignment.value(&eb)).abs();
        if diff <= tolerance {
            return vec![];
        }
        vec![Violation::new(
            name.clone(),
            format!(
                "`{}` and `{}` are misaligned on {} by {} (tolerance {})",
                ea.selector(),
                eb.selector(),
                alignment.as_str(),
                diff,
                tolerance
            ),
        )
        .with_details(json!({ "diff": diff, "tolerance": tolerance }))]
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
    Both,
}

/// The center of `a` must be within `tolerance` of the center of `b`
pub fn centered_in(a: impl Into<Target>, b: impl Into<Target>, axis: Axis, tolerance: f64) -> Constraint {
    let (a, b) = (a.into(), b.into());

    Constraint::new("centered_in", move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present("centered_in", &[&*ea, &*eb]) {
            return vec![v];
        }

        let checks: &[(&str, f64)] = &[
            ("horizontal", ea.center_x() - eb.center_x()),
            ("vertical", ea.center_y() - eb.center_y()),
        ];
        checks
            .iter()
            .filter(|(label, _)| match axis {
                Axis::Horizontal => *label == "horizontal",
                Axis::Vertical => *label == "vertical",
                Axis::Both => true,
            })
            .filter(|(_, offset)| offset.abs() > tolerance)
            .map(|(label, offset)| {
                Violation::new(
                    format!("centered_in.{}", label),
                    format!(
                        "`{}` is off-center in `{}` {}ly by {}",
                        ea.selector(),
                        eb.selector(),
                        label,
                        offset
                    ),
                )
                .with_details(json!({ "offset": offset, "tolerance": tolerance }))
            })
            .collect()
    })
}

// Size

fn measured(name: &'static str, what: &'static str, a: Target, range: Range, measure: fn(&Elem) -> Option<f64>) -> Constraint {
    Constraint::new(name, move |scope| {
        let ea = scope.resolve(&a);
        if let Some(v) = require_present(name, &[&*ea]) {
            return vec![v];
        }
        match measure(&ea) {
            Some(value) if range.test(value) => vec![],
            Some(value) => vec![Violation::new(
                name,
                format!("`{}` {} is {}, expected {}", ea.selector(), what, value, range),
            )
            .with_details(json!({ "actual": value, "expected": range }))],
            None => vec![Violation::new(
                name,
                format!("`{}` {} cannot be measured", ea.selector(), what),
            )],
        }
    })
}

pub fn width_is(a: impl Into<Target>, range: Range) -> Constraint {
    measured("width_is", "width", a.into(), range, |e| Some(e.width()))
}

pub fn height_is(a: impl Into<Target>, range: Range) -> Constraint {
    measured("height_is", "height", a.into(), range, |e| Some(e.height()))
}

/// `width / height` must satisfy `range`; a zero height always fails
pub fn aspect_ratio(a: impl Into<Target>, range: Range) -> Constraint {
    measured("aspect_ratio", "aspect ratio", a.into(), range, |e| {
        (e.height() != 0.0).then(|| e.width() / e.height())
    })
}

fn same_dimension(name: &'static str, what: &'static str, a: Target, b: Target, tolerance: f64, dim: fn(&Elem) -> f64) -> Constraint {
    Constraint::new(name, move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present(name, &[&*ea, &*eb]) {
            return vec![v];
        }
        let diff = (dim(&ea) - dim(&eb)).abs();
        if diff <= tolerance {
            return vec![];
        }
        vec![Violation::new(
            name,
            format!(
                "`{}` and `{}` {}s differ by {} (tolerance {})",
                ea.selector(),
                eb.selector(),
                what,
                diff,
                tolerance
            ),
        )
        .with_details(json!({ "diff": diff, "tolerance": tolerance }))]
    })
}

pub fn same_width(a: impl Into<Target>, b: impl Into<Target>, tolerance: f64) -> Constraint {
    same_dimension("same_width", "width", a.into(), b.into(), tolerance, Elem::width)
}

pub fn same_height(a: impl Into<Target>, b: impl Into<Target>, tolerance: f64) -> Constraint {
    same_dimension("same_height", "height", a.into(), b.into(), tolerance, Elem::height)
}

// Overlap

pub fn overlaps(a: impl Into<Target>, b: impl Into<Target>) -> Constraint {
    let (a, b) = (a.into(), b.into());
    Constraint::new("overlaps", move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present("overlaps", &[&*ea, &*eb]) {
            return vec![v];
        }
        if ea.frame().intersection_area(eb.frame()) > 0.0 {
            return vec![];
        }
        vec![Violation::new(
            "overlaps",
            format!("`{}` should overlap `{}`", ea.selector(), eb.selector()),
        )]
    })
}

pub fn no_overlap(a: impl Into<Target>, b: impl Into<Target>) -> Constraint {
    let (a, b) = (a.into(), b.into());
    Constraint::new("no_overlap", move |scope| {
        let (ea, eb) = (scope.resolve(&a), scope.resolve(&b));
        if let Some(v) = require_present("no_overlap", &[&*ea, &*eb]) {
            return vec![v];
        }
        let area = ea.frame().intersection_area(eb.frame());
        if area == 0.0 {
            return vec![];
        }
        vec![Violation::new(
            "no_overlap",
            format!("`{}` overlaps `{}` ({} px²)", ea.selector(), eb.selector(), area),
        )
        .with_details(json!({ "area": area }))]
    })
}

// Visibility

fn flag(name: &'static str, expectation: &'static str, a: Target, holds: fn(&Elem) -> bool) -> Constraint {
    Constraint::new(name, move |scope| {
        let ea = scope.resolve(&a);
        if holds(&ea) {
            return vec![];
        }
        vec![Violation::new(name, format!("`{}` should be {}", ea.selector(), expectation))
            .with_details(json!({ "present": ea.is_present(), "visible": ea.is_visible() }))]
    })
}

pub fn visible(a: impl Into<Target>) -> Constraint {
    flag("visible", "visible", a.into(), |e| e.is_present() && e.is_visible())
}

/// Absent elements count as hidden
pub fn hidden(a: impl Into<Target>) -> Constraint {
    flag("hidden", "hidden", a.into(), |e| !e.is_visible())
}

pub fn present(a: impl Into<Target>) -> Constraint {
    flag("present", "present", a.into(), Elem::is_present)
}

pub fn absent(a: impl Into<Target>) -> Constraint {
    flag("absent", "absent", a.into(), |e| !e.is_present())
}

// Text

fn text_check<F>(name: &'static str, a: Target, expectation: String, holds: F) -> Constraint
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Constraint::new(name, move |scope| {
        let ea = scope.resolve(&a);
        if let Some(v) = require_present(name, &[&*ea]) {
            return vec![v];
        }
        let text = ea.text().trim();
        if holds(text) {
            return vec![];
        }
        vec![Violation::new(
            name,
            format!("`{}` text {:?} should {}", ea.selector(), text, expectation),
        )
        .with_details(json!({ "actual": text }))]
    })
}

/// Trimmed text must equal `expected`
pub fn text_is(a: impl Into<Target>, expected: impl Into<String>) -> Constraint {
    let expected = expected.into();
    let expectation = format!("be {:?}", expected);
    text_check("text_is", a.into(), expectation, move |t| t == expected)
}

pub fn text_contains(a: impl Into<Target>, needle: impl Into<String>) -> Constraint {
    let needle = needle.into();
    let expectation = format!("contain {:?}", needle);
    text_check("text_contains", a.into(), expectation, move |t| t.contains(needle.as_str()))
}

pub fn text_matches(a: impl Into<Target>, pattern: Regex) -> Constraint {
    let expectation = format!("match /{}/", pattern.as_str());
    text_check("text_matches", a.into(), expectation, move |t| pattern.is_match(t))
}

/// Number of rendered text lines must satisfy `range`.
///
/// Without per-line metrics, non-empty text counts as one line.
pub fn line_count(a: impl Into<Target>, range: Range) -> Constraint {
    let a = a.into();
    Constraint::new("line_count", move |scope| {
        let ea = scope.resolve(&a);
        if let Some(v) = require_present("line_count", &[&*ea]) {
            return vec![v];
        }
        let count = match ea.lines() {
            Some(lines) => lines.len(),
            None if ea.text().trim().is_empty() => 0,
            None => 1,
        };
        if range.test(count as f64) {
            return vec![];
        }
        vec![Violation::new(
            "line_count",
            format!("`{}` renders {} line(s), expected {}", ea.selector(), count, range),
        )
        .with_details(json!({ "count": count, "expected": range }))]
    })
}

// Counting

fn counted(name: &'static str, what: &'static str, group: GroupTarget, range: Range, include: fn(&Elem) -> bool) -> Constraint {
    Constraint::new(name, move |scope| {
        let g = scope.resolve_group(&group);
        let count = g.items().iter().filter(|e| include(e)).count();
        if range.test(count as f64) {
            return vec![];
        }
        vec![Violation::new(
            name,
            format!("`{}` has {} {}, expected {}", g.selector(), count, what, range),
        )
        .with_details(json!({ "count": count, "expected": range }))]
    })
}

/// Number of matched elements must satisfy `range`
pub fn count_is(group: impl Into<GroupTarget>, range: Range) -> Constraint {
    counted("count_is", "element(s)", group.into(), range, |_| true)
}

/// Number of visible elements must satisfy `range`
pub fn amount_of_visible(group: impl Into<GroupTarget>, range: Range) -> Constraint {
    counted("amount_of_visible", "visible element(s)", group.into(), range, Elem::is_visible)
}
