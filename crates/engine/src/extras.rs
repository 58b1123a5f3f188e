//! Grid and spacing checks over groups

use serde_json::json;
use std::sync::Arc;

use crate::constraint::{Constraint, GroupTarget};
use crate::geometry::Elem;
use crate::range::Range;
use crate::violation::Violation;

/// Items whose tops differ from a row's first item by at most this many pixels share the row
pub const ROW_TOLERANCE: f64 = 5.0;

/// Options for [`table_layout`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableLayout {
    /// Maximum number of items per row
    pub columns: usize,
    /// Gap between horizontally adjacent items within a row
    pub horizontal_margin: Option<Range>,
    /// Gap between the lowest bottom of a row and the highest top of the next
    pub vertical_margin: Option<Range>,
}

impl TableLayout {
    pub fn columns(columns: usize) -> Self {
        Self {
            columns,
            horizontal_margin: None,
            vertical_margin: None,
        }
    }

    pub fn horizontal_margin(mut self, range: Range) -> Self {
        self.horizontal_margin = Some(range);
        self
    }

    pub fn vertical_margin(mut self, range: Range) -> Self {
        self.vertical_margin = Some(range);
        self
    }
}

/// Cluster items into rows ordered top to bottom.
///
/// Items are sorted by (top, left) and greedily appended to the current row
/// while their top is within [`ROW_TOLERANCE`] of the row's first member.
pub fn cluster_rows(items: &[Arc<Elem>]) -> Vec<Vec<Arc<Elem>>> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| a.top().total_cmp(&b.top()).then(a.left().total_cmp(&b.left())));

    let mut rows: Vec<Vec<Arc<Elem>>> = Vec::new();
    for item in sorted {
        match rows.last_mut() {
            Some(row) if (item.top() - row[0].top()).abs() <= ROW_TOLERANCE => row.push(item),
            _ => rows.push(vec![item]),
        }
    }
    rows
}

pub fn table_layout(group: impl Into<GroupTarget>, layout: TableLayout) -> Constraint {
    let group = group.into();
    Constraint::new("table_layout", move |scope| {
        let g = scope.resolve_group(&group);
        let rows = cluster_rows(g.items());
        let mut violations = Vec::new();

        for (r, row) in rows.iter().enumerate() {
            if row.len() > layout.columns {
                violations.push(
                    Violation::new(
                        format!("table_layout.row[{}].columns", r),
                        format!(
                            "row {} of `{}` has {} items, at most {} allowed",
                            r,
                            g.selector(),
                            row.len(),
                            layout.columns
                        ),
                    )
                    .with_details(json!({ "row": r, "count": row.len(), "columns": layout.columns })),
                );
            }

            if let Some(margin) = layout.horizontal_margin {
                let mut by_left = row.clone();
                by_left.sort_by(|a, b| a.left().total_cmp(&b.left()));
                for (i, pair) in by_left.windows(2).enumerate() {
                    let gap = pair[1].left() - pair[0].right();
                    if !margin.test(gap) {
                        violations.push(
                            Violation::new(
                                format!("table_layout.row[{}].gap[{}]", r, i),
                                format!(
                                    "horizontal gap {} in row {} of `{}` is {}, expected {}",
                                    i,
                                    r,
                                    g.selector(),
                                    gap,
                                    margin
                                ),
                            )
                            .with_details(json!({ "row": r, "diff": gap, "expected": margin })),
                        );
                    }
                }
            }
        }

        if let Some(margin) = layout.vertical_margin {
            for (r, pair) in rows.windows(2).enumerate() {
                let lowest_bottom = pair[0].iter().map(|e| e.bottom()).fold(f64::MIN, f64::max);
                let highest_top = pair[1].iter().map(|e| e.top()).fold(f64::MAX, f64::min);
                let gap = highest_top - lowest_bottom;
                if !margin.test(gap) {
                    violations.push(
                        Violation::new(
                            format!("table_layout.row_gap[{}]", r),
                            format!(
                                "vertical gap between rows {} and {} of `{}` is {}, expected {}",
                                r,
                                r + 1,
                                g.selector(),
                                gap,
                                margin
                            ),
                        )
                        .with_details(json!({ "row": r, "diff": gap, "expected": margin })),
                    );
                }
            }
        }

        violations
    })
}

fn equal_gap(name: &'static str, group: GroupTarget, tolerance: f64, horizontal: bool) -> Constraint {
    Constraint::new(name, move |scope| {
        let g = scope.resolve_group(&group);
        let mut items = g.items().to_vec();
        if horizontal {
            items.sort_by(|a, b| a.left().total_cmp(&b.left()));
        } else {
            items.sort_by(|a, b| a.top().total_cmp(&b.top()));
        }

        let gaps: Vec<f64> = items
            .windows(2)
            .map(|pair| {
                if horizontal {
                    pair[1].left() - pair[0].right()
                } else {
                    pair[1].top() - pair[0].bottom()
                }
            })
            .collect();

        let Some(&baseline) = gaps.first() else {
            return vec![];
        };
        gaps.iter()
            .enumerate()
            .skip(1)
            .filter(|(_, gap)| (*gap - baseline).abs() > tolerance)
            .map(|(i, gap)| {
                Violation::new(
                    format!("{}[{}]", name, i),
                    format!(
                        "gap {} in `{}` is {}, expected {} (first gap) +/- {}",
                        i,
                        g.selector(),
                        gap,
                        baseline,
                        tolerance
                    ),
                )
                .with_details(json!({ "index": i, "diff": gap, "baseline": baseline }))
            })
            .collect()
    })
}

/// Every horizontal gap must match the first one within `tolerance`
pub fn equal_gap_horizontal(group: impl Into<GroupTarget>, tolerance: f64) -> Constraint {
    equal_gap("equal_gap_horizontal", group.into(), tolerance, true)
}

/// Every vertical gap must match the first one within `tolerance`
pub fn equal_gap_vertical(group: impl Into<GroupTarget>, tolerance: f64) -> Constraint {
    equal_gap("equal_gap_vertical", group.into(), tolerance, false)
}
