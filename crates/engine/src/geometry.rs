//! Measured element geometry
//!
//! [`ElemSnapshot`] is the wire record produced by the measurement
//! collaborator. [`Elem`] and [`Group`] are the read-only views that
//! constraints operate on during one evaluation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Axis-aligned rectangle in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl FrameRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Area of the intersection with another rectangle (0 when disjoint)
    pub fn intersection_area(&self, other: &FrameRect) -> f64 {
        let w = self.right().min(other.right()) - self.left.max(other.left);
        let h = self.bottom().min(other.bottom()) - self.top.max(other.top);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }
}

/// Metrics for one rendered line of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Captured record for one element at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElemSnapshot {
    pub selector: String,
    /// Intrinsic box in page coordinates
    #[serde(rename = "box")]
    pub bbox: FrameRect,
    /// Box clipped to the viewport
    #[serde(default)]
    pub view: FrameRect,
    /// Scrollable extent
    #[serde(default)]
    pub canvas: FrameRect,
    #[serde(default)]
    pub visible: bool,
    #[serde(default = "default_present")]
    pub present: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<TextLine>>,
}

fn default_present() -> bool {
    true
}

impl ElemSnapshot {
    /// A present, visible element whose three frames all equal `rect`
    pub fn visible_at(selector: impl Into<String>, rect: FrameRect) -> Self {
        Self {
            selector: selector.into(),
            bbox: rect,
            view: rect,
            canvas: rect,
            visible: true,
            present: true,
            text: String::new(),
            lines: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_lines(mut self, lines: Vec<TextLine>) -> Self {
        self.lines = Some(lines);
        self
    }
}

/// Read-only element wrapper with derived geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Elem {
    snapshot: ElemSnapshot,
}

impl Elem {
    pub fn new(snapshot: ElemSnapshot) -> Self {
        Self { snapshot }
    }

    /// Stand-in for a reference that matched nothing
    pub fn placeholder(selector: impl Into<String>) -> Self {
        Self {
            snapshot: ElemSnapshot {
                selector: selector.into(),
                visible: false,
                present: false,
                ..Default::default()
            },
        }
    }

    pub fn snapshot(&self) -> &ElemSnapshot {
        &self.snapshot
    }

    pub fn selector(&self) -> &str {
        &self.snapshot.selector
    }

    pub fn frame(&self) -> &FrameRect {
        &self.snapshot.bbox
    }

    pub fn view_frame(&self) -> &FrameRect {
        &self.snapshot.view
    }

    pub fn canvas_frame(&self) -> &FrameRect {
        &self.snapshot.canvas
    }

    pub fn left(&self) -> f64 {
        self.snapshot.bbox.left
    }

    pub fn top(&self) -> f64 {
        self.snapshot.bbox.top
    }

    pub fn width(&self) -> f64 {
        self.snapshot.bbox.width
    }

    pub fn height(&self) -> f64 {
        self.snapshot.bbox.height
    }

    pub fn right(&self) -> f64 {
        self.snapshot.bbox.right()
    }

    pub fn bottom(&self) -> f64 {
        self.snapshot.bbox.bottom()
    }

    pub fn center_x(&self) -> f64 {
        self.left() + self.width() / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top() + self.height() / 2.0
    }

    pub fn is_visible(&self) -> bool {
        self.snapshot.visible
    }

    pub fn is_present(&self) -> bool {
        self.snapshot.present
    }

    pub fn text(&self) -> &str {
        &self.snapshot.text
    }

    pub fn lines(&self) -> Option<&[TextLine]> {
        self.snapshot.lines.as_deref()
    }
}

impl From<ElemSnapshot> for Elem {
    fn from(snapshot: ElemSnapshot) -> Self {
        Self::new(snapshot)
    }
}

/// Ordered collection of elements, in collaborator delivery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    selector: String,
    items: Vec<Arc<Elem>>,
}

impl Group {
    pub fn new(selector: impl Into<String>, items: Vec<Arc<Elem>>) -> Self {
        Self {
            selector: selector.into(),
            items,
        }
    }

    pub fn from_snapshots(selector: impl Into<String>, snapshots: &[ElemSnapshot]) -> Self {
        let items = snapshots
            .iter()
            .cloned()
            .map(|s| Arc::new(Elem::new(s)))
            .collect();
        Self::new(selector, items)
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn items(&self) -> &[Arc<Elem>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
