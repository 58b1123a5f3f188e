//! Spec compiler
//!
//! A [`SpecBuilder`] session records selector references and deferred
//! constraint factories during one synchronous pass and is then frozen
//! into an immutable [`LayoutSpec`].
//!
//! ```
//! use layoutcheck_engine::{LayoutSpec, relations::below, range::between};
//!
//! let spec = LayoutSpec::build(|b| {
//!     let header = b.el("header");
//!     let menu = b.el("nav.menu");
//!     b.must(below(&menu, &header, between(0.0, 16.0)));
//! });
//! assert_eq!(spec.elements().len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constraint::Constraints;
use crate::evaluate::RuntimeContext;

/// Reserved key for the viewport pseudo-element
pub const VIEW_KEY: &str = "$view";

/// Reserved key for the scrollable page canvas pseudo-element
pub const CANVAS_KEY: &str = "$canvas";

/// Opaque reference key, unique within one build session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefKey(String);

impl RefKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RefKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// How the measurement collaborator should locate an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "query", rename_all = "snake_case")]
pub enum SelectorDescriptor {
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
    View,
    Canvas,
}

impl SelectorDescriptor {
    /// Human-readable label used in messages and placeholders
    pub fn label(&self) -> String {
        match self {
            SelectorDescriptor::Css(query) => query.clone(),
            SelectorDescriptor::XPath(query) => format!("xpath:{}", query),
            SelectorDescriptor::View => "view".to_string(),
            SelectorDescriptor::Canvas => "canvas".to_string(),
        }
    }
}

impl From<&str> for SelectorDescriptor {
    fn from(css: &str) -> Self {
        SelectorDescriptor::Css(css.to_string())
    }
}

impl From<String> for SelectorDescriptor {
    fn from(css: String) -> Self {
        SelectorDescriptor::Css(css)
    }
}

/// Selector constructors
pub struct Selector;

impl Selector {
    pub fn css(query: impl Into<String>) -> SelectorDescriptor {
        SelectorDescriptor::Css(query.into())
    }

    pub fn xpath(query: impl Into<String>) -> SelectorDescriptor {
        SelectorDescriptor::XPath(query.into())
    }
}

/// Reference to a single element (first match)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElemRef {
    key: RefKey,
}

impl ElemRef {
    pub fn key(&self) -> &RefKey {
        &self.key
    }
}

/// Reference to every match of a selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupRef {
    key: RefKey,
}

impl GroupRef {
    pub fn key(&self) -> &RefKey {
        &self.key
    }
}

/// One declared reference, as handed to the measurement collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub key: RefKey,
    pub selector: SelectorDescriptor,
}

pub(crate) type Factory = Arc<dyn Fn(&RuntimeContext<'_>) -> Constraints + Send + Sync>;

/// One spec-build session
pub struct SpecBuilder {
    next_id: u64,
    elements: Vec<Declaration>,
    groups: Vec<Declaration>,
    frame_groups: Vec<Declaration>,
    factories: Vec<Factory>,
    view: ElemRef,
    canvas: ElemRef,
}

impl SpecBuilder {
    fn new() -> Self {
        Self {
            next_id: 0,
            elements: Vec::new(),
            groups: Vec::new(),
            frame_groups: Vec::new(),
            factories: Vec::new(),
            view: ElemRef { key: RefKey::new(VIEW_KEY) },
            canvas: ElemRef { key: RefKey::new(CANVAS_KEY) },
        }
    }

    fn next_key(&mut self, prefix: &str) -> RefKey {
        self.next_id += 1;
        RefKey(format!("{}-{}", prefix, self.next_id))
    }

    /// Declare a single-element reference.
    ///
    /// `View` and `Canvas` descriptors return the reserved frame references.
    pub fn el(&mut self, selector: impl Into<SelectorDescriptor>) -> ElemRef {
        let selector = selector.into();
        match selector {
            SelectorDescriptor::View => return self.view(),
            SelectorDescriptor::Canvas => return self.canvas(),
            SelectorDescriptor::Css(_) | SelectorDescriptor::XPath(_) => {}
        }
        let key = self.next_key("el");
        self.elements.push(Declaration {
            key: key.clone(),
            selector,
        });
        ElemRef { key }
    }

    /// Declare a reference to every matching element.
    ///
    /// A `View` or `Canvas` group holds exactly that frame and is never sent
    /// to the measurement collaborator.
    pub fn group(&mut self, selector: impl Into<SelectorDescriptor>) -> GroupRef {
        let key = self.next_key("group");
        let selector = selector.into();
        let decl = Declaration {
            key: key.clone(),
            selector,
        };
        match decl.selector {
            SelectorDescriptor::View | SelectorDescriptor::Canvas => self.frame_groups.push(decl),
            SelectorDescriptor::Css(_) | SelectorDescriptor::XPath(_) => self.groups.push(decl),
        }
        GroupRef { key }
    }

    pub fn view(&self) -> ElemRef {
        self.view.clone()
    }

    pub fn canvas(&self) -> ElemRef {
        self.canvas.clone()
    }

    /// Register constraints that do not depend on runtime data
    pub fn must(&mut self, constraints: impl Into<Constraints>) {
        let constraints = constraints.into();
        self.factories.push(Arc::new(move |_ctx: &RuntimeContext<'_>| constraints.clone()));
    }

    /// Register a factory evaluated against the runtime context of each evaluation
    pub fn must_ref<F, C>(&mut self, factory: F)
    where
        F: Fn(&RuntimeContext<'_>) -> C + Send + Sync + 'static,
        C: Into<Constraints>,
    {
        self.factories.push(Arc::new(move |ctx: &RuntimeContext<'_>| -> Constraints { factory(ctx).into() }));
    }

    fn finish(self) -> LayoutSpec {
        let mut descriptors = HashMap::new();
        descriptors.insert(self.view.key.clone(), SelectorDescriptor::View);
        descriptors.insert(self.canvas.key.clone(), SelectorDescriptor::Canvas);
        for decl in self.elements.iter().chain(&self.groups).chain(&self.frame_groups) {
            descriptors.insert(decl.key.clone(), decl.selector.clone());
        }

        LayoutSpec {
            elements: self.elements,
            groups: self.groups,
            descriptors,
            factories: self.factories,
            view: self.view,
            canvas: self.canvas,
        }
    }
}

/// Compiled, immutable layout spec
pub struct LayoutSpec {
    elements: Vec<Declaration>,
    groups: Vec<Declaration>,
    descriptors: HashMap<RefKey, SelectorDescriptor>,
    factories: Vec<Factory>,
    view: ElemRef,
    canvas: ElemRef,
}

impl LayoutSpec {
    /// Run `define` exactly once against a fresh builder session
    pub fn build(define: impl FnOnce(&mut SpecBuilder)) -> Self {
        let mut builder = SpecBuilder::new();
        define(&mut builder);
        builder.finish()
    }

    pub fn elements(&self) -> &[Declaration] {
        &self.elements
    }

    pub fn groups(&self) -> &[Declaration] {
        &self.groups
    }

    pub fn descriptor(&self, key: &RefKey) -> Option<&SelectorDescriptor> {
        self.descriptors.get(key)
    }

    /// Selector label for a key, falling back to the key itself
    pub fn label(&self, key: &RefKey) -> String {
        self.descriptor(key)
            .map(SelectorDescriptor::label)
            .unwrap_or_else(|| key.to_string())
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    pub(crate) fn factories(&self) -> &[Factory] {
        &self.factories
    }

    pub fn view(&self) -> &ElemRef {
        &self.view
    }

    pub fn canvas(&self) -> &ElemRef {
        &self.canvas
    }
}

impl fmt::Debug for LayoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutSpec")
            .field("elements", &self.elements)
            .field("groups", &self.groups)
            .field("factories", &self.factories.len())
            .finish()
    }
}
