//! Layoutcheck constraint engine
//!
//! This crate compiles declarative layout specs and evaluates them against
//! measured element geometry:
//! - Records selector references and deferred constraint factories
//! - Resolves measurements into memoized element and group handles
//! - Checks relations, quantifiers and grid rules
//! - Produces one [`LayoutReport`] per evaluation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Layout Engine (sync)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LayoutSpec::build(|b| ...)                                 │
//! │    ├── b.el(selector)    -> ElemRef   ("el-N")              │
//! │    ├── b.group(selector) -> GroupRef  ("group-N")           │
//! │    ├── b.view() / b.canvas()                                │
//! │    ├── b.must(constraints)                                  │
//! │    └── b.must_ref(|ctx| constraints)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  evaluate(spec, store, context) -> LayoutReport             │
//! │    ├── Scope: key -> Arc<Elem> / Arc<Group> (memoized)      │
//! │    ├── RuntimeContext: view size, viewport class, names     │
//! │    └── factories run in declaration order                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod combinators;
pub mod constraint;
pub mod error;
pub mod evaluate;
pub mod extras;
pub mod geometry;
pub mod range;
pub mod relations;
pub mod report;
pub mod spec;
pub mod viewport;
pub mod violation;

pub use constraint::{Constraint, Constraints, GroupTarget, Target};
pub use error::{Error, Result};
pub use evaluate::{evaluate, EvaluationContext, Measurement, RuntimeContext, Scope, SnapshotStore};
pub use geometry::{Elem, ElemSnapshot, FrameRect, Group, TextLine};
pub use range::Range;
pub use report::LayoutReport;
pub use spec::{
    Declaration, ElemRef, GroupRef, LayoutSpec, RefKey, Selector, SelectorDescriptor, SpecBuilder,
};
pub use viewport::{ViewSize, ViewportClass};
pub use violation::Violation;
