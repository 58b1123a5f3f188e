//! Constraint values and their operands

use std::fmt;
use std::sync::Arc;

use crate::evaluate::Scope;
use crate::geometry::{Elem, Group};
use crate::spec::{ElemRef, GroupRef};
use crate::violation::Violation;

type CheckFn = dyn Fn(&Scope<'_>) -> Vec<Violation> + Send + Sync;

/// A named, pure predicate producing zero or more violations
#[derive(Clone)]
pub struct Constraint {
    name: String,
    check: Arc<CheckFn>,
}

impl Constraint {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Scope<'_>) -> Vec<Violation> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, scope: &Scope<'_>) -> Vec<Violation> {
        (self.check)(scope)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint").field("name", &self.name).finish()
    }
}

/// What a factory returns: one constraint or several
#[derive(Debug, Clone)]
pub enum Constraints {
    One(Constraint),
    Many(Vec<Constraint>),
}

impl Constraints {
    pub fn flatten(self) -> Vec<Constraint> {
        match self {
            Constraints::One(c) => vec![c],
            Constraints::Many(cs) => cs,
        }
    }

    /// Check every constraint in order and concatenate the results
    pub fn check_all(self, scope: &Scope<'_>) -> Vec<Violation> {
        self.flatten().iter().flat_map(|c| c.check(scope)).collect()
    }
}

impl From<Constraint> for Constraints {
    fn from(c: Constraint) -> Self {
        Constraints::One(c)
    }
}

impl From<Vec<Constraint>> for Constraints {
    fn from(cs: Vec<Constraint>) -> Self {
        Constraints::Many(cs)
    }
}

impl<const N: usize> From<[Constraint; N]> for Constraints {
    fn from(cs: [Constraint; N]) -> Self {
        Constraints::Many(cs.into())
    }
}

/// An element operand: either a spec reference or an already resolved element
#[derive(Debug, Clone)]
pub enum Target {
    Ref(ElemRef),
    Resolved(Arc<Elem>),
}

impl From<ElemRef> for Target {
    fn from(r: ElemRef) -> Self {
        Target::Ref(r)
    }
}

impl From<&ElemRef> for Target {
    fn from(r: &ElemRef) -> Self {
        Target::Ref(r.clone())
    }
}

impl From<Arc<Elem>> for Target {
    fn from(e: Arc<Elem>) -> Self {
        Target::Resolved(e)
    }
}

impl From<&Arc<Elem>> for Target {
    fn from(e: &Arc<Elem>) -> Self {
        Target::Resolved(e.clone())
    }
}

impl From<Elem> for Target {
    fn from(e: Elem) -> Self {
        Target::Resolved(Arc::new(e))
    }
}

impl From<&Target> for Target {
    fn from(t: &Target) -> Self {
        t.clone()
    }
}

/// A group operand
#[derive(Debug, Clone)]
pub enum GroupTarget {
    Ref(GroupRef),
    Resolved(Arc<Group>),
}

impl From<GroupRef> for GroupTarget {
    fn from(r: GroupRef) -> Self {
        GroupTarget::Ref(r)
    }
}

impl From<&GroupRef> for GroupTarget {
    fn from(r: &GroupRef) -> Self {
        GroupTarget::Ref(r.clone())
    }
}

impl From<Group> for GroupTarget {
    fn from(g: Group) -> Self {
        GroupTarget::Resolved(Arc::new(g))
    }
}

impl From<Arc<Group>> for GroupTarget {
    fn from(g: Arc<Group>) -> Self {
        GroupTarget::Resolved(g)
    }
}
