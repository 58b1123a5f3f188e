//! Violation records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single failed constraint instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dot-namespaced constraint path, e.g. `for_all[2].inside.left`
    pub constraint: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Violation {
    pub fn new(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Prefix the constraint path with a parent namespace
    pub fn nested(mut self, prefix: &str) -> Self {
        self.constraint = format!("{}.{}", prefix, self.constraint);
        self
    }

    /// Read a numeric field out of the details payload
    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.as_ref()?.get(key)?.as_f64()
    }
}
