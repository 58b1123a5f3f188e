//! Layout report types

use serde::{Deserialize, Serialize};

use crate::viewport::{ViewSize, ViewportClass};
use crate::violation::Violation;

/// Result of evaluating one spec against one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub scenario_name: String,
    pub snapshot_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_tag: Option<String>,
    pub view_size: ViewSize,
    pub viewport_class: ViewportClass,
    pub violations: Vec<Violation>,
}

impl LayoutReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        let tag = self
            .view_tag
            .as_deref()
            .map(|t| format!(" [{}]", t))
            .unwrap_or_default();
        let outcome = if self.violations.is_empty() {
            "ok".to_string()
        } else {
            format!("{} violation(s)", self.violations.len())
        };

        format!(
            "{}/{}{} @ {}x{} ({}): {}",
            self.scenario_name,
            self.snapshot_name,
            tag,
            self.view_size.width,
            self.view_size.height,
            self.viewport_class,
            outcome,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(violations: Vec<Violation>) -> LayoutReport {
        LayoutReport {
            scenario_name: "home".into(),
            snapshot_name: "hero".into(),
            view_tag: Some("mobile".into()),
            view_size: ViewSize { width: 375.0, height: 812.0 },
            viewport_class: ViewportClass::Mobile,
            violations,
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(report(vec![])).unwrap();
        assert_eq!(json["scenarioName"], "home");
        assert_eq!(json["snapshotName"], "hero");
        assert_eq!(json["viewTag"], "mobile");
        assert_eq!(json["viewSize"]["width"], 375.0);
        assert_eq!(json["viewportClass"], "mobile");
        assert!(json["violations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_summary() {
        assert_eq!(report(vec![]).summary(), "home/hero [mobile] @ 375x812 (mobile): ok");
        let dirty = report(vec![Violation::new("below", "too far")]);
        assert!(!dirty.is_clean());
        assert!(dirty.summary().ends_with("1 violation(s)"));
    }
}
