//! Numeric range predicates

use serde::{Deserialize, Serialize};
use std::fmt;

/// A predicate over a single number.
///
/// Bounds are inclusive for `Gte`, `Lte` and `Between`, exclusive for `Gt` and `Lt`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Range {
    Eq { value: f64 },
    Gte { min: f64 },
    Lte { max: f64 },
    Gt { min: f64 },
    Lt { max: f64 },
    Between { min: f64, max: f64 },
    Approx { value: f64, tolerance: f64 },
}

impl Range {
    /// Test a value against this range
    pub fn test(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match *self {
            Range::Eq { value: expected } => value == expected,
            Range::Gte { min } => value >= min,
            Range::Lte { max } => value <= max,
            Range::Gt { min } => value > min,
            Range::Lt { max } => value < max,
            Range::Between { min, max } => value >= min && value <= max,
            Range::Approx { value: expected, tolerance } => (value - expected).abs() <= tolerance,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Eq { value } => write!(f, "exactly {}", value),
            Range::Gte { min } => write!(f, ">= {}", min),
            Range::Lte { max } => write!(f, "<= {}", max),
            Range::Gt { min } => write!(f, "> {}", min),
            Range::Lt { max } => write!(f, "< {}", max),
            Range::Between { min, max } => write!(f, "between {} and {}", min, max),
            Range::Approx { value, tolerance } => write!(f, "{} +/- {}", value, tolerance),
        }
    }
}

pub fn eq(value: f64) -> Range {
    Range::Eq { value }
}

pub fn gte(min: f64) -> Range {
    Range::Gte { min }
}

pub fn lte(max: f64) -> Range {
    Range::Lte { max }
}

pub fn gt(min: f64) -> Range {
    Range::Gt { min }
}

pub fn lt(max: f64) -> Range {
    Range::Lt { max }
}

/// Inclusive on both ends
pub fn between(min: f64, max: f64) -> Range {
    Range::Between { min, max }
}

pub fn approx(value: f64, tolerance: f64) -> Range {
    Range::Approx { value, tolerance }
}
