//! Responsive viewport classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Widths below this are mobile
pub const TABLET_MIN_WIDTH: f64 = 768.0;

/// Widths at or above this are desktop
pub const DESKTOP_MIN_WIDTH: f64 = 1024.0;

/// Coarse responsive bucket derived from the viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportClass {
    Mobile,
    Tablet,
    Desktop,
}

impl ViewportClass {
    pub fn from_width(width: f64) -> Self {
        if width < TABLET_MIN_WIDTH {
            ViewportClass::Mobile
        } else if width < DESKTOP_MIN_WIDTH {
            ViewportClass::Tablet
        } else {
            ViewportClass::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportClass::Mobile => "mobile",
            ViewportClass::Tablet => "tablet",
            ViewportClass::Desktop => "desktop",
        }
    }
}

impl fmt::Display for ViewportClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewportClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Ok(ViewportClass::Mobile),
            "tablet" => Ok(ViewportClass::Tablet),
            "desktop" => Ok(ViewportClass::Desktop),
            other => Err(Error::UnknownViewportClass(other.to_string())),
        }
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSize {
    pub width: f64,
    pub height: f64,
}
