//! Viewport presets, groups and the token grammar used at the configuration boundary

use layoutcheck_engine::ViewportClass;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{RunnerError, RunnerResult};

static AD_HOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_.-]+)=(\d+)x(\d+)$").expect("valid viewport regex"));

/// A named browser viewport size
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    pub fn class(&self) -> ViewportClass {
        ViewportClass::from_width(self.width as f64)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.width, self.height)
    }
}

/// Known presets and named groups of presets
#[derive(Debug, Clone)]
pub struct ViewportCatalog {
    presets: Vec<Viewport>,
    groups: Vec<(String, Vec<String>)>,
}

impl Default for ViewportCatalog {
    fn default() -> Self {
        let presets = vec![
            Viewport::new("mobile-s", 320, 568),
            Viewport::new("mobile", 375, 812),
            Viewport::new("mobile-l", 414, 896),
            Viewport::new("tablet", 768, 1024),
            Viewport::new("tablet-l", 1024, 768),
            Viewport::new("desktop", 1280, 800),
            Viewport::new("desktop-l", 1920, 1080),
        ];
        let group = |members: &[&str]| members.iter().map(|m| m.to_string()).collect();
        let groups = vec![
            ("phones".to_string(), group(&["mobile-s", "mobile", "mobile-l"])),
            ("tablets".to_string(), group(&["tablet", "tablet-l"])),
            ("desktops".to_string(), group(&["desktop", "desktop-l"])),
            ("common".to_string(), group(&["mobile", "tablet", "desktop"])),
            (
                "all".to_string(),
                presets.iter().map(|p| p.name.clone()).collect(),
            ),
        ];
        Self { presets, groups }
    }
}

impl ViewportCatalog {
    /// Catalog without any presets or groups
    pub fn empty() -> Self {
        Self {
            presets: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Add or replace a preset
    pub fn with_preset(mut self, viewport: Viewport) -> Self {
        match self.presets.iter_mut().find(|p| p.name == viewport.name) {
            Some(existing) => *existing = viewport,
            None => self.presets.push(viewport),
        }
        self
    }

    /// Add or replace a group. Members must name presets.
    pub fn with_group(mut self, name: impl Into<String>, members: Vec<String>) -> RunnerResult<Self> {
        let name = name.into();
        if let Some(unknown) = members.iter().find(|m| self.preset(m).is_none()) {
            return Err(RunnerError::InvalidViewport {
                token: name,
                reason: format!("group member '{}' is not a preset", unknown),
            });
        }
        match self.groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = members,
            None => self.groups.push((name, members)),
        }
        Ok(self)
    }

    pub fn presets(&self) -> &[Viewport] {
        &self.presets
    }

    pub fn groups(&self) -> &[(String, Vec<String>)] {
        &self.groups
    }

    pub fn preset(&self, name: &str) -> Option<&Viewport> {
        self.presets.iter().find(|p| p.name == name)
    }

    fn group(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, members)| members.as_slice())
    }

    /// Parse a single token into one or more viewports
    pub fn parse_token(&self, token: &str) -> RunnerResult<Vec<Viewport>> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RunnerError::InvalidViewport {
                token: token.to_string(),
                reason: "empty token".to_string(),
            });
        }

        if token.contains('=') {
            let caps = AD_HOC.captures(token).ok_or_else(|| RunnerError::InvalidViewport {
                token: token.to_string(),
                reason: "expected name=WIDTHxHEIGHT".to_string(),
            })?;
            let dimension = |i: usize| -> RunnerResult<u32> {
                let value: u32 = caps[i].parse().map_err(|_| RunnerError::InvalidViewport {
                    token: token.to_string(),
                    reason: format!("'{}' is out of range", &caps[i]),
                })?;
                if value == 0 {
                    return Err(RunnerError::InvalidViewport {
                        token: token.to_string(),
                        reason: "dimensions must be positive".to_string(),
                    });
                }
                Ok(value)
            };
            return Ok(vec![Viewport::new(&caps[1], dimension(2)?, dimension(3)?)]);
        }

        if let Some(preset) = self.preset(token) {
            return Ok(vec![preset.clone()]);
        }

        if let Some(members) = self.group(token) {
            return Ok(members
                .iter()
                .filter_map(|m| self.preset(m).cloned())
                .collect());
        }

        Err(RunnerError::InvalidViewport {
            token: token.to_string(),
            reason: "not a preset or group".to_string(),
        })
    }

    /// Expand tokens in order, removing duplicate names (first occurrence wins)
    pub fn expand<S: AsRef<str>>(&self, tokens: &[S]) -> RunnerResult<Vec<Viewport>> {
        let mut seen = HashSet::new();
        let mut viewports = Vec::new();
        for token in tokens {
            for viewport in self.parse_token(token.as_ref())? {
                if seen.insert(viewport.name.clone()) {
                    viewports.push(viewport);
                }
            }
        }
        Ok(viewports)
    }
}
