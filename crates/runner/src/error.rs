//! Error types for layout runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid viewport token '{token}': {reason}")]
    InvalidViewport { token: String, reason: String },

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Unknown spec: {0}")]
    UnknownSpec(String),

    #[error("No scenarios registered")]
    EmptyRegistry,

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Navigation to '{path}' failed: {reason}")]
    Navigation { path: String, reason: String },

    #[error("No free port starting at {preferred} after {attempts} attempts")]
    PortsExhausted { preferred: u16, attempts: usize },

    #[error("Failed to bind 127.0.0.1:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine error: {0}")]
    Engine(#[from] layoutcheck_engine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RunnerError {
    /// Configuration errors are raised before any browser session opens
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RunnerError::InvalidConfig(_)
                | RunnerError::InvalidViewport { .. }
                | RunnerError::UnknownScenario(_)
                | RunnerError::UnknownSpec(_)
                | RunnerError::EmptyRegistry
        )
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
