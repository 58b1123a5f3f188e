//! Browser collaborator traits
//!
//! A [`Browser`] is launched once per run. Every plan entry opens its own
//! [`Page`] and closes it when the entry finishes, so no page state leaks
//! between entries.

use async_trait::async_trait;
use layoutcheck_engine::{LayoutSpec, Measurement};

use crate::error::RunnerResult;
use crate::viewport::Viewport;

#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh page sized to `viewport`
    async fn open_page(&self, viewport: &Viewport) -> RunnerResult<Box<dyn Page>>;
}

#[async_trait]
pub trait Page: Send {
    /// Navigate to a path relative to the served base URL
    async fn navigate(&mut self, path: &str) -> RunnerResult<()>;

    /// Measure every reference declared by `spec` against the current page state
    async fn measure(&mut self, spec: &LayoutSpec) -> RunnerResult<Measurement>;

    async fn close(&mut self) -> RunnerResult<()>;
}
