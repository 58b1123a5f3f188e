//! Playwright-backed browser sessions
//!
//! One node driver process runs for the whole run and owns the launched
//! browser. Commands and replies travel as JSON lines over the driver's
//! stdin/stdout, tagged with an id so concurrent pages can share it:
//!
//! ```text
//! -> {"id":3,"op":"open","width":375,"height":812}
//! <- {"id":3,"ok":true,"page":1}
//! -> {"id":4,"op":"goto","page":1,"url":"http://127.0.0.1:4173/"}
//! -> {"id":5,"op":"measure","page":1,"input":{"elements":[..],"groups":[..]}}
//! <- {"id":5,"ok":true,"measurement":{"store":{..},"view":{..},"canvas":{..}}}
//! ```

use async_trait::async_trait;
use layoutcheck_engine::{Declaration, LayoutSpec, Measurement};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::session::{Browser, Page};
use crate::viewport::Viewport;

const DRIVER_JS: &str = include_str!("driver.js");

/// Browser engine launched by Playwright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    /// Navigation timeout handed to Playwright
    pub timeout_ms: u64,
    /// Directory node runs in; `playwright` is resolved from here
    pub work_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4173".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            timeout_ms: 30_000,
            work_dir: PathBuf::from("."),
        }
    }
}

impl PlaywrightConfig {
    /// Settings handed to the driver as its only argument
    pub fn driver_args(&self) -> Value {
        json!({
            "browser": self.browser.as_str(),
            "headless": self.headless,
            "timeout": self.timeout_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    page: Option<u64>,
    #[serde(default)]
    measurement: Option<Measurement>,
}

/// Waiting requests by id; `None` once the driver's stdout has closed
type Pending = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<DriverReply>>>>>;

/// A child process speaking the JSON-lines protocol
struct Driver {
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    child: tokio::sync::Mutex<Child>,
    pending: Pending,
    next_id: AtomicU64,
}

impl Driver {
    fn spawn(mut command: TokioCommand) -> RunnerResult<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let missing = || RunnerError::Playwright("driver pipes unavailable".to_string());
        let stdin = child.stdin.take().ok_or_else(missing)?;
        let stdout = child.stdout.take().ok_or_else(missing)?;
        let stderr = child.stderr.take().ok_or_else(missing)?;

        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        tokio::spawn(read_replies(stdout, pending.clone()));
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("driver: {}", line);
            }
        });

        Ok(Self {
            stdin: tokio::sync::Mutex::new(Some(stdin)),
            child: tokio::sync::Mutex::new(child),
            pending,
            next_id: AtomicU64::new(0),
        })
    }

    /// Send one command and wait for the reply carrying its id
    async fn request(&self, mut command: Value) -> RunnerResult<DriverReply> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        command["id"] = json!(id);
        let mut line = serde_json::to_string(&command)?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        match self.pending.lock().as_mut() {
            Some(pending) => {
                pending.insert(id, tx);
            }
            None => return Err(RunnerError::Playwright("driver has exited".to_string())),
        }

        if let Err(e) = self.write_line(&line).await {
            if let Some(pending) = self.pending.lock().as_mut() {
                pending.remove(&id);
            }
            return Err(e);
        }

        let reply = rx
            .await
            .map_err(|_| RunnerError::Playwright("driver exited before replying".to_string()))?;
        if reply.ok {
            Ok(reply)
        } else {
            Err(RunnerError::Playwright(
                reply.error.unwrap_or_else(|| "driver reported an error".to_string()),
            ))
        }
    }

    async fn write_line(&self, line: &str) -> RunnerResult<()> {
        let mut stdin = self.stdin.lock().await;
        let stdin = stdin
            .as_mut()
            .ok_or_else(|| RunnerError::Playwright("driver is shut down".to_string()))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Close stdin so the driver closes the browser, then wait for it to exit
    async fn shutdown(&self) {
        self.stdin.lock().await.take();
        let mut child = self.child.lock().await;
        match tokio::time::timeout(Duration::from_secs(10), child.wait()).await {
            Ok(Ok(status)) => debug!("Driver exited with {}", status),
            Ok(Err(e)) => warn!("Failed to wait for driver: {}", e),
            Err(_) => {
                warn!("Driver did not exit in time, killing it");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill driver: {}", e);
                }
            }
        }
    }
}

async fn read_replies(stdout: ChildStdout, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match serde_json::from_str::<DriverReply>(&line) {
            Ok(reply) => {
                let waiter = pending.lock().as_mut().and_then(|p| p.remove(&reply.id));
                if let Some(tx) = waiter {
                    let _ = tx.send(reply);
                }
            }
            Err(_) => debug!("driver: {}", line),
        }
    }
    // dropping the senders fails every request still waiting
    pending.lock().take();
}

/// Browser launched once per run; pages are contexts inside it
pub struct PlaywrightBrowser {
    config: PlaywrightConfig,
    driver: Arc<Driver>,
    _script_dir: TempDir,
}

impl PlaywrightBrowser {
    /// Verify Playwright is installed, start the driver and wait for the browser
    pub async fn launch(config: PlaywrightConfig) -> RunnerResult<Self> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !matches!(status, Ok(status) if status.success()) {
            return Err(RunnerError::PlaywrightNotFound);
        }

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;
        debug!("Starting Playwright driver: {}", script_path.display());

        let mut command = TokioCommand::new("node");
        command
            .arg(&script_path)
            .arg(config.driver_args().to_string())
            .current_dir(&config.work_dir);
        let driver = Driver::spawn(command)?;
        driver.request(json!({ "op": "ping" })).await?;

        info!(
            "Playwright ready ({}, base URL {})",
            config.browser.as_str(),
            config.base_url
        );
        Ok(Self {
            config,
            driver: Arc::new(driver),
            _script_dir: script_dir,
        })
    }

    /// Close the browser and stop the driver
    pub async fn shutdown(self) {
        self.driver.shutdown().await;
        info!("Playwright browser closed");
    }
}

#[async_trait]
impl Browser for PlaywrightBrowser {
    async fn open_page(&self, viewport: &Viewport) -> RunnerResult<Box<dyn Page>> {
        let reply = self
            .driver
            .request(json!({ "op": "open", "width": viewport.width, "height": viewport.height }))
            .await?;
        let id = reply
            .page
            .ok_or_else(|| RunnerError::Playwright("open returned no page id".to_string()))?;
        debug!("Opened page {} at {}", id, viewport);

        Ok(Box::new(PlaywrightPage {
            driver: self.driver.clone(),
            id,
            base_url: self.config.base_url.clone(),
            viewport: viewport.clone(),
            closed: false,
        }))
    }
}

/// One live page in the shared browser
pub struct PlaywrightPage {
    driver: Arc<Driver>,
    id: u64,
    base_url: String,
    viewport: Viewport,
    closed: bool,
}

impl PlaywrightPage {
    /// Absolute URL for a path relative to the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Declarations the driver measures for `spec`
    pub fn measure_input(spec: &LayoutSpec) -> Value {
        let describe = |decls: &[Declaration]| {
            decls
                .iter()
                .map(|d| json!({ "key": d.key, "selector": d.selector }))
                .collect::<Vec<_>>()
        };
        json!({
            "elements": describe(spec.elements()),
            "groups": describe(spec.groups()),
        })
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn navigate(&mut self, path: &str) -> RunnerResult<()> {
        if !path.starts_with('/') {
            return Err(RunnerError::Navigation {
                path: path.to_string(),
                reason: "path must start with '/'".to_string(),
            });
        }
        self.driver
            .request(json!({ "op": "goto", "page": self.id, "url": self.url(path) }))
            .await
            .map_err(|e| RunnerError::Navigation {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn measure(&mut self, spec: &LayoutSpec) -> RunnerResult<Measurement> {
        let reply = self
            .driver
            .request(json!({ "op": "measure", "page": self.id, "input": Self::measure_input(spec) }))
            .await?;
        reply.measurement.ok_or_else(|| {
            RunnerError::Playwright(format!("no measurement returned at {}", self.viewport))
        })
    }

    async fn close(&mut self) -> RunnerResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver
            .request(json!({ "op": "close", "page": self.id }))
            .await?;
        Ok(())
    }
}
