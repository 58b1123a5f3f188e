//! Static file server for built output
//!
//! Binds 127.0.0.1 starting at a preferred port and moves to the next port
//! while the current one is in use, up to a bounded number of attempts.

use axum::Router;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{RunnerError, RunnerResult};

/// Port tried on attempt `i`, if it fits in `u16`
fn candidate_port(preferred: u16, i: usize) -> Option<u16> {
    u16::try_from(i).ok().and_then(|offset| preferred.checked_add(offset))
}

/// Port tried after attempt `i` fails, or `None` when that was the last one
fn next_port(preferred: u16, i: usize, attempts: usize) -> Option<u16> {
    if i + 1 < attempts {
        candidate_port(preferred, i + 1)
    } else {
        None
    }
}

/// Bind the first free port in `preferred..preferred + attempts`
pub async fn bind_with_retry(preferred: u16, attempts: usize) -> RunnerResult<TcpListener> {
    for i in 0..attempts {
        let Some(port) = candidate_port(preferred, i) else {
            break;
        };
        match TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                match next_port(preferred, i, attempts) {
                    Some(next) => warn!("Port {} in use, trying {}", port, next),
                    None => warn!("Port {} in use, no ports left to try", port),
                }
            }
            Err(source) => return Err(RunnerError::Bind { port, source }),
        }
    }
    Err(RunnerError::PortsExhausted { preferred, attempts })
}

/// Handle to a running static server; stops on drop
pub struct StaticServer {
    addr: SocketAddr,
    root: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Serve `dir` on the first free port at or after `preferred_port`
    pub async fn bind(dir: impl AsRef<Path>, preferred_port: u16, attempts: usize) -> RunnerResult<Self> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(RunnerError::InvalidConfig(format!(
                "static directory {} does not exist",
                root.display()
            )));
        }

        let listener = bind_with_retry(preferred_port, attempts).await?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .fallback_service(ServeDir::new(&root).append_index_html_on_directories(true))
            .layer(TraceLayer::new_for_http());
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = signal.await;
            });
            if let Err(e) = server.await {
                warn!("Static server stopped with error: {}", e);
            }
        });

        info!("Serving {} at http://{}", root.display(), addr);
        Ok(Self {
            addr,
            root,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop serving and wait for the server task to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("Static server on port {} stopped", self.addr.port());
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn occupied_port() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_candidate_ports_stay_in_range() {
        assert_eq!(candidate_port(4173, 0), Some(4173));
        assert_eq!(candidate_port(4173, 2), Some(4175));
        assert_eq!(candidate_port(u16::MAX, 0), Some(u16::MAX));
        assert_eq!(candidate_port(u16::MAX, 1), None);
    }

    #[test]
    fn test_last_attempt_has_no_next_port() {
        assert_eq!(next_port(4173, 0, 10), Some(4174));
        assert_eq!(next_port(4173, 8, 10), Some(4182));
        assert_eq!(next_port(4173, 9, 10), None);
        assert_eq!(next_port(4173, 0, 1), None);
        assert_eq!(next_port(u16::MAX, 0, 10), None);
    }

    #[tokio::test]
    async fn test_skips_port_in_use() {
        let (_held, port) = occupied_port().await;
        if port == u16::MAX {
            return;
        }
        let listener = bind_with_retry(port, 20).await.unwrap();
        assert!(listener.local_addr().unwrap().port() > port);
    }

    #[tokio::test]
    async fn test_exhausted_after_attempts() {
        let (_held, port) = occupied_port().await;
        let err = bind_with_retry(port, 1).await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::PortsExhausted { preferred, attempts: 1 } if preferred == port
        ));
    }

    #[tokio::test]
    async fn test_serves_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();

        let (probe, port) = occupied_port().await;
        drop(probe);
        let server = StaticServer::bind(dir.path(), port, 20).await.unwrap();

        let mut stream = TcpStream::connect(server.addr()).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>hello</h1>"));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_missing_directory_is_config_error() {
        let err = StaticServer::bind("/definitely/not/here", 4173, 1).await.err().unwrap();
        assert!(err.is_config());
    }
}
