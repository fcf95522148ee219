use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use msgpipe_transport::{AsyncPipeEndpoint, DEFAULT_BUFFER_CAPACITY};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::Result;
use crate::observer::ConnectionObserver;

/// Per-connection buffer capacities for a server.
///
/// Server and clients must agree on compatible capacities out of band;
/// capacity mismatch is not negotiated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Read buffer capacity in bytes.
    pub read_capacity: usize,
    /// Write buffer capacity in bytes.
    pub write_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_capacity: DEFAULT_BUFFER_CAPACITY,
            write_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Single-threaded, completion-driven pipe server.
///
/// [`run`](PipeServer::run) accepts clients and drives every connection's
/// reads and writes through one dispatch loop: all completions (any
/// connection's, plus accept readiness) serialize through the same await
/// point, so no two observer hooks ever run concurrently. The returned
/// future is `!Send`; run it on a current-thread runtime.
pub struct PipeServer {
    observer: Rc<RefCell<dyn ConnectionObserver>>,
    config: ServerConfig,
    ready: Option<Arc<Notify>>,
}

impl PipeServer {
    /// Create a server sharing `observer` across all its connections.
    pub fn new(observer: Rc<RefCell<dyn ConnectionObserver>>) -> Self {
        Self {
            observer,
            config: ServerConfig::default(),
            ready: None,
        }
    }

    /// Override buffer capacities.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Notify `ready` once the endpoint is bound and accepting.
    pub fn with_ready(mut self, ready: Arc<Notify>) -> Self {
        self.ready = Some(ready);
        self
    }

    /// Bind `path` and serve until `shutdown` is cancelled.
    ///
    /// Accepted connections are cast loose to manage their own remaining
    /// lifetime; the server tracks them no further than driving their
    /// completions. Endpoint failures and pipe-sever failures are fatal;
    /// per-connection I/O failures only end that connection.
    pub async fn run(&self, path: impl AsRef<Path>, shutdown: CancellationToken) -> Result<()> {
        let endpoint = AsyncPipeEndpoint::bind(path.as_ref())?;
        if let Some(ready) = &self.ready {
            ready.notify_one();
        }
        info!(path = ?endpoint.path(), "pipe server running");

        let mut live = FuturesUnordered::new();
        let mut next_id: u64 = 1;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("shutdown requested");
                    break;
                }
                accepted = endpoint.accept() => {
                    let stream = accepted?;
                    let connection = Connection::new(
                        next_id,
                        stream,
                        self.config.read_capacity,
                        self.config.write_capacity,
                    );
                    next_id += 1;
                    live.push(connection.drive(Rc::clone(&self.observer)));
                }
                Some(retired) = live.next() => {
                    // A connection ended. Absorbed failures never reach
                    // here; a sever failure does, and is fatal.
                    retired?;
                }
            }
        }

        Ok(())
    }
}
