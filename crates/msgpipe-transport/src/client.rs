use std::io::ErrorKind;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::message::{MessageStream, DEFAULT_BUFFER_CAPACITY};

/// Interval between connect retries while waiting for an endpoint.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Receives message chunks from [`ClientChannel::wait_for_data`].
pub trait ChunkSink {
    fn put(&mut self, data: &[u8]);
}

impl ChunkSink for Vec<u8> {
    fn put(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }
}

/// Client-side channel configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Read buffer capacity in bytes.
    pub read_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Blocking client end of a message-mode pipe.
///
/// All operations suspend the calling thread until the OS completes them;
/// each channel is expected to live on its own thread or process.
pub struct ClientChannel {
    stream: Option<MessageStream>,
    read_buf: Vec<u8>,
}

impl ClientChannel {
    /// Connect to the endpoint at `path`, waiting up to `timeout` for it to
    /// become available.
    ///
    /// Returns `Ok(None)` when no endpoint appeared within the timeout;
    /// that is not an error. Any other OS failure is.
    pub fn connect(path: impl AsRef<Path>, timeout: Duration) -> Result<Option<Self>> {
        Self::connect_with_config(path, timeout, ClientConfig::default())
    }

    /// Connect with an explicit configuration.
    pub fn connect_with_config(
        path: impl AsRef<Path>,
        timeout: Duration,
        config: ClientConfig,
    ) -> Result<Option<Self>> {
        let path = path.as_ref();
        let deadline = Instant::now() + timeout;

        loop {
            match UnixStream::connect(path) {
                Ok(stream) => {
                    debug!(?path, "client channel connected");
                    return Ok(Some(Self {
                        stream: Some(MessageStream::new(stream)),
                        read_buf: vec![0u8; config.read_capacity.max(1)],
                    }));
                }
                // No endpoint bound yet, or the listener backlog is full.
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::NotFound | ErrorKind::ConnectionRefused
                    ) =>
                {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(?path, "no endpoint available within timeout");
                        return Ok(None);
                    }
                    std::thread::sleep(RETRY_INTERVAL.min(deadline - now));
                }
                Err(err) => {
                    return Err(TransportError::Connect {
                        path: path.to_path_buf(),
                        source: err,
                    })
                }
            }
        }
    }

    /// Send one complete message (blocking).
    pub fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .as_mut()
            .ok_or(TransportError::NotConnected)?
            .write_message(data)
    }

    /// Receive one complete message, forwarding each chunk to `sink`.
    ///
    /// The transport preserves message boundaries, but a single read may
    /// only retrieve a prefix of a larger message; this loops until the
    /// read reports no further truncation.
    pub fn wait_for_data(&mut self, sink: &mut dyn ChunkSink) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        loop {
            let chunk = stream.read_chunk(&mut self.read_buf)?;
            sink.put(&self.read_buf[..chunk.len]);
            if !chunk.more {
                return Ok(());
            }
        }
    }

    /// Close the channel. Safe to call more than once.
    pub fn disconnect(&mut self) {
        self.stream = None;
    }

    /// Whether the channel currently holds a connection.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
