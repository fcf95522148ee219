use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::debug;

use crate::endpoint::{bind_uds, SocketGuard, DEFAULT_SOCKET_MODE};
use crate::error::{Result, TransportError};
use crate::message::{ReadChunk, MAX_MESSAGE_SIZE, MESSAGE_HEADER_SIZE};

/// Server-side pipe endpoint (async).
///
/// Same bind semantics as [`crate::PipeEndpoint`], with nonblocking accept.
/// Must be created and used within a tokio runtime.
pub struct AsyncPipeEndpoint {
    listener: UnixListener,
    guard: SocketGuard,
}

impl AsyncPipeEndpoint {
    /// Bind an endpoint at `path` with the default socket mode.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, DEFAULT_SOCKET_MODE)
    }

    /// Bind an endpoint at `path` with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let (std_listener, guard) = bind_uds(path.as_ref(), mode)?;
        std_listener.set_nonblocking(true)?;
        let listener = UnixListener::from_std(std_listener)?;
        Ok(Self { listener, guard })
    }

    /// Accept an incoming connection.
    pub async fn accept(&self) -> Result<AsyncMessageStream> {
        let (stream, _addr) = self.listener.accept().await.map_err(TransportError::Accept)?;
        debug!("accepted connection");
        Ok(AsyncMessageStream {
            inner: stream,
            remaining: 0,
        })
    }

    /// The path this endpoint is bound to.
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

/// A connected message-mode pipe stream (async).
///
/// Chunked-read semantics match [`crate::MessageStream`].
pub struct AsyncMessageStream {
    inner: UnixStream,
    remaining: usize,
}

impl AsyncMessageStream {
    /// Connect to a listening endpoint.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            inner: stream,
            remaining: 0,
        })
    }

    /// Write one complete message.
    pub async fn write_message(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let header = (payload.len() as u32).to_le_bytes();
        self.write_all(&header).await?;
        self.write_all(payload).await
    }

    /// Read the next chunk of the current (or next) message into `buf`.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ReadChunk> {
        if self.remaining == 0 {
            let mut header = [0u8; MESSAGE_HEADER_SIZE];
            self.read_all(&mut header).await?;
            self.remaining = u32::from_le_bytes(header) as usize;
        }

        let want = self.remaining.min(buf.len());
        if want > 0 {
            self.read_all(&mut buf[..want]).await?;
        }
        self.remaining -= want;

        Ok(ReadChunk {
            len: want,
            more: self.remaining > 0,
        })
    }

    /// Shut down the write half, severing the pipe for the peer.
    pub async fn sever(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).await.map_err(TransportError::Io)
    }

    async fn read_all(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(TransportError::ConnectionClosed)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }
}

impl std::fmt::Debug for AsyncMessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncMessageStream")
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_sock(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("msgpipe-aio-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("pipe.sock")
    }

    #[tokio::test]
    async fn async_accept_and_chunked_read() {
        let sock_path = temp_sock("chunked");
        let endpoint = AsyncPipeEndpoint::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let client = tokio::spawn(async move {
            let mut stream = AsyncMessageStream::connect(&path_clone).await.unwrap();
            stream.write_message(&[7u8; 30]).await.unwrap();
        });

        let mut server = endpoint.accept().await.unwrap();
        let mut buf = [0u8; 20];

        let first = server.read_chunk(&mut buf).await.unwrap();
        assert_eq!((first.len, first.more), (20, true));

        let second = server.read_chunk(&mut buf).await.unwrap();
        assert_eq!((second.len, second.more), (10, false));

        client.await.unwrap();
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[tokio::test]
    async fn sever_surfaces_as_closed_to_peer() {
        let sock_path = temp_sock("sever");
        let endpoint = AsyncPipeEndpoint::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let client = tokio::spawn(async move {
            let mut stream = AsyncMessageStream::connect(&path_clone).await.unwrap();
            let mut buf = [0u8; 8];
            stream.read_chunk(&mut buf).await
        });

        let mut server = endpoint.accept().await.unwrap();
        server.sever().await.unwrap();

        let err = client.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
