use std::cell::RefCell;
use std::io::ErrorKind;
use std::rc::Rc;

use msgpipe_transport::AsyncMessageStream;
use tracing::{debug, trace};

use crate::error::{Result, ServerError};
use crate::observer::ConnectionObserver;

/// Outcome of [`Connection::send_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The whole message was copied into the write buffer and queued.
    Queued,
    /// The message exceeded the write buffer; only its first `sent` bytes
    /// were queued.
    Truncated { sent: usize },
    /// The connection is no longer connected; nothing was queued.
    NotConnected,
}

enum QueuedOp {
    Read,
    Write,
}

/// One accepted server-side pipe connection.
///
/// Owns the stream plus fixed-capacity read and write buffers. Observer
/// hooks queue the next operation (`listen_for_data` or `send_data`); the
/// driver performs it and dispatches the completion back to the observer.
/// The queued-op slot holds at most one operation, so a connection never
/// has two asynchronous operations in flight; a hook that queues twice
/// replaces the earlier operation.
pub struct Connection {
    id: u64,
    stream: AsyncMessageStream,
    read_buf: Vec<u8>,
    write_buf: Vec<u8>,
    write_len: usize,
    connected: bool,
    queued: Option<QueuedOp>,
}

impl Connection {
    pub(crate) fn new(
        id: u64,
        stream: AsyncMessageStream,
        read_capacity: usize,
        write_capacity: usize,
    ) -> Self {
        Self {
            id,
            stream,
            read_buf: vec![0u8; read_capacity.max(1)],
            write_buf: vec![0u8; write_capacity.max(1)],
            write_len: 0,
            connected: false,
            queued: None,
        }
    }

    /// Server-assigned connection id, unique per server run.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection is live.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Queue a read for the next message chunk. No-op when not connected.
    pub fn listen_for_data(&mut self) {
        if !self.connected {
            return;
        }
        self.queued = Some(QueuedOp::Read);
    }

    /// Copy `data` into the write buffer and queue a write.
    ///
    /// Messages larger than the write buffer are truncated to its capacity;
    /// the returned status reports how much was actually queued.
    pub fn send_data(&mut self, data: &[u8]) -> SendStatus {
        if !self.connected {
            return SendStatus::NotConnected;
        }

        let len = data.len().min(self.write_buf.len());
        self.write_buf[..len].copy_from_slice(&data[..len]);
        self.write_len = len;
        self.queued = Some(QueuedOp::Write);

        if len < data.len() {
            debug!(id = self.id, sent = len, dropped = data.len() - len, "outbound message truncated");
            SendStatus::Truncated { sent: len }
        } else {
            SendStatus::Queued
        }
    }

    /// Mark the connection for teardown. The stream is severed after the
    /// current observer hook returns; subsequent queue calls are no-ops.
    pub fn close(&mut self) {
        self.connected = false;
        self.queued = None;
    }

    /// Run the connection to completion: dispatch the connected hook, then
    /// perform queued operations one at a time until the queue is empty or
    /// an operation fails, then sever the pipe.
    pub(crate) async fn drive(mut self, observer: Rc<RefCell<dyn ConnectionObserver>>) -> Result<()> {
        self.connected = true;
        debug!(id = self.id, "pipe connected");
        observer.borrow_mut().on_connected(&mut self);

        loop {
            match self.queued.take() {
                Some(QueuedOp::Read) => {
                    // Moved out so the observer can borrow the connection
                    // and the chunk at the same time.
                    let mut buf = std::mem::take(&mut self.read_buf);
                    let outcome = self.stream.read_chunk(&mut buf).await;
                    match outcome {
                        Ok(chunk) if chunk.more => {
                            trace!(id = self.id, len = chunk.len, "partial data received");
                            observer
                                .borrow_mut()
                                .on_partial_data_received(&mut self, &buf[..chunk.len]);
                        }
                        Ok(chunk) => {
                            trace!(id = self.id, len = chunk.len, "data received");
                            observer
                                .borrow_mut()
                                .on_data_received(&mut self, &buf[..chunk.len]);
                        }
                        Err(err) => {
                            debug!(id = self.id, error = %err, "read failed, disconnecting");
                            self.read_buf = buf;
                            break;
                        }
                    }
                    self.read_buf = buf;
                }
                Some(QueuedOp::Write) => {
                    let buf = std::mem::take(&mut self.write_buf);
                    let outcome = self.stream.write_message(&buf[..self.write_len]).await;
                    self.write_buf = buf;
                    match outcome {
                        Ok(()) => {
                            trace!(id = self.id, len = self.write_len, "data sent");
                            observer.borrow_mut().on_data_sent(&mut self);
                        }
                        Err(err) => {
                            debug!(id = self.id, error = %err, "write failed, disconnecting");
                            break;
                        }
                    }
                }
                None => break,
            }
        }

        self.disconnect().await
    }

    /// Sever the pipe. Consumes the connection; it is dropped exactly once,
    /// here, after its last operation retired.
    async fn disconnect(mut self) -> Result<()> {
        self.connected = false;
        debug!(id = self.id, "pipe disconnected");
        match self.stream.sever().await {
            Ok(()) => Ok(()),
            // The peer tore the pipe down first; nothing left to sever.
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(ServerError::Disconnect(err)),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.connected)
            .finish()
    }
}
