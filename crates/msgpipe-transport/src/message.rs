use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;

use crate::error::{Result, TransportError};

/// Transport-internal message header: payload length (4 bytes LE).
///
/// This is the pipe's "message mode" plumbing, not part of any application
/// wire format: each `write_message` becomes one discrete read-visible unit
/// on the other side, regardless of how the kernel splits the byte stream.
pub const MESSAGE_HEADER_SIZE: usize = 4;

/// Largest message the transport header can describe.
pub const MAX_MESSAGE_SIZE: usize = u32::MAX as usize;

/// Default read/write buffer capacity for pipes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Outcome of a single chunked read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadChunk {
    /// Number of bytes placed into the caller's buffer.
    pub len: usize,
    /// True when the current message did not fit and more chunks follow.
    pub more: bool,
}

/// A connected message-mode pipe stream (blocking).
///
/// Writes are framed as whole messages. Reads drain one message at a time:
/// a read into a buffer smaller than the current message returns the next
/// chunk with `more = true`, and subsequent reads continue the same message.
pub struct MessageStream {
    inner: UnixStream,
    /// Bytes left of the message currently being drained.
    remaining: usize,
}

impl MessageStream {
    pub(crate) fn new(inner: UnixStream) -> Self {
        Self {
            inner,
            remaining: 0,
        }
    }

    /// Write one complete message (blocking).
    pub fn write_message(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let header = (payload.len() as u32).to_le_bytes();
        self.write_all(&header)?;
        self.write_all(payload)
    }

    /// Read the next chunk of the current (or next) message into `buf`.
    ///
    /// Blocks until at least one chunk is available. `buf` must not be
    /// empty unless a zero-length message is expected. Returns
    /// `ConnectionClosed` when the peer has closed the pipe.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ReadChunk> {
        if self.remaining == 0 {
            let mut header = [0u8; MESSAGE_HEADER_SIZE];
            self.read_all(&mut header)?;
            self.remaining = u32::from_le_bytes(header) as usize;
        }

        let want = self.remaining.min(buf.len());
        if want > 0 {
            self.read_all(&mut buf[..want])?;
        }
        self.remaining -= want;

        Ok(ReadChunk {
            len: want,
            more: self.remaining > 0,
        })
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            match self.inner.write(bytes) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => bytes = &bytes[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn read_all(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                Err(TransportError::ConnectionClosed)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream")
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (MessageStream, MessageStream) {
        let (left, right) = UnixStream::pair().unwrap();
        (MessageStream::new(left), MessageStream::new(right))
    }

    #[test]
    fn single_message_roundtrip() {
        let (mut tx, mut rx) = pair();
        tx.write_message(b"hello").unwrap();

        let mut buf = [0u8; 64];
        let chunk = rx.read_chunk(&mut buf).unwrap();

        assert_eq!(chunk, ReadChunk { len: 5, more: false });
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn message_larger_than_buffer_is_chunked() {
        let (mut tx, mut rx) = pair();
        let message: Vec<u8> = (0..55u8).collect();
        tx.write_message(&message).unwrap();

        let mut buf = [0u8; 20];
        let mut collected = Vec::new();
        let mut chunks = Vec::new();
        loop {
            let chunk = rx.read_chunk(&mut buf).unwrap();
            collected.extend_from_slice(&buf[..chunk.len]);
            chunks.push(chunk);
            if !chunk.more {
                break;
            }
        }

        assert_eq!(
            chunks,
            vec![
                ReadChunk { len: 20, more: true },
                ReadChunk { len: 20, more: true },
                ReadChunk { len: 15, more: false },
            ]
        );
        assert_eq!(collected, message);
    }

    #[test]
    fn message_boundaries_are_preserved() {
        let (mut tx, mut rx) = pair();
        tx.write_message(b"first").unwrap();
        tx.write_message(b"second").unwrap();

        let mut buf = [0u8; 64];
        let c1 = rx.read_chunk(&mut buf).unwrap();
        assert_eq!((c1.len, c1.more), (5, false));
        assert_eq!(&buf[..5], b"first");

        let c2 = rx.read_chunk(&mut buf).unwrap();
        assert_eq!((c2.len, c2.more), (6, false));
        assert_eq!(&buf[..6], b"second");
    }

    #[test]
    fn zero_length_message_roundtrips() {
        let (mut tx, mut rx) = pair();
        tx.write_message(b"").unwrap();

        let mut buf = [0u8; 8];
        let chunk = rx.read_chunk(&mut buf).unwrap();
        assert_eq!(chunk, ReadChunk { len: 0, more: false });
    }

    #[test]
    fn read_after_peer_close_reports_closed() {
        let (tx, mut rx) = pair();
        drop(tx);

        let mut buf = [0u8; 8];
        let err = rx.read_chunk(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[test]
    fn close_mid_message_reports_closed() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut rx = MessageStream::new(right);

        // Header promising 16 bytes, then only part of the payload.
        let mut raw = left;
        raw.write_all(&16u32.to_le_bytes()).unwrap();
        raw.write_all(b"only-part").unwrap();
        drop(raw);

        let mut buf = [0u8; 32];
        let err = rx.read_chunk(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }
}
