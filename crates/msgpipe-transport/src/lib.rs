//! Message-boundary-preserving local pipe transport.
//!
//! Pipes are path-addressed Unix domain sockets carrying discrete messages:
//! each write becomes one read-visible unit, with truncation signaled when
//! the reader's buffer is smaller than the unit. This is the lowest layer of
//! msgpipe; the server engine and value codec build on top of it.
//!
//! Two flavors share the same semantics:
//! - blocking ([`PipeEndpoint`], [`MessageStream`], [`ClientChannel`])
//! - async behind the `async` feature ([`AsyncPipeEndpoint`],
//!   [`AsyncMessageStream`])

pub mod client;
pub mod endpoint;
pub mod error;
pub mod message;

#[cfg(feature = "async")]
pub mod nonblocking;

pub use client::{ChunkSink, ClientChannel, ClientConfig};
pub use endpoint::{PipeEndpoint, DEFAULT_SOCKET_MODE};
pub use error::{Result, TransportError};
pub use message::{
    MessageStream, ReadChunk, DEFAULT_BUFFER_CAPACITY, MAX_MESSAGE_SIZE, MESSAGE_HEADER_SIZE,
};

#[cfg(feature = "async")]
pub use nonblocking::{AsyncMessageStream, AsyncPipeEndpoint};
