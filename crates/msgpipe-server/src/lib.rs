//! Single-threaded, completion-driven pipe server engine.
//!
//! [`PipeServer::run`] owns the dispatch loop: it accepts clients on a
//! message-mode pipe endpoint and drives every live connection's queued
//! read/write operations through one await point, so all completions (any
//! connection's, plus accept readiness) are serialized on one thread.
//! Applications plug in protocol logic through [`ConnectionObserver`],
//! whose default hook wiring keeps each connection listening.
//!
//! Per connection, operations are strictly sequential: the queued-op slot
//! holds at most one outstanding read or write, and observer hooks run
//! between operations, never concurrently.

pub mod connection;
pub mod error;
pub mod observer;
pub mod server;

pub use connection::{Connection, SendStatus};
pub use error::{Result, ServerError};
pub use observer::ConnectionObserver;
pub use server::{PipeServer, ServerConfig};
