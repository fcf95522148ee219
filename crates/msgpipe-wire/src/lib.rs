//! Length-prefixed binary value codec for msgpipe payloads.
//!
//! Fixed-width primitives travel as raw little-endian bytes; strings carry a
//! `u64` length prefix counting a trailing zero terminator, so integers and
//! strings share one length-prefix rule. Framing into discrete messages is
//! the transport's job, not the codec's; this crate only defines the byte
//! representation of individual values.

pub mod buffer;
pub mod error;
pub mod value;

pub use buffer::{SliceSource, WireSink, WireSource};
pub use error::{Result, WireError};
pub use value::{Decode, Encode};
