/// Errors that can occur while decoding wire values.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The source holds fewer bytes than the decode requested.
    ///
    /// This is the only recoverable codec error; it typically means a value
    /// was truncated in transit or the caller mis-declared a field order.
    #[error("data of requested size not available ({requested} bytes requested, {available} remaining)")]
    Underflow { requested: usize, available: usize },

    /// A string length prefix that cannot describe any encoded string.
    /// Encoded strings always carry at least the terminator byte.
    #[error("invalid string length prefix: {len}")]
    InvalidLength { len: u64 },

    /// A decoded string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
