use msgpipe_transport::TransportError;

/// Errors that can abort the server engine.
///
/// Per-connection failures (a client misbehaved or disappeared) are absorbed
/// by disconnecting that connection and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Endpoint setup or accept failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Severing a pipe failed. This is an internal-consistency violation,
    /// not a normal runtime error.
    #[error("failed to sever pipe: {0}")]
    Disconnect(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
