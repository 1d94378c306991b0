//! Error types for the Roomcast client.

use thiserror::Error;

/// Errors that can occur when using the Roomcast client.
#[derive(Debug, Error)]
pub enum RoomcastError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol frame or event.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the
    /// connection is not established.
    #[error("not connected to server")]
    NotConnected,

    /// The REST collaborator rejected an action or query.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// Human-readable error message from the server.
        message: String,
        /// Structured error code, if provided by the server.
        error_code: Option<crate::error_codes::ErrorCode>,
    },

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An HTTP transport error from the REST collaborator.
    #[cfg(feature = "api-http")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Roomcast client operations.
pub type Result<T> = std::result::Result<T, RoomcastError>;
