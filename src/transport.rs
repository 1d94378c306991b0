//! Transport abstraction for the Roomcast push channel.
//!
//! The [`Transport`] trait defines a bidirectional text message channel
//! between the client and the push server. The protocol uses JSON text
//! frames, so every transport implementation must handle message framing
//! internally (e.g., WebSocket frames, length-prefixed TCP, QUIC streams).
//!
//! # Connection Setup
//!
//! Because the connection manager reconnects indefinitely, it cannot take a
//! single pre-connected transport — it needs a way to mint fresh sessions.
//! That is the [`Connector`] trait: a factory that performs the
//! credential-bearing handshake and returns a connected [`Transport`].
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use roomcast_client::error::RoomcastError;
//! use roomcast_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, frame: String) -> Result<(), RoomcastError> {
//!         // Send the JSON text frame over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, RoomcastError>> {
//!         // Receive the next JSON text frame
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), RoomcastError> {
//!         // Gracefully shut down the connection
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::RoomcastError;

/// A bidirectional text frame transport for the Roomcast push channel.
///
/// Implementors shuttle serialized JSON strings between the client and
/// server. Each call to [`send`](Transport::send) transmits one complete
/// frame; each call to [`recv`](Transport::recv) returns one complete frame.
///
/// # Object Safety
///
/// This trait is object-safe — the connection manager holds transports as
/// `Box<dyn Transport>` so a [`Connector`] can return any implementation.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it
/// is used inside `tokio::select!`. If `recv` is cancelled before
/// completion, calling it again must not lose data. Channel-based
/// implementations (e.g., wrapping `mpsc::Receiver`) are naturally
/// cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`RoomcastError::TransportSend`] if the frame could not be
    /// sent (e.g., connection broken, write buffer full).
    async fn send(&mut self, frame: String) -> Result<(), RoomcastError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete frame was received
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the connection was closed cleanly by the server
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, RoomcastError>>;

    /// Close the transport connection gracefully.
    ///
    /// After calling this method, subsequent calls to
    /// [`send`](Transport::send) and [`recv`](Transport::recv) may return
    /// errors or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations
    /// should still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), RoomcastError>;
}

/// Factory for connected [`Transport`] sessions.
///
/// The connection manager calls [`connect`](Connector::connect) for the
/// initial handshake and again after every connection loss, passing the
/// bearer credential each time so reconnected sessions re-authenticate.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake and return a connected transport.
    ///
    /// # Errors
    ///
    /// Returns any transport-level error; the connection manager treats
    /// every failure as retriable and waits one reconnect delay before the
    /// next attempt.
    async fn connect(&self, credential: &str) -> Result<Box<dyn Transport>, RoomcastError>;
}
