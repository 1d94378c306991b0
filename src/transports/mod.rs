//! Transport implementations for the Roomcast push channel.
//!
//! This module provides concrete [`Transport`](crate::Transport) and
//! [`Connector`](crate::transport::Connector) implementations behind feature
//! gates. Enable the corresponding Cargo feature to pull in a transport:
//!
//! | Feature                | Transport              |
//! |------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`] |

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
