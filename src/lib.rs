//! # Roomcast Client
//!
//! Transport-agnostic Rust client for the Roomcast live-event rooms
//! protocol: quizzes, surveys, and multi-stage contests that evolve in real
//! time against a server-authoritative process.
//!
//! The crate is the *room synchronization core*: it merges one REST
//! snapshot with an unbounded stream of push events into a coherent,
//! render-ready view per room, while tolerating connection loss,
//! out-of-order delivery, and concurrent subscribe/unsubscribe from many UI
//! surfaces sharing one connection per service domain.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement [`Transport`] +
//!   [`Connector`](transport::Connector) for any backend
//! - **WebSocket built-in** — default `transport-websocket` feature
//!   provides [`WebSocketTransport`] with the credential on the handshake
//! - **HTTP API built-in** — default `api-http` feature provides
//!   [`HttpApi`](api::HttpApi) for all three domains
//! - **Resilient consumption** — fixed-delay indefinite reconnect,
//!   re-subscription after every handshake, per-message defensive decoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let connection = Connection::new(
//!     ServiceDomain::Quiz,
//!     WebSocketConnector::new("wss://push.example.com/quiz"),
//!     ConnectionConfig::new().with_credential(token.clone()),
//! );
//! connection.activate();
//!
//! let api = Arc::new(HttpApi::new("https://api.example.com").with_credential(token));
//! let room = QuizRoom::attach(&connection, api, room_id);
//!
//! let mut state = room.state();
//! while state.changed().await.is_ok() {
//!     render(&state.borrow());
//! }
//! ```

pub mod api;
pub mod connection;
pub mod countdown;
pub mod error;
pub mod error_codes;
pub mod notifications;
pub mod protocol;
pub mod reconciler;
pub mod room;
pub mod subscription;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use connection::{Connection, ConnectionConfig, ServiceDomain};
pub use countdown::Countdown;
pub use error::RoomcastError;
pub use error_codes::ErrorCode;
pub use notifications::{InvitationListener, Notification, NotificationKind, NotificationSink};
pub use protocol::{RoomEvent, RoomId, UserId};
pub use reconciler::{
    ContestViewState, QuizViewState, RoomPhase, SurveyViewState,
};
pub use room::{ContestRoom, QuizRoom, SurveyRoom};
pub use subscription::SubscriptionHandle;
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};

#[cfg(feature = "api-http")]
pub use api::HttpApi;
