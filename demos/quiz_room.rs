//! # Quiz Room Example
//!
//! Demonstrates a complete Roomcast client lifecycle:
//!
//! 1. Activate the quiz-domain push connection (credential on the handshake)
//! 2. Attach a quiz room: snapshot fetch + subscription run concurrently
//! 3. Join as a participant and render state updates as they arrive
//! 4. Detach cleanly on Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! ROOMCAST_TOKEN=<session-token> ROOMCAST_ROOM=<room-uuid> \
//!     cargo run --example quiz_room
//!
//! # Override the endpoints:
//! ROOMCAST_PUSH_URL=wss://push.example.com/quiz \
//! ROOMCAST_API_URL=https://api.example.com \
//!     cargo run --example quiz_room
//! ```

use std::sync::Arc;

use roomcast_client::{
    Connection, ConnectionConfig, HttpApi, QuizRoom, RoomPhase, ServiceDomain,
    WebSocketConnector,
};

/// Default endpoints for a local development stack.
const DEFAULT_PUSH_URL: &str = "ws://localhost:4460/quiz";
const DEFAULT_API_URL: &str = "http://localhost:4461";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let push_url =
        std::env::var("ROOMCAST_PUSH_URL").unwrap_or_else(|_| DEFAULT_PUSH_URL.to_string());
    let api_url =
        std::env::var("ROOMCAST_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let token = std::env::var("ROOMCAST_TOKEN").unwrap_or_else(|_| "dev-token".to_string());
    let room_id: roomcast_client::RoomId = std::env::var("ROOMCAST_ROOM")?.parse()?;

    // ── Connection ──────────────────────────────────────────────────
    // One connection per service domain, shared by every quiz view for
    // the process lifetime.
    let connection = Connection::new(
        ServiceDomain::Quiz,
        WebSocketConnector::new(push_url),
        ConnectionConfig::new().with_credential(token.clone()),
    );
    connection.on_connect(|| tracing::info!("push connection ready"));
    connection.activate();

    let api = Arc::new(HttpApi::new(api_url).with_credential(token));

    // ── Room ────────────────────────────────────────────────────────
    let room = QuizRoom::attach(&connection, api, room_id);
    room.join("rusty-player").await?;

    let mut state = room.state();

    // ── Render loop ─────────────────────────────────────────────────
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = state.borrow_and_update().clone();
                match &view.phase {
                    RoomPhase::Loading => println!("loading…"),
                    RoomPhase::Error(message) => println!("error: {message} (press Ctrl+C, or retry)"),
                    RoomPhase::Ready(status) => {
                        println!("[{status:?}] {} participants", view.participants_count);
                        if let Some(question) = &view.current_question {
                            let remaining = view
                                .countdown()
                                .map(|c| c.remaining().as_secs())
                                .unwrap_or(0);
                            println!("  Q: {} ({remaining}s left)", question.text);
                            for option in &question.options {
                                let marker = if view.revealed_option_id == Some(option.id) {
                                    "✓"
                                } else {
                                    " "
                                };
                                println!("   {marker} {}", option.text);
                            }
                        }
                        for entry in view.leaderboard.iter().take(5) {
                            println!("  #{} {} — {}", entry.rank, entry.user_name, entry.score);
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("detaching…");
                break;
            }
        }
    }

    room.detach();
    connection.deactivate().await;
    Ok(())
}
