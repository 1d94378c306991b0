//! Event reconcilers: the per-domain state machines that merge one REST
//! snapshot with an unbounded stream of push events into a single coherent,
//! render-ready view model.
//!
//! The snapshot fetch and the subscription are started concurrently on room
//! attach, so no ordering between "snapshot arrived" and "first event
//! arrived" may be assumed. The merge is therefore per-field last-writer-
//! wins rather than whole-object replacement:
//!
//! - participant counts merge by `max(current, incoming)` — a stale
//!   snapshot can never reduce a count a live event already advanced;
//! - status, current question/stage, and leaderboard are event-wins once
//!   any event has written the field (tracked by per-field freshness
//!   flags) and snapshot-wins before that;
//! - final results are `Some`-wins, with terminal events allowed to freeze
//!   the current leaderboard when they carry no results payload.
//!
//! Terminal states latch: once a room is `FINISHED`/`CLOSED`, subsequent
//! events are ignored for the rest of the view's lifetime — a closed room
//! cannot reopen.

pub mod contest;
pub mod quiz;
pub mod survey;

pub use contest::{ContestReconciler, ContestViewState};
pub use quiz::{QuizReconciler, QuizViewState};
pub use survey::{SurveyReconciler, SurveyViewState};

use crate::protocol::{ChatMessage, LeaderboardEntry, UserId};

/// Upper bound on retained chat messages per room view.
pub const MAX_CHAT_MESSAGES: usize = 100;

/// Marker for domain status enums with a terminal value.
pub trait RoomStatus: Copy {
    /// `true` for the status from which no further live transitions are
    /// accepted.
    fn is_terminal(&self) -> bool;
}

impl RoomStatus for crate::protocol::QuizStatus {
    fn is_terminal(&self) -> bool {
        crate::protocol::QuizStatus::is_terminal(*self)
    }
}

impl RoomStatus for crate::protocol::SurveyStatus {
    fn is_terminal(&self) -> bool {
        crate::protocol::SurveyStatus::is_terminal(*self)
    }
}

impl RoomStatus for crate::protocol::ContestStatus {
    fn is_terminal(&self) -> bool {
        crate::protocol::ContestStatus::is_terminal(*self)
    }
}

/// Render phase of a room view. Exactly one of loading / error /
/// ready-with-status holds at any time — enforced structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomPhase<S> {
    /// Created on attach; cleared by the first snapshot or status-bearing
    /// event.
    Loading,
    /// The snapshot fetch failed before any view was available. Blocks
    /// room content until the caller retries.
    Error(String),
    /// A coherent view is available.
    Ready(S),
}

impl<S> RoomPhase<S> {
    /// `true` while no snapshot or status-bearing event has arrived.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The error message, if the phase is `Error`.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// The domain status, if the phase is `Ready`.
    pub fn status(&self) -> Option<&S> {
        match self {
            Self::Ready(status) => Some(status),
            _ => None,
        }
    }
}

impl<S: RoomStatus> RoomPhase<S> {
    /// `true` once the view reached the domain's terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready(status) if status.is_terminal())
    }
}

/// Append a zero-score placeholder for a newly joined identity unless the
/// roster already lists it — avoids a visible "participant count ahead of
/// roster" gap between a join event and the next server ranking.
///
/// The placeholder rank is provisional (bottom of the list); the next
/// `LEADERBOARD_UPDATE` replaces the whole ranking.
pub(crate) fn ensure_roster_entry(
    leaderboard: &mut Vec<LeaderboardEntry>,
    user_id: UserId,
    user_name: Option<String>,
) {
    if leaderboard.iter().any(|entry| entry.user_id == user_id) {
        return;
    }
    let rank = leaderboard.len() as u32 + 1;
    leaderboard.push(LeaderboardEntry {
        user_id,
        user_name: user_name.unwrap_or_default(),
        score: 0,
        rank,
    });
}

/// Append a chat message, dropping the oldest once the cap is reached.
pub(crate) fn push_chat(chat: &mut Vec<ChatMessage>, message: ChatMessage) {
    if chat.len() >= MAX_CHAT_MESSAGES {
        chat.remove(0);
    }
    chat.push(message);
}
