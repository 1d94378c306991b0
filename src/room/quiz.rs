//! Quiz room handle.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::watch;
use tracing::debug;

use crate::api::{JoinReceipt, QuizApi};
use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{OptionId, QuestionId, RoomId};
use crate::reconciler::{QuizReconciler, QuizViewState};

use super::RoomCore;

/// Handle to one attached quiz room view.
///
/// Created with [`attach`](QuizRoom::attach); dropping the handle (or
/// calling [`detach`](QuizRoom::detach)) releases the subscription and
/// stops all state updates. State is read through the `watch` receiver
/// returned by [`state`](QuizRoom::state) — it changes only via snapshots
/// and events, never via an action's return value.
pub struct QuizRoom {
    core: RoomCore<QuizReconciler>,
    api: Arc<dyn QuizApi>,
    /// Questions this client already answered — a second submit attempt is
    /// a local no-op, not a re-send the server would reject anyway.
    answered: StdMutex<HashSet<QuestionId>>,
}

impl QuizRoom {
    /// Attach to a quiz room: start the snapshot fetch and the topic
    /// subscription concurrently.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(connection: &Connection, api: Arc<dyn QuizApi>, room_id: RoomId) -> Self {
        let fetch_api = Arc::clone(&api);
        let core = RoomCore::attach(connection, room_id, QuizReconciler::new(room_id), move || {
            let api = Arc::clone(&fetch_api);
            async move { api.room_details(room_id).await }
        });
        Self {
            core,
            api,
            answered: StdMutex::new(HashSet::new()),
        }
    }

    /// The room this handle is attached to.
    pub fn room_id(&self) -> RoomId {
        self.core.room_id()
    }

    /// A receiver of the merged, render-ready view state.
    pub fn state(&self) -> watch::Receiver<QuizViewState> {
        self.core.state()
    }

    /// The latest merged view.
    pub fn current_state(&self) -> QuizViewState {
        self.core.current()
    }

    /// Re-run the snapshot fetch, e.g. after a fetch error, on user action.
    pub fn refresh(&self) {
        self.core.refresh();
    }

    /// Release the subscription and stop applying asynchronous results.
    /// Idempotent; also performed on drop.
    pub fn detach(&self) {
        self.core.detach();
    }

    // ── Participant actions ─────────────────────────────────────────

    /// Join the room as a participant.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error; the reconciled state is not
    /// touched either way (the join lands via `USER_JOINED`).
    pub async fn join(&self, display_name: &str) -> Result<JoinReceipt> {
        self.api.join(self.room_id(), display_name).await
    }

    /// Submit one answer for a question.
    ///
    /// One answer per question: once a submission succeeded, further calls
    /// for the same question return `Ok(())` without hitting the server.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error for the first attempt; a
    /// failed attempt does not set the latch, so the user can retry.
    pub async fn submit_answer(&self, question_id: QuestionId, option_id: OptionId) -> Result<()> {
        if self.has_answered(question_id) {
            debug!(room = %self.room_id(), %question_id, "answer already submitted; skipping");
            return Ok(());
        }
        self.api
            .submit_answer(self.room_id(), question_id, option_id)
            .await?;
        if let Ok(mut answered) = self.answered.lock() {
            answered.insert(question_id);
        }
        Ok(())
    }

    /// Whether this client already answered the given question (the
    /// UI-local "I already clicked submit" affordance).
    pub fn has_answered(&self, question_id: QuestionId) -> bool {
        self.answered
            .lock()
            .map(|answered| answered.contains(&question_id))
            .unwrap_or(false)
    }

    // ── Host actions ────────────────────────────────────────────────

    /// Host: start the quiz from the lobby.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn start(&self) -> Result<()> {
        self.api.start(self.room_id()).await
    }

    /// Host: advance to the next question.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn next_question(&self) -> Result<()> {
        self.api.next_question(self.room_id()).await
    }

    /// Host: force-finish the current question.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn finish_question(&self) -> Result<()> {
        self.api.finish_question(self.room_id()).await
    }

    /// Host: close the room.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn close(&self) -> Result<()> {
        self.api.close(self.room_id()).await
    }
}

impl std::fmt::Debug for QuizRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizRoom")
            .field("room_id", &self.room_id())
            .finish_non_exhaustive()
    }
}
