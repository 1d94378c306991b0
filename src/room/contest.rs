//! Contest room handle.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{ContestApi, ContestVote, JoinReceipt};
use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::RoomId;
use crate::reconciler::{ContestReconciler, ContestViewState};

use super::RoomCore;

/// Handle to one attached contest room view.
///
/// Stage advances are host-driven server calls; the view follows the next
/// `STAGE_CHANGED` event or an explicit [`refresh`](ContestRoom::refresh).
pub struct ContestRoom {
    core: RoomCore<ContestReconciler>,
    api: Arc<dyn ContestApi>,
}

impl ContestRoom {
    /// Attach to a contest room: start the snapshot fetch and the topic
    /// subscription concurrently.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(connection: &Connection, api: Arc<dyn ContestApi>, room_id: RoomId) -> Self {
        let fetch_api = Arc::clone(&api);
        let core = RoomCore::attach(
            connection,
            room_id,
            ContestReconciler::new(room_id),
            move || {
                let api = Arc::clone(&fetch_api);
                async move { api.room_details(room_id).await }
            },
        );
        Self { core, api }
    }

    /// The room this handle is attached to.
    pub fn room_id(&self) -> RoomId {
        self.core.room_id()
    }

    /// A receiver of the merged, render-ready view state.
    pub fn state(&self) -> watch::Receiver<ContestViewState> {
        self.core.state()
    }

    /// The latest merged view.
    pub fn current_state(&self) -> ContestViewState {
        self.core.current()
    }

    /// Re-run the snapshot fetch — also the fallback state refresh after a
    /// host advanced the stage and no `STAGE_CHANGED` event arrived.
    pub fn refresh(&self) {
        self.core.refresh();
    }

    /// Release the subscription and stop applying asynchronous results.
    /// Idempotent; also performed on drop.
    pub fn detach(&self) {
        self.core.detach();
    }

    // ── Participant actions ─────────────────────────────────────────

    /// Join the contest as a participant.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn join(&self, display_name: &str) -> Result<JoinReceipt> {
        self.api.join(self.room_id(), display_name).await
    }

    /// Cast a vote during a jury/public-vote stage. Tallies come back via
    /// `VOTE_RECORDED`; this call does not mutate local state.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn vote(&self, vote: &ContestVote) -> Result<()> {
        self.api.vote(self.room_id(), vote).await
    }

    // ── Host actions ────────────────────────────────────────────────

    /// Host: advance to the next stage.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn advance_stage(&self) -> Result<()> {
        self.api.advance_stage(self.room_id()).await
    }

    /// Host: close the contest.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn close(&self) -> Result<()> {
        self.api.close(self.room_id()).await
    }
}

impl std::fmt::Debug for ContestRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContestRoom")
            .field("room_id", &self.room_id())
            .finish_non_exhaustive()
    }
}
