//! Survey room handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::api::{JoinReceipt, SurveyAnswer, SurveyApi};
use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{RoomId, SurveyStatus};
use crate::reconciler::{RoomPhase, SurveyReconciler, SurveyViewState};

use super::RoomCore;

/// Handle to one attached survey room view.
pub struct SurveyRoom {
    core: RoomCore<SurveyReconciler>,
    api: Arc<dyn SurveyApi>,
    /// Set after a successful submission; gates result visibility and makes
    /// a second submit a local no-op.
    submitted: AtomicBool,
}

impl SurveyRoom {
    /// Attach to a survey room: start the snapshot fetch and the topic
    /// subscription concurrently.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(connection: &Connection, api: Arc<dyn SurveyApi>, room_id: RoomId) -> Self {
        let fetch_api = Arc::clone(&api);
        let core = RoomCore::attach(connection, room_id, SurveyReconciler::new(room_id), move || {
            let api = Arc::clone(&fetch_api);
            async move { api.room_details(room_id).await }
        });
        Self {
            core,
            api,
            submitted: AtomicBool::new(false),
        }
    }

    /// The room this handle is attached to.
    pub fn room_id(&self) -> RoomId {
        self.core.room_id()
    }

    /// A receiver of the merged, render-ready view state.
    pub fn state(&self) -> watch::Receiver<SurveyViewState> {
        self.core.state()
    }

    /// The latest merged view.
    pub fn current_state(&self) -> SurveyViewState {
        self.core.current()
    }

    /// Re-run the snapshot fetch.
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
    /// Returns the REST collaborator's error.
    pub async fn join(&self, display_name: &str) -> Result<JoinReceipt> {
        self.api.join(self.room_id(), display_name).await
    }

    /// Submit the whole survey form.
    ///
    /// Once a submission succeeded, further calls return `Ok(())` without
    /// hitting the server. A failed attempt does not set the latch.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn submit(&self, answers: &[SurveyAnswer]) -> Result<()> {
        if self.has_submitted() {
            debug!(room = %self.room_id(), "survey already submitted; skipping");
            return Ok(());
        }
        self.api.submit(self.room_id(), answers).await?;
        self.submitted.store(true, Ordering::Release);
        Ok(())
    }

    /// Whether this client's submission was recorded.
    pub fn has_submitted(&self) -> bool {
        self.submitted.load(Ordering::Acquire)
    }

    /// Rendering gate for the aggregate: a participant may view results
    /// only after their own submission was recorded, unless the room is
    /// already closed. Enforced here, not inferred from absent data.
    pub fn can_view_results(&self) -> bool {
        if self.has_submitted() {
            return true;
        }
        self.core.current().phase == RoomPhase::Ready(SurveyStatus::Closed)
    }

    // ── Host actions ────────────────────────────────────────────────

    /// Host: close the survey.
    ///
    /// # Errors
    ///
    /// Returns the REST collaborator's error.
    pub async fn close(&self) -> Result<()> {
        self.api.close(self.room_id()).await
    }
}

impl std::fmt::Debug for SurveyRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveyRoom")
            .field("room_id", &self.room_id())
            .field("submitted", &self.has_submitted())
            .finish_non_exhaustive()
    }
}
