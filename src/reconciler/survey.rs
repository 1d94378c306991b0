//! Survey room reconciler.
//!
//! Status flow: `OPEN → CLOSED` (terminal). The aggregate grows
//! progressively while open and freezes on close.

use tracing::debug;

use crate::protocol::{
    AggregateResults, RoomEvent, RoomId, SurveyQuestion, SurveySnapshot, SurveyStatus,
};

use super::RoomPhase;

/// Render-ready view of a survey room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyViewState {
    pub room_id: RoomId,
    pub phase: RoomPhase<SurveyStatus>,
    pub participants_count: u32,
    /// The survey form; supplied by snapshots only.
    pub questions: Vec<SurveyQuestion>,
    /// Live aggregate while open, final aggregate once closed.
    pub results: Option<AggregateResults>,
}

impl SurveyViewState {
    fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            phase: RoomPhase::Loading,
            participants_count: 0,
            questions: Vec::new(),
            results: None,
        }
    }
}

/// Merges the survey snapshot and survey room events into a
/// [`SurveyViewState`].
#[derive(Debug)]
pub struct SurveyReconciler {
    state: SurveyViewState,
    status_from_event: bool,
    results_from_event: bool,
}

impl SurveyReconciler {
    /// Create a reconciler in the `Loading` phase.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            state: SurveyViewState::new(room_id),
            status_from_event: false,
            results_from_event: false,
        }
    }

    /// The current merged view.
    pub fn state(&self) -> &SurveyViewState {
        &self.state
    }

    /// Apply the REST snapshot, field by field.
    pub fn apply_snapshot(&mut self, snapshot: SurveySnapshot) {
        let state = &mut self.state;

        state.participants_count = state.participants_count.max(snapshot.participants_count);

        // The form itself only ever comes from snapshots.
        if !snapshot.questions.is_empty() {
            state.questions = snapshot.questions;
        }

        if !self.results_from_event {
            if let Some(results) = snapshot.results {
                state.results = Some(results);
            }
        }

        if state.phase.is_terminal() {
            return;
        }
        if !self.status_from_event || snapshot.status.is_terminal() {
            state.phase = RoomPhase::Ready(snapshot.status);
        }
    }

    /// Record a snapshot fetch failure; see the quiz reconciler for the
    /// loading-only rule.
    pub fn apply_fetch_error(&mut self, message: String) {
        if self.state.phase.is_loading() {
            self.state.phase = RoomPhase::Error(message);
        } else {
            debug!(room = %self.state.room_id, "snapshot fetch failed after view was ready: {message}");
        }
    }

    /// Apply one push event.
    pub fn apply_event(&mut self, event: RoomEvent) {
        if self.state.phase.is_terminal() {
            debug!(room = %self.state.room_id, "event ignored: survey is closed");
            return;
        }
        let state = &mut self.state;

        match event {
            RoomEvent::UserJoined {
                new_participant_count,
                ..
            } => {
                state.participants_count =
                    state.participants_count.max(new_participant_count);
            }
            RoomEvent::VoteRecorded { results } => {
                // Always the server's computed aggregate, replaced wholesale.
                state.results = Some(results);
                self.results_from_event = true;
            }
            RoomEvent::RoomClosed { final_results } => {
                if let Some(results) = final_results.and_then(|r| r.results) {
                    state.results = Some(results);
                }
                state.phase = RoomPhase::Ready(SurveyStatus::Closed);
                self.status_from_event = true;
            }
            // Quiz/contest kinds on a survey topic, and chat (surveys have
            // no chat surface): no-ops.
            RoomEvent::NewQuestion { .. }
            | RoomEvent::QuestionFinished { .. }
            | RoomEvent::LeaderboardUpdate { .. }
            | RoomEvent::ChatMessage { .. }
            | RoomEvent::StageChanged { .. }
            | RoomEvent::SubmissionPresented { .. }
            | RoomEvent::ContestFinished { .. } => {}
            RoomEvent::Unknown => {
                debug!(room = %state.room_id, "unknown event kind ignored");
            }
        }
    }
}
