//! Contest room reconciler.
//!
//! A contest is an ordered sequence of heterogeneous stages (embedded quiz,
//! embedded survey, jury vote, public vote, pause). Position `0` is the
//! lobby; `ROOM_CLOSED`/`CONTEST_FINISHED` are terminal. Stage advances are
//! host-driven server calls — this reconciler is display-only and follows
//! `STAGE_CHANGED` events (or explicit refreshes).

use tracing::debug;

use crate::countdown::Countdown;
use crate::protocol::{
    AggregateResults, ChatMessage, ContestSnapshot, ContestStatus, FinalResults,
    LeaderboardEntry, PresentedSubmission, RoomEvent, RoomId, StageDescriptor,
};

use super::{ensure_roster_entry, push_chat, RoomPhase};

/// Render-ready view of a contest room.
#[derive(Debug, Clone, PartialEq)]
pub struct ContestViewState {
    pub room_id: RoomId,
    pub phase: RoomPhase<ContestStatus>,
    pub participants_count: u32,
    /// The full stage plan, as reported by snapshots.
    pub stages: Vec<StageDescriptor>,
    /// Current position; 0 denotes the lobby.
    pub position: u32,
    pub current_stage: Option<StageDescriptor>,
    /// Server-ordered, rank ascending.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Submission on display during jury/public-vote stages.
    pub presented_submission: Option<PresentedSubmission>,
    /// Tallies of the current voting stage.
    pub vote_results: Option<AggregateResults>,
    /// `None` until the contest reaches its terminal state.
    pub final_results: Option<FinalResults>,
    pub chat: Vec<ChatMessage>,
}

impl ContestViewState {
    fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            phase: RoomPhase::Loading,
            participants_count: 0,
            stages: Vec::new(),
            position: 0,
            current_stage: None,
            leaderboard: Vec::new(),
            presented_submission: None,
            vote_results: None,
            final_results: None,
            chat: Vec::new(),
        }
    }

    /// Countdown for the current stage, if it is timed.
    pub fn countdown(&self) -> Option<Countdown> {
        self.current_stage.as_ref().and_then(Countdown::for_stage)
    }
}

fn status_for_position(position: u32) -> ContestStatus {
    if position == 0 {
        ContestStatus::Lobby
    } else {
        ContestStatus::Active
    }
}

/// Merges the contest snapshot and contest room events into a
/// [`ContestViewState`].
#[derive(Debug)]
pub struct ContestReconciler {
    state: ContestViewState,
    status_from_event: bool,
    stage_from_event: bool,
    leaderboard_from_event: bool,
}

impl ContestReconciler {
    /// Create a reconciler in the `Loading` phase.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            state: ContestViewState::new(room_id),
            status_from_event: false,
            stage_from_event: false,
            leaderboard_from_event: false,
        }
    }

    /// The current merged view.
    pub fn state(&self) -> &ContestViewState {
        &self.state
    }

    /// Apply the REST snapshot, field by field.
    pub fn apply_snapshot(&mut self, snapshot: ContestSnapshot) {
        let state = &mut self.state;

        state.participants_count = state.participants_count.max(snapshot.participants_count);

        // The stage plan only ever comes from snapshots.
        if !snapshot.stages.is_empty() {
            state.stages = snapshot.stages;
        }

        if !self.stage_from_event {
            state.position = snapshot.position;
            state.current_stage = snapshot.current_stage;
        }

        if !self.leaderboard_from_event && !snapshot.leaderboard.is_empty() {
            state.leaderboard = snapshot.leaderboard;
        }

        if let Some(results) = snapshot.final_results {
            state.final_results = Some(results);
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
            debug!(room = %self.state.room_id, "event ignored: contest is finished");
            return;
        }
        let state = &mut self.state;

        match event {
            RoomEvent::UserJoined {
                user_id,
                user_name,
                new_participant_count,
            } => {
                state.participants_count =
                    state.participants_count.max(new_participant_count);
                ensure_roster_entry(&mut state.leaderboard, user_id, user_name);
            }
            RoomEvent::StageChanged { stage, position } => {
                // Atomic replacement; per-stage artifacts reset with it.
                state.position = position;
                state.current_stage = Some(stage);
                state.presented_submission = None;
                state.vote_results = None;
                state.phase = RoomPhase::Ready(status_for_position(position));
                self.stage_from_event = true;
                self.status_from_event = true;
            }
            RoomEvent::SubmissionPresented { submission } => {
                state.presented_submission = Some(submission);
            }
            RoomEvent::VoteRecorded { results } => {
                state.vote_results = Some(results);
            }
            RoomEvent::LeaderboardUpdate { leaderboard } => {
                state.leaderboard = leaderboard;
                self.leaderboard_from_event = true;
            }
            RoomEvent::ContestFinished { final_results }
            | RoomEvent::RoomClosed { final_results } => {
                match final_results {
                    Some(results) => state.final_results = Some(results),
                    None => {
                        if state.final_results.is_none() {
                            state.final_results = Some(FinalResults {
                                leaderboard: state.leaderboard.clone(),
                                results: state.vote_results.clone(),
                            });
                        }
                    }
                }
                state.phase = RoomPhase::Ready(ContestStatus::Finished);
                self.status_from_event = true;
            }
            RoomEvent::ChatMessage { message } => {
                push_chat(&mut state.chat, message);
            }
            // Embedded quiz rooms carry their own topics; their events on
            // the contest topic are no-ops.
            RoomEvent::NewQuestion { .. } | RoomEvent::QuestionFinished { .. } => {}
            RoomEvent::Unknown => {
                debug!(room = %state.room_id, "unknown event kind ignored");
            }
        }
    }
}
