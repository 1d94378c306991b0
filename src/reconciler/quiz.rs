//! Quiz room reconciler.
//!
//! Status flow: `LOBBY → QUESTION_ACTIVE → QUESTION_FINISHED →
//! (LEADERBOARD) → QUESTION_ACTIVE → … → FINISHED` (terminal).

use tracing::debug;

use crate::countdown::Countdown;
use crate::protocol::{
    ChatMessage, FinalResults, LeaderboardEntry, OptionId, QuestionDescriptor, QuizSnapshot,
    QuizStatus, RoomEvent, RoomId,
};

use super::{ensure_roster_entry, push_chat, RoomPhase};

/// Render-ready view of a quiz room.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizViewState {
    pub room_id: RoomId,
    pub phase: RoomPhase<QuizStatus>,
    pub participants_count: u32,
    /// Kept through `QUESTION_FINISHED` — the UI still shows what was
    /// asked after answers lock.
    pub current_question: Option<QuestionDescriptor>,
    /// Correct option of the current question, revealed when it closes.
    pub revealed_option_id: Option<OptionId>,
    /// Server-ordered, rank ascending. Never re-ranked locally.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// `None` until the room reaches its terminal state.
    pub final_results: Option<FinalResults>,
    pub chat: Vec<ChatMessage>,
}

impl QuizViewState {
    fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            phase: RoomPhase::Loading,
            participants_count: 0,
            current_question: None,
            revealed_option_id: None,
            leaderboard: Vec::new(),
            final_results: None,
            chat: Vec::new(),
        }
    }

    /// Countdown for the current question, if one is shown.
    pub fn countdown(&self) -> Option<Countdown> {
        self.current_question.as_ref().map(Countdown::for_question)
    }
}

/// Merges the quiz snapshot and quiz room events into a [`QuizViewState`].
#[derive(Debug)]
pub struct QuizReconciler {
    state: QuizViewState,
    // Per-field freshness: set once an event has written the field, after
    // which a (possibly stale) snapshot no longer overwrites it.
    status_from_event: bool,
    question_from_event: bool,
    leaderboard_from_event: bool,
}

impl QuizReconciler {
    /// Create a reconciler in the `Loading` phase.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            state: QuizViewState::new(room_id),
            status_from_event: false,
            question_from_event: false,
            leaderboard_from_event: false,
        }
    }

    /// The current merged view.
    pub fn state(&self) -> &QuizViewState {
        &self.state
    }

    /// Apply the REST snapshot, field by field. Called for the initial
    /// fetch and for every explicit refresh; freshness flags persist so a
    /// refresh cannot roll back event-sourced fields either.
    pub fn apply_snapshot(&mut self, snapshot: QuizSnapshot) {
        let state = &mut self.state;

        state.participants_count = state.participants_count.max(snapshot.participants_count);

        if !self.question_from_event {
            state.current_question = snapshot.current_question;
            state.revealed_option_id = snapshot.revealed_option_id;
        }

        if !self.leaderboard_from_event && !snapshot.leaderboard.is_empty() {
            state.leaderboard = snapshot.leaderboard;
        }

        if let Some(results) = snapshot.final_results {
            state.final_results = Some(results);
        }

        if state.phase.is_terminal() {
            // A closed room cannot reopen, not even through a stale read.
            return;
        }
        if !self.status_from_event || snapshot.status.is_terminal() {
            state.phase = RoomPhase::Ready(snapshot.status);
        }
    }

    /// Record a snapshot fetch failure. Only a still-loading view becomes
    /// an error; once events produced a `Ready` view, a failed refresh is
    /// logged and dropped.
    pub fn apply_fetch_error(&mut self, message: String) {
        if self.state.phase.is_loading() {
            self.state.phase = RoomPhase::Error(message);
        } else {
            debug!(room = %self.state.room_id, "snapshot fetch failed after view was ready: {message}");
        }
    }

    /// Apply one push event. Exhaustive over every event kind; kinds that
    /// belong to other domains are explicit no-ops.
    pub fn apply_event(&mut self, event: RoomEvent) {
        if self.state.phase.is_terminal() {
            debug!(room = %self.state.room_id, "event ignored: room is finished");
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
            RoomEvent::NewQuestion { question } => {
                // Atomic replacement; the end time is derived from the
                // server-issued start instant carried by the descriptor.
                state.current_question = Some(question);
                state.revealed_option_id = None;
                state.phase = RoomPhase::Ready(QuizStatus::QuestionActive);
                self.question_from_event = true;
                self.status_from_event = true;
            }
            RoomEvent::QuestionFinished {
                question_id: _,
                correct_option_id,
            } => {
                // A question id that does not match the tracked one is
                // accepted anyway — the server is authoritative and the
                // client does not validate sequence numbers.
                state.revealed_option_id = correct_option_id;
                state.phase = RoomPhase::Ready(QuizStatus::QuestionFinished);
                self.question_from_event = true;
                self.status_from_event = true;
            }
            RoomEvent::LeaderboardUpdate { leaderboard } => {
                state.leaderboard = leaderboard;
                self.leaderboard_from_event = true;
                // A ranking pushed after a finished question is the host
                // showing the interstitial leaderboard; during an active
                // question it is a data-only score tick.
                if state.phase == RoomPhase::Ready(QuizStatus::QuestionFinished) {
                    state.phase = RoomPhase::Ready(QuizStatus::Leaderboard);
                    self.status_from_event = true;
                }
            }
            RoomEvent::RoomClosed { final_results } => {
                match final_results {
                    Some(results) => state.final_results = Some(results),
                    None => {
                        if state.final_results.is_none() {
                            state.final_results = Some(FinalResults {
                                leaderboard: state.leaderboard.clone(),
                                results: None,
                            });
                        }
                    }
                }
                state.phase = RoomPhase::Ready(QuizStatus::Finished);
                self.status_from_event = true;
            }
            RoomEvent::ChatMessage { message } => {
                push_chat(&mut state.chat, message);
            }
            // Survey/contest kinds on a quiz topic: no-ops.
            RoomEvent::VoteRecorded { .. }
            | RoomEvent::StageChanged { .. }
            | RoomEvent::SubmissionPresented { .. }
            | RoomEvent::ContestFinished { .. } => {}
            RoomEvent::Unknown => {
                debug!(room = %state.room_id, "unknown event kind ignored");
            }
        }
    }
}
