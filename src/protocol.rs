//! Wire-compatible protocol types for the Roomcast live-event rooms protocol.
//!
//! Every type in this module produces identical JSON to the server's wire
//! format: frames are tagged by a `type` field, room events by an `event`
//! field in `SCREAMING_SNAKE_CASE`, and all payload fields use `camelCase`.
//!
//! Unknown event kinds deserialize to [`RoomEvent::Unknown`] instead of
//! failing — the push channel may carry kinds newer than this client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for rooms.
pub type RoomId = Uuid;

/// Unique identifier for users (participants and hosts).
pub type UserId = Uuid;

/// Unique identifier for quiz/survey questions.
pub type QuestionId = Uuid;

/// Unique identifier for answer options.
pub type OptionId = Uuid;

// ── Topics ──────────────────────────────────────────────────────────

/// Topic carrying live events for a single room.
pub fn room_topic(room_id: RoomId) -> String {
    format!("rooms/{room_id}")
}

/// User-scoped topic carrying out-of-band notifications (invites etc.).
pub fn user_topic(user_id: UserId) -> String {
    format!("users/{user_id}")
}

// ── Frames ──────────────────────────────────────────────────────────

/// Control frames sent from the client to the push server.
///
/// The push channel is read-only with respect to room state — the only
/// client-originated traffic is subscription management and keep-alive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Register interest in a topic.
    Subscribe { topic: String },
    /// Drop interest in a topic.
    Unsubscribe { topic: String },
    /// Keep-alive heartbeat so idle connections aren't reclaimed by
    /// intermediaries.
    Ping,
}

/// Frames sent from the push server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A message published on a subscribed topic. The payload is an opaque
    /// JSON object decoded further by the subscriber (room events,
    /// notifications).
    Message {
        topic: String,
        payload: serde_json::Value,
    },
    /// Heartbeat response.
    Pong,
    /// Unknown frame kind — ignored, never fatal.
    #[serde(other)]
    Unknown,
}

// ── Domain statuses ─────────────────────────────────────────────────

/// Status of a quiz room as reported by snapshots and implied by events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizStatus {
    /// Accepting joins, no question shown yet.
    Lobby,
    /// A question is live; the timer is running and answers are accepted.
    QuestionActive,
    /// Answers are locked and the correct answer is revealed.
    QuestionFinished,
    /// The interstitial leaderboard is shown.
    Leaderboard,
    /// Terminal. The final leaderboard is frozen.
    Finished,
}

impl QuizStatus {
    /// Returns `true` for the terminal status from which a room cannot
    /// reopen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Status of a survey room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurveyStatus {
    /// Submissions accepted; aggregate grows progressively.
    Open,
    /// Terminal. The final aggregate is frozen.
    Closed,
}

impl SurveyStatus {
    /// Returns `true` for the terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Status of a contest room. The stage position is tracked separately —
/// position `0` denotes the lobby.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestStatus {
    Lobby,
    Active,
    /// Terminal.
    Finished,
}

impl ContestStatus {
    /// Returns `true` for the terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

// ── Descriptors ─────────────────────────────────────────────────────

/// One selectable answer option of a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

/// The currently shown question of a quiz (or quiz stage).
///
/// `start_time` is the server-issued start instant in milliseconds since the
/// Unix epoch. Remaining time is always derived from
/// `start_time + time_limit_seconds` against the sampling wall clock — see
/// [`Countdown`](crate::countdown::Countdown).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDescriptor {
    pub id: QuestionId,
    /// Zero-based position within the quiz, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub text: String,
    /// Absent for free-text questions.
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Server-issued start instant, milliseconds since the Unix epoch.
    pub start_time: u64,
    pub time_limit_seconds: u64,
}

/// One question of a survey form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestion {
    pub id: QuestionId,
    pub text: String,
    /// Absent for free-text questions.
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Whether a response to this question is required for submission.
    #[serde(default)]
    pub required: bool,
}

/// Kind of a contest stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// An embedded quiz room.
    Quiz,
    /// An embedded survey room.
    Survey,
    /// Jury members score presented submissions.
    JuryVote,
    /// The audience votes on presented submissions.
    PublicVote,
    /// A generic pause/intermission stage.
    Pause,
    /// Stage kind newer than this client — rendered as a pause.
    #[serde(other)]
    Unknown,
}

/// One stage of a contest. Stages are heterogeneous and ordered; position
/// `0` is the lobby and is not part of this list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageDescriptor {
    /// One-based position within the contest.
    pub index: u32,
    pub kind: StageKind,
    #[serde(default)]
    pub title: String,
    /// Room id of the embedded quiz/survey, for `Quiz`/`Survey` stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Server-issued start instant, milliseconds since the Unix epoch.
    /// Absent for untimed stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u64>,
}

/// One row of a server-computed leaderboard.
///
/// Ranking (including tie-breaks) is always the server's; the client never
/// re-derives ranks locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: String,
    pub score: i64,
    /// Rank ascending, 1 = first place.
    pub rank: u32,
}

/// A chat message published into a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: String,
    pub text: String,
    /// Server timestamp (ISO 8601), when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
}

/// Per-option vote/submission counts, always server-computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option_id: OptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub count: u32,
}

/// Aggregate results of a survey or voting stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResults {
    pub total_submissions: u32,
    #[serde(default)]
    pub options: Vec<OptionCount>,
}

/// Final tallies of a room, produced by terminal events (and, for rooms
/// already over at snapshot time, by snapshots).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalResults {
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<AggregateResults>,
}

/// A participant submission put on display during jury/public-vote stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresentedSubmission {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Opaque submission content; rendering is the UI collaborator's job.
    #[serde(default)]
    pub content: serde_json::Value,
}

// ── Room events ─────────────────────────────────────────────────────

/// An asynchronously pushed, tagged state-change notification for a room.
///
/// Wire shape: `{ "event": "<KIND>", ...kind-specific fields }`. Every kind
/// is handled exhaustively by each domain reconciler; kinds irrelevant to a
/// domain are explicit no-op arms, and kinds unknown to this client land in
/// [`Unknown`](Self::Unknown).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomEvent {
    /// A participant joined the room.
    #[serde(rename_all = "camelCase")]
    UserJoined {
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
        /// Participant count after the join, as counted by the server.
        new_participant_count: u32,
    },
    /// A new question started (quiz domain). Replaces the current question
    /// wholesale.
    NewQuestion { question: QuestionDescriptor },
    /// The current question closed; answers are locked.
    #[serde(rename_all = "camelCase")]
    QuestionFinished {
        question_id: QuestionId,
        /// Absent for questions without a single correct option.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct_option_id: Option<OptionId>,
    },
    /// Server-computed leaderboard replacement.
    LeaderboardUpdate { leaderboard: Vec<LeaderboardEntry> },
    /// A vote/submission was recorded; carries the updated aggregate.
    VoteRecorded { results: AggregateResults },
    /// A chat message was published into the room.
    ChatMessage { message: ChatMessage },
    /// The contest advanced to another stage. `position` 0 is the lobby.
    StageChanged {
        stage: StageDescriptor,
        position: u32,
    },
    /// A submission was put on display for a jury/public-vote stage.
    SubmissionPresented { submission: PresentedSubmission },
    /// The room reached its terminal state.
    #[serde(rename_all = "camelCase")]
    RoomClosed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_results: Option<FinalResults>,
    },
    /// The contest reached its terminal state.
    #[serde(rename_all = "camelCase")]
    ContestFinished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_results: Option<FinalResults>,
    },
    /// Event kind newer than this client — a no-op branch, not an error.
    #[serde(other)]
    Unknown,
}

// ── Snapshots ───────────────────────────────────────────────────────

/// Point-in-time truth for a quiz room, fetched over request/response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
    pub room_id: RoomId,
    pub status: QuizStatus,
    #[serde(default)]
    pub participants_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionDescriptor>,
    /// Revealed correct option of the current question, when the snapshot
    /// was taken after the question closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_option_id: Option<OptionId>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_results: Option<FinalResults>,
}

/// Point-in-time truth for a survey room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySnapshot {
    pub room_id: RoomId,
    pub status: SurveyStatus,
    #[serde(default)]
    pub participants_count: u32,
    /// The survey form. Content authoring is out of scope; the client only
    /// renders what the server reports.
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<AggregateResults>,
}

/// Point-in-time truth for a contest room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestSnapshot {
    pub room_id: RoomId,
    pub status: ContestStatus,
    #[serde(default)]
    pub participants_count: u32,
    #[serde(default)]
    pub stages: Vec<StageDescriptor>,
    /// Current stage position; 0 denotes the lobby.
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageDescriptor>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_results: Option<FinalResults>,
}
