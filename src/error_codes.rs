//! Error codes for structured error handling of REST actions.
//!
//! These codes are wire-compatible with the server's `ErrorCode` enum and
//! serialize using `SCREAMING_SNAKE_CASE` to match the server's JSON format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error codes returned by the Roomcast REST collaborator.
///
/// Each variant corresponds to a specific error condition. The server sends
/// these as `"SCREAMING_SNAKE_CASE"` strings (e.g., `"ROOM_NOT_FOUND"`).
///
/// Use [`description()`](ErrorCode::description) for a human-readable
/// explanation suitable for a transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors
    Unauthorized,
    InvalidToken,
    AuthenticationRequired,

    // Validation errors
    InvalidInput,
    InvalidDisplayName,
    InvalidAnswer,

    // Room errors
    RoomNotFound,
    RoomClosed,
    RoomFull,
    AlreadyJoined,
    NotAParticipant,
    InvalidRoomState,

    // Submission errors
    AlreadySubmitted,
    QuestionExpired,
    SubmissionsClosed,
    VoteRejected,

    // Host errors
    NotAHost,
    NoNextQuestion,
    NoNextStage,

    // Rate limiting
    RateLimitExceeded,

    // Server errors
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// These messages are written so a UI collaborator can surface them
    /// directly as a dismissible notification.
    pub fn description(&self) -> &'static str {
        match self {
            // Authentication errors
            Self::Unauthorized => {
                "Access denied. Authentication credentials are missing or invalid."
            }
            Self::InvalidToken => {
                "The session token is invalid or has expired. Please sign in again."
            }
            Self::AuthenticationRequired => {
                "This operation requires authentication. Please sign in first."
            }

            // Validation errors
            Self::InvalidInput => {
                "The provided input is invalid or malformed. Check your request parameters."
            }
            Self::InvalidDisplayName => {
                "The display name is invalid. Names must be non-empty and meet length requirements."
            }
            Self::InvalidAnswer => {
                "The submitted answer does not match any option of the current question."
            }

            // Room errors
            Self::RoomNotFound => {
                "The requested room could not be found. It may have ended or the link is incorrect."
            }
            Self::RoomClosed => {
                "This room has already ended. No further participation is possible."
            }
            Self::RoomFull => {
                "The room has reached its maximum participant capacity."
            }
            Self::AlreadyJoined => {
                "You have already joined this room from this or another session."
            }
            Self::NotAParticipant => {
                "You are not a participant of this room. Join the room before performing this action."
            }
            Self::InvalidRoomState => {
                "The room is in an invalid state for this operation. Try refreshing the room."
            }

            // Submission errors
            Self::AlreadySubmitted => {
                "An answer for this question was already recorded. Only the first submission counts."
            }
            Self::QuestionExpired => {
                "The time limit for this question has passed. Answers are no longer accepted."
            }
            Self::SubmissionsClosed => {
                "Submissions are closed for this room."
            }
            Self::VoteRejected => {
                "The vote could not be recorded. The voting stage may have ended."
            }

            // Host errors
            Self::NotAHost => {
                "Only the room host can perform this action."
            }
            Self::NoNextQuestion => {
                "There is no further question in this quiz."
            }
            Self::NoNextStage => {
                "There is no further stage in this contest."
            }

            // Rate limiting
            Self::RateLimitExceeded => {
                "Too many requests in a short time. Please slow down and try again later."
            }

            // Server errors
            Self::InternalError => {
                "An internal server error occurred. Please try again or contact support if the issue persists."
            }
            Self::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again in a few moments."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
