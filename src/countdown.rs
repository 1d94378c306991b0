//! Server-anchored countdown for timed questions and stages.
//!
//! Remaining time is always derived from the server-issued start instant
//! plus the time limit, sampled against the wall clock — never decremented
//! locally. A paused render loop or a delayed timer tick therefore cannot
//! drift the countdown away from the server's deadline; the next sample
//! lands on the correct value again.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::protocol::{QuestionDescriptor, StageDescriptor};

/// Suggested re-sampling interval for countdown displays (sub-second, per
/// the cooperative tick model).
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// A countdown anchored to a server-issued start instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Server start instant, milliseconds since the Unix epoch.
    start_time: u64,
    /// Time limit in seconds.
    time_limit_seconds: u64,
}

impl Countdown {
    /// Create a countdown from a raw start instant (epoch milliseconds) and
    /// a time limit in seconds.
    pub fn new(start_time: u64, time_limit_seconds: u64) -> Self {
        Self {
            start_time,
            time_limit_seconds,
        }
    }

    /// Countdown for a quiz question.
    pub fn for_question(question: &QuestionDescriptor) -> Self {
        Self::new(question.start_time, question.time_limit_seconds)
    }

    /// Countdown for a contest stage, if the stage is timed.
    pub fn for_stage(stage: &StageDescriptor) -> Option<Self> {
        match (stage.start_time, stage.time_limit_seconds) {
            (Some(start), Some(limit)) => Some(Self::new(start, limit)),
            _ => None,
        }
    }

    /// The deadline in milliseconds since the Unix epoch.
    pub fn deadline_millis(&self) -> u64 {
        self.start_time
            .saturating_add(self.time_limit_seconds.saturating_mul(1000))
    }

    /// Remaining time at the given sample instant (epoch milliseconds).
    /// Clamped at zero — never negative.
    pub fn remaining_at(&self, now_millis: u64) -> Duration {
        Duration::from_millis(self.deadline_millis().saturating_sub(now_millis))
    }

    /// Remaining time sampled against the current wall clock.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(now_millis())
    }

    /// Whether the deadline has passed at the given sample instant.
    pub fn is_expired_at(&self, now_millis: u64) -> bool {
        self.remaining_at(now_millis).is_zero()
    }
}

/// Current wall clock in milliseconds since the Unix epoch.
///
/// A clock set before 1970 reads as 0 rather than panicking.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
