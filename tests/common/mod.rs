#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for Roomcast client integration tests.
//!
//! Provides a channel-driven [`ChannelConnector`]/[`ChannelTransport`] pair
//! for injecting push frames mid-test, scripted mock APIs for all three
//! domains, and helpers for building wire frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use roomcast_client::api::{ContestApi, ContestVote, JoinReceipt, QuizApi, SurveyAnswer, SurveyApi};
use roomcast_client::connection::{Connection, ConnectionConfig, ServiceDomain};
use roomcast_client::error::{Result, RoomcastError};
use roomcast_client::protocol::{
    ContestSnapshot, ContestStatus, OptionId, QuestionId, QuizSnapshot, QuizStatus, RoomEvent,
    RoomId, ServerFrame, SurveySnapshot, SurveyStatus,
};
use roomcast_client::transport::{Connector, Transport};

// ── Channel transport ───────────────────────────────────────────────

/// Transport fed by an in-memory channel: the test side pushes frames at
/// the moment it chooses; dropping the sender reads as a clean close.
pub struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<String>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, frame: String) -> Result<()> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Connector handing out [`ChannelTransport`] sessions scripted in order.
/// Once the script is exhausted, further connects yield sessions with no
/// inbound traffic that stay open forever.
pub struct ChannelConnector {
    sessions: StdMutex<VecDeque<mpsc::UnboundedReceiver<String>>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    connect_calls: Arc<AtomicUsize>,
    fail_connects: AtomicUsize,
}

impl ChannelConnector {
    /// A connector with one pre-scripted session; returns the sender used
    /// to push frames into it.
    pub fn single_session() -> (Self, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            sessions: StdMutex::new(VecDeque::from([rx])),
            sent: Arc::new(StdMutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            connect_calls: Arc::new(AtomicUsize::new(0)),
            fail_connects: AtomicUsize::new(0),
        };
        (connector, tx)
    }

    /// Fail this many handshakes before the first session succeeds.
    pub fn failing_first(self, attempts: usize) -> Self {
        self.fail_connects.store(attempts, Ordering::Relaxed);
        self
    }

    /// Frames the client sent, decoded from JSON on access.
    pub fn sent(&self) -> Arc<StdMutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }

    pub fn connect_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connect_calls)
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, _credential: &str) -> Result<Box<dyn Transport>> {
        self.connect_calls.fetch_add(1, Ordering::Relaxed);

        let remaining = self.fail_connects.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_connects.store(remaining - 1, Ordering::Relaxed);
            return Err(RoomcastError::TransportClosed);
        }

        let rx = self.sessions.lock().unwrap().pop_front().unwrap_or_else(|| {
            // Open-ended idle session: keep a sender alive forever.
            let (tx, rx) = mpsc::unbounded_channel();
            std::mem::forget(tx);
            rx
        });
        Ok(Box::new(ChannelTransport {
            rx,
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        }))
    }
}

// ── Frame helpers ───────────────────────────────────────────────────

/// Serialize a `Message` frame carrying a room event for `topic`.
pub fn event_frame(topic: &str, event: &RoomEvent) -> String {
    serde_json::to_string(&ServerFrame::Message {
        topic: topic.into(),
        payload: serde_json::to_value(event).unwrap(),
    })
    .unwrap()
}

/// Serialize a `Message` frame with an arbitrary payload.
pub fn payload_frame(topic: &str, payload: serde_json::Value) -> String {
    serde_json::to_string(&ServerFrame::Message {
        topic: topic.into(),
        payload,
    })
    .unwrap()
}

/// A connection wired to a single scripted session with test-friendly
/// timings, already activated.
pub fn connected(
    domain: ServiceDomain,
) -> (Connection, mpsc::UnboundedSender<String>) {
    let (connector, frames) = ChannelConnector::single_session();
    let config = ConnectionConfig::new()
        .with_credential("test-token")
        .with_reconnect_delay(Duration::from_millis(10))
        .with_subscribe_retry_interval(Duration::from_millis(10))
        .with_shutdown_timeout(Duration::from_millis(200));
    let connection = Connection::new(domain, connector, config);
    connection.activate();
    (connection, frames)
}

/// Let spawned tasks and channels drain.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}

// ── Mock APIs ───────────────────────────────────────────────────────

/// Scripted quiz API: `room_details` pops scripted results in order (after
/// an optional delay); an exhausted script returns a 404-style error.
/// Actions are recorded, never fail unless scripted to.
pub struct MockQuizApi {
    snapshots: StdMutex<VecDeque<Result<QuizSnapshot>>>,
    pub details_delay: StdMutex<Duration>,
    pub details_calls: AtomicUsize,
    pub answers: StdMutex<Vec<(QuestionId, OptionId)>>,
    pub host_actions: StdMutex<Vec<&'static str>>,
    pub fail_submit: AtomicBool,
}

impl MockQuizApi {
    pub fn new(snapshots: Vec<Result<QuizSnapshot>>) -> Arc<Self> {
        Arc::new(Self {
            snapshots: StdMutex::new(VecDeque::from(snapshots)),
            details_delay: StdMutex::new(Duration::ZERO),
            details_calls: AtomicUsize::new(0),
            answers: StdMutex::new(Vec::new()),
            host_actions: StdMutex::new(Vec::new()),
            fail_submit: AtomicBool::new(false),
        })
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.details_delay.lock().unwrap() = delay;
        self
    }

    fn not_found() -> RoomcastError {
        RoomcastError::Api {
            status: 404,
            message: "room not found".into(),
            error_code: Some(roomcast_client::ErrorCode::RoomNotFound),
        }
    }
}

#[async_trait]
impl QuizApi for MockQuizApi {
    async fn room_details(&self, _room_id: RoomId) -> Result<QuizSnapshot> {
        self.details_calls.fetch_add(1, Ordering::Relaxed);
        let delay = *self.details_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::not_found()))
    }

    async fn join(&self, _room_id: RoomId, display_name: &str) -> Result<JoinReceipt> {
        Ok(JoinReceipt {
            user_id: uuid::Uuid::from_u128(900),
            display_name: display_name.into(),
        })
    }

    async fn submit_answer(
        &self,
        _room_id: RoomId,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<()> {
        if self.fail_submit.load(Ordering::Relaxed) {
            return Err(RoomcastError::Api {
                status: 409,
                message: "answers locked".into(),
                error_code: Some(roomcast_client::ErrorCode::QuestionExpired),
            });
        }
        self.answers.lock().unwrap().push((question_id, option_id));
        Ok(())
    }

    async fn start(&self, _room_id: RoomId) -> Result<()> {
        self.host_actions.lock().unwrap().push("start");
        Ok(())
    }

    async fn next_question(&self, _room_id: RoomId) -> Result<()> {
        self.host_actions.lock().unwrap().push("next");
        Ok(())
    }

    async fn finish_question(&self, _room_id: RoomId) -> Result<()> {
        self.host_actions.lock().unwrap().push("finish");
        Ok(())
    }

    async fn close(&self, _room_id: RoomId) -> Result<()> {
        self.host_actions.lock().unwrap().push("close");
        Ok(())
    }
}

/// Scripted survey API.
pub struct MockSurveyApi {
    snapshots: StdMutex<VecDeque<Result<SurveySnapshot>>>,
    pub submissions: StdMutex<Vec<Vec<SurveyAnswer>>>,
    pub fail_submit: AtomicBool,
}

impl MockSurveyApi {
    pub fn new(snapshots: Vec<Result<SurveySnapshot>>) -> Arc<Self> {
        Arc::new(Self {
            snapshots: StdMutex::new(VecDeque::from(snapshots)),
            submissions: StdMutex::new(Vec::new()),
            fail_submit: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl SurveyApi for MockSurveyApi {
    async fn room_details(&self, _room_id: RoomId) -> Result<SurveySnapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RoomcastError::Api {
                    status: 404,
                    message: "room not found".into(),
                    error_code: Some(roomcast_client::ErrorCode::RoomNotFound),
                })
            })
    }

    async fn join(&self, _room_id: RoomId, display_name: &str) -> Result<JoinReceipt> {
        Ok(JoinReceipt {
            user_id: uuid::Uuid::from_u128(901),
            display_name: display_name.into(),
        })
    }

    async fn submit(&self, _room_id: RoomId, answers: &[SurveyAnswer]) -> Result<()> {
        if self.fail_submit.load(Ordering::Relaxed) {
            return Err(RoomcastError::Api {
                status: 409,
                message: "submissions closed".into(),
                error_code: Some(roomcast_client::ErrorCode::SubmissionsClosed),
            });
        }
        self.submissions.lock().unwrap().push(answers.to_vec());
        Ok(())
    }

    async fn close(&self, _room_id: RoomId) -> Result<()> {
        Ok(())
    }
}

/// Scripted contest API.
pub struct MockContestApi {
    snapshots: StdMutex<VecDeque<Result<ContestSnapshot>>>,
    pub votes: StdMutex<Vec<ContestVote>>,
    pub advances: AtomicUsize,
}

impl MockContestApi {
    pub fn new(snapshots: Vec<Result<ContestSnapshot>>) -> Arc<Self> {
        Arc::new(Self {
            snapshots: StdMutex::new(VecDeque::from(snapshots)),
            votes: StdMutex::new(Vec::new()),
            advances: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ContestApi for MockContestApi {
    async fn room_details(&self, _room_id: RoomId) -> Result<ContestSnapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RoomcastError::Api {
                    status: 404,
                    message: "room not found".into(),
                    error_code: Some(roomcast_client::ErrorCode::RoomNotFound),
                })
            })
    }

    async fn join(&self, _room_id: RoomId, display_name: &str) -> Result<JoinReceipt> {
        Ok(JoinReceipt {
            user_id: uuid::Uuid::from_u128(902),
            display_name: display_name.into(),
        })
    }

    async fn vote(&self, _room_id: RoomId, vote: &ContestVote) -> Result<()> {
        self.votes.lock().unwrap().push(vote.clone());
        Ok(())
    }

    async fn advance_stage(&self, _room_id: RoomId) -> Result<()> {
        self.advances.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self, _room_id: RoomId) -> Result<()> {
        Ok(())
    }
}

// ── Snapshot fixtures ───────────────────────────────────────────────

pub fn quiz_room_id() -> RoomId {
    uuid::Uuid::from_u128(0xA1)
}

pub fn quiz_lobby_snapshot(participants: u32) -> QuizSnapshot {
    QuizSnapshot {
        room_id: quiz_room_id(),
        status: QuizStatus::Lobby,
        participants_count: participants,
        current_question: None,
        revealed_option_id: None,
        leaderboard: Vec::new(),
        final_results: None,
    }
}

pub fn survey_room_id() -> RoomId {
    uuid::Uuid::from_u128(0xB2)
}

pub fn survey_open_snapshot() -> SurveySnapshot {
    SurveySnapshot {
        room_id: survey_room_id(),
        status: SurveyStatus::Open,
        participants_count: 1,
        questions: Vec::new(),
        results: None,
    }
}

pub fn contest_room_id() -> RoomId {
    uuid::Uuid::from_u128(0xC3)
}

pub fn contest_lobby_snapshot() -> ContestSnapshot {
    ContestSnapshot {
        room_id: contest_room_id(),
        status: ContestStatus::Lobby,
        participants_count: 2,
        stages: Vec::new(),
        position: 0,
        current_stage: None,
        leaderboard: Vec::new(),
        final_results: None,
    }
}
