#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Reconciler property tests: merge-rule behavior for every ordering of
//! snapshot and events that the push channel can produce.

use roomcast_client::countdown::Countdown;
use roomcast_client::protocol::{
    AggregateResults, AnswerOption, ContestSnapshot, ContestStatus, LeaderboardEntry,
    QuestionDescriptor, QuizSnapshot, QuizStatus, RoomEvent, RoomId, StageDescriptor, StageKind,
    SurveySnapshot, SurveyStatus,
};
use roomcast_client::reconciler::{ContestReconciler, QuizReconciler, RoomPhase, SurveyReconciler};

fn room() -> RoomId {
    uuid::Uuid::from_u128(0xFEED)
}

fn question(id: u128) -> QuestionDescriptor {
    QuestionDescriptor {
        id: uuid::Uuid::from_u128(id),
        index: None,
        text: "Q".into(),
        options: vec![AnswerOption {
            id: uuid::Uuid::from_u128(id + 100),
            text: "A".into(),
        }],
        start_time: 1_700_000_000_000,
        time_limit_seconds: 30,
    }
}

fn quiz_snapshot(status: QuizStatus, participants: u32) -> QuizSnapshot {
    QuizSnapshot {
        room_id: room(),
        status,
        participants_count: participants,
        current_question: None,
        revealed_option_id: None,
        leaderboard: Vec::new(),
        final_results: None,
    }
}

fn entry(id: u128, score: i64, rank: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        user_id: uuid::Uuid::from_u128(id),
        user_name: format!("user-{id}"),
        score,
        rank,
    }
}

// ════════════════════════════════════════════════════════════════════
// Status follows the last state-changing write
// ════════════════════════════════════════════════════════════════════

#[test]
fn status_equals_last_state_changing_event() {
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 1));

    reconciler.apply_event(RoomEvent::NewQuestion {
        question: question(1),
    });
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(QuizStatus::QuestionActive)
    );

    reconciler.apply_event(RoomEvent::QuestionFinished {
        question_id: uuid::Uuid::from_u128(1),
        correct_option_id: None,
    });
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(QuizStatus::QuestionFinished)
    );

    // Host advances: active again.
    reconciler.apply_event(RoomEvent::NewQuestion {
        question: question(2),
    });
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(QuizStatus::QuestionActive)
    );
}

#[test]
fn status_equals_snapshot_when_no_events_arrived() {
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_snapshot(quiz_snapshot(QuizStatus::QuestionFinished, 5));
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(QuizStatus::QuestionFinished)
    );
}

// ════════════════════════════════════════════════════════════════════
// Idempotence
// ════════════════════════════════════════════════════════════════════

#[test]
fn applying_the_same_leaderboard_update_twice_is_idempotent() {
    let board = vec![entry(1, 300, 1), entry(2, 250, 2)];

    let mut once = QuizReconciler::new(room());
    once.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 2));
    once.apply_event(RoomEvent::LeaderboardUpdate {
        leaderboard: board.clone(),
    });

    let mut twice = QuizReconciler::new(room());
    twice.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 2));
    twice.apply_event(RoomEvent::LeaderboardUpdate {
        leaderboard: board.clone(),
    });
    twice.apply_event(RoomEvent::LeaderboardUpdate { leaderboard: board });

    assert_eq!(once.state().leaderboard, twice.state().leaderboard);
    assert_eq!(once.state().phase, twice.state().phase);
}

// ════════════════════════════════════════════════════════════════════
// Terminal invariant
// ════════════════════════════════════════════════════════════════════

#[test]
fn terminal_status_is_unchanged_by_subsequent_non_terminal_events() {
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::RoomClosed {
        final_results: None,
    });

    let frozen = reconciler.state().clone();

    reconciler.apply_event(RoomEvent::NewQuestion {
        question: question(9),
    });
    reconciler.apply_event(RoomEvent::LeaderboardUpdate {
        leaderboard: vec![entry(1, 1, 1)],
    });
    reconciler.apply_event(RoomEvent::UserJoined {
        user_id: uuid::Uuid::from_u128(7),
        user_name: None,
        new_participant_count: 99,
    });

    assert_eq!(reconciler.state(), &frozen);
}

#[test]
fn closed_survey_ignores_further_votes() {
    let mut reconciler = SurveyReconciler::new(room());
    reconciler.apply_event(RoomEvent::RoomClosed {
        final_results: None,
    });
    reconciler.apply_event(RoomEvent::VoteRecorded {
        results: AggregateResults {
            total_submissions: 50,
            options: Vec::new(),
        },
    });
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(SurveyStatus::Closed)
    );
    assert!(reconciler.state().results.is_none());
}

// ════════════════════════════════════════════════════════════════════
// Out-of-order tolerance (snapshot vs. event races)
// ════════════════════════════════════════════════════════════════════

#[test]
fn snapshot_after_user_joined_never_reduces_participant_count() {
    // Snapshot says 3, an already-applied USER_JOINED said 4. The count
    // policy is max(current, incoming), so the causally newer 4 survives.
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::UserJoined {
        user_id: uuid::Uuid::from_u128(4),
        user_name: Some("Dana".into()),
        new_participant_count: 4,
    });
    reconciler.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 3));

    assert_eq!(reconciler.state().participants_count, 4);
}

#[test]
fn count_policy_is_applied_consistently_in_both_orders() {
    // Same pair of writes, both orders, same result.
    let mut snapshot_first = QuizReconciler::new(room());
    snapshot_first.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 3));
    snapshot_first.apply_event(RoomEvent::UserJoined {
        user_id: uuid::Uuid::from_u128(4),
        user_name: None,
        new_participant_count: 4,
    });

    let mut event_first = QuizReconciler::new(room());
    event_first.apply_event(RoomEvent::UserJoined {
        user_id: uuid::Uuid::from_u128(4),
        user_name: None,
        new_participant_count: 4,
    });
    event_first.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 3));

    assert_eq!(
        snapshot_first.state().participants_count,
        event_first.state().participants_count
    );
    assert_eq!(snapshot_first.state().participants_count, 4);
}

#[test]
fn late_snapshot_does_not_erase_event_supplied_question() {
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::NewQuestion {
        question: question(1),
    });
    // The snapshot was taken in the lobby, before the question started.
    reconciler.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 0));

    let state = reconciler.state();
    assert!(state.current_question.is_some());
    assert_eq!(state.phase, RoomPhase::Ready(QuizStatus::QuestionActive));
}

#[test]
fn late_snapshot_still_fills_fields_events_never_touched() {
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::UserJoined {
        user_id: uuid::Uuid::from_u128(4),
        user_name: None,
        new_participant_count: 4,
    });

    let mut snapshot = quiz_snapshot(QuizStatus::QuestionActive, 3);
    snapshot.current_question = Some(question(1));
    reconciler.apply_snapshot(snapshot);

    let state = reconciler.state();
    // The question only ever arrived via the snapshot; the event-advanced
    // count is untouched.
    assert!(state.current_question.is_some());
    assert_eq!(state.participants_count, 4);
    assert_eq!(state.phase, RoomPhase::Ready(QuizStatus::QuestionActive));
}

#[test]
fn snapshot_leaderboard_is_kept_until_an_event_replaces_it() {
    let mut reconciler = QuizReconciler::new(room());
    let mut snapshot = quiz_snapshot(QuizStatus::Lobby, 2);
    snapshot.leaderboard = vec![entry(1, 10, 1), entry(2, 5, 2)];
    reconciler.apply_snapshot(snapshot);
    assert_eq!(reconciler.state().leaderboard.len(), 2);

    reconciler.apply_event(RoomEvent::LeaderboardUpdate {
        leaderboard: vec![entry(2, 50, 1)],
    });
    assert_eq!(reconciler.state().leaderboard.len(), 1);

    // A refresh with a stale board cannot roll the event board back.
    let mut stale = quiz_snapshot(QuizStatus::Lobby, 2);
    stale.leaderboard = vec![entry(1, 10, 1)];
    reconciler.apply_snapshot(stale);
    assert_eq!(reconciler.state().leaderboard[0].score, 50);
}

#[test]
fn terminal_snapshot_closes_a_live_view() {
    // The room ended while this client was attached but the event was
    // missed; a refresh snapshot reporting FINISHED must land even though
    // events had set the status before.
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::NewQuestion {
        question: question(1),
    });

    let mut snapshot = quiz_snapshot(QuizStatus::Finished, 5);
    snapshot.final_results = Some(roomcast_client::protocol::FinalResults {
        leaderboard: vec![entry(1, 300, 1)],
        results: None,
    });
    reconciler.apply_snapshot(snapshot);

    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(QuizStatus::Finished)
    );
    assert!(reconciler.state().final_results.is_some());
}

// ════════════════════════════════════════════════════════════════════
// Contest ordering
// ════════════════════════════════════════════════════════════════════

#[test]
fn contest_stage_survives_stale_snapshot() {
    let mut reconciler = ContestReconciler::new(room());
    reconciler.apply_event(RoomEvent::StageChanged {
        stage: StageDescriptor {
            index: 2,
            kind: StageKind::PublicVote,
            title: "Audience vote".into(),
            room_id: None,
            start_time: None,
            time_limit_seconds: None,
        },
        position: 2,
    });

    reconciler.apply_snapshot(ContestSnapshot {
        room_id: room(),
        status: ContestStatus::Lobby,
        participants_count: 3,
        stages: vec![],
        position: 0,
        current_stage: None,
        leaderboard: vec![],
        final_results: None,
    });

    assert_eq!(reconciler.state().position, 2);
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(ContestStatus::Active)
    );
}

#[test]
fn survey_aggregate_is_not_rolled_back_by_stale_snapshot() {
    let mut reconciler = SurveyReconciler::new(room());
    reconciler.apply_event(RoomEvent::VoteRecorded {
        results: AggregateResults {
            total_submissions: 9,
            options: Vec::new(),
        },
    });

    reconciler.apply_snapshot(SurveySnapshot {
        room_id: room(),
        status: SurveyStatus::Open,
        participants_count: 9,
        questions: Vec::new(),
        results: Some(AggregateResults {
            total_submissions: 7,
            options: Vec::new(),
        }),
    });

    assert_eq!(
        reconciler.state().results.as_ref().unwrap().total_submissions,
        9
    );
}

// ════════════════════════════════════════════════════════════════════
// Event payload tolerance
// ════════════════════════════════════════════════════════════════════

#[test]
fn event_with_missing_optional_fields_does_not_crash_the_reconciler() {
    // Decoded from minimal wire payloads, then applied.
    let events: Vec<RoomEvent> = [
        serde_json::json!({"event": "USER_JOINED", "userId": uuid::Uuid::from_u128(1), "newParticipantCount": 1}),
        serde_json::json!({"event": "NEW_QUESTION", "question": {"id": uuid::Uuid::from_u128(2), "text": "?", "startTime": 0u64, "timeLimitSeconds": 10}}),
        serde_json::json!({"event": "QUESTION_FINISHED", "questionId": uuid::Uuid::from_u128(2)}),
        serde_json::json!({"event": "ROOM_CLOSED"}),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect();

    let mut reconciler = QuizReconciler::new(room());
    for event in events {
        reconciler.apply_event(event);
    }
    assert_eq!(
        reconciler.state().phase,
        RoomPhase::Ready(QuizStatus::Finished)
    );
}

#[test]
fn unknown_event_kind_leaves_state_untouched() {
    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_snapshot(quiz_snapshot(QuizStatus::Lobby, 2));
    let before = reconciler.state().clone();

    let unknown: RoomEvent =
        serde_json::from_str(r#"{"event":"SOMETHING_NEW","x":1}"#).unwrap();
    reconciler.apply_event(unknown);

    assert_eq!(reconciler.state(), &before);
}

// ════════════════════════════════════════════════════════════════════
// Quiz timer
// ════════════════════════════════════════════════════════════════════

#[test]
fn new_question_yields_end_time_start_plus_limit() {
    const T: u64 = 1_700_000_000_000;

    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::NewQuestion {
        question: QuestionDescriptor {
            id: uuid::Uuid::from_u128(1),
            index: None,
            text: "Q".into(),
            options: Vec::new(),
            start_time: T,
            time_limit_seconds: 30,
        },
    });

    let countdown = reconciler.state().countdown().unwrap();
    assert_eq!(countdown.deadline_millis(), T + 30_000);

    // Sampling one second past the deadline reads 0, never negative.
    assert_eq!(
        countdown.remaining_at(T + 31_000),
        std::time::Duration::ZERO
    );
    // And mid-question the remaining time tracks the server clock.
    assert_eq!(
        countdown.remaining_at(T + 12_000),
        std::time::Duration::from_secs(18)
    );
}

#[test]
fn countdown_is_recomputed_per_question() {
    const T: u64 = 1_700_000_000_000;

    let mut reconciler = QuizReconciler::new(room());
    reconciler.apply_event(RoomEvent::NewQuestion {
        question: QuestionDescriptor {
            id: uuid::Uuid::from_u128(1),
            index: None,
            text: "Q1".into(),
            options: Vec::new(),
            start_time: T,
            time_limit_seconds: 30,
        },
    });
    reconciler.apply_event(RoomEvent::NewQuestion {
        question: QuestionDescriptor {
            id: uuid::Uuid::from_u128(2),
            index: None,
            text: "Q2".into(),
            options: Vec::new(),
            start_time: T + 60_000,
            time_limit_seconds: 20,
        },
    });

    let countdown: Countdown = reconciler.state().countdown().unwrap();
    assert_eq!(countdown.deadline_millis(), T + 60_000 + 20_000);
}
