//! Room handles: the attach/detach lifecycle around one live room view.
//!
//! Attaching a room starts the snapshot fetch and the topic subscription
//! *concurrently* — neither may be assumed to complete first; the
//! reconcilers' merge rules absorb either ordering. Each attached room runs
//! one background task that folds the snapshot result and every inbound
//! event into its reconciler and publishes the merged view on a `watch`
//! channel.
//!
//! Detaching releases exactly the subscription created for the attach and
//! flips a liveness flag checked before any asynchronous completion writes
//! to state — a snapshot resolving after detach is silently discarded, and
//! no retry timer outlives the view.
//!
//! Action methods (join, submit, vote, host controls) forward to the REST
//! collaborator and deliberately do *not* mutate the reconciled state:
//! state changes only through snapshots and events. The one exception is
//! the UI-local submit latch ("I already clicked submit"), which never
//! reaches the reconciler.

pub mod contest;
pub mod quiz;
pub mod survey;

pub use contest::ContestRoom;
pub use quiz::QuizRoom;
pub use survey::SurveyRoom;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{room_topic, RoomEvent, RoomId};
use crate::subscription::SubscriptionHandle;

/// Commands from a room handle to its background task.
enum RoomCommand {
    /// Re-run the snapshot fetch (user-driven retry or explicit refresh).
    Refresh,
}

type SnapshotFuture<S> = Pin<Box<dyn Future<Output = Result<S>> + Send>>;

/// Factory producing one snapshot fetch future per call. Stored so the
/// room task can re-fetch on [`RoomCommand::Refresh`].
type FetchFn<S> = Arc<dyn Fn() -> SnapshotFuture<S> + Send + Sync>;

/// Seam between the generic room plumbing and the per-domain reconcilers.
pub(crate) trait Reconcile: Send + 'static {
    type Snapshot: Send + 'static;
    type View: Clone + Send + Sync + 'static;

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot);
    fn apply_fetch_error(&mut self, message: String);
    fn apply_event(&mut self, event: RoomEvent);
    fn view(&self) -> &Self::View;
}

impl Reconcile for crate::reconciler::QuizReconciler {
    type Snapshot = crate::protocol::QuizSnapshot;
    type View = crate::reconciler::QuizViewState;

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) {
        crate::reconciler::QuizReconciler::apply_snapshot(self, snapshot);
    }

    fn apply_fetch_error(&mut self, message: String) {
        crate::reconciler::QuizReconciler::apply_fetch_error(self, message);
    }

    fn apply_event(&mut self, event: RoomEvent) {
        crate::reconciler::QuizReconciler::apply_event(self, event);
    }

    fn view(&self) -> &Self::View {
        self.state()
    }
}

impl Reconcile for crate::reconciler::SurveyReconciler {
    type Snapshot = crate::protocol::SurveySnapshot;
    type View = crate::reconciler::SurveyViewState;

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) {
        crate::reconciler::SurveyReconciler::apply_snapshot(self, snapshot);
    }

    fn apply_fetch_error(&mut self, message: String) {
        crate::reconciler::SurveyReconciler::apply_fetch_error(self, message);
    }

    fn apply_event(&mut self, event: RoomEvent) {
        crate::reconciler::SurveyReconciler::apply_event(self, event);
    }

    fn view(&self) -> &Self::View {
        self.state()
    }
}

impl Reconcile for crate::reconciler::ContestReconciler {
    type Snapshot = crate::protocol::ContestSnapshot;
    type View = crate::reconciler::ContestViewState;

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) {
        crate::reconciler::ContestReconciler::apply_snapshot(self, snapshot);
    }

    fn apply_fetch_error(&mut self, message: String) {
        crate::reconciler::ContestReconciler::apply_fetch_error(self, message);
    }

    fn apply_event(&mut self, event: RoomEvent) {
        crate::reconciler::ContestReconciler::apply_event(self, event);
    }

    fn view(&self) -> &Self::View {
        self.state()
    }
}

/// Shared attach/detach plumbing of the three room handles.
pub(crate) struct RoomCore<R: Reconcile> {
    room_id: RoomId,
    connection: Connection,
    subscription: SubscriptionHandle,
    live: Arc<AtomicBool>,
    state_rx: watch::Receiver<R::View>,
    cmd_tx: mpsc::UnboundedSender<RoomCommand>,
    task: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<R: Reconcile> RoomCore<R> {
    /// Subscribe to the room topic and spawn the merge task. The snapshot
    /// fetch starts immediately, concurrently with the subscription.
    pub(crate) fn attach<F, Fut>(
        connection: &Connection,
        room_id: RoomId,
        reconciler: R,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R::Snapshot>> + Send + 'static,
    {
        let fetch: FetchFn<R::Snapshot> = Arc::new(move || {
            let fut: SnapshotFuture<R::Snapshot> = Box::pin(fetch());
            fut
        });
        let live = Arc::new(AtomicBool::new(true));

        let (event_tx, event_rx) = mpsc::unbounded_channel::<RoomEvent>();
        let subscription = connection.subscribe(room_topic(room_id), move |payload| {
            // Defensive decode: a malformed event payload is logged and
            // dropped, never propagated as a rendering error.
            match serde_json::from_value::<RoomEvent>(payload.clone()) {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => {
                    warn!(room = %room_id, "malformed room event dropped: {e}");
                }
            }
        });

        let (state_tx, state_rx) = watch::channel(reconciler.view().clone());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<RoomCommand>();

        let task = tokio::spawn(room_loop(
            reconciler,
            fetch,
            event_rx,
            cmd_rx,
            state_tx,
            Arc::clone(&live),
        ));

        Self {
            room_id,
            connection: connection.clone(),
            subscription,
            live,
            state_rx,
            cmd_tx,
            task: StdMutex::new(Some(task)),
        }
    }

    pub(crate) fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// A receiver of the merged view; clones observe every update.
    pub(crate) fn state(&self) -> watch::Receiver<R::View> {
        self.state_rx.clone()
    }

    /// The latest merged view.
    pub(crate) fn current(&self) -> R::View {
        self.state_rx.borrow().clone()
    }

    /// Request a re-fetch of the snapshot through the same merge rules.
    pub(crate) fn refresh(&self) {
        let _ = self.cmd_tx.send(RoomCommand::Refresh);
    }

    /// Release the subscription and stop applying asynchronous results.
    /// Idempotent.
    pub(crate) fn detach(&self) {
        if !self.live.swap(false, Ordering::AcqRel) {
            return;
        }
        debug!(room = %self.room_id, "room detached");
        self.connection.unsubscribe(self.subscription);
    }
}

impl<R: Reconcile> Drop for RoomCore<R> {
    fn drop(&mut self) {
        self.detach();
        // Dropping the subscription already ends the loop; aborting the
        // task additionally cancels a snapshot fetch still in flight.
        if let Ok(mut slot) = self.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

/// Merge loop of one attached room: one optional in-flight snapshot fetch,
/// the event stream, and refresh commands, multiplexed via `tokio::select!`.
async fn room_loop<R: Reconcile>(
    mut reconciler: R,
    fetch: FetchFn<R::Snapshot>,
    mut event_rx: mpsc::UnboundedReceiver<RoomEvent>,
    mut cmd_rx: mpsc::UnboundedReceiver<RoomCommand>,
    state_tx: watch::Sender<R::View>,
    live: Arc<AtomicBool>,
) {
    let mut in_flight: Option<SnapshotFuture<R::Snapshot>> = Some(fetch());

    loop {
        tokio::select! {
            // Branch 1: snapshot fetch completion
            result = poll_snapshot(&mut in_flight) => {
                in_flight = None;
                if !live.load(Ordering::Acquire) {
                    // Resolved after detach: discard silently.
                    break;
                }
                match result {
                    Ok(snapshot) => reconciler.apply_snapshot(snapshot),
                    Err(e) => reconciler.apply_fetch_error(e.to_string()),
                }
                let _ = state_tx.send(reconciler.view().clone());
            }

            // Branch 2: inbound room event
            event = event_rx.recv() => {
                let Some(event) = event else {
                    // Subscription released — the view is gone.
                    break;
                };
                if !live.load(Ordering::Acquire) {
                    break;
                }
                reconciler.apply_event(event);
                let _ = state_tx.send(reconciler.view().clone());
            }

            // Branch 3: handle command
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    RoomCommand::Refresh => {
                        if in_flight.is_none() {
                            in_flight = Some(fetch());
                        }
                    }
                }
            }
        }
    }
}

/// Await the in-flight snapshot fetch, or park forever when none is
/// running (so the surrounding `select!` ignores this branch).
async fn poll_snapshot<S>(in_flight: &mut Option<SnapshotFuture<S>>) -> Result<S> {
    match in_flight {
        Some(fut) => fut.as_mut().await,
        None => std::future::pending().await,
    }
}
