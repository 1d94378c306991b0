//! Per-domain connection manager for the Roomcast push channel.
//!
//! A [`Connection`] owns one persistent session per service domain (quiz,
//! survey, contest): it performs the credential-bearing handshake through a
//! [`Connector`], pumps frames in a background task, reconnects with a fixed
//! delay and unbounded attempts after every loss, keeps idle connections
//! alive with periodic pings, and re-issues subscribe frames for all live
//! topics after each successful handshake.
//!
//! The handle is cheaply cloneable and intended to be shared process-wide —
//! many room views and the invitation listener subscribe through the same
//! `Connection` concurrently. Connection state is observable by polling
//! [`is_connected`](Connection::is_connected) or via
//! [`on_connect`](Connection::on_connect) hooks fired once per successful
//! handshake; callers must not assume synchronous availability after
//! [`activate`](Connection::activate).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use crate::protocol::{ClientFrame, ServerFrame};
use crate::subscription::{Registry, SubscriptionHandle, TopicCallback};
use crate::transport::{Connector, Transport};

/// Default delay between reconnection attempts.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Default keep-alive ping interval.
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);

/// Default polling interval for subscribe attempts issued while the
/// connection is not yet established. Tunable; hundreds of milliseconds is
/// the intended range.
const DEFAULT_SUBSCRIBE_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Default timeout for graceful deactivation.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Service domains ─────────────────────────────────────────────────

/// The three Roomcast service domains, each served by its own endpoint and
/// its own [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceDomain {
    Quiz,
    Survey,
    Contest,
}

impl ServiceDomain {
    /// Stable lowercase name, used in logs and endpoint paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Survey => "survey",
            Self::Contest => "contest",
        }
    }
}

impl std::fmt::Display for ServiceDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`Connection`].
///
/// All fields have defaults; the credential is optional because a
/// connection may be constructed before sign-in completes —
/// [`activate`](Connection::activate) without a credential is a logged
/// no-op.
///
/// # Example
///
/// ```
/// use roomcast_client::connection::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new()
///     .with_credential("session-token")
///     .with_reconnect_delay(Duration::from_secs(5));
/// assert_eq!(config.credential.as_deref(), Some("session-token"));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bearer credential attached to every handshake.
    pub credential: Option<String>,
    /// Fixed delay between reconnection attempts. Attempts are unbounded.
    pub reconnect_delay: Duration,
    /// Interval between keep-alive pings on an established session.
    pub keepalive_interval: Duration,
    /// Polling interval for subscribe attempts while disconnected.
    pub subscribe_retry_interval: Duration,
    /// Timeout for the graceful shutdown during
    /// [`deactivate`](Connection::deactivate). If it expires, the supervisor
    /// task is aborted.
    pub shutdown_timeout: Duration,
}

impl ConnectionConfig {
    /// Create a configuration with default values and no credential.
    pub fn new() -> Self {
        Self {
            credential: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            subscribe_retry_interval: DEFAULT_SUBSCRIBE_RETRY_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the bearer credential.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Set the fixed reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the keep-alive ping interval.
    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the subscribe polling interval.
    #[must_use]
    pub fn with_subscribe_retry_interval(mut self, interval: Duration) -> Self {
        self.subscribe_retry_interval = interval;
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Connection ──────────────────────────────────────────────────────

type ConnectHook = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    domain: ServiceDomain,
    config: ConnectionConfig,
    connector: Box<dyn Connector>,
    registry: Registry,
    connected: AtomicBool,
    activated: AtomicBool,
    shutting_down: AtomicBool,
    /// Sender half of the outgoing frame channel of the current session.
    /// `None` while disconnected.
    frame_tx: StdMutex<Option<mpsc::UnboundedSender<ClientFrame>>>,
    on_connect: StdMutex<Vec<ConnectHook>>,
    task: StdMutex<Option<tokio::task::JoinHandle<()>>>,
    shutdown: Notify,
}

/// Shared handle to one per-domain push connection.
///
/// Cloning is cheap (an `Arc` bump); all clones observe the same session.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Create a connection for the given domain. No I/O happens until
    /// [`activate`](Self::activate).
    pub fn new(
        domain: ServiceDomain,
        connector: impl Connector,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                domain,
                config,
                connector: Box::new(connector),
                registry: Registry::new(),
                connected: AtomicBool::new(false),
                activated: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                frame_tx: StdMutex::new(None),
                on_connect: StdMutex::new(Vec::new()),
                task: StdMutex::new(None),
                shutdown: Notify::new(),
            }),
        }
    }

    /// Start the connection supervisor. Idempotent.
    ///
    /// Without a configured credential this logs and returns — non-fatal,
    /// because until a credential exists there is nothing useful to do; a
    /// later call after sign-in will start the supervisor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(&self) {
        if self.inner.config.credential.is_none() {
            debug!(domain = %self.inner.domain, "activate skipped: no credential configured");
            return;
        }
        if self.inner.activated.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(domain = %self.inner.domain, "activating push connection");
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(connection_loop(inner));
        if let Ok(mut slot) = self.inner.task.lock() {
            *slot = Some(task);
        }
    }

    /// Returns `true` only after handshake completion, `false` while
    /// disconnected or reconnecting.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Register a hook fired once per successful handshake (including every
    /// reconnect handshake).
    pub fn on_connect(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut hooks) = self.inner.on_connect.lock() {
            hooks.push(Arc::new(hook));
        }
    }

    /// Subscribe a callback to a topic.
    ///
    /// Returns an opaque handle immediately. If the connection is not yet
    /// established, the subscribe frame is retried on a fixed interval
    /// ([`ConnectionConfig::subscribe_retry_interval`]) until the
    /// connection is ready or the handle is unsubscribed — UI surfaces
    /// mount before the connection necessarily exists, so failing here
    /// would be wrong.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        callback: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let topic = topic.into();
        let callback: TopicCallback = Arc::new(callback);
        let handle = self.inner.registry.insert(topic.clone(), callback);

        if self.is_connected() {
            self.send_frame(ClientFrame::Subscribe {
                topic: topic.clone(),
            });
            debug!(domain = %self.inner.domain, topic = %topic, "subscribed");
            return handle;
        }

        // Not connected yet: poll until the session is up, then attach.
        // The loop exits on its own when the handle is unsubscribed or the
        // connection shuts down, so detach never leaves a stray timer.
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                if inner.shutting_down.load(Ordering::Acquire)
                    || !inner.registry.contains(handle)
                {
                    debug!(topic = %topic, "subscribe retry cancelled");
                    return;
                }
                if inner.connected.load(Ordering::Acquire) {
                    send_frame_on(&inner, ClientFrame::Subscribe {
                        topic: topic.clone(),
                    });
                    debug!(domain = %inner.domain, topic = %topic, "subscribed after retry");
                    return;
                }
                tokio::time::sleep(inner.config.subscribe_retry_interval).await;
            }
        });

        handle
    }

    /// Release a subscription. Never fails: a no-op for unknown handles and
    /// while the connection is inactive. The wire unsubscribe is only sent
    /// once the last handle for the topic is gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let Some((topic, topic_still_live)) = self.inner.registry.remove(handle) else {
            return;
        };
        debug!(domain = %self.inner.domain, topic = %topic, "unsubscribed");
        if !topic_still_live && self.is_connected() {
            self.send_frame(ClientFrame::Unsubscribe { topic });
        }
    }

    /// Shut down the connection gracefully.
    ///
    /// Safe to skip entirely — the app-level policy is "stay connected once
    /// needed" — but tests and embedders that tear the process down cleanly
    /// use this. The supervisor is given
    /// [`ConnectionConfig::shutdown_timeout`] to close the transport, then
    /// aborted.
    pub async fn deactivate(&self) {
        debug!(domain = %self.inner.domain, "deactivate requested");
        self.inner.shutting_down.store(true, Ordering::Release);
        self.inner.shutdown.notify_waiters();

        let task = self.inner.task.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut task) = task {
            match tokio::time::timeout(self.inner.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection supervisor terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection supervisor did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection supervisor aborted: {join_err}");
                    }
                }
            }
        }

        self.inner.connected.store(false, Ordering::Release);
    }

    /// Queue a frame onto the current session. Dropped silently while
    /// disconnected — subscription state is replayed on reconnect anyway.
    fn send_frame(&self, frame: ClientFrame) {
        send_frame_on(&self.inner, frame);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("domain", &self.inner.domain)
            .field("connected", &self.is_connected())
            .field("activated", &self.inner.activated.load(Ordering::Acquire))
            .finish()
    }
}

fn send_frame_on(inner: &Inner, frame: ClientFrame) {
    let Ok(slot) = inner.frame_tx.lock() else {
        return;
    };
    match slot.as_ref() {
        Some(tx) => {
            let _ = tx.send(frame);
        }
        None => {
            debug!(domain = %inner.domain, "frame dropped: no active session");
        }
    }
}

// ── Supervisor ──────────────────────────────────────────────────────

/// Outcome of one pumped session.
enum SessionExit {
    /// Graceful shutdown was requested; the supervisor stops.
    Shutdown,
    /// The transport closed or failed; the supervisor reconnects.
    Lost,
}

/// Connection supervisor: handshake, pump, reconnect — forever, until
/// shutdown. Fixed-delay retries with unbounded attempts.
async fn connection_loop(inner: Arc<Inner>) {
    debug!(domain = %inner.domain, "connection supervisor started");

    // Credential presence was checked in `activate`.
    let credential = inner.config.credential.clone().unwrap_or_default();

    loop {
        if inner.shutting_down.load(Ordering::Acquire) {
            break;
        }

        let transport = match inner.connector.connect(&credential).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(domain = %inner.domain, "handshake failed: {e}; retrying in {:?}",
                    inner.config.reconnect_delay);
                if reconnect_pause(&inner).await {
                    break;
                }
                continue;
            }
        };

        if inner.shutting_down.load(Ordering::Acquire) {
            break;
        }

        info!(domain = %inner.domain, "push session established");

        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<ClientFrame>();
        if let Ok(mut slot) = inner.frame_tx.lock() {
            *slot = Some(frame_tx);
        }
        inner.connected.store(true, Ordering::Release);

        // Replay interest before anything else so no event published after
        // the handshake is missed longer than necessary.
        for topic in inner.registry.topics() {
            send_frame_on(&inner, ClientFrame::Subscribe { topic });
        }

        fire_connect_hooks(&inner);

        let exit = session_pump(transport, frame_rx, &inner).await;

        inner.connected.store(false, Ordering::Release);
        if let Ok(mut slot) = inner.frame_tx.lock() {
            *slot = None;
        }

        match exit {
            SessionExit::Shutdown => break,
            SessionExit::Lost => {
                warn!(domain = %inner.domain, "push session lost; reconnecting in {:?}",
                    inner.config.reconnect_delay);
                if reconnect_pause(&inner).await {
                    break;
                }
            }
        }
    }

    debug!(domain = %inner.domain, "connection supervisor exited");
}

/// Wait one reconnect delay, returning `true` if shutdown was requested in
/// the meantime.
async fn reconnect_pause(inner: &Inner) -> bool {
    tokio::select! {
        () = tokio::time::sleep(inner.config.reconnect_delay) => {}
        () = inner.shutdown.notified() => {}
    }
    inner.shutting_down.load(Ordering::Acquire)
}

fn fire_connect_hooks(inner: &Inner) {
    let hooks: Vec<ConnectHook> = match inner.on_connect.lock() {
        Ok(hooks) => hooks.iter().map(Arc::clone).collect(),
        Err(_) => return,
    };
    for hook in hooks {
        hook();
    }
}

/// Pump one established session: outgoing frames, keep-alive pings, and
/// inbound frames, multiplexed via `tokio::select!`.
async fn session_pump(
    mut transport: Box<dyn Transport>,
    mut frame_rx: mpsc::UnboundedReceiver<ClientFrame>,
    inner: &Inner,
) -> SessionExit {
    let shutdown = inner.shutdown.notified();
    tokio::pin!(shutdown);

    let mut keepalive = tokio::time::interval(inner.config.keepalive_interval);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first ping
    // goes out one full interval after the handshake.
    keepalive.tick().await;

    loop {
        tokio::select! {
            // Branch 1: outgoing frame
            frame = frame_rx.recv() => {
                let Some(frame) = frame else {
                    // All senders gone — session channel replaced.
                    return SessionExit::Lost;
                };
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!("transport send error: {e}");
                            return SessionExit::Lost;
                        }
                    }
                    Err(e) => {
                        // Serialization errors are programming bugs; don't
                        // kill the session over one frame.
                        error!("failed to serialize client frame: {e}");
                    }
                }
            }

            // Branch 2: keep-alive tick
            _ = keepalive.tick() => {
                match serde_json::to_string(&ClientFrame::Ping) {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!("keep-alive send error: {e}");
                            return SessionExit::Lost;
                        }
                    }
                    Err(e) => error!("failed to serialize ping frame: {e}"),
                }
            }

            // Branch 3: shutdown signal
            () = &mut shutdown => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                return SessionExit::Shutdown;
            }

            // Branch 4: inbound frame
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => handle_inbound(inner, &text),
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        return SessionExit::Lost;
                    }
                    None => {
                        debug!("transport closed by server");
                        return SessionExit::Lost;
                    }
                }
            }
        }
    }
}

/// Decode one inbound frame defensively: malformed frames are logged and
/// dropped, never propagated.
fn handle_inbound(inner: &Inner, text: &str) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Message { topic, payload }) => {
            inner.registry.dispatch(&topic, &payload);
        }
        Ok(ServerFrame::Pong) => {
            debug!("keep-alive pong received");
        }
        Ok(ServerFrame::Unknown) => {
            debug!("unknown server frame kind ignored");
        }
        Err(e) => {
            warn!("failed to decode server frame: {e} — raw: {text}");
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::RoomcastError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    // ── Mock transport / connector ──────────────────────────────────

    /// Scripted transport: yields the scripted items in order, then hangs
    /// until dropped (the supervisor owns it for the session lifetime).
    struct MockTransport {
        incoming: VecDeque<Option<Result<String, RoomcastError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, frame: String) -> Result<(), RoomcastError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String, RoomcastError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> Result<(), RoomcastError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Connector that replays scripted sessions in order. Once the script
    /// is exhausted, further connects yield sessions with no inbound
    /// traffic.
    struct MockConnector {
        sessions: StdMutex<VecDeque<Vec<Option<Result<String, RoomcastError>>>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
        connect_calls: Arc<AtomicUsize>,
        /// Fail this many connect attempts before succeeding.
        fail_connects: AtomicUsize,
        credentials_seen: Arc<StdMutex<Vec<String>>>,
    }

    impl MockConnector {
        fn new(sessions: Vec<Vec<Option<Result<String, RoomcastError>>>>) -> Self {
            Self {
                sessions: StdMutex::new(VecDeque::from(sessions)),
                sent: Arc::new(StdMutex::new(Vec::new())),
                closed: Arc::new(AtomicBool::new(false)),
                connect_calls: Arc::new(AtomicUsize::new(0)),
                fail_connects: AtomicUsize::new(0),
                credentials_seen: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn failing_first(self, attempts: usize) -> Self {
            self.fail_connects.store(attempts, Ordering::Relaxed);
            self
        }

        fn sent(&self) -> Arc<StdMutex<Vec<String>>> {
            Arc::clone(&self.sent)
        }

        fn connect_calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.connect_calls)
        }

        fn closed(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.closed)
        }

        fn credentials_seen(&self) -> Arc<StdMutex<Vec<String>>> {
            Arc::clone(&self.credentials_seen)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, credential: &str) -> Result<Box<dyn Transport>, RoomcastError> {
            self.connect_calls.fetch_add(1, Ordering::Relaxed);
            self.credentials_seen
                .lock()
                .unwrap()
                .push(credential.to_string());

            let remaining = self.fail_connects.load(Ordering::Relaxed);
            if remaining > 0 {
                self.fail_connects.store(remaining - 1, Ordering::Relaxed);
                return Err(RoomcastError::TransportClosed);
            }

            let incoming = self
                .sessions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            Ok(Box::new(MockTransport {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&self.sent),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn fast_config() -> ConnectionConfig {
        ConnectionConfig::new()
            .with_credential("test-token")
            .with_reconnect_delay(Duration::from_millis(10))
            .with_keepalive_interval(Duration::from_secs(60))
            .with_subscribe_retry_interval(Duration::from_millis(10))
            .with_shutdown_timeout(Duration::from_millis(200))
    }

    fn message_frame(topic: &str, payload: serde_json::Value) -> Option<Result<String, RoomcastError>> {
        Some(Ok(serde_json::to_string(&ServerFrame::Message {
            topic: topic.into(),
            payload,
        })
        .unwrap()))
    }

    fn sent_frames(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<ClientFrame> {
        sent.lock()
            .unwrap()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(80)).await;
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn activate_without_credential_is_silent_noop() {
        let connector = MockConnector::new(vec![]);
        let calls = connector.connect_calls();
        let conn = Connection::new(ServiceDomain::Quiz, connector, ConnectionConfig::new());

        conn.activate();
        settle().await;

        assert!(!conn.is_connected());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn activate_connects_and_passes_credential() {
        let connector = MockConnector::new(vec![vec![]]);
        let creds = connector.credentials_seen();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        settle().await;

        assert!(conn.is_connected());
        assert_eq!(creds.lock().unwrap().as_slice(), ["test-token"]);

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn activate_is_idempotent() {
        let connector = MockConnector::new(vec![vec![]]);
        let calls = connector.connect_calls();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        conn.activate();
        settle().await;

        assert_eq!(calls.load(Ordering::Relaxed), 1);

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn on_connect_hook_fires_per_handshake() {
        // First session ends immediately (clean close), second stays open:
        // the hook must fire twice.
        let connector = MockConnector::new(vec![vec![None], vec![]]);
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_hook = Arc::clone(&fired);
        conn.on_connect(move || {
            fired_hook.fetch_add(1, Ordering::Relaxed);
        });

        conn.activate();
        settle().await;

        assert!(fired.load(Ordering::Relaxed) >= 2);
        assert!(conn.is_connected());

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn reconnects_after_handshake_failure() {
        let connector = MockConnector::new(vec![vec![]]).failing_first(2);
        let calls = connector.connect_calls();
        let conn = Connection::new(ServiceDomain::Survey, connector, fast_config());

        conn.activate();
        settle().await;

        assert!(conn.is_connected());
        assert_eq!(calls.load(Ordering::Relaxed), 3);

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn subscribe_while_connected_sends_one_frame() {
        let connector = MockConnector::new(vec![vec![]]);
        let sent = connector.sent();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        settle().await;
        let _handle = conn.subscribe("rooms/abc", |_payload| {});
        settle().await;

        let frames = sent_frames(&sent);
        let subs: Vec<_> = frames
            .iter()
            .filter(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "rooms/abc"))
            .collect();
        assert_eq!(subs.len(), 1);

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn subscribe_before_connect_retries_until_attached() {
        // Three failed handshakes at 10ms reconnect delay keep the
        // connection down for the first several subscribe polls.
        let connector = MockConnector::new(vec![vec![]]).failing_first(3);
        let sent = connector.sent();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        // Subscribe before the connection exists at all.
        let _handle = conn.subscribe("rooms/early", |_payload| {});
        conn.activate();
        settle().await;

        assert!(conn.is_connected());
        let frames = sent_frames(&sent);
        let subs = frames
            .iter()
            .filter(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "rooms/early"))
            .count();
        // One from the retry loop; the handshake replay may add one more if
        // the session came up between poll and replay. Never zero, and the
        // retry loop itself attaches at most once.
        assert!(subs >= 1, "expected at least one subscribe frame");
        assert!(subs <= 2, "retry loop must not attach repeatedly, got {subs}");

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn unsubscribe_before_connect_cancels_retry() {
        let connector = MockConnector::new(vec![vec![]]).failing_first(2);
        let sent = connector.sent();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        let handle = conn.subscribe("rooms/never", |_payload| {});
        conn.unsubscribe(handle);
        conn.activate();
        settle().await;

        let frames = sent_frames(&sent);
        assert!(
            !frames
                .iter()
                .any(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "rooms/never")),
            "cancelled retry must not attach"
        );

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn resubscribes_live_topics_after_reconnect() {
        // Session 1 closes cleanly after a moment; session 2 stays open.
        let connector = MockConnector::new(vec![vec![None], vec![]]);
        let sent = connector.sent();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        let _handle = conn.subscribe("rooms/sticky", |_payload| {});
        settle().await;

        let frames = sent_frames(&sent);
        let subs = frames
            .iter()
            .filter(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "rooms/sticky"))
            .count();
        assert!(subs >= 1, "topic must be re-attached on the new session");
        assert!(conn.is_connected());

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn dispatches_message_payload_to_callback() {
        let payload = serde_json::json!({"event": "USER_JOINED", "userId": uuid::Uuid::nil(), "newParticipantCount": 1});
        let connector =
            MockConnector::new(vec![vec![message_frame("rooms/abc", payload.clone())]]);
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        let received: Arc<StdMutex<Vec<serde_json::Value>>> =
            Arc::new(StdMutex::new(Vec::new()));
        let received_cb = Arc::clone(&received);
        let _handle = conn.subscribe("rooms/abc", move |p| {
            received_cb.lock().unwrap().push(p.clone());
        });

        conn.activate();
        settle().await;

        assert_eq!(received.lock().unwrap().as_slice(), [payload]);

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn malformed_inbound_frame_is_dropped_not_fatal() {
        let payload = serde_json::json!({"event": "UNKNOWN_KIND"});
        let connector = MockConnector::new(vec![vec![
            Some(Ok("{not json".into())),
            message_frame("rooms/abc", payload.clone()),
        ]]);
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        let received = Arc::new(AtomicUsize::new(0));
        let received_cb = Arc::clone(&received);
        let _handle = conn.subscribe("rooms/abc", move |_p| {
            received_cb.fetch_add(1, Ordering::Relaxed);
        });

        conn.activate();
        settle().await;

        // The garbage frame is dropped; the following valid one still lands.
        assert_eq!(received.load(Ordering::Relaxed), 1);
        assert!(conn.is_connected());

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn unsubscribe_last_handle_sends_wire_unsubscribe() {
        let connector = MockConnector::new(vec![vec![]]);
        let sent = connector.sent();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        settle().await;

        let h1 = conn.subscribe("rooms/abc", |_p| {});
        let h2 = conn.subscribe("rooms/abc", |_p| {});
        settle().await;

        conn.unsubscribe(h1);
        settle().await;
        {
            let frames = sent_frames(&sent);
            assert!(
                !frames
                    .iter()
                    .any(|f| matches!(f, ClientFrame::Unsubscribe { .. })),
                "unsubscribe must not hit the wire while another handle is live"
            );
        }

        conn.unsubscribe(h2);
        settle().await;
        let frames = sent_frames(&sent);
        assert!(frames
            .iter()
            .any(|f| matches!(f, ClientFrame::Unsubscribe { topic } if topic == "rooms/abc")));

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn unsubscribe_unknown_handle_is_noop() {
        let connector = MockConnector::new(vec![vec![]]);
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        settle().await;

        let handle = conn.subscribe("rooms/abc", |_p| {});
        conn.unsubscribe(handle);
        conn.unsubscribe(handle); // second time: no-op, no panic

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn keepalive_pings_are_sent() {
        let connector = MockConnector::new(vec![vec![]]);
        let sent = connector.sent();
        let config = fast_config().with_keepalive_interval(Duration::from_millis(15));
        let conn = Connection::new(ServiceDomain::Quiz, connector, config);

        conn.activate();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let frames = sent_frames(&sent);
        let pings = frames
            .iter()
            .filter(|f| matches!(f, ClientFrame::Ping))
            .count();
        assert!(pings >= 2, "expected periodic pings, got {pings}");

        conn.deactivate().await;
    }

    #[tokio::test]
    async fn deactivate_closes_transport_and_disconnects() {
        let connector = MockConnector::new(vec![vec![]]);
        let closed = connector.closed();
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        settle().await;
        assert!(conn.is_connected());

        conn.deactivate().await;

        assert!(!conn.is_connected());
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn double_deactivate_does_not_panic() {
        let connector = MockConnector::new(vec![vec![]]);
        let conn = Connection::new(ServiceDomain::Quiz, connector, fast_config());

        conn.activate();
        settle().await;
        conn.deactivate().await;
        conn.deactivate().await;
    }

    #[tokio::test]
    async fn debug_impl_for_connection() {
        let connector = MockConnector::new(vec![]);
        let conn = Connection::new(ServiceDomain::Contest, connector, ConnectionConfig::new());
        let debug_str = format!("{conn:?}");
        assert!(debug_str.contains("Connection"));
        assert!(debug_str.contains("contest"));
    }
}
