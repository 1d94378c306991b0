//! Invitation/notification listener.
//!
//! A best-effort subscriber to the user-scoped topic, independent of any
//! room view: its lifecycle is tied to "a user identity is known", not to a
//! room mount. Received payloads are normalized into [`Notification`]s and
//! forwarded to a [`NotificationSink`] collaborator; display is out of
//! scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::protocol::{user_topic, UserId};
use crate::subscription::SubscriptionHandle;

/// Kind of an out-of-band notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Invitation to a live room; `link` carries the deep link.
    RoomInvite,
    Info,
    Warning,
    /// Kind newer than this client — still surfaced, rendered as info.
    #[serde(other)]
    Other,
}

/// A normalized out-of-band notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Deep link into the inviting room, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Collaborator receiving normalized notifications. Implemented by the
/// host application's notification center.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Channel-backed sink, convenient for tests and simple consumers.
impl NotificationSink for tokio::sync::mpsc::UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

/// Subscription to the user-scoped notification topic.
///
/// Uses the connection's ordinary subscribe path, so the same polling retry
/// applies while the connection is still establishing. Dropping the
/// listener (or calling [`stop`](InvitationListener::stop)) releases the
/// subscription.
pub struct InvitationListener {
    connection: Connection,
    subscription: SubscriptionHandle,
    user_id: UserId,
    stopped: AtomicBool,
}

impl InvitationListener {
    /// Start listening for the given user identity, forwarding each
    /// notification to `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        connection: &Connection,
        user_id: UserId,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let subscription = connection.subscribe(user_topic(user_id), move |payload| {
            match serde_json::from_value::<Notification>(payload.clone()) {
                Ok(notification) => {
                    debug!(kind = ?notification.kind, "notification received");
                    sink.notify(notification);
                }
                Err(e) => {
                    warn!("malformed notification dropped: {e}");
                }
            }
        });
        debug!(user = %user_id, "invitation listener started");
        Self {
            connection: connection.clone(),
            subscription,
            user_id,
            stopped: AtomicBool::new(false),
        }
    }

    /// The identity this listener is scoped to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Release the subscription. Idempotent; also performed on drop.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(user = %self.user_id, "invitation listener stopped");
        self.connection.unsubscribe(self.subscription);
    }
}

impl Drop for InvitationListener {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for InvitationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationListener")
            .field("user_id", &self.user_id)
            .field("stopped", &self.stopped.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn notification_wire_shape() {
        let json = r#"{
            "type": "ROOM_INVITE",
            "title": "Trivia night",
            "message": "You are invited",
            "link": "roomcast://quiz/123"
        }"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.kind, NotificationKind::RoomInvite);
        assert_eq!(notification.title, "Trivia night");
        assert_eq!(notification.link.as_deref(), Some("roomcast://quiz/123"));
    }

    #[test]
    fn unknown_kind_is_still_surfaced() {
        let json = r#"{ "type": "SOMETHING_NEW", "title": "t" }"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.kind, NotificationKind::Other);
        assert_eq!(notification.message, "");
        assert!(notification.link.is_none());
    }
}
