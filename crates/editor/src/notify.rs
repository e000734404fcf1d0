//! In-process notification channel backed by `tokio::sync::broadcast`.
//!
//! Every committed mutation and every failure in the editor publishes a
//! human-readable [`Notification`]; a UI layer subscribes and shows them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyLevel {
    Info,
    Error,
}

/// One user-facing message.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotifyLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out notification channel, shared via `Arc<NotificationBus>`.
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers observe `RecvError::Lagged` once the buffer is full.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped when nobody listens.
    pub fn publish(&self, notification: Notification) {
        let _ = self.sender.send(notification);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(Notification::new(NotifyLevel::Info, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notification::new(NotifyLevel::Error, message));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let bus = NotificationBus::default();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.info("saved");
        bus.error("save failed");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.level, NotifyLevel::Info);
        assert_eq!(first.message, "saved");
        assert_eq!(second.level, NotifyLevel::Error);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = NotificationBus::new(4);
        bus.info("nobody listening");
        assert_eq!(bus.subscriber_count(), 0);
    }
}
