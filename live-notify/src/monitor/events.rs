//! Monitor events.
//!
//! Every observable step of a poll cycle is published here so callers and
//! tests can follow the monitor without a global subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the poll cycle and the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// A live session that still needs a notification was observed.
    SessionDetected {
        channel: String,
        session_id: String,
        title: String,
        category: String,
        timestamp: DateTime<Utc>,
    },
    /// Delivery of a live notification succeeded.
    NotificationSent {
        channel: String,
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Delivery of a live notification failed; retried next cycle.
    NotificationFailed {
        channel: String,
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A channel that was live is no longer broadcasting.
    ChannelOffline {
        channel: String,
        timestamp: DateTime<Utc>,
    },
    /// A configured channel does not exist on the platform.
    ChannelNotFound {
        channel: String,
        timestamp: DateTime<Utc>,
    },
    /// A cycle ran to completion.
    CycleCompleted {
        checked: usize,
        live: usize,
        notified: usize,
        timestamp: DateTime<Utc>,
    },
    /// A cycle ended early.
    CycleFailed {
        error: String,
        consecutive_failures: u32,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::SessionDetected {
                channel, title, ..
            } => format!("{} is now live: {}", channel, title),
            MonitorEvent::NotificationSent { channel, .. } => {
                format!("Notified that {} is live", channel)
            }
            MonitorEvent::NotificationFailed { channel, .. } => {
                format!("Failed to notify that {} is live", channel)
            }
            MonitorEvent::ChannelOffline { channel, .. } => format!("{} went offline", channel),
            MonitorEvent::ChannelNotFound { channel, .. } => {
                format!("{} was not found on the platform", channel)
            }
            MonitorEvent::CycleCompleted {
                checked,
                live,
                notified,
                ..
            } => format!(
                "Checked {} channels: {} live, {} notified",
                checked, live, notified
            ),
            MonitorEvent::CycleFailed {
                error,
                consecutive_failures,
                ..
            } => format!("Cycle failed (attempt {}): {}", consecutive_failures, error),
        }
    }
}

/// Broadcaster for monitor events.
#[derive(Clone)]
pub struct MonitorEventBroadcaster {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Events without subscribers are dropped.
    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MonitorEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = MonitorEvent::SessionDetected {
            channel: "alice".to_string(),
            session_id: "s1".to_string(),
            title: "Speedrun".to_string(),
            category: "Celeste".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.description(), "alice is now live: Speedrun");
    }

    #[tokio::test]
    async fn test_broadcaster_publish_subscribe() {
        let broadcaster = MonitorEventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        let event = MonitorEvent::ChannelOffline {
            channel: "bob".to_string(),
            timestamp: Utc::now(),
        };
        broadcaster.publish(event.clone());

        assert_eq!(receiver.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let broadcaster = MonitorEventBroadcaster::new();
        broadcaster.publish(MonitorEvent::ChannelNotFound {
            channel: "ghost".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
