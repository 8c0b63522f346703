//! Outbound notification messages.

use crate::domain::StreamSessionState;

/// A message ready to be delivered by a [`NotificationChannel`](super::NotificationChannel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    /// URL opened when the notification is clicked.
    pub click: Option<String>,
    /// Overrides the channel's configured tags.
    pub tags: Option<String>,
    /// Overrides the channel's configured priority.
    pub priority: Option<String>,
}

impl NotificationMessage {
    /// Announcement that `state`'s channel went live, with an already rendered body.
    pub fn stream_online(state: &StreamSessionState, body: String) -> Self {
        Self {
            title: format!("🔴 {} is now live!", state.channel_name),
            body,
            click: Some(state.channel_url()),
            tags: None,
            priority: None,
        }
    }

    /// Low-priority message used to verify delivery during setup checks.
    pub fn setup_test() -> Self {
        Self {
            title: "Live Notify Test".to_string(),
            body: "Test notification: your live-notify setup is working.".to_string(),
            click: None,
            tags: Some("test,setup".to_string()),
            priority: Some("low".to_string()),
        }
    }
}
