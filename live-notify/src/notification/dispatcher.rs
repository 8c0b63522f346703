use std::sync::Arc;

use tracing::{info, warn};

use super::channels::{NotificationChannel, NtfyChannel, NtfyConfig};
use super::{NotificationMessage, template};
use crate::Result;
use crate::domain::StreamSessionState;

/// Renders live announcements and hands them to a single channel.
///
/// Delivery failures are logged and reported as `false`; they never propagate.
/// There is no internal retry: an unconfirmed notification is re-evaluated
/// on the next poll cycle.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
    time_format: String,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>, time_format: impl Into<String>) -> Self {
        Self {
            channel,
            time_format: time_format.into(),
        }
    }

    /// Build a dispatcher backed by ntfy. Fails when the topic is unset.
    pub fn ntfy(config: NtfyConfig, time_format: impl Into<String>) -> Result<Self> {
        let channel = NtfyChannel::new(config)?;
        Ok(Self::new(Arc::new(channel), time_format))
    }

    pub fn channel(&self) -> &Arc<dyn NotificationChannel> {
        &self.channel
    }

    /// Announce that `state`'s channel is live. Returns whether delivery succeeded.
    pub async fn send(&self, state: &StreamSessionState, template: &str) -> bool {
        let body = template::render(template, state, &self.time_format);
        let message = NotificationMessage::stream_online(state, body);

        match self.channel.send(&message).await {
            Ok(()) => {
                info!(
                    channel = %state.channel_name,
                    via = self.channel.channel_type(),
                    "Notification sent"
                );
                true
            }
            Err(e) => {
                warn!(
                    channel = %state.channel_name,
                    via = self.channel.channel_type(),
                    error = %e,
                    "Failed to send notification"
                );
                false
            }
        }
    }
}
