//! Notification channels.
//!
//! A channel delivers one [`NotificationMessage`] per call and never retries;
//! retrying is left to the next poll cycle.

mod ntfy;

pub use ntfy::{NtfyChannel, NtfyConfig};

use async_trait::async_trait;

use super::NotificationMessage;
use crate::Result;

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Deliver a message. Any non-success outcome is an error.
    async fn send(&self, message: &NotificationMessage) -> Result<()>;

    /// Deliver a low-priority test message.
    async fn test(&self) -> Result<()> {
        self.send(&NotificationMessage::setup_test()).await
    }
}
