//! Notification delivery.
//!
//! The [`NotificationDispatcher`] renders a message from a session record and
//! delivers it through one [`NotificationChannel`]. ntfy is the only channel.

pub mod channels;
mod dispatcher;
mod message;
pub mod template;

pub use channels::{NotificationChannel, NtfyChannel, NtfyConfig};
pub use dispatcher::NotificationDispatcher;
pub use message::NotificationMessage;
