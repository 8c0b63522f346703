//! live-notify: push a notification once per Twitch live session.
//!
//! The [`scheduler`] drives a [`monitor::PollCycle`] that polls the platform,
//! folds each observation into the channel's [`domain::StreamSessionState`],
//! notifies through the [`notification`] dispatcher and persists the records
//! with the [`state::StateStore`].

pub mod check;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod scheduler;
pub mod state;
pub mod utils;

pub use error::{Error, ErrorKind, Result};
