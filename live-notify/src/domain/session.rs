//! Per-channel stream session state and the fold that advances it.
//!
//! A record answers one question for the poll cycle: has a notification been
//! delivered for the broadcast that is live right now? The fold compares the
//! previous record with a fresh observation and reports whether the observed
//! broadcast still needs a notification.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Title used when the platform reports none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Category used when the platform reports none.
pub const DEFAULT_CATEGORY: &str = "Unknown";

const CHANNEL_URL_BASE: &str = "https://twitch.tv";

/// Normalized lookup key for a channel name. Channel names compare case-insensitively.
pub fn channel_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An active broadcast as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    /// Platform-assigned id of this live session.
    pub id: String,
    pub broadcaster_id: String,
    pub title: Option<String>,
    pub category: Option<String>,
    /// Raw start timestamp; parsed during the fold.
    pub started_at: Option<String>,
}

/// Last known liveness of one monitored channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSessionState {
    /// Display name as configured. Compared through [`channel_key`].
    #[serde(default, alias = "username")]
    pub channel_name: String,
    #[serde(default)]
    pub is_live: bool,
    /// Id of the current broadcast. `None` iff offline.
    #[serde(default, alias = "stream_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "game_name")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default = "Utc::now",
        alias = "last_checked",
        deserialize_with = "lenient_timestamp_or_now"
    )]
    pub last_checked_at: DateTime<Utc>,
    /// Whether a notification was delivered for the current session.
    #[serde(default)]
    pub notification_sent: bool,
}

impl StreamSessionState {
    /// A record for a channel that has never been observed.
    pub fn new(channel_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            channel_name: channel_name.into(),
            is_live: false,
            session_id: None,
            title: None,
            category_name: None,
            started_at: None,
            last_checked_at: now,
            notification_sent: false,
        }
    }

    /// Public URL of the channel.
    pub fn channel_url(&self) -> String {
        format!("{}/{}", CHANNEL_URL_BASE, self.channel_name)
    }

    /// Fold an observation into this record in place.
    ///
    /// Returns `true` when the observed broadcast still needs a notification.
    pub fn observe(&mut self, observation: Option<&Broadcast>, now: DateTime<Utc>) -> bool {
        let (next, is_new_session) = fold_observation(self, observation, now);
        *self = next;
        is_new_session
    }

    /// Check the liveness/session invariant.
    pub fn is_consistent(&self) -> bool {
        self.is_live == self.session_id.is_some()
    }

    /// Repair a record that violates the liveness/session invariant.
    ///
    /// A live record without a session id cannot be matched against future
    /// observations, so it is treated as offline. Returns whether anything changed.
    pub fn normalize(&mut self) -> bool {
        if self.is_consistent() && (self.is_live || !self.notification_sent) {
            return false;
        }
        let now = self.last_checked_at;
        self.observe(None, now);
        true
    }
}

/// Combine a prior record with the current observation.
///
/// `None` means the platform reports no active broadcast. The returned flag is
/// `true` when the channel is live and either the broadcast is new or no
/// notification has been confirmed for it yet.
pub fn fold_observation(
    prior: &StreamSessionState,
    observation: Option<&Broadcast>,
    now: DateTime<Utc>,
) -> (StreamSessionState, bool) {
    let Some(broadcast) = observation else {
        let next = StreamSessionState {
            channel_name: prior.channel_name.clone(),
            ..StreamSessionState::new(String::new(), now)
        };
        return (next, false);
    };

    let same_session = prior.is_live && prior.session_id.as_deref() == Some(broadcast.id.as_str());
    let notification_sent = same_session && prior.notification_sent;
    let is_new_session = !notification_sent;

    let started_at = broadcast
        .started_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let next = StreamSessionState {
        channel_name: prior.channel_name.clone(),
        is_live: true,
        session_id: Some(broadcast.id.clone()),
        title: Some(non_empty_or(broadcast.title.as_deref(), DEFAULT_TITLE)),
        category_name: Some(non_empty_or(broadcast.category.as_deref(), DEFAULT_CATEGORY)),
        started_at: Some(started_at),
        last_checked_at: now,
        notification_sent,
    };

    (next, is_new_session)
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (with offset) and naive timestamps, which are taken as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

fn lenient_timestamp_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_timestamp(deserializer)?.unwrap_or_else(Utc::now))
}
