//! Application configuration.
//!
//! Loaded once at startup from a YAML file, then overridden from the
//! environment and validated. Nothing downstream re-reads the file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use platforms_helix::HelixConfig;

use crate::domain::{BackoffPolicy, channel_key};
use crate::notification::NtfyConfig;
use crate::{Error, Result};

/// Default notification body.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "{username} is now live!\n\n🎮 {game}\n📺 {title}\n🔗 {url}";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub twitch: TwitchConfig,

    #[serde(default)]
    pub ntfy: NtfyConfig,

    /// Channel names to monitor, in notification order.
    #[serde(default)]
    pub streamers: Vec<String>,

    /// Seconds between successful cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Consecutive failed cycles tolerated before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Backoff cap in seconds.
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay: u64,

    #[serde(default)]
    pub retry_jitter: bool,

    #[serde(default = "default_message_template")]
    pub message_template: String,

    /// `strftime` format for `{started_at}`.
    #[serde(default = "default_time_format")]
    pub time_format: String,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Days an unconfigured channel's record survives.
    #[serde(default = "default_state_retention_days")]
    pub state_retention_days: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwitchConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Pre-issued app access token; skips the client-credentials request.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Override of the Helix base URL (tests and proxies).
    #[serde(default)]
    pub api_base: Option<String>,

    /// Override of the OAuth base URL.
    #[serde(default)]
    pub auth_base: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    60
}

fn default_retry_max_delay() -> u64 {
    300
}

fn default_message_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state/stream_state.json")
}

fn default_state_retention_days() -> u32 {
    7
}

fn default_timeout_secs() -> u64 {
    10
}

/// Upper bound for `state_retention_days` (about a century).
pub const MAX_STATE_RETENTION_DAYS: u32 = 36_500;

const PRIORITIES: [&str; 11] = [
    "min", "low", "default", "high", "max", "urgent", "1", "2", "3", "4", "5",
];

impl AppConfig {
    /// Read, override from the process environment, normalize and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.dedup_streamers();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment overrides. `lookup` returns the value of a variable.
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = var("TWITCH_CLIENT_ID") {
            self.twitch.client_id = client_id;
        }
        if let Some(client_secret) = var("TWITCH_CLIENT_SECRET") {
            self.twitch.client_secret = client_secret;
        }
        if let Some(token) = var("TWITCH_ACCESS_TOKEN") {
            self.twitch.access_token = Some(token);
        }
        if let Some(server) = var("NTFY_SERVER") {
            self.ntfy.server = server;
        }
        if let Some(topic) = var("NTFY_TOPIC") {
            self.ntfy.topic = topic;
        }
        if let Some(token) = var("NTFY_TOKEN") {
            self.ntfy.token = Some(token);
        }
    }

    /// Trim streamer names and drop case-insensitive duplicates, keeping the first.
    pub fn dedup_streamers(&mut self) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(self.streamers.len());

        for name in self.streamers.drain(..) {
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            if seen.insert(channel_key(&name)) {
                unique.push(name);
            } else {
                warn!(channel = %name, "Duplicate streamer in configuration, ignoring");
            }
        }

        self.streamers = unique;
    }

    pub fn validate(&self) -> Result<()> {
        if self.twitch.client_id.trim().is_empty() {
            return Err(Error::config("twitch.client_id is required"));
        }
        if self.twitch.client_secret.trim().is_empty() && self.twitch.access_token.is_none() {
            return Err(Error::config("twitch.client_secret is required"));
        }
        for (field, base) in [
            ("twitch.api_base", &self.twitch.api_base),
            ("twitch.auth_base", &self.twitch.auth_base),
        ] {
            if let Some(base) = base {
                Url::parse(base)
                    .map_err(|e| Error::config(format!("{field} is not a valid URL: {e}")))?;
            }
        }

        if self.ntfy.topic.trim().is_empty() {
            return Err(Error::config("ntfy.topic is required"));
        }
        let server = Url::parse(&self.ntfy.server)
            .map_err(|e| Error::config(format!("ntfy.server is not a valid URL: {e}")))?;
        if !matches!(server.scheme(), "http" | "https") {
            return Err(Error::config("ntfy.server must be an http(s) URL"));
        }
        if !PRIORITIES.contains(&self.ntfy.priority.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "Invalid ntfy.priority: {}. Must be one of: {}",
                self.ntfy.priority,
                PRIORITIES.join(", ")
            )));
        }

        if self.streamers.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::config("At least one streamer must be configured"));
        }
        if self.poll_interval == 0 {
            return Err(Error::config("poll_interval must be greater than 0"));
        }
        if self.max_retries == 0 {
            return Err(Error::config("max_retries must be at least 1"));
        }
        if self.retry_max_delay < self.retry_delay {
            return Err(Error::config(
                "retry_max_delay must not be smaller than retry_delay",
            ));
        }
        if self.message_template.trim().is_empty() {
            return Err(Error::config("message_template cannot be empty"));
        }
        if self.time_format.trim().is_empty()
            || StrftimeItems::new(&self.time_format).any(|item| item == Item::Error)
        {
            return Err(Error::config(format!(
                "Invalid time_format: {:?}",
                self.time_format
            )));
        }
        if self.state_file.as_os_str().is_empty() {
            return Err(Error::config("state_file cannot be empty"));
        }
        if self.state_retention_days > MAX_STATE_RETENTION_DAYS {
            return Err(Error::config(format!(
                "state_retention_days must be at most {MAX_STATE_RETENTION_DAYS}"
            )));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn state_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.state_retention_days))
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            use_jitter: self.retry_jitter,
            ..BackoffPolicy::new(
                self.max_retries,
                Duration::from_secs(self.retry_delay),
                Duration::from_secs(self.retry_max_delay),
            )
        }
    }

    pub fn helix_config(&self) -> HelixConfig {
        let mut helix = HelixConfig::new(&self.twitch.client_id, &self.twitch.client_secret);
        helix.access_token = self.twitch.access_token.clone();
        if let Some(base) = &self.twitch.api_base {
            helix.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(base) = &self.twitch.auth_base {
            helix.auth_base = base.trim_end_matches('/').to_string();
        }
        helix.timeout = Duration::from_secs(self.twitch.timeout_secs);
        helix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use crate::error::ErrorKind;

    const MINIMAL: &str = r#"
twitch:
  client_id: abc
  client_secret: shh
ntfy:
  topic: my-streams
streamers:
  - alice
  - bob
"#;

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.poll_interval, 120);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, 60);
        assert_eq!(config.retry_max_delay, 300);
        assert_eq!(config.message_template, DEFAULT_MESSAGE_TEMPLATE);
        assert_eq!(config.time_format, "%H:%M");
        assert_eq!(config.state_file, PathBuf::from("state/stream_state.json"));
        assert_eq!(config.state_retention_days, 7);
        assert_eq!(config.ntfy.server, "https://ntfy.sh");
        assert_eq!(config.ntfy.priority, "default");
        assert_eq!(config.ntfy.tags, "twitch,live");
        assert!(!config.ntfy.click_url);
        assert_eq!(config.twitch.timeout_secs, 10);
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        let env: HashMap<&str, &str> = [
            ("TWITCH_CLIENT_ID", "env-id"),
            ("NTFY_TOPIC", "env-topic"),
            ("NTFY_TOKEN", "tk_123"),
            ("NTFY_SERVER", ""),
        ]
        .into_iter()
        .collect();

        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.twitch.client_id, "env-id");
        assert_eq!(config.twitch.client_secret, "shh");
        assert_eq!(config.ntfy.topic, "env-topic");
        assert_eq!(config.ntfy.token.as_deref(), Some("tk_123"));
        assert_eq!(config.ntfy.server, "https://ntfy.sh");
    }

    #[test]
    fn test_missing_topic_is_config_error() {
        let config = AppConfig::from_yaml(
            "twitch: {client_id: a, client_secret: b}\nstreamers: [alice]\n",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("ntfy.topic"));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.twitch.client_id.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.twitch.client_secret.clear();
        assert!(config.validate().is_err());

        // A pre-issued token stands in for the secret.
        config.twitch.access_token = Some("token".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_numeric_bounds_rejected() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.poll_interval = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.retry_max_delay = 10;
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.time_format = "%H:%Q".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_state_retention_is_bounded() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.state_retention_days = 200_000_000;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        config.state_retention_days = MAX_STATE_RETENTION_DAYS;
        config.validate().unwrap();
        assert_eq!(config.state_retention().num_days(), 36_500);
    }

    #[test]
    fn test_empty_streamers_rejected() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.streamers = vec!["  ".to_string()];
        config.dedup_streamers();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_server_and_priority_rejected() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.ntfy.server = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.ntfy.priority = "loud".to_string();
        assert!(config.validate().is_err());

        config.ntfy.priority = "HIGH".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dedup_streamers_keeps_first_spelling() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.streamers = vec![
            "Alice".to_string(),
            " bob ".to_string(),
            "alice".to_string(),
            "".to_string(),
        ];
        config.dedup_streamers();
        assert_eq!(config.streamers, vec!["Alice", "bob"]);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = AppConfig::from_yaml("streamers: [alice\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_helix_config_mapping() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.twitch.api_base = Some("http://127.0.0.1:9999/helix/".to_string());
        config.twitch.timeout_secs = 3;

        let helix = config.helix_config();
        assert_eq!(helix.client_id, "abc");
        assert_eq!(helix.api_base, "http://127.0.0.1:9999/helix");
        assert_eq!(helix.auth_base, platforms_helix::helix::DEFAULT_AUTH_BASE);
        assert_eq!(helix.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_policy_mapping() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        let policy = config.backoff_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(300));
    }
}
