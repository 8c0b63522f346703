//! ntfy push notification channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::NotificationChannel;
use crate::notification::NotificationMessage;
use crate::utils::http_client::build_http_client;
use crate::{Error, Result};

/// ntfy channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NtfyConfig {
    /// Server base URL.
    #[serde(default = "default_server")]
    pub server: String,
    /// Topic to publish to. Required.
    #[serde(default)]
    pub topic: String,
    /// `min`, `low`, `default`, `high`, `max`/`urgent` or `1`-`5`.
    #[serde(default = "default_priority")]
    pub priority: String,
    /// Comma separated tags; ntfy renders known ones as emoji.
    #[serde(default = "default_tags")]
    pub tags: String,
    /// Open the channel page when the notification is clicked.
    #[serde(default)]
    pub click_url: bool,
    #[serde(default)]
    pub icon: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Bearer token for protected topics.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_server() -> String {
    "https://ntfy.sh".to_string()
}

fn default_priority() -> String {
    "default".to_string()
}

fn default_tags() -> String {
    "twitch,live".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            topic: String::new(),
            priority: default_priority(),
            tags: default_tags(),
            click_url: false,
            icon: None,
            timeout_secs: default_timeout(),
            token: None,
        }
    }
}

impl NtfyConfig {
    /// Full publish URL, `{server}/{topic}`.
    pub fn endpoint(&self) -> Result<Url> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(Error::config("ntfy topic is not set"));
        }

        let base = Url::parse(&self.server)
            .map_err(|e| Error::config(format!("Invalid ntfy server URL {}: {}", self.server, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Invalid ntfy server URL {}",
                self.server
            )));
        }

        let mut url = base;
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Invalid ntfy server URL {}", self.server)))?
            .pop_if_empty()
            .push(topic);
        Ok(url)
    }
}

/// ntfy notification channel.
pub struct NtfyChannel {
    config: NtfyConfig,
    endpoint: Url,
    client: Client,
}

impl std::fmt::Debug for NtfyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtfyChannel")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl NtfyChannel {
    /// Create a new ntfy channel.
    ///
    /// Fails with a configuration error when the topic is unset or the server
    /// URL is invalid.
    pub fn new(config: NtfyConfig) -> Result<Self> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs));
        Self::with_client(config, client)
    }

    pub fn with_client(config: NtfyConfig, client: Client) -> Result<Self> {
        let endpoint = config.endpoint()?;
        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_headers(&self, message: &NotificationMessage) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let priority = message.priority.as_deref().unwrap_or(&self.config.priority);
        let tags = message.tags.as_deref().unwrap_or(&self.config.tags);
        let click = if self.config.click_url {
            message.click.as_deref()
        } else {
            None
        };

        insert_header(&mut headers, "title", Some(message.title.as_str()));
        insert_header(&mut headers, "priority", Some(priority));
        insert_header(&mut headers, "tags", Some(tags));
        insert_header(&mut headers, "click", click);
        insert_header(&mut headers, "icon", self.config.icon.as_deref());

        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }
}

/// Insert a header, skipping empty values.
///
/// Values are sent as raw UTF-8 so emoji in titles survive.
fn insert_header(headers: &mut HeaderMap, name: &'static str, value: Option<&str>) {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    match HeaderValue::from_bytes(value.as_bytes()) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(e) => warn!(header = name, error = %e, "Dropping invalid ntfy header"),
    }
}

#[async_trait]
impl NotificationChannel for NtfyChannel {
    fn channel_type(&self) -> &'static str {
        "ntfy"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.build_headers(message))
            .body(message.body.clone())
            .send()
            .await
            .map_err(|e| Error::notification(format!("ntfy request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(format!(
                "ntfy returned {}: {}",
                status,
                body.trim()
            )));
        }

        debug!(endpoint = %self.endpoint, "ntfy notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::ErrorKind;

    fn config(server: &MockServer) -> NtfyConfig {
        NtfyConfig {
            server: server.uri(),
            topic: "streams".to_string(),
            ..NtfyConfig::default()
        }
    }

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "🔴 alice is now live!".to_string(),
            body: "alice is now live!".to_string(),
            click: Some("https://twitch.tv/alice".to_string()),
            tags: None,
            priority: None,
        }
    }

    fn header_str<'a>(request: &'a wiremock::Request, name: &str) -> Option<&'a str> {
        request
            .headers
            .get(name)
            .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
    }

    #[test]
    fn test_config_default() {
        let config = NtfyConfig::default();
        assert_eq!(config.server, "https://ntfy.sh");
        assert!(config.topic.is_empty());
        assert_eq!(config.priority, "default");
        assert_eq!(config.tags, "twitch,live");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_missing_topic_is_config_error() {
        let err = NtfyChannel::new(NtfyConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_endpoint_joins_server_and_topic() {
        let config = NtfyConfig {
            server: "https://ntfy.example.com/".to_string(),
            topic: "my-topic".to_string(),
            ..NtfyConfig::default()
        };
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "https://ntfy.example.com/my-topic"
        );

        let config = NtfyConfig {
            server: "https://example.com/ntfy".to_string(),
            ..config
        };
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "https://example.com/ntfy/my-topic"
        );
    }

    #[tokio::test]
    async fn test_send_posts_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/streams"))
            .and(header("Priority", "high"))
            .and(header("Authorization", "Bearer tk_abc"))
            .and(body_string("alice is now live!"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NtfyChannel::new(NtfyConfig {
            priority: "high".to_string(),
            token: Some("tk_abc".to_string()),
            click_url: true,
            ..config(&server)
        })
        .unwrap();
        channel.send(&message()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(header_str(&requests[0], "title"), Some("🔴 alice is now live!"));
        assert_eq!(header_str(&requests[0], "tags"), Some("twitch,live"));
        assert_eq!(header_str(&requests[0], "click"), Some("https://twitch.tv/alice"));
        assert_eq!(header_str(&requests[0], "icon"), None);
    }

    #[tokio::test]
    async fn test_click_header_only_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let channel = NtfyChannel::new(config(&server)).unwrap();
        channel.send(&message()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(header_str(&requests[0], "click"), None);
        assert_eq!(header_str(&requests[0], "authorization"), None);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NtfyChannel::new(config(&server)).unwrap();
        let err = channel.send(&message()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransientRemote);
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_setup_message_overrides_tags_and_priority() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Priority", "low"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NtfyChannel::new(config(&server)).unwrap();
        channel.test().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(header_str(&requests[0], "tags"), Some("test,setup"));
    }
}
