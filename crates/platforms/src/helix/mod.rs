//! Twitch Helix API client.
//!
//! Covers the user lookup and stream listing endpoints. Both accept up to 100
//! ids per request; larger inputs are split into chunks transparently.

mod models;

pub use models::{HelixStream, HelixUser};

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::client::create_client_builder;
use crate::error::PlatformError;
use models::{AppAccessToken, HelixPage};

/// Maximum number of `login` / `user_id` parameters accepted per request.
pub const MAX_IDS_PER_REQUEST: usize = 100;

pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_AUTH_BASE: &str = "https://id.twitch.tv/oauth2";

/// Helix client configuration.
#[derive(Debug, Clone)]
pub struct HelixConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Pre-issued app access token. When unset, one is requested with the
    /// client-credentials grant on first use.
    pub access_token: Option<String>,
    pub api_base: String,
    pub auth_base: String,
    pub timeout: Duration,
}

impl HelixConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            access_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct HelixClient {
    config: HelixConfig,
    client: Client,
    /// Cached bearer token. Cleared when the API answers 401.
    token: Mutex<Option<String>>,
}

impl HelixClient {
    /// Create a new client, validating the configured endpoints.
    pub fn new(config: HelixConfig) -> Result<Self, PlatformError> {
        let client = create_client_builder(Some(config.timeout)).build()?;
        Self::with_client(config, client)
    }

    /// Create a new client with a custom HTTP client.
    pub fn with_client(config: HelixConfig, client: Client) -> Result<Self, PlatformError> {
        for base in [&config.api_base, &config.auth_base] {
            Url::parse(base).map_err(|e| PlatformError::InvalidUrl(format!("{base}: {e}")))?;
        }

        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    /// Look up users by login name.
    ///
    /// Logins that do not exist are simply absent from the result.
    pub async fn get_users(&self, logins: &[String]) -> Result<Vec<HelixUser>, PlatformError> {
        let mut users = Vec::with_capacity(logins.len());

        for chunk in logins.chunks(MAX_IDS_PER_REQUEST) {
            let query: Vec<(&str, &str)> = chunk.iter().map(|l| ("login", l.as_str())).collect();
            let page: HelixPage<HelixUser> = self.get_json("users", &query).await?;
            users.extend(page.data);
        }

        debug!(requested = logins.len(), found = users.len(), "Resolved Helix users");
        Ok(users)
    }

    /// List the active streams of the given user ids, following pagination.
    ///
    /// Users that are offline are absent from the result.
    pub async fn get_streams(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<HelixStream>, PlatformError> {
        let mut streams = Vec::new();

        for chunk in user_ids.chunks(MAX_IDS_PER_REQUEST) {
            let mut cursor: Option<String> = None;
            loop {
                let mut query: Vec<(&str, &str)> =
                    chunk.iter().map(|id| ("user_id", id.as_str())).collect();
                query.push(("first", "100"));
                if let Some(after) = cursor.as_deref() {
                    query.push(("after", after));
                }

                let page: HelixPage<HelixStream> = self.get_json("streams", &query).await?;
                let fetched = page.data.len();
                streams.extend(page.data);

                match page.pagination.cursor {
                    Some(next) if fetched > 0 && !next.is_empty() => cursor = Some(next),
                    _ => break,
                }
            }
        }

        debug!(requested = user_ids.len(), live = streams.len(), "Fetched Helix streams");
        Ok(streams)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/{}", self.config.api_base.trim_end_matches('/'), endpoint);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Client-Id", &self.config.client_id)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(endpoint, "Helix rejected the access token");
            self.invalidate_token().await;
            return Err(PlatformError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn bearer_token(&self) -> Result<String, PlatformError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = match self.config.access_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => self.request_app_token().await?,
        };
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Request an app access token with the client-credentials grant.
    async fn request_app_token(&self) -> Result<String, PlatformError> {
        let url = format!("{}/token", self.config.auth_base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::FORBIDDEN {
            return Err(PlatformError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let token: AppAccessToken = serde_json::from_str(&response.text().await?)?;
        if token.access_token.is_empty() {
            return Err(PlatformError::InvalidResponse(
                "empty access_token in token response".to_string(),
            ));
        }

        debug!(expires_in = token.expires_in, "Obtained Helix app access token");
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{
        body_string_contains, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, access_token: Option<&str>) -> HelixConfig {
        HelixConfig {
            access_token: access_token.map(str::to_string),
            api_base: format!("{}/helix", server.uri()),
            auth_base: format!("{}/oauth2", server.uri()),
            ..HelixConfig::new("cid", "secret")
        }
    }

    fn logins(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_users_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/users"))
            .and(query_param("login", "alice"))
            .and(header("Client-Id", "cid"))
            .and(header("Authorization", "Bearer static-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "1", "login": "alice", "display_name": "Alice"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelixClient::new(test_config(&server, Some("static-token"))).unwrap();
        let users = client.get_users(&logins(&["alice"])).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "1");
        assert_eq!(users[0].display_name, "Alice");
    }

    #[tokio::test]
    async fn test_app_token_is_requested_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "app-token",
                "expires_in": 5000000,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/helix/users"))
            .and(header("Authorization", "Bearer app-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(2)
            .mount(&server)
            .await;

        let client = HelixClient::new(test_config(&server, None)).unwrap();
        client.get_users(&logins(&["alice"])).await.unwrap();
        client.get_users(&logins(&["bob"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_clears_cached_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "app-token",
                "expires_in": 10
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/helix/streams"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HelixClient::new(test_config(&server, None)).unwrap();
        let ids = logins(&["1"]);

        let err = client.get_streams(&ids).await.unwrap_err();
        assert!(matches!(err, PlatformError::Unauthorized));
        assert!(err.is_transient());

        // The next call must request a fresh token.
        assert!(client.get_streams(&ids).await.is_err());
    }

    #[tokio::test]
    async fn test_get_streams_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/streams"))
            .and(query_param_is_missing("after"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "s1", "user_id": "1", "user_login": "alice", "title": "one"}],
                "pagination": {"cursor": "page-2"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/helix/streams"))
            .and(query_param("after", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "s2", "user_id": "2", "user_login": "bob", "title": "two"}],
                "pagination": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelixClient::new(test_config(&server, Some("t"))).unwrap();
        let streams = client.get_streams(&logins(&["1", "2"])).await.unwrap();

        let ids: Vec<&str> = streams.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/users"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = HelixClient::new(test_config(&server, Some("t"))).unwrap();
        let err = client.get_users(&logins(&["alice"])).await.unwrap_err();

        match &err {
            PlatformError::Status { status, body } => {
                assert_eq!(*status, 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_large_login_list_is_chunked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(2)
            .mount(&server)
            .await;

        let names: Vec<String> = (0..150).map(|i| format!("user{i}")).collect();
        let client = HelixClient::new(test_config(&server, Some("t"))).unwrap();
        client.get_users(&names).await.unwrap();
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = HelixConfig {
            api_base: "not a url".to_string(),
            access_token: Some("t".to_string()),
            ..HelixConfig::new("cid", "secret")
        };
        assert!(matches!(
            HelixClient::new(config),
            Err(PlatformError::InvalidUrl(_))
        ));
    }
}
