use std::time::Duration;

use tracing::warn;

/// Build a `reqwest::Client` configured like `platforms-helix`'s default client.
///
/// Falls back to reqwest defaults if the configured builder cannot be built.
pub fn build_http_client(request_timeout: Duration) -> reqwest::Client {
    platforms_helix::create_client_builder(Some(request_timeout))
        .build()
        .unwrap_or_else(|error| {
            warn!(
                error = %error,
                "Failed to create HTTP client via platforms-helix; falling back to reqwest defaults"
            );
            reqwest::Client::new()
        })
}
