use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

pub const DEFAULT_UA: &str = concat!("live-notify/", env!("CARGO_PKG_VERSION"));

/// Install the process-wide rustls crypto provider.
///
/// reqwest is built without a bundled provider, so this must run before any
/// client is constructed. Repeated calls are no-ops.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Create a `reqwest::ClientBuilder` with the defaults shared by every binding.
pub fn create_client_builder(timeout: Option<Duration>) -> reqwest::ClientBuilder {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(DEFAULT_UA);
    if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
        builder = builder.timeout(timeout);
    }
    builder
}
