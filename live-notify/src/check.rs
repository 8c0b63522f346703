//! Setup diagnostics for the `check` command.

use tracing::{info, warn};

use crate::domain::channel_key;
use crate::monitor::PlatformClient;
use crate::notification::NotificationDispatcher;

/// Outcome of [`run_checks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Error from the platform lookup, if it failed outright.
    pub platform_error: Option<String>,
    /// Configured channels that resolved, with their ids.
    pub found: Vec<(String, String)>,
    pub missing: Vec<String>,
    /// `None` when no test notification was requested.
    pub notification: Option<std::result::Result<(), String>>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.platform_error.is_none()
            && self.missing.is_empty()
            && !matches!(self.notification, Some(Err(_)))
    }
}

/// Verify platform credentials by looking up every configured channel, then
/// optionally deliver a test notification.
pub async fn run_checks(
    platform: &dyn PlatformClient,
    channels: &[String],
    dispatcher: Option<&NotificationDispatcher>,
) -> CheckReport {
    let mut report = CheckReport::default();

    match platform.resolve_users(channels).await {
        Ok(users) => {
            for name in channels {
                let key = channel_key(name);
                match users.iter().find(|u| channel_key(&u.name) == key) {
                    Some(user) => {
                        info!(channel = %name, id = %user.id, "Channel found");
                        report.found.push((name.clone(), user.id.clone()));
                    }
                    None => {
                        warn!(channel = %name, "Channel not found");
                        report.missing.push(name.clone());
                    }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "Platform check failed");
            report.platform_error = Some(e.to_string());
        }
    }

    if let Some(dispatcher) = dispatcher {
        let result = dispatcher.channel().test().await.map_err(|e| e.to_string());
        match &result {
            Ok(()) => info!("Test notification sent"),
            Err(e) => warn!(error = %e, "Test notification failed"),
        }
        report.notification = Some(result);
    }

    report
}
