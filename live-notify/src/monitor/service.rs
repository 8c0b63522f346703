//! Poll cycle engine.
//!
//! One cycle resolves the configured channel names, fetches their active
//! broadcasts in bulk, folds each observation into the channel's record,
//! notifies new sessions and commits the result to disk.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::events::{MonitorEvent, MonitorEventBroadcaster};
use super::platform::PlatformClient;
use crate::domain::{Broadcast, DEFAULT_CATEGORY, DEFAULT_TITLE, channel_key};
use crate::notification::NotificationDispatcher;
use crate::scheduler::CycleRunner;
use crate::state::StateStore;
use crate::{Error, ErrorKind, Result};

/// Inputs of a poll cycle that do not change between cycles.
#[derive(Debug, Clone)]
pub struct PollCycleConfig {
    /// Channels to check, in notification order.
    pub channels: Vec<String>,
    pub template: String,
    /// How long records of unconfigured channels are kept.
    pub retention: chrono::Duration,
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Channels that resolved and were folded.
    pub checked: usize,
    /// Configured channels the platform does not know.
    pub unresolved: Vec<String>,
    pub live: usize,
    /// Live channels that still needed a notification.
    pub pending: usize,
    pub notified: usize,
    pub failed_notifications: usize,
    /// Whether the state file was written.
    pub saved: bool,
    /// Records removed by the retention sweep.
    pub removed: Vec<String>,
    /// Set when a transient platform failure left this cycle without data.
    pub platform_error: Option<String>,
}

/// Drives one poll cycle at a time over an owned [`StateStore`].
pub struct PollCycle {
    config: PollCycleConfig,
    platform: Arc<dyn PlatformClient>,
    dispatcher: NotificationDispatcher,
    store: StateStore,
    events: MonitorEventBroadcaster,
}

impl PollCycle {
    pub fn new(
        config: PollCycleConfig,
        platform: Arc<dyn PlatformClient>,
        dispatcher: NotificationDispatcher,
        store: StateStore,
    ) -> Self {
        Self {
            config,
            platform,
            dispatcher,
            store,
            events: MonitorEventBroadcaster::new(),
        }
    }

    /// Publish events on `events` instead of a private broadcaster.
    pub fn with_events(mut self, events: MonitorEventBroadcaster) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &MonitorEventBroadcaster {
        &self.events
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one cycle.
    ///
    /// A transient platform failure (network error, rate limit, 5xx) counts
    /// as "no data this cycle": no record is folded, state is still saved and
    /// swept, and the report carries the error. Any other platform failure is
    /// returned to the caller. Notification and save failures are logged and
    /// do not fail the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let lookup = self.platform.resolve_users(&self.config.channels).await;
        let users = match lookup {
            Ok(users) => users,
            Err(e) => return self.skip_fold(report, e),
        };
        let ids: HashMap<String, String> = users
            .into_iter()
            .map(|user| (channel_key(&user.name), user.id))
            .collect();

        let mut resolved: Vec<(String, String)> = Vec::with_capacity(self.config.channels.len());
        for name in &self.config.channels {
            match ids.get(&channel_key(name)) {
                Some(id) => resolved.push((name.clone(), id.clone())),
                None => {
                    warn!(channel = %name, "Channel not found on platform, skipping");
                    self.events.publish(MonitorEvent::ChannelNotFound {
                        channel: name.clone(),
                        timestamp: Utc::now(),
                    });
                    report.unresolved.push(name.clone());
                }
            }
        }

        if resolved.is_empty() {
            warn!("None of the configured channels could be resolved");
            return Ok(report);
        }

        let id_list: Vec<String> = resolved.iter().map(|(_, id)| id.clone()).collect();
        let fetched = self.platform.get_active_broadcasts(&id_list).await;
        let broadcasts = match fetched {
            Ok(broadcasts) => broadcasts,
            Err(e) => return self.skip_fold(report, e),
        };
        let mut by_broadcaster: HashMap<&str, &Broadcast> =
            HashMap::with_capacity(broadcasts.len());
        for broadcast in &broadcasts {
            by_broadcaster
                .entry(broadcast.broadcaster_id.as_str())
                .or_insert(broadcast);
        }

        let now = Utc::now();
        for (name, id) in &resolved {
            let observed = by_broadcaster.get(id.as_str()).copied();
            let state = self.store.get_or_create(name, now);
            let was_live = state.is_live;
            let is_new_session = state.observe(observed, now);
            report.checked += 1;

            if !state.is_live {
                if was_live {
                    info!(channel = %state.channel_name, "Channel went offline");
                    self.events.publish(MonitorEvent::ChannelOffline {
                        channel: state.channel_name.clone(),
                        timestamp: now,
                    });
                } else {
                    debug!(channel = %state.channel_name, "Channel is offline");
                }
                continue;
            }

            report.live += 1;
            if !is_new_session {
                debug!(channel = %state.channel_name, "Session already notified");
                continue;
            }

            let session_id = state.session_id.clone().unwrap_or_default();
            report.pending += 1;
            info!(
                channel = %state.channel_name,
                session_id = %session_id,
                "Live session needs a notification"
            );
            self.events.publish(MonitorEvent::SessionDetected {
                channel: state.channel_name.clone(),
                session_id: session_id.clone(),
                title: state.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                category: state
                    .category_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                timestamp: now,
            });

            if self.dispatcher.send(state, &self.config.template).await {
                state.notification_sent = true;
                report.notified += 1;
                self.events.publish(MonitorEvent::NotificationSent {
                    channel: state.channel_name.clone(),
                    session_id,
                    timestamp: Utc::now(),
                });
            } else {
                report.failed_notifications += 1;
                self.events.publish(MonitorEvent::NotificationFailed {
                    channel: state.channel_name.clone(),
                    session_id,
                    timestamp: Utc::now(),
                });
            }
        }

        Ok(self.commit(report))
    }

    /// Finish a cycle whose platform call failed without folding anything.
    fn skip_fold(&mut self, mut report: CycleReport, e: Error) -> Result<CycleReport> {
        if e.kind() != ErrorKind::TransientRemote {
            return Err(e);
        }

        warn!(error = %e, "Platform unavailable, treating this cycle as having no data");
        report.platform_error = Some(e.to_string());
        Ok(self.commit(report))
    }

    /// Save, then sweep stale records, then announce the finished cycle.
    fn commit(&mut self, mut report: CycleReport) -> CycleReport {
        match self.store.save() {
            Ok(()) => report.saved = true,
            Err(e) => error!(error = %e, "Failed to save state; will retry next cycle"),
        }

        let active: HashSet<String> = self.config.channels.iter().cloned().collect();
        report.removed = self
            .store
            .sweep_stale(&active, self.config.retention, Utc::now());

        info!(
            checked = report.checked,
            live = report.live,
            notified = report.notified,
            failed = report.failed_notifications,
            "Poll cycle complete"
        );
        self.events.publish(MonitorEvent::CycleCompleted {
            checked: report.checked,
            live: report.live,
            notified: report.notified,
            timestamp: Utc::now(),
        });

        report
    }
}

#[async_trait]
impl CycleRunner for PollCycle {
    async fn run_cycle(&mut self) -> Result<CycleReport> {
        PollCycle::run_cycle(self).await
    }

    fn events(&self) -> Option<&MonitorEventBroadcaster> {
        Some(&self.events)
    }
}
