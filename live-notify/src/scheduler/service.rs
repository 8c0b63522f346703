//! Scheduler loop: fixed interval on success, exponential backoff on failure.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::BackoffPolicy;
use crate::monitor::{CycleReport, MonitorEvent, MonitorEventBroadcaster};
use crate::{Error, Result};

/// Something the scheduler can run once per tick.
#[async_trait]
pub trait CycleRunner: Send {
    async fn run_cycle(&mut self) -> Result<CycleReport>;

    /// Where the scheduler publishes cycle failures, if anywhere.
    fn events(&self) -> Option<&MonitorEventBroadcaster> {
        None
    }
}

/// Where the scheduler loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Running a cycle or waiting out the poll interval.
    Running,
    /// Waiting before retry `retry` after consecutive failures.
    Backoff { retry: u32 },
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub backoff: BackoffPolicy,
}

/// Drives a [`CycleRunner`] until cancelled or out of retries.
///
/// Cycles never overlap. Cancellation is observed between cycles and during
/// sleeps, never in the middle of a cycle.
pub struct Scheduler<R> {
    runner: R,
    config: SchedulerConfig,
    state: SchedulerState,
    consecutive_failures: u32,
}

impl<R: CycleRunner> Scheduler<R> {
    pub fn new(runner: R, config: SchedulerConfig) -> Self {
        Self {
            runner,
            config,
            state: SchedulerState::Running,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run until `token` is cancelled (`Ok`) or the retry ceiling is reached
    /// ([`Error::RetriesExhausted`]).
    pub async fn run(&mut self, token: CancellationToken) -> Result<()> {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_retries = self.config.backoff.max_retries,
            "Scheduler started"
        );

        loop {
            if token.is_cancelled() {
                self.stop();
                return Ok(());
            }

            self.state = SchedulerState::Running;
            let delay = match self.runner.run_cycle().await {
                Ok(report) => {
                    if self.consecutive_failures > 0 {
                        info!(
                            after_failures = self.consecutive_failures,
                            "Poll cycle recovered"
                        );
                    }
                    self.consecutive_failures = 0;
                    debug!(?report, "Cycle finished");
                    self.config.poll_interval
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    let attempts = self.consecutive_failures;
                    error!(
                        error = %e,
                        consecutive_failures = attempts,
                        "Poll cycle failed"
                    );
                    if let Some(events) = self.runner.events() {
                        events.publish(MonitorEvent::CycleFailed {
                            error: e.to_string(),
                            consecutive_failures: attempts,
                            timestamp: Utc::now(),
                        });
                    }

                    if self.config.backoff.is_exhausted(attempts) {
                        error!(attempts, "Maximum retries reached, stopping");
                        self.state = SchedulerState::Stopped;
                        return Err(Error::RetriesExhausted {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }

                    self.state = SchedulerState::Backoff { retry: attempts };
                    let delay = self.config.backoff.delay_for_retry(attempts);
                    warn!(
                        retry = attempts,
                        delay_secs = delay.as_secs_f64(),
                        "Backing off before next cycle"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = token.cancelled() => {
                    self.stop();
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn stop(&mut self) {
        info!("Scheduler received cancellation signal");
        self.state = SchedulerState::Stopped;
    }
}
