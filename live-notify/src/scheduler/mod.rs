//! Cycle scheduling, retry policy enforcement and shutdown.

mod service;
mod signal;

pub use service::{CycleRunner, Scheduler, SchedulerConfig, SchedulerState};
pub use signal::shutdown_signal;
