//! Liveness monitoring.
//!
//! - [`PlatformClient`] abstracts the two bulk platform lookups
//! - [`PollCycle`] runs one resolve / fetch / fold / notify / commit pass
//! - [`MonitorEvent`]s report what each cycle observed

mod events;
mod platform;
mod service;

pub use events::{MonitorEvent, MonitorEventBroadcaster};
pub use platform::{PlatformClient, PlatformUser};
pub use service::{CycleReport, PollCycle, PollCycleConfig};
