//! Domain types shared by the monitor, the state store and the dispatcher.

pub mod retry_policy;
pub mod session;

pub use retry_policy::BackoffPolicy;
pub use session::{
    Broadcast, DEFAULT_CATEGORY, DEFAULT_TITLE, StreamSessionState, channel_key, fold_observation,
};
