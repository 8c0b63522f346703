//! Durable per-channel session state.

mod store;

pub use store::StateStore;
