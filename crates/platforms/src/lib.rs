//! Platform bindings used by `live-notify`.
//!
//! Only the two bulk Helix lookups needed for liveness polling are bound here:
//! resolving logins to user ids and listing the active streams of a set of ids.

pub mod client;
pub mod error;
pub mod helix;

pub use client::{DEFAULT_UA, create_client_builder, install_rustls_provider};
pub use error::PlatformError;
pub use helix::{HelixClient, HelixConfig, HelixStream, HelixUser};
