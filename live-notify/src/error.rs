//! Application-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Platform error: {0}")]
    Platform(#[from] platforms_helix::PlatformError),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Persistence error while {op} {}: {source}", path.display())]
    Persistence {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Giving up after {attempts} consecutive failed poll cycles: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("{0}")]
    Other(String),
}

/// Coarse classification used for recovery decisions and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed configuration. Fatal at startup.
    Config,
    /// Network failure, rate limiting or server-side failure. Recovered by
    /// treating the cycle as having no data.
    TransientRemote,
    /// State file could not be read or written.
    Persistence,
    /// Too many consecutive failed cycles.
    FatalExhaustion,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Process exit code for an error of this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Config => 2,
            ErrorKind::FatalExhaustion => 3,
            ErrorKind::TransientRemote | ErrorKind::Persistence | ErrorKind::Internal => 1,
        }
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Wrap an IO error with the operation and path that produced it.
    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Persistence {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Config,
            Error::Platform(e) if e.is_transient() => ErrorKind::TransientRemote,
            Error::Platform(_) => ErrorKind::Internal,
            Error::Notification(_) => ErrorKind::TransientRemote,
            Error::Persistence { .. } | Error::Serialization(_) => ErrorKind::Persistence,
            Error::RetriesExhausted { .. } => ErrorKind::FatalExhaustion,
            Error::Other(_) => ErrorKind::Internal,
        }
    }
}
