//! Error types for consent store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::events::EventKind;

/// Boxed error returned by observer callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for consent store operations.
#[derive(Debug, Error)]
pub enum ConsentError {
    /// Store options failed validation.
    #[error("invalid store options")]
    InvalidOptions {
        /// Option that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Reading a configuration file failed.
    #[error("failed to read configuration file")]
    ConfigIo {
        /// Path of the configuration file.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// A configuration file did not contain valid JSON.
    #[error("failed to parse configuration file")]
    ConfigParse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Source parse error.
        source: serde_json::Error,
    },
    /// The backing cookie jar rejected a write.
    #[error("cookie jar operation failed")]
    Jar {
        /// Operation identifier.
        operation: &'static str,
        /// Source jar error.
        source: JarError,
    },
    /// An observer callback failed; delivery to later observers was skipped.
    #[error("observer for {event} failed")]
    Observer {
        /// Event being delivered when the observer failed.
        event: EventKind,
        /// Error returned by the observer.
        source: BoxError,
    },
}

/// Errors raised by cookie jar backends.
#[derive(Debug, Error)]
pub enum JarError {
    /// The underlying document or storage is not reachable.
    #[error("cookie storage unavailable: {detail}")]
    Unavailable {
        /// Backend-specific detail.
        detail: String,
    },
    /// Loading a persisted jar snapshot failed.
    #[error("failed to load cookie jar from {}", .path.display())]
    Load {
        /// Source path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Persisting the jar snapshot failed.
    #[error("failed to persist cookie jar to {}", .path.display())]
    Persist {
        /// Destination path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Encoding or decoding the jar snapshot failed.
    #[error("cookie jar snapshot is invalid")]
    Snapshot {
        /// Source serialization error.
        source: serde_json::Error,
    },
}

/// Convenience alias for consent store results.
pub type ConsentResult<T> = Result<T, ConsentError>;

/// Convenience alias for cookie jar results.
pub type JarResult<T> = Result<T, JarError>;
