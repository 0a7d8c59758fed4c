//! Error taxonomy for the harvesting pipeline.
//!
//! Library errors are typed; the CLI layer wraps them in `anyhow`. The split
//! mirrors how the pipeline treats failures: element absence is expected and
//! handled with sentinels at the call site, timeouts are fatal only for the
//! entity whose primary container never appeared, and store I/O degrades to
//! safe defaults where the contract says so.

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by an automation driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A wait condition was not met within its timeout. Plain lookup misses
    /// are not errors; drivers report those as `Ok(None)`.
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    /// The underlying automation transport failed.
    #[error("driver protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout,
        }
    }
}

/// Failures in the persisted tabular stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed store row: {0}")]
    Csv(#[from] csv::Error),

    #[error("unrecognized store header: {0}")]
    UnknownSchema(String),

    #[error("failed to replace store file: {0}")]
    Rename(#[source] std::io::Error),
}

/// Convenience alias for driver-facing results.
pub type DriverResult<T> = Result<T, DriverError>;

/// Convenience alias for store-facing results.
pub type StoreResult<T> = Result<T, StoreError>;
