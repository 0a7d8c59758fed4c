//! Scoped driver session.
//!
//! The driver is owned by a `Session` that every component borrows, and the
//! session is torn down explicitly on every exit path. Nothing in the
//! pipeline holds driver state at module level.

use tracing::warn;

use crate::driver::Driver;
use crate::error::DriverResult;

pub struct Session<D: Driver> {
    driver: D,
}

impl<D: Driver> Session<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Shut the driver down. Consumes the session so a closed driver cannot
    /// be reused.
    pub async fn close(self) -> DriverResult<()> {
        self.driver.shutdown().await
    }

    /// Best-effort close for error paths where the original failure is the
    /// one worth reporting.
    pub async fn close_quietly(self) {
        if let Err(e) = self.driver.shutdown().await {
            warn!("driver shutdown failed: {e}");
        }
    }
}
