//! Abstract automation-driver interface.
//!
//! The pipeline never talks to a browser library directly; it is generic
//! over this capability set, which is the whole surface the engines need:
//! navigation, element lookup (optionally scoped to a parent element),
//! bounded waits, container scroll/height probes, attribute/text reads and
//! clicks. The CDP implementation lives behind the `browser` feature; tests
//! run against a scripted driver.

#[cfg(feature = "browser")]
pub mod chrome;
#[cfg(test)]
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverResult;

#[cfg(feature = "browser")]
pub use chrome::ChromeDriver;

/// A condition to wait for. CSS selectors only; the original surface's
/// XPath lookups all have CSS equivalents.
#[derive(Debug, Clone, Copy)]
pub enum Wait<'a> {
    /// The selector matches at least one element.
    Presence(&'a str),
    /// The selector matches an element ready to receive a click. Drivers
    /// without an interactability signal may treat this as presence; click
    /// failures stay fault-tolerant at the call site either way.
    Clickable(&'a str),
}

impl Wait<'_> {
    pub fn selector(&self) -> &str {
        match self {
            Wait::Presence(s) | Wait::Clickable(s) => s,
        }
    }
}

/// One browser-automation session driving one logical current page.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opaque element handle. Cheap to clone; valid while the page is live.
    type Handle: Clone + Send + Sync;

    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// First match on the current page, or `None`.
    async fn find(&self, selector: &str) -> DriverResult<Option<Self::Handle>>;

    /// All current matches on the page, document order.
    async fn find_all(&self, selector: &str) -> DriverResult<Vec<Self::Handle>>;

    /// First match inside `scope`, or `None`.
    async fn find_in(
        &self,
        scope: &Self::Handle,
        selector: &str,
    ) -> DriverResult<Option<Self::Handle>>;

    /// All matches inside `scope`, document order.
    async fn find_all_in(
        &self,
        scope: &Self::Handle,
        selector: &str,
    ) -> DriverResult<Vec<Self::Handle>>;

    /// Block until the condition holds, with `DriverError::Timeout` when it
    /// does not within `timeout`.
    async fn wait_until(&self, wait: Wait<'_>, timeout: Duration) -> DriverResult<Self::Handle>;

    /// Command a scrollable container to its current bottom.
    async fn scroll_to_bottom(&self, container: &Self::Handle) -> DriverResult<()>;

    /// Content height of a scrollable container, the growth probe used for
    /// convergence detection.
    async fn scroll_height(&self, container: &Self::Handle) -> DriverResult<i64>;

    async fn read_attribute(
        &self,
        handle: &Self::Handle,
        name: &str,
    ) -> DriverResult<Option<String>>;

    async fn read_text(&self, handle: &Self::Handle) -> DriverResult<String>;

    async fn click(&self, handle: &Self::Handle) -> DriverResult<()>;

    async fn current_url(&self) -> DriverResult<String>;

    async fn title(&self) -> DriverResult<String>;

    /// Cooperative pause between scroll and probe. Scripted drivers skip it.
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Tear the session down. Called once on all exit paths.
    async fn shutdown(&self) -> DriverResult<()> {
        Ok(())
    }
}
