//! CDP-backed driver over chromiumoxide.
//!
//! One launched (headless) Chrome, one page, one logical control thread.
//! Waits are bounded polls against the page; element lookups that fail are
//! reported as absence, which the engines treat as expected.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Driver, Wait};
use crate::config::BrowserConfig;
use crate::error::{DriverError, DriverResult};

/// Poll interval for bounded waits.
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Common Chrome executable locations, checked before `which`.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

pub struct ChromeDriver {
    browser: Mutex<Browser>,
    page: Page,
}

impl ChromeDriver {
    /// Launch Chrome and open the session's single page.
    pub async fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let chrome_path = find_chrome()?;
        info!(path = %chrome_path.display(), headless = config.headless, "launching browser");

        let mut builder =
            chromiumoxide::BrowserConfig::builder().chrome_executable(chrome_path);
        if !config.headless {
            builder = builder.with_head();
        }
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--window-size=800,600");
        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch browser")?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
        })
    }

    fn protocol(e: impl std::fmt::Display) -> DriverError {
        DriverError::Protocol(e.to_string())
    }
}

fn find_chrome() -> anyhow::Result<PathBuf> {
    for path in CHROME_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }
    for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }
    Err(anyhow::anyhow!(
        "Chrome/Chromium not found; install it or pass chrome_args with an explicit binary"
    ))
}

#[async_trait]
impl Driver for ChromeDriver {
    type Handle = Arc<Element>;

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!(url, "navigate");
        self.page.goto(url).await.map_err(Self::protocol)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(Self::protocol)?;
        Ok(())
    }

    async fn find(&self, selector: &str) -> DriverResult<Option<Self::Handle>> {
        match self.page.find_element(selector).await {
            Ok(el) => Ok(Some(Arc::new(el))),
            Err(_) => Ok(None),
        }
    }

    async fn find_all(&self, selector: &str) -> DriverResult<Vec<Self::Handle>> {
        match self.page.find_elements(selector).await {
            Ok(els) => Ok(els.into_iter().map(Arc::new).collect()),
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn find_in(
        &self,
        scope: &Self::Handle,
        selector: &str,
    ) -> DriverResult<Option<Self::Handle>> {
        match scope.find_element(selector).await {
            Ok(el) => Ok(Some(Arc::new(el))),
            Err(_) => Ok(None),
        }
    }

    async fn find_all_in(
        &self,
        scope: &Self::Handle,
        selector: &str,
    ) -> DriverResult<Vec<Self::Handle>> {
        match scope.find_elements(selector).await {
            Ok(els) => Ok(els.into_iter().map(Arc::new).collect()),
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn wait_until(&self, wait: Wait<'_>, timeout: Duration) -> DriverResult<Self::Handle> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.find(wait.selector()).await? {
                return Ok(el);
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout(wait.selector().to_string(), timeout));
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    async fn scroll_to_bottom(&self, container: &Self::Handle) -> DriverResult<()> {
        container
            .call_js_fn("function() { this.scrollTop = this.scrollHeight; }", false)
            .await
            .map_err(Self::protocol)?;
        Ok(())
    }

    async fn scroll_height(&self, container: &Self::Handle) -> DriverResult<i64> {
        let ret = container
            .call_js_fn("function() { return this.scrollHeight; }", false)
            .await
            .map_err(Self::protocol)?;
        Ok(ret
            .result
            .value
            .and_then(|v| v.as_i64())
            .unwrap_or_default())
    }

    async fn read_attribute(
        &self,
        handle: &Self::Handle,
        name: &str,
    ) -> DriverResult<Option<String>> {
        handle.attribute(name).await.map_err(Self::protocol)
    }

    async fn read_text(&self, handle: &Self::Handle) -> DriverResult<String> {
        Ok(handle
            .inner_text()
            .await
            .map_err(Self::protocol)?
            .unwrap_or_default())
    }

    async fn click(&self, handle: &Self::Handle) -> DriverResult<()> {
        handle.click().await.map_err(Self::protocol)?;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(Self::protocol)?
            .unwrap_or_default())
    }

    async fn title(&self) -> DriverResult<String> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(Self::protocol)?
            .unwrap_or_default())
    }

    async fn shutdown(&self) -> DriverResult<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("browser close failed: {e}");
        }
        let _ = browser.wait().await;
        Ok(())
    }
}
