//! Discovery of place links on the map search surface.
//!
//! Drives the keyword + geographic-cell search page, scrolls the result feed
//! until it stops growing, then pulls one detail link out of each result
//! card. Individual broken cards never abort the batch.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ScrollConfig;
use crate::driver::{Driver, Wait};
use crate::error::DriverResult;
use crate::scrape::scroll::GrowthProbe;
use crate::scrape::selectors;

/// Wait for the feed container itself; no feed means no results surface.
const FEED_WAIT: Duration = Duration::from_secs(10);

/// Best-effort wait for optional affordances.
const AFFORDANCE_WAIT: Duration = Duration::from_secs(5);

/// One search viewport: center coordinates plus zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCell {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
}

impl GeoCell {
    pub fn new(lat: f64, lng: f64, zoom: u8) -> Self {
        Self { lat, lng, zoom }
    }
}

/// Search URL for a keyword within a cell.
pub fn search_url(keyword: &str, cell: &GeoCell) -> String {
    format!(
        "https://www.google.com/maps/search/{}/@{},{},{}z",
        urlencoding::encode(keyword),
        cell.lat,
        cell.lng,
        cell.zoom
    )
}

/// Scroll the result feed to convergence and collect place detail links.
///
/// Returns links deduplicated with set semantics, in first-seen order —
/// the order the pipeline consumes them in.
pub async fn discover<D: Driver>(
    driver: &D,
    config: &ScrollConfig,
    keyword: &str,
    cell: &GeoCell,
) -> DriverResult<Vec<String>> {
    driver.navigate(&search_url(keyword, cell)).await?;

    // "Update results when map moves" keeps the feed in sync with the cell.
    // Optional affordance: absence is logged, never fatal.
    match driver
        .wait_until(Wait::Clickable(selectors::UPDATE_RESULTS_CHECKBOX), AFFORDANCE_WAIT)
        .await
    {
        Ok(checkbox) => {
            if let Err(e) = driver.click(&checkbox).await {
                debug!("update-results checkbox click failed: {e}");
            }
        }
        Err(e) => debug!("update-results checkbox not found: {e}"),
    }

    let feed = driver
        .wait_until(Wait::Presence(selectors::FEED), FEED_WAIT)
        .await?;

    // Growth is probed on height AND card count; the feed only counts as
    // drained when neither moves for the configured run of probes.
    let mut probe = GrowthProbe::new(config.no_growth_threshold);
    let mut scrolls = 0u32;
    while scrolls < config.max_scrolls {
        driver.scroll_to_bottom(&feed).await?;
        driver.pause(Duration::from_millis(config.pause_ms)).await;
        scrolls += 1;

        let height = driver.scroll_height(&feed).await?;
        let cards = driver.find_all(selectors::FEED_ITEM).await?.len();
        debug!(scrolls, height, cards, "feed probe");
        if probe.observe((height, cards)) {
            break;
        }
    }

    let items = driver.find_all(selectors::FEED_ITEM).await?;
    info!(keyword, cards = items.len(), scrolls, "feed converged");

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for item in &items {
        match item_link(driver, item).await {
            Ok(Some(href)) => {
                if seen.insert(href.clone()) {
                    links.push(href);
                }
            }
            Ok(None) => debug!("result card without anchor, skipped"),
            Err(e) => warn!("result card link extraction failed: {e}"),
        }
    }
    Ok(links)
}

/// Detail link of one result card: an anchor matching the place-link
/// pattern when present, otherwise the first anchor.
async fn item_link<D: Driver>(driver: &D, item: &D::Handle) -> DriverResult<Option<String>> {
    let anchors = driver.find_all_in(item, selectors::ITEM_ANCHOR).await?;
    let mut first = None;
    for anchor in &anchors {
        if let Some(href) = driver.read_attribute(anchor, "href").await? {
            if href.contains(selectors::PLACE_LINK_PATTERN) {
                return Ok(Some(href));
            }
            if first.is_none() {
                first = Some(href);
            }
        }
    }
    Ok(first)
}
