//! Scraping pipeline: discovery → dedup routing → profile → reviews.
//!
//! One driver session, one entity at a time, in discovery order. A failure
//! while processing one entity is logged and never aborts the rest of the
//! run; resume safety comes from the stores, not from retries here.

pub mod discovery;
pub mod profile;
pub mod reviews;
pub mod scroll;
pub mod selectors;
pub mod session;

use std::collections::HashSet;

use tracing::{error, info};

use crate::config::ScrapeConfig;
use crate::driver::Driver;
use crate::services::images;
use crate::store::DataStore;

pub use discovery::GeoCell;
pub use session::Session;

/// Aggregate result of one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Unique place links discovered across all cells.
    pub discovered: usize,
    /// Entities processed to completion of their per-entity flow.
    pub processed: usize,
    /// Entities seen for the first time this run.
    pub new_places: usize,
    /// Entities skipped because harvesting was already complete.
    pub skipped_completed: usize,
    /// Entities whose processing failed; the next run retries them.
    pub failed: usize,
    /// Reviews stored this run.
    pub reviews_stored: usize,
}

struct ProcessOutcome {
    is_new: bool,
    skipped_completed: bool,
    new_reviews: usize,
}

/// Run discovery over every cell, then process each discovered entity.
pub async fn run<D: Driver>(
    driver: &D,
    store: &DataStore,
    config: &ScrapeConfig,
    keyword: &str,
    cells: &[GeoCell],
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let http = reqwest::Client::new();

    // Union of links across cells, kept in first-discovered order; that
    // order is the processing order.
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for cell in cells {
        let discovered = discovery::discover(driver, &config.discovery, keyword, cell).await?;
        for link in discovered {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }
    summary.discovered = links.len();
    info!(keyword, links = links.len(), cells = cells.len(), "discovery finished");

    for link in &links {
        match process_place(driver, store, config, &http, keyword, link).await {
            Ok(outcome) => {
                summary.processed += 1;
                summary.reviews_stored += outcome.new_reviews;
                if outcome.is_new {
                    summary.new_places += 1;
                }
                if outcome.skipped_completed {
                    summary.skipped_completed += 1;
                }
            }
            Err(e) => {
                // One broken entity never takes down the run.
                error!(%link, "entity processing failed: {e:#}");
                summary.failed += 1;
            }
        }
    }

    info!(
        keyword,
        processed = summary.processed,
        new_places = summary.new_places,
        reviews = summary.reviews_stored,
        failed = summary.failed,
        "run finished"
    );
    Ok(summary)
}

async fn process_place<D: Driver>(
    driver: &D,
    store: &DataStore,
    config: &ScrapeConfig,
    http: &reqwest::Client,
    keyword: &str,
    link: &str,
) -> anyhow::Result<ProcessOutcome> {
    driver.navigate(link).await?;

    let title = driver.title().await?;
    let name = title
        .split(" - ")
        .next()
        .unwrap_or(title.as_str())
        .trim()
        .to_string();

    let draft = profile::extract(driver, &config.intro, &name).await;
    let image_url = draft.image_url.clone();
    let disposition = store.places.find_or_create(draft, keyword)?;

    if disposition.is_new {
        if let Some(url) = image_url {
            if let Some(filename) =
                images::download_primary_image(http, &url, &config.paths.image_dir, &disposition.id)
                    .await
            {
                store.places.set_image_filename(&disposition.id, &filename)?;
            }
        }
    }

    if disposition.is_completed {
        info!(id = %disposition.id, name, "already complete, skipping");
        return Ok(ProcessOutcome {
            is_new: false,
            skipped_completed: true,
            new_reviews: 0,
        });
    }
    if disposition.is_duplicate() {
        info!(id = %disposition.id, name, "incomplete duplicate, resuming harvest");
    }

    let outcome = reviews::harvest(
        driver,
        &store.places,
        &store.reviews,
        &config.quotas,
        &config.reviews,
        &disposition.id,
        &name,
    )
    .await?;

    Ok(ProcessOutcome {
        is_new: disposition.is_new,
        skipped_completed: false,
        new_reviews: outcome.new_reviews,
    })
}
