//! Review harvesting under dual quotas.
//!
//! Quotas are checked against recomputed store counters before the browser
//! is touched at all, then re-checked after every stored review so the loop
//! stops mid-batch the moment either ceiling is reached. Dedup is on
//! `(entity, reviewer, date-text)`; body text never participates in the key.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::{QuotaConfig, ReviewScrollConfig};
use crate::driver::{Driver, Wait};
use crate::error::DriverResult;
use crate::models::{CompletionState, ReviewKey, ReviewRecord, NO_REVIEW_TEXT};
use crate::scrape::scroll::GrowthProbe;
use crate::scrape::selectors;
use crate::store::{PlaceStore, ReviewStore};

const AFFORDANCE_WAIT: Duration = Duration::from_secs(10);
const SORT_MENU_WAIT: Duration = Duration::from_secs(2);

/// What one harvest attempt did.
#[derive(Debug, Default, Clone)]
pub struct HarvestOutcome {
    /// Reviews stored by this attempt.
    pub new_reviews: usize,
    /// Stored reviews that carried free text.
    pub new_text_reviews: usize,
    /// Completion reason persisted by this attempt, if any.
    pub completion: Option<String>,
}

/// Why the scroll loop stopped.
enum Stop {
    Quota(String),
    Converged,
    Ceiling,
}

/// Harvest reviews for one entity on the currently open detail page.
///
/// The primary review container failing to appear is fatal for this entity
/// only: the error propagates, nothing is marked complete, and the next run
/// retries. Every other UI affordance is best-effort.
pub async fn harvest<D: Driver>(
    driver: &D,
    places: &PlaceStore,
    reviews: &ReviewStore,
    quotas: &QuotaConfig,
    config: &ReviewScrollConfig,
    entity_id: &str,
    name: &str,
) -> anyhow::Result<HarvestOutcome> {
    let mut outcome = HarvestOutcome::default();

    // True current totals, recomputed from the store: a resumed run must
    // never trust anything cached by an earlier run.
    let mut counters = reviews.counters(entity_id)?;
    if let Some(reason) = quota_reason(quotas, counters.with_text, counters.total) {
        info!(entity_id, name, reason, "quota already met, skipping harvest");
        places.mark_completion(entity_id, CompletionState::Done, &reason)?;
        outcome.completion = Some(reason);
        return Ok(outcome);
    }

    open_review_panel(driver).await;
    sort_by_newest(driver).await;

    let container = driver
        .wait_until(
            Wait::Presence(selectors::SCROLL_PANEL),
            Duration::from_secs(config.container_timeout_secs),
        )
        .await?;

    let mut known: HashSet<ReviewKey> = reviews.keys_for(entity_id)?;
    let scrape_date = Local::now().format("%Y-%m-%d").to_string();
    let mut probe = GrowthProbe::new(config.no_growth_threshold);
    let mut processed = 0usize;
    let mut scrolls = 0u32;

    let stop = 'scroll: loop {
        if scrolls >= config.max_scrolls {
            break Stop::Ceiling;
        }
        driver.scroll_to_bottom(&container).await?;
        driver.pause(Duration::from_millis(config.pause_ms)).await;
        scrolls += 1;

        let rendered = driver.find_all(selectors::REVIEW_ITEM).await?;
        debug!(entity_id, scrolls, rendered = rendered.len(), "review probe");

        let batch_end = rendered.len().min(processed + config.batch_size);
        for element in rendered.get(processed..batch_end).unwrap_or(&[]) {
            expand_truncated(driver, element, config.expand_attempts).await;
            let record =
                match extract_review(driver, element, entity_id, &scrape_date).await {
                    Ok(Some(record)) => record,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(entity_id, "review extraction failed: {e}");
                        continue;
                    }
                };

            let key = record.key();
            if !known.insert(key) {
                debug!(
                    entity_id,
                    reviewer = %record.reviewer_name,
                    date = %record.review_date,
                    "duplicate review, skipped"
                );
                continue;
            }

            reviews.append(&record)?;
            counters.total += 1;
            outcome.new_reviews += 1;
            if record.has_text() {
                counters.with_text += 1;
                outcome.new_text_reviews += 1;
            }

            if let Some(reason) = quota_reason(quotas, counters.with_text, counters.total) {
                break 'scroll Stop::Quota(reason);
            }
        }
        processed = processed.max(batch_end);

        let height = driver.scroll_height(&container).await?;
        if probe.observe(height) {
            break Stop::Converged;
        }
    };

    match stop {
        Stop::Quota(reason) => {
            info!(entity_id, name, reason, "quota reached");
            places.mark_completion(entity_id, CompletionState::Done, &reason)?;
            outcome.completion = Some(reason);
        }
        Stop::Converged => {
            let reason = "已抓取所有可用評論".to_string();
            info!(entity_id, name, stored = outcome.new_reviews, "reviews drained");
            places.mark_completion(entity_id, CompletionState::Done, &reason)?;
            outcome.completion = Some(reason);
        }
        // The ceiling is a safety valve, not completion: the next run
        // resumes with the stored rows already deduplicated.
        Stop::Ceiling => {
            warn!(entity_id, scrolls, "scroll ceiling hit before convergence");
        }
    }

    Ok(outcome)
}

/// The reason string for whichever quota is met, if any. The text quota is
/// checked first and wins when both are met at once.
fn quota_reason(quotas: &QuotaConfig, with_text: usize, total: usize) -> Option<String> {
    if with_text >= quotas.text_quota {
        Some(format!("已達到{}則文字評論上限", quotas.text_quota))
    } else if total >= quotas.total_quota {
        Some(format!("已達到{}則評論上限", quotas.total_quota))
    } else {
        None
    }
}

/// Click the reviews tab. Best-effort: a failure is logged and the harvest
/// proceeds against whatever panel is open.
async fn open_review_panel<D: Driver>(driver: &D) {
    match driver
        .wait_until(Wait::Clickable(selectors::REVIEWS_BUTTON), AFFORDANCE_WAIT)
        .await
    {
        Ok(button) => {
            if let Err(e) = driver.click(&button).await {
                warn!("reviews tab click failed: {e}");
            }
        }
        Err(e) => warn!("reviews tab not found: {e}"),
    }
}

/// Switch the sort order to newest-first. Best-effort; the harvester assumes
/// but does not verify the resulting order.
async fn sort_by_newest<D: Driver>(driver: &D) {
    let button = match driver
        .wait_until(Wait::Clickable(selectors::SORT_BUTTON), AFFORDANCE_WAIT)
        .await
    {
        Ok(button) => button,
        Err(e) => {
            warn!("sort control not found: {e}");
            return;
        }
    };
    if let Err(e) = driver.click(&button).await {
        warn!("sort control click failed: {e}");
        return;
    }
    match driver
        .wait_until(Wait::Clickable(selectors::SORT_NEWEST_OPTION), SORT_MENU_WAIT)
        .await
    {
        Ok(option) => {
            if let Err(e) = driver.click(&option).await {
                warn!("newest-first option click failed: {e}");
            }
        }
        Err(e) => warn!("newest-first option not found: {e}"),
    }
}

/// Expand a "show more" truncation control. Long bodies may need more than
/// one click, so this retries until the control disappears or the attempt
/// cap is hit.
async fn expand_truncated<D: Driver>(driver: &D, element: &D::Handle, attempts: u32) {
    for _ in 0..attempts {
        let Ok(Some(button)) = driver.find_in(element, selectors::REVIEW_EXPAND).await else {
            return;
        };
        if driver.click(&button).await.is_err() {
            return;
        }
        driver.pause(Duration::from_millis(300)).await;
    }
}

/// Extract one rendered review. `Ok(None)` means the element lacks the
/// fields that make up the dedup key and cannot be stored.
async fn extract_review<D: Driver>(
    driver: &D,
    element: &D::Handle,
    entity_id: &str,
    scrape_date: &str,
) -> DriverResult<Option<ReviewRecord>> {
    let Some(name_el) = driver.find_in(element, selectors::REVIEWER_NAME).await? else {
        debug!("review without reviewer name, skipped");
        return Ok(None);
    };
    let reviewer_name = driver.read_text(&name_el).await?.trim().to_string();

    let Some(date_el) = driver.find_in(element, selectors::REVIEW_DATE).await? else {
        debug!("review without date text, skipped");
        return Ok(None);
    };
    let review_date = driver.read_text(&date_el).await?.trim().to_string();

    let rating = match driver.find_in(element, selectors::REVIEW_RATING).await? {
        Some(rating_el) => driver
            .read_attribute(&rating_el, "aria-label")
            .await?
            .map(|label| parse_rating(&label))
            .unwrap_or(0),
        None => 0,
    };

    let review_text = match driver.find_in(element, selectors::REVIEW_TEXT).await? {
        Some(text_el) => {
            let text = driver.read_text(&text_el).await?;
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                NO_REVIEW_TEXT.to_string()
            } else {
                text
            }
        }
        None => NO_REVIEW_TEXT.to_string(),
    };

    let structured_tags = match driver.find_in(element, selectors::REVIEW_TAGS).await? {
        Some(tags_el) => driver.read_text(&tags_el).await?.trim().to_string(),
        None => String::new(),
    };

    let reviewer_profile_url = match driver.find_in(element, selectors::REVIEWER_LINK).await? {
        Some(link_el) => driver
            .read_attribute(&link_el, "data-href")
            .await?
            .unwrap_or_default(),
        None => String::new(),
    };

    Ok(Some(ReviewRecord {
        entity_id: entity_id.to_string(),
        reviewer_name,
        rating,
        review_date,
        review_text,
        structured_tags,
        scrape_date: scrape_date.to_string(),
        reviewer_profile_url,
    }))
}

/// Digits out of an accessible rating label like `5 顆星`.
fn parse_rating(label: &str) -> u8 {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotaConfig;
    use crate::driver::mock::{MockDriver, MockElement};
    use crate::models::PlaceDraft;
    use crate::store::DataStore;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> DataStore {
        let paths = crate::config::PathConfig {
            data_dir: dir.path().to_path_buf(),
            image_dir: dir.path().join("img"),
        };
        DataStore::open(&paths).unwrap()
    }

    fn seed_place(store: &DataStore) -> String {
        store
            .places
            .find_or_create(PlaceDraft::bare("山上咖啡"), "咖啡廳")
            .unwrap()
            .id
    }

    fn review_el(reviewer: &str, date: &str, text: Option<&str>) -> MockElement {
        let mut el = MockElement::default()
            .child(selectors::REVIEWER_NAME, MockElement::with_text(reviewer))
            .child(
                selectors::REVIEW_RATING,
                MockElement::default().attr("aria-label", "5 顆星"),
            )
            .child(selectors::REVIEW_DATE, MockElement::with_text(date));
        if let Some(text) = text {
            el = el.child(selectors::REVIEW_TEXT, MockElement::with_text(text));
        }
        el
    }

    fn panel_driver(items: Vec<MockElement>) -> MockDriver {
        let driver = MockDriver::new();
        driver.put(selectors::SCROLL_PANEL, vec![MockElement::default()]);
        driver.put(selectors::REVIEW_ITEM, items);
        driver.set_heights(vec![500]);
        driver
    }

    fn stored_review(entity: &str, reviewer: &str, date: &str, text: &str) -> ReviewRecord {
        ReviewRecord {
            entity_id: entity.into(),
            reviewer_name: reviewer.into(),
            rating: 4,
            review_date: date.into(),
            review_text: text.into(),
            structured_tags: String::new(),
            scrape_date: "2026-08-30".into(),
            reviewer_profile_url: String::new(),
        }
    }

    #[tokio::test]
    async fn same_review_across_two_calls_is_stored_once() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);
        let quotas = QuotaConfig::default();
        let config = ReviewScrollConfig::default();

        let driver = panel_driver(vec![review_el("王小明", "2 週前", Some("好吃"))]);
        let first = harvest(&driver, &store.places, &store.reviews, &quotas, &config, &id, "山上咖啡")
            .await
            .unwrap();
        assert_eq!(first.new_reviews, 1);
        assert_eq!(first.new_text_reviews, 1);

        let driver = panel_driver(vec![review_el("王小明", "2 週前", Some("好吃"))]);
        let second = harvest(&driver, &store.places, &store.reviews, &quotas, &config, &id, "山上咖啡")
            .await
            .unwrap();
        assert_eq!(second.new_reviews, 0);
        assert_eq!(store.reviews.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn text_quota_reached_first_cites_the_text_quota() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);
        for i in 0..60 {
            store
                .reviews
                .append(&stored_review(&id, &format!("用戶{i}"), "1 週前", "好"))
                .unwrap();
        }

        let driver = MockDriver::new();
        let outcome = harvest(
            &driver,
            &store.places,
            &store.reviews,
            &QuotaConfig::default(),
            &ReviewScrollConfig::default(),
            &id,
            "山上咖啡",
        )
        .await
        .unwrap();

        let reason = outcome.completion.unwrap();
        assert!(reason.contains("文字評論"), "reason was {reason}");
        // Quota short-circuits before any browser interaction.
        assert!(driver.untouched());
        let record = store.places.get(&id).unwrap().unwrap();
        assert!(record.completion_state.is_done());
    }

    #[tokio::test]
    async fn total_quota_reached_first_cites_the_count_quota() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);
        for i in 0..160 {
            store
                .reviews
                .append(&stored_review(&id, &format!("用戶{i}"), "1 週前", NO_REVIEW_TEXT))
                .unwrap();
        }

        let driver = MockDriver::new();
        let outcome = harvest(
            &driver,
            &store.places,
            &store.reviews,
            &QuotaConfig::default(),
            &ReviewScrollConfig::default(),
            &id,
            "山上咖啡",
        )
        .await
        .unwrap();

        let reason = outcome.completion.unwrap();
        assert!(!reason.contains("文字評論"), "reason was {reason}");
        assert!(reason.contains("160"));
        assert!(driver.untouched());
    }

    #[tokio::test]
    async fn quota_stops_the_loop_mid_batch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);
        let quotas = QuotaConfig {
            text_quota: 1,
            total_quota: 160,
        };

        let driver = panel_driver(vec![
            review_el("甲", "1 週前", Some("第一則")),
            review_el("乙", "2 週前", Some("第二則")),
        ]);
        let outcome = harvest(
            &driver,
            &store.places,
            &store.reviews,
            &quotas,
            &ReviewScrollConfig::default(),
            &id,
            "山上咖啡",
        )
        .await
        .unwrap();

        assert_eq!(outcome.new_reviews, 1);
        assert!(outcome.completion.unwrap().contains("文字評論"));
        assert_eq!(store.reviews.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_container_is_fatal_and_marks_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);

        // No scroll panel anywhere on the page.
        let driver = MockDriver::new();
        driver.put(selectors::REVIEW_ITEM, vec![review_el("甲", "1 週前", None)]);

        let config = ReviewScrollConfig {
            container_timeout_secs: 0,
            ..Default::default()
        };
        let result = harvest(
            &driver,
            &store.places,
            &store.reviews,
            &QuotaConfig::default(),
            &config,
            &id,
            "山上咖啡",
        )
        .await;
        assert!(result.is_err());

        let record = store.places.get(&id).unwrap().unwrap();
        assert!(!record.completion_state.is_done());
    }

    #[tokio::test]
    async fn textless_reviews_store_the_sentinel_and_count_only_toward_total() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);

        let driver = panel_driver(vec![review_el("甲", "1 週前", None)]);
        let outcome = harvest(
            &driver,
            &store.places,
            &store.reviews,
            &QuotaConfig::default(),
            &ReviewScrollConfig::default(),
            &id,
            "山上咖啡",
        )
        .await
        .unwrap();

        assert_eq!(outcome.new_reviews, 1);
        assert_eq!(outcome.new_text_reviews, 0);
        let records = store.reviews.load().unwrap();
        assert_eq!(records[0].review_text, NO_REVIEW_TEXT);
        assert_eq!(records[0].rating, 5);
    }

    #[tokio::test]
    async fn convergence_marks_the_entity_done() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = seed_place(&store);

        let driver = panel_driver(vec![review_el("甲", "1 週前", Some("好吃"))]);
        let outcome = harvest(
            &driver,
            &store.places,
            &store.reviews,
            &QuotaConfig::default(),
            &ReviewScrollConfig::default(),
            &id,
            "山上咖啡",
        )
        .await
        .unwrap();

        assert_eq!(outcome.completion.as_deref(), Some("已抓取所有可用評論"));
        let record = store.places.get(&id).unwrap().unwrap();
        assert_eq!(record.completion_reason, "已抓取所有可用評論");
    }

    #[test]
    fn rating_digits_are_parsed_from_the_label() {
        assert_eq!(parse_rating("5 顆星"), 5);
        assert_eq!(parse_rating("評分：4"), 4);
        assert_eq!(parse_rating("無"), 0);
    }
}
