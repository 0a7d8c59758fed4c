//! Profile extraction from a place detail page.
//!
//! Every field is an independent best-effort probe: a missing element leaves
//! the sentinel in place and the extraction never fails. The about panel's
//! sectioned text is the only multi-step part — scroll to convergence,
//! collect blocks, format as `Title：[item1, item2]`.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::config::ScrollConfig;
use crate::driver::{Driver, Wait};
use crate::models::{sentinel, PlaceDraft};
use crate::scrape::scroll::GrowthProbe;
use crate::scrape::selectors;

const AFFORDANCE_WAIT: Duration = Duration::from_secs(5);

/// Coordinates embedded in a place detail URL.
fn coords_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!3d([\d.]+)!4d([\d.]+)").expect("valid regex"))
}

/// Extract all profile fields from the currently open detail page.
pub async fn extract<D: Driver>(driver: &D, intro: &ScrollConfig, name: &str) -> PlaceDraft {
    let mut draft = PlaceDraft::bare(name);

    if let Some(address) = probe_text(driver, selectors::ADDRESS).await {
        draft.address = address;
    }
    if let Some(rating) = probe_text(driver, selectors::RATING).await {
        draft.rating = rating;
    }
    if let Some(price) = probe_attribute(driver, selectors::PRICE, "aria-label").await {
        draft.price_tier = price
            .strip_prefix("價格: ")
            .unwrap_or(&price)
            .to_string();
    }
    if let Some(hours) = probe_attribute(driver, selectors::HOURS, "aria-label").await {
        // The label appends hints after the schedule; keep the first clause.
        draft.hours = hours.split(". ").next().unwrap_or(&hours).to_string();
    }
    if let Some(website) = probe_attribute(driver, selectors::WEBSITE, "href").await {
        draft.website = website;
    }
    if let Some(coordinates) = coordinates_from_url(driver).await {
        draft.coordinates = coordinates;
    }
    if let Some(src) = probe_attribute(driver, selectors::PRIMARY_IMAGE, "src").await {
        draft.image_url = Some(src);
    }
    draft.category_tags = probe_all_text(driver, selectors::CATEGORY).await;

    extract_intro(driver, intro, &mut draft).await;

    draft
}

/// Coordinates from the detail page's own URL, as `"lat,lng"`.
async fn coordinates_from_url<D: Driver>(driver: &D) -> Option<String> {
    let url = driver.current_url().await.ok()?;
    let caps = coords_regex().captures(&url)?;
    Some(format!("{},{}", &caps[1], &caps[2]))
}

/// Open the about panel and fill short/long descriptions. All failures
/// leave the sentinels in place.
async fn extract_intro<D: Driver>(driver: &D, config: &ScrollConfig, draft: &mut PlaceDraft) {
    let button = match driver
        .wait_until(Wait::Clickable(selectors::INTRO_BUTTON), AFFORDANCE_WAIT)
        .await
    {
        Ok(button) => button,
        Err(e) => {
            debug!(name = %draft.name, "about tab not found: {e}");
            return;
        }
    };
    if let Err(e) = driver.click(&button).await {
        debug!("about tab click failed: {e}");
        return;
    }

    if let Some(brief) = probe_text(driver, selectors::SHORT_DESCRIPTION).await {
        draft.short_description = brief;
    }

    let panel = match driver
        .wait_until(Wait::Presence(selectors::SCROLL_PANEL), AFFORDANCE_WAIT)
        .await
    {
        Ok(panel) => panel,
        Err(e) => {
            debug!(name = %draft.name, "about panel not found: {e}");
            return;
        }
    };

    let mut probe = GrowthProbe::new(config.no_growth_threshold);
    let mut scrolls = 0u32;
    while scrolls < config.max_scrolls {
        if driver.scroll_to_bottom(&panel).await.is_err() {
            break;
        }
        driver.pause(Duration::from_millis(config.pause_ms)).await;
        scrolls += 1;
        match driver.scroll_height(&panel).await {
            Ok(height) if probe.observe(height) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    let blocks = probe_all_text(driver, selectors::INTRO_BLOCK).await;
    if let Some(formatted) = format_intro(&blocks) {
        draft.long_description = formatted;
    }
}

/// Format about-panel blocks into `Title：[item1, item2]` sections joined
/// by `, `. The first non-empty line of a block is its title, remaining
/// non-empty lines are items, de-duplicated in first-seen order. Blocks
/// without body items are dropped.
pub fn format_intro(blocks: &[String]) -> Option<String> {
    let mut sections = Vec::new();
    for block in blocks {
        let cleaned = strip_icon_glyphs(block);
        let mut lines = cleaned
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let Some(title) = lines.next() else {
            continue;
        };
        let mut items: Vec<&str> = Vec::new();
        for item in lines {
            if !items.contains(&item) {
                items.push(item);
            }
        }
        if items.is_empty() {
            continue;
        }
        sections.push(format!("{title}：[{}]", items.join(", ")));
    }
    if sections.is_empty() {
        None
    } else {
        Some(sections.join(", "))
    }
}

/// The panel embeds icon-font glyphs from the private use area in its text.
fn strip_icon_glyphs(text: &str) -> String {
    text.chars()
        .filter(|c| !('\u{e000}'..='\u{f8ff}').contains(c))
        .collect()
}

async fn probe_text<D: Driver>(driver: &D, selector: &str) -> Option<String> {
    let handle = driver.find(selector).await.ok()??;
    let text = driver.read_text(&handle).await.ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

async fn probe_attribute<D: Driver>(driver: &D, selector: &str, name: &str) -> Option<String> {
    let handle = driver.find(selector).await.ok()??;
    driver.read_attribute(&handle, name).await.ok()?
}

async fn probe_all_text<D: Driver>(driver: &D, selector: &str) -> Vec<String> {
    let Ok(handles) = driver.find_all(selector).await else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for handle in &handles {
        if let Ok(text) = driver.read_text(handle).await {
            let text = text.trim();
            if !text.is_empty() {
                out.push(text.to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockDriver, MockElement};

    #[tokio::test]
    async fn empty_page_yields_sentinels_without_error() {
        let driver = MockDriver::new();
        driver.set_url("https://www.google.com/maps/place/somewhere");

        let draft = extract(&driver, &ScrollConfig::default(), "山上咖啡").await;
        assert_eq!(draft.name, "山上咖啡");
        assert_eq!(draft.website, "無官方網站");
        assert_eq!(draft.address, "無地址");
        assert_eq!(draft.coordinates, "無經緯度");
        assert_eq!(draft.long_description, "無詳細簡介");
        assert_eq!(draft.rating, sentinel::NO_RATING);
    }

    #[tokio::test]
    async fn fields_come_from_their_probes() {
        let driver = MockDriver::new();
        driver.set_url("https://www.google.com/maps/place/x/@24.8,121.0,17z/data=!3d24.8496199!4d121.0237044");
        driver.put(selectors::ADDRESS, vec![MockElement::with_text("山路1號")]);
        driver.put(selectors::RATING, vec![MockElement::with_text("4.5")]);
        driver.put(
            selectors::WEBSITE,
            vec![MockElement::default().attr("href", "https://example.tw")],
        );
        driver.put(
            selectors::PRICE,
            vec![MockElement::default().attr("aria-label", "價格: $$")],
        );
        driver.put(selectors::CATEGORY, vec![MockElement::with_text("咖啡廳")]);

        let draft = extract(&driver, &ScrollConfig::default(), "山上咖啡").await;
        assert_eq!(draft.address, "山路1號");
        assert_eq!(draft.rating, "4.5");
        assert_eq!(draft.website, "https://example.tw");
        assert_eq!(draft.price_tier, "$$");
        assert_eq!(draft.coordinates, "24.8496199,121.0237044");
        assert_eq!(draft.category_tags, vec!["咖啡廳"]);
    }

    #[test]
    fn intro_sections_format_with_item_dedup() {
        let blocks = vec![
            "服務項目\n外帶\n內用\n外帶".to_string(),
            "無障礙程度\n".to_string(),
            "氣氛\n悠閒".to_string(),
        ];
        assert_eq!(
            format_intro(&blocks).unwrap(),
            "服務項目：[外帶, 內用], 氣氛：[悠閒]"
        );
    }

    #[test]
    fn intro_icon_glyphs_are_stripped() {
        let blocks = vec!["服務項目\n\u{e5ca}外帶".to_string()];
        assert_eq!(format_intro(&blocks).unwrap(), "服務項目：[外帶]");
    }

    #[test]
    fn empty_blocks_yield_no_description() {
        assert_eq!(format_intro(&[]), None);
        assert_eq!(format_intro(&["只有標題".to_string()]), None);
    }
}
