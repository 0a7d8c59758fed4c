//! Locators for the map search surface.
//!
//! Obfuscated class names churn when the site ships a new frontend build;
//! they are collected here so a breakage is a one-file fix. Everything is
//! expressed as CSS, including the lookups the original surface needed
//! XPath for (attribute-contains matches).

/// Scrollable results feed on the search surface.
pub const FEED: &str = "div[role=\"feed\"]";

/// One result card inside the feed.
pub const FEED_ITEM: &str = "div[role=\"feed\"] > div > div[jsaction]";

/// Anchors inside a result card; the place link is preferred by pattern.
pub const ITEM_ANCHOR: &str = "a";

/// Href substring identifying a place detail link.
pub const PLACE_LINK_PATTERN: &str = "/maps/place/";

/// "Update results when map moves" checkbox.
pub const UPDATE_RESULTS_CHECKBOX: &str = "button[role=\"checkbox\"]";

/// Reviews tab on a place detail page.
pub const REVIEWS_BUTTON: &str = "button[aria-label*=\"評論\"]";

/// Review sort control and its "newest" menu entry.
pub const SORT_BUTTON: &str = "button[aria-label=\"排序評論\"]";
pub const SORT_NEWEST_OPTION: &str = "div.fxNQSd[data-index=\"1\"]";

/// Shared scrollable panel (reviews and about both render into it).
pub const SCROLL_PANEL: &str = "div.m6QErb.DxyBCb.kA9KIf.dS8AEf.XiKgde";

/// One rendered review.
pub const REVIEW_ITEM: &str = "div.jftiEf";

/// "Show more" truncation control inside a review.
pub const REVIEW_EXPAND: &str = "button.w8nwRe.kyuRq[aria-label=\"顯示更多\"]";

pub const REVIEWER_NAME: &str = ".d4r55";
/// Star rating carrier; the numeric value sits in its aria-label.
pub const REVIEW_RATING: &str = ".kvMYJc";
pub const REVIEW_DATE: &str = ".rsqaWe";
pub const REVIEW_TEXT: &str = ".MyEned";
/// Optional category + sub-rating block under a review.
pub const REVIEW_TAGS: &str = "div.PBK6be";
/// Reviewer profile link; the target URL sits in data-href.
pub const REVIEWER_LINK: &str = "button[data-href]";

/// About tab on a place detail page.
pub const INTRO_BUTTON: &str = "button[aria-label*=\"簡介\"]";
/// Short marketing description at the top of the about panel.
pub const SHORT_DESCRIPTION: &str = "div.PbZDve span.HlvSq";
/// One section block inside the about panel.
pub const INTRO_BLOCK: &str = "div.iP2t7d";

pub const ADDRESS: &str = "div.Io6YTe.fontBodyMedium";
pub const RATING: &str = "div.F7nice span[aria-hidden=\"true\"]";
/// Price tier carrier; value in aria-label with a `價格: ` prefix.
pub const PRICE: &str = "span.mgr77e span[aria-label^=\"價格\"]";
/// Weekly hours carrier; aria-label holds the schedule text.
pub const HOURS: &str = "div[aria-label*=\"星期\"]";
pub const WEBSITE: &str = "a.CsEnBe[data-item-id=\"authority\"]";
pub const CATEGORY: &str = "button.DkEaL";
pub const PRIMARY_IMAGE: &str = "img[src*=\"googleusercontent.com\"]";
