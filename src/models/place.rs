//! Entity (place) records.
//!
//! One row per unique physical place, keyed by the natural key
//! `(name, coordinates, address)`. Rows are created on first discovery and
//! only ever mutated in two ways afterwards: keyword merge and completion
//! updates. Descriptive fields keep whatever the first discovery extracted.

use serde::{Deserialize, Serialize};

/// Joiner for the serialized keyword set.
pub const KEYWORD_SEPARATOR: &str = "、";

/// Sentinel values written when the corresponding UI element is absent.
/// These are data values in the site's locale, not message strings.
pub mod sentinel {
    pub const NO_ADDRESS: &str = "無地址";
    pub const NO_COORDINATES: &str = "無經緯度";
    pub const NO_HOURS: &str = "無營業時間";
    pub const NO_WEBSITE: &str = "無官方網站";
    pub const NO_SHORT_DESCRIPTION: &str = "無簡述";
    pub const NO_LONG_DESCRIPTION: &str = "無詳細簡介";
    pub const NO_RATING: &str = "無星數";
    pub const NO_PRICE_TIER: &str = "無價位資訊";
}

/// Whether review harvesting for a place is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompletionState {
    #[default]
    #[serde(rename = "未完成")]
    NotDone,
    #[serde(rename = "已完成")]
    Done,
}

impl CompletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDone => "未完成",
            Self::Done => "已完成",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "未完成" => Some(Self::NotDone),
            "已完成" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Identity of a place independent of its allocated id.
///
/// Equality is exact string equality; no normalization or fuzzing. Two
/// discoveries matching on all three fields are the same place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub name: String,
    pub coordinates: String,
    pub address: String,
}

/// A persisted place row. Field order is the canonical column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Stable, keyword-namespaced identifier. Assigned exactly once.
    pub id: String,
    pub name: String,
    pub address: String,
    /// `"lat,lng"` or the no-coordinates sentinel.
    pub coordinates: String,
    pub hours: String,
    pub website: String,
    pub short_description: String,
    /// Sectioned text serialized as `Title：[item1, item2]` joined by `, `.
    pub long_description: String,
    /// Search term(s) plus extracted category tags, joined by `、`.
    pub keywords: String,
    pub rating: String,
    pub price_tier: String,
    /// `{id}.jpg` under the image directory, or empty when no image.
    pub image_filename: String,
    pub completion_state: CompletionState,
    pub completion_reason: String,
}

impl PlaceRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            name: self.name.clone(),
            coordinates: self.coordinates.clone(),
            address: self.address.clone(),
        }
    }

    /// Keyword set in stored order.
    pub fn keywords(&self) -> Vec<String> {
        self.keywords
            .split(KEYWORD_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Set-union merge of `incoming` into the keyword set, preserving stored
    /// order and appending new keywords in first-seen order. Returns true if
    /// anything was added.
    pub fn merge_keywords<I, S>(&mut self, incoming: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords = self.keywords();
        let mut changed = false;
        for kw in incoming {
            let kw = kw.as_ref();
            if kw.is_empty() {
                continue;
            }
            if !keywords.iter().any(|k| k == kw) {
                keywords.push(kw.to_string());
                changed = true;
            }
        }
        if changed {
            self.keywords = keywords.join(KEYWORD_SEPARATOR);
        }
        changed
    }
}

/// Extracted profile fields before identity assignment.
///
/// Every field is populated, with sentinels standing in for absent UI
/// elements; absence is expected and not an error.
#[derive(Debug, Clone)]
pub struct PlaceDraft {
    pub name: String,
    pub address: String,
    pub coordinates: String,
    pub hours: String,
    pub website: String,
    pub short_description: String,
    pub long_description: String,
    /// Category tags read off the detail surface; merged into keywords.
    pub category_tags: Vec<String>,
    pub rating: String,
    pub price_tier: String,
    /// Source URL of the primary image, if one was found.
    pub image_url: Option<String>,
}

impl PlaceDraft {
    /// A draft carrying only a name, all other fields at their sentinels.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: sentinel::NO_ADDRESS.to_string(),
            coordinates: sentinel::NO_COORDINATES.to_string(),
            hours: sentinel::NO_HOURS.to_string(),
            website: sentinel::NO_WEBSITE.to_string(),
            short_description: sentinel::NO_SHORT_DESCRIPTION.to_string(),
            long_description: sentinel::NO_LONG_DESCRIPTION.to_string(),
            category_tags: Vec::new(),
            rating: sentinel::NO_RATING.to_string(),
            price_tier: sentinel::NO_PRICE_TIER.to_string(),
            image_url: None,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            name: self.name.clone(),
            coordinates: self.coordinates.clone(),
            address: self.address.clone(),
        }
    }

    /// Materialize a new row under `id`, discovered via `keyword`.
    pub fn into_record(self, id: String, keyword: &str) -> PlaceRecord {
        let mut keywords: Vec<String> = Vec::new();
        if !keyword.is_empty() {
            keywords.push(keyword.to_string());
        }
        for tag in &self.category_tags {
            if !tag.is_empty() && !keywords.iter().any(|k| k == tag) {
                keywords.push(tag.clone());
            }
        }
        PlaceRecord {
            id,
            name: self.name,
            address: self.address,
            coordinates: self.coordinates,
            hours: self.hours,
            website: self.website,
            short_description: self.short_description,
            long_description: self.long_description,
            keywords: keywords.join(KEYWORD_SEPARATOR),
            rating: self.rating,
            price_tier: self.price_tier,
            image_filename: String::new(),
            completion_state: CompletionState::NotDone,
            completion_reason: String::new(),
        }
    }
}
