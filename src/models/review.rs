//! Review records.
//!
//! One row per `(entity, reviewer, review-date-text)`; that triple is the
//! dedup key. Rows are created once and never mutated or deleted — two
//! extractions with the same key but different body text are the same review
//! and the stored row wins.

use serde::{Deserialize, Serialize};

/// Sentinel stored when a review carries no free-text body.
pub const NO_REVIEW_TEXT: &str = "無評論";

/// Dedup key for a stored review.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    pub entity_id: String,
    pub reviewer_name: String,
    pub review_date: String,
}

/// A persisted review row. Field order is the canonical column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub entity_id: String,
    pub reviewer_name: String,
    /// Star rating, digits parsed out of the accessible label.
    pub rating: u8,
    /// Site-native relative or absolute date text, not normalized.
    pub review_date: String,
    /// Free-text body, or the no-text sentinel.
    pub review_text: String,
    /// Optional category + sub-rating text; empty when absent.
    pub structured_tags: String,
    /// ISO date of the harvesting run that stored this row.
    pub scrape_date: String,
    /// Reviewer profile link; empty when absent.
    pub reviewer_profile_url: String,
}

impl ReviewRecord {
    pub fn key(&self) -> ReviewKey {
        ReviewKey {
            entity_id: self.entity_id.clone(),
            reviewer_name: self.reviewer_name.clone(),
            review_date: self.review_date.clone(),
        }
    }

    /// Whether this review counts toward the with-text quota.
    pub fn has_text(&self) -> bool {
        !self.review_text.is_empty() && self.review_text != NO_REVIEW_TEXT
    }
}
