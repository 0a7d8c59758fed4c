//! Record types for the persisted stores.

mod place;
mod review;

pub use place::{sentinel, CompletionState, NaturalKey, PlaceDraft, PlaceRecord, KEYWORD_SEPARATOR};
pub use review::{ReviewKey, ReviewRecord, NO_REVIEW_TEXT};
