//! Persisted tabular stores.
//!
//! Two CSV files are the pipeline's source of truth: the place store (one row
//! per unique place, merged in full rewrites) and the review store (strictly
//! append-only). Every writer either appends or rewrites the whole file
//! through a temp file + atomic rename, so an interrupted run never leaves a
//! half-written store behind. Single-process only; there is no file locking.

mod migrate;
mod places;
mod reviews;

pub use migrate::{migrate_legacy_stores, MigrationReport};
pub use places::{Disposition, PlaceStore};
pub use reviews::{QuotaCounters, ReviewStore};

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::PathConfig;
use crate::error::{StoreError, StoreResult};

/// File name of the place store inside the data directory.
pub const PLACES_FILE: &str = "places.csv";
/// File name of the review store inside the data directory.
pub const REVIEWS_FILE: &str = "reviews.csv";

/// Both stores, rooted in one data directory.
pub struct DataStore {
    pub places: PlaceStore,
    pub reviews: ReviewStore,
    data_dir: PathBuf,
}

impl DataStore {
    /// Open the stores under `paths.data_dir`, creating the directory if
    /// needed. Files themselves are created lazily on first append.
    pub fn open(paths: &PathConfig) -> StoreResult<Self> {
        fs::create_dir_all(&paths.data_dir)?;
        Ok(Self {
            places: PlaceStore::new(paths.data_dir.join(PLACES_FILE)),
            reviews: ReviewStore::new(paths.data_dir.join(REVIEWS_FILE)),
            data_dir: paths.data_dir.clone(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Replace a store file atomically: serialize into a temp file next to it,
/// fsync, then rename over the original.
pub(crate) fn rewrite_atomic<T: Serialize>(path: &Path, records: &[T]) -> StoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Rename(e.error))?;
    Ok(())
}
