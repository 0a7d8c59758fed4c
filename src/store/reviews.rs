//! Review store: append-only log with recomputed quota counters.
//!
//! Rows are only ever appended. Quota counters are never cached — each
//! harvest attempt recounts from the file so a resumed run sees true totals
//! no matter where the previous run stopped.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;
use crate::models::{ReviewKey, ReviewRecord};

/// Per-entity review volume, recomputed from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaCounters {
    /// All stored reviews for the entity.
    pub total: usize,
    /// Stored reviews carrying free text.
    pub with_text: usize,
}

pub struct ReviewStore {
    path: PathBuf,
}

impl ReviewStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored rows; an absent file is an empty store.
    pub fn load(&self) -> StoreResult<Vec<ReviewRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    /// Append one row, writing the header first when the file is new.
    pub fn append(&self, record: &ReviewRecord) -> StoreResult<()> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    /// Recount stored volume for one entity.
    pub fn counters(&self, entity_id: &str) -> StoreResult<QuotaCounters> {
        let mut counters = QuotaCounters::default();
        for record in self.load()? {
            if record.entity_id == entity_id {
                counters.total += 1;
                if record.has_text() {
                    counters.with_text += 1;
                }
            }
        }
        Ok(counters)
    }

    /// Dedup keys of everything stored for one entity.
    pub fn keys_for(&self, entity_id: &str) -> StoreResult<HashSet<ReviewKey>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| r.entity_id == entity_id)
            .map(|r| r.key())
            .collect())
    }
}
