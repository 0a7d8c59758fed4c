//! Place store: identity allocation, dedup index, completion tracking.
//!
//! The store is a header-row CSV with no in-place update primitive, so every
//! mutation of an existing row (keyword merge, completion flag) reads the
//! full file and rewrites it atomically. Identity state is derived by
//! scanning the stored ids at each allocation; there is no counter file, so
//! the allocator is durable for free.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::models::{CompletionState, PlaceDraft, PlaceRecord};

/// Zero-pad width of the numeric id suffix.
const ID_SUFFIX_WIDTH: usize = 5;

/// Outcome of routing a draft through the dedup index.
#[derive(Debug, Clone)]
pub struct Disposition {
    /// Allocated or reused stable id.
    pub id: String,
    /// True when no stored row matched the natural key.
    pub is_new: bool,
    /// Stored completion flag of the matched row (false for new rows).
    pub is_completed: bool,
}

impl Disposition {
    pub fn is_duplicate(&self) -> bool {
        !self.is_new
    }
}

pub struct PlaceStore {
    path: PathBuf,
}

impl PlaceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored rows; an absent file is an empty store.
    pub fn load(&self) -> StoreResult<Vec<PlaceRecord>> {
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
    pub fn append(&self, record: &PlaceRecord) -> StoreResult<()> {
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

    /// Replace the whole store atomically (temp file + rename).
    pub fn rewrite(&self, records: &[PlaceRecord]) -> StoreResult<()> {
        super::rewrite_atomic(&self.path, records)
    }

    /// Look up a row by id.
    pub fn get(&self, id: &str) -> StoreResult<Option<PlaceRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    /// Next available id under the keyword's namespace.
    ///
    /// Any read error degrades to a fresh `namespace + 00001` rather than
    /// propagating; a duplicated id is recoverable, an aborted run is not.
    pub fn next_id(&self, keyword: Option<&str>) -> String {
        match self.load() {
            Ok(records) => allocate_id(&records, keyword),
            Err(e) => {
                warn!("place store unreadable during id allocation: {e}");
                allocate_id(&[], keyword)
            }
        }
    }

    /// Route a draft through the dedup index.
    ///
    /// An exact `(name, coordinates, address)` match reuses the stored id and
    /// merges `keyword` plus the draft's category tags into the keyword set
    /// (full rewrite when anything changed). No match allocates a fresh id
    /// and appends the draft as a new row.
    pub fn find_or_create(&self, draft: PlaceDraft, keyword: &str) -> StoreResult<Disposition> {
        let key = draft.natural_key();
        let mut records = self.load()?;

        if let Some(existing) = records.iter_mut().find(|r| r.natural_key() == key) {
            let id = existing.id.clone();
            let is_completed = existing.completion_state.is_done();
            let mut incoming = vec![keyword.to_string()];
            incoming.extend(draft.category_tags.iter().cloned());
            let changed = existing.merge_keywords(incoming);
            info!(
                id = %id,
                name = %key.name,
                merged = changed,
                "duplicate place, keywords merged"
            );
            if changed {
                self.rewrite(&records)?;
            }
            return Ok(Disposition {
                id,
                is_new: false,
                is_completed,
            });
        }

        let id = allocate_id(&records, Some(keyword).filter(|k| !k.is_empty()));
        let record = draft.into_record(id.clone(), keyword);
        self.append(&record)?;
        info!(id = %id, name = %record.name, "new place stored");
        Ok(Disposition {
            id,
            is_new: true,
            is_completed: false,
        })
    }

    /// Persist the completion flag and reason for `id`; every other row
    /// passes through unchanged.
    pub fn mark_completion(
        &self,
        id: &str,
        state: CompletionState,
        reason: &str,
    ) -> StoreResult<()> {
        let mut records = self.load()?;
        let mut touched = false;
        for record in records.iter_mut() {
            if record.id == id {
                record.completion_state = state;
                record.completion_reason = reason.to_string();
                touched = true;
            }
        }
        if touched {
            self.rewrite(&records)?;
            info!(id, state = state.as_str(), reason, "completion updated");
        } else {
            warn!(id, "completion update matched no stored place");
        }
        Ok(())
    }

    /// Record the downloaded image filename for `id`.
    pub fn set_image_filename(&self, id: &str, filename: &str) -> StoreResult<()> {
        let mut records = self.load()?;
        let mut touched = false;
        for record in records.iter_mut() {
            if record.id == id && record.image_filename != filename {
                record.image_filename = filename.to_string();
                touched = true;
            }
        }
        if touched {
            self.rewrite(&records)?;
            debug!(id, filename, "image filename recorded");
        }
        Ok(())
    }
}

/// Derive the namespace code for a keyword: the first 3 decimal digits of
/// the code point of each considered character (in practice, the first one).
fn namespace_code(keyword: &str) -> String {
    keyword
        .chars()
        .take(1)
        .map(|c| {
            let digits = (c as u32).to_string();
            digits[..digits.len().min(3)].to_string()
        })
        .collect()
}

/// Pure allocation over an already-loaded record set.
fn allocate_id(records: &[PlaceRecord], keyword: Option<&str>) -> String {
    let code = keyword.map(namespace_code).unwrap_or_default();

    if code.is_empty() {
        let max = records
            .iter()
            .filter_map(|r| r.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        return format!("{:0width$}", max + 1, width = ID_SUFFIX_WIDTH);
    }

    let max = records
        .iter()
        .filter_map(|r| r.id.strip_prefix(&code))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{code}{:0width$}", max + 1, width = ID_SUFFIX_WIDTH)
}
