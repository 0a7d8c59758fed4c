//! One-way migration from the legacy store layouts to the canonical schema.
//!
//! The legacy system left two incompatible layouts behind: place rows with a
//! `營業狀態` (business status) column and review rows with a single
//! `評價` content column. Rather than supporting both at read time, the
//! canonical schema is fixed and this module converts old files explicitly.
//! A header that matches neither a legacy layout nor the canonical one is
//! refused — silently guessing at columns is how stores get corrupted.

use std::path::Path;

use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::models::{CompletionState, PlaceRecord, ReviewRecord};
use crate::store::DataStore;

/// Legacy place header carrying the business-status column.
const LEGACY_PLACE_HEADER: &[&str] = &[
    "編號", "店名", "地址", "經緯度", "營業時間", "官方網站", "店家簡述", "簡介",
    "搜尋關鍵字", "星數", "價位", "營業狀態", "圖片檔案名稱", "是否已完成",
];

/// Later legacy place header, already without business status.
const LEGACY_PLACE_HEADER_NO_STATUS: &[&str] = &[
    "編號", "店名", "地址", "經緯度", "營業時間", "官方網站", "店家簡述", "簡介",
    "搜尋關鍵字", "星數", "價位", "圖片檔案名稱", "是否已完成",
];

/// Legacy review header with a single content column.
const LEGACY_REVIEW_HEADER: &[&str] =
    &["店家編號", "用戶", "評分", "日期", "評價", "評論抓取日期"];

const CANONICAL_PLACE_HEADER: &[&str] = &[
    "id", "name", "address", "coordinates", "hours", "website", "short_description",
    "long_description", "keywords", "rating", "price_tier", "image_filename",
    "completion_state", "completion_reason",
];

const CANONICAL_REVIEW_HEADER: &[&str] = &[
    "entity_id", "reviewer_name", "rating", "review_date", "review_text",
    "structured_tags", "scrape_date", "reviewer_profile_url",
];

/// What a migration pass did.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationReport {
    pub places_migrated: usize,
    pub reviews_migrated: usize,
}

/// Migrate both store files in place. Files already in the canonical layout
/// (or absent) are left untouched.
pub fn migrate_legacy_stores(store: &DataStore) -> StoreResult<MigrationReport> {
    let mut report = MigrationReport::default();

    if let Some(places) = read_legacy_places(store.places.path())? {
        report.places_migrated = places.len();
        store.places.rewrite(&places)?;
        info!(rows = report.places_migrated, "place store migrated");
    }
    if let Some(reviews) = read_legacy_reviews(store.reviews.path())? {
        report.reviews_migrated = reviews.len();
        super::rewrite_atomic(store.reviews.path(), &reviews)?;
        info!(rows = report.reviews_migrated, "review store migrated");
    }

    Ok(report)
}

/// Returns `Some(rows)` when the file carries a legacy layout, `None` when it
/// is absent or already canonical.
fn read_legacy_places(path: &Path) -> StoreResult<Option<Vec<PlaceRecord>>> {
    let Some((header, rows)) = read_raw(path)? else {
        return Ok(None);
    };

    let (with_status, layout): (bool, &[&str]) = if header == LEGACY_PLACE_HEADER {
        (true, LEGACY_PLACE_HEADER)
    } else if header == LEGACY_PLACE_HEADER_NO_STATUS {
        (false, LEGACY_PLACE_HEADER_NO_STATUS)
    } else if header == CANONICAL_PLACE_HEADER {
        return Ok(None);
    } else {
        return Err(StoreError::UnknownSchema(header.join(",")));
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != layout.len() {
            return Err(StoreError::UnknownSchema(format!(
                "legacy place row has {} columns, expected {}",
                row.len(),
                layout.len()
            )));
        }
        // Column offsets shift by one past the dropped business status.
        let shift = usize::from(with_status);
        records.push(PlaceRecord {
            id: row[0].clone(),
            name: row[1].clone(),
            address: row[2].clone(),
            coordinates: row[3].clone(),
            hours: row[4].clone(),
            website: row[5].clone(),
            short_description: row[6].clone(),
            long_description: row[7].clone(),
            keywords: row[8].clone(),
            rating: row[9].clone(),
            price_tier: row[10].clone(),
            image_filename: row[10 + shift + 1].clone(),
            completion_state: CompletionState::from_str(&row[11 + shift + 1])
                .unwrap_or(CompletionState::NotDone),
            completion_reason: String::new(),
        });
    }
    Ok(Some(records))
}

fn read_legacy_reviews(path: &Path) -> StoreResult<Option<Vec<ReviewRecord>>> {
    let Some((header, rows)) = read_raw(path)? else {
        return Ok(None);
    };

    if header == CANONICAL_REVIEW_HEADER {
        return Ok(None);
    }
    if header != LEGACY_REVIEW_HEADER {
        return Err(StoreError::UnknownSchema(header.join(",")));
    }

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != LEGACY_REVIEW_HEADER.len() {
            return Err(StoreError::UnknownSchema(format!(
                "legacy review row has {} columns, expected {}",
                row.len(),
                LEGACY_REVIEW_HEADER.len()
            )));
        }
        records.push(ReviewRecord {
            entity_id: row[0].clone(),
            reviewer_name: row[1].clone(),
            rating: row[2].parse().unwrap_or(0),
            review_date: row[3].clone(),
            review_text: row[4].clone(),
            structured_tags: String::new(),
            scrape_date: row[5].clone(),
            reviewer_profile_url: String::new(),
        });
    }
    Ok(Some(records))
}

/// Read header + rows as plain strings, stripping a UTF-8 BOM the legacy
/// writer put on the first header cell.
fn read_raw(path: &Path) -> StoreResult<Option<(Vec<String>, Vec<Vec<String>>)>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows.push(row.iter().map(str::to_string).collect());
    }
    Ok(Some((header, rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathConfig;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> DataStore {
        let paths = PathConfig {
            data_dir: dir.path().to_path_buf(),
            image_dir: dir.path().join("img"),
        };
        DataStore::open(&paths).unwrap()
    }

    #[test]
    fn legacy_place_file_with_status_migrates() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let legacy = "\u{feff}編號,店名,地址,經緯度,營業時間,官方網站,店家簡述,簡介,搜尋關鍵字,星數,價位,營業狀態,圖片檔案名稱,是否已完成\n\
            28700001,山上咖啡,山路1號,\"24.1,121.0\",無營業時間,無官方網站,無簡述,無詳細簡介,咖啡廳,4.5,$$,營業中,28700001.jpg,已完成\n";
        std::fs::write(store.places.path(), legacy).unwrap();

        let report = migrate_legacy_stores(&store).unwrap();
        assert_eq!(report.places_migrated, 1);

        let records = store.places.load().unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id, "28700001");
        assert_eq!(r.coordinates, "24.1,121.0");
        assert_eq!(r.image_filename, "28700001.jpg");
        assert_eq!(r.completion_state, CompletionState::Done);
        // Business status is dropped, reason starts empty.
        assert_eq!(r.completion_reason, "");
    }

    #[test]
    fn legacy_review_file_migrates_with_empty_new_columns() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let legacy = "店家編號,用戶,評分,日期,評價,評論抓取日期\n\
            28700001,王小明,5,2 週前,好吃,2025-01-01\n";
        std::fs::write(store.reviews.path(), legacy).unwrap();

        let report = migrate_legacy_stores(&store).unwrap();
        assert_eq!(report.reviews_migrated, 1);

        let records = store.reviews.load().unwrap();
        assert_eq!(records[0].rating, 5);
        assert_eq!(records[0].structured_tags, "");
        assert_eq!(records[0].reviewer_profile_url, "");
    }

    #[test]
    fn canonical_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let draft = crate::models::PlaceDraft::bare("山上咖啡");
        store.places.find_or_create(draft, "咖啡廳").unwrap();
        let before = std::fs::read_to_string(store.places.path()).unwrap();

        let report = migrate_legacy_stores(&store).unwrap();
        assert_eq!(report.places_migrated, 0);
        assert_eq!(std::fs::read_to_string(store.places.path()).unwrap(), before);
    }

    #[test]
    fn unknown_header_is_refused() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        std::fs::write(store.places.path(), "foo,bar\n1,2\n").unwrap();
        let err = migrate_legacy_stores(&store).unwrap_err();
        assert!(matches!(err, StoreError::UnknownSchema(_)));
    }
}
