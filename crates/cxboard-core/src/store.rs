//! Record store: the immutable set of call records every view reads from
//!
//! Records live in an `Arc<[CallRecord]>` so clones are cheap and nothing can
//! mutate the set once built.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CoreError, LoadError, LoadReport};
use crate::models::{CallId, CallRecord, RawCallRecord};

/// Call records shipped with the dashboard
const BUILTIN_RECORDS: &str = include_str!("data/calls.json");

static BUILTIN: Lazy<RecordStore> = Lazy::new(|| {
    let raw: Vec<Value> = match serde_json::from_str(BUILTIN_RECORDS) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Built-in call records unreadable, starting empty");
            Vec::new()
        }
    };
    let (store, report) = RecordStore::from_values(raw);
    for error in &report.errors {
        warn!(source = %error.source, "Built-in record skipped: {}", error.message);
    }
    store
});

/// Immutable, ordered collection of call records with unique ids
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Arc<[CallRecord]>,
    by_id: Arc<HashMap<CallId, usize>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            by_id: Arc::new(HashMap::new()),
        }
    }
}

impl RecordStore {
    /// Build a store, rejecting duplicate ids
    pub fn new(records: Vec<CallRecord>) -> Result<Self, CoreError> {
        let mut by_id = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if by_id.insert(record.id.clone(), idx).is_some() {
                return Err(CoreError::DuplicateRecordId {
                    id: record.id.to_string(),
                });
            }
        }
        Ok(Self {
            records: Arc::from(records),
            by_id: Arc::new(by_id),
        })
    }

    /// The built-in dataset
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Load records from a JSON array file
    ///
    /// Entries that fail to parse are skipped and listed in the report. Only an
    /// unreadable file or a document that is not a JSON array is an error.
    pub fn load_from_file(path: &Path) -> Result<(Self, LoadReport), CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Vec<Value> =
            serde_json::from_str(&content).map_err(|source| CoreError::JsonParse {
                path: path.to_path_buf(),
                message: "expected a JSON array of call records".to_string(),
                source,
            })?;

        let (store, report) = Self::from_values(raw);
        info!(
            path = %path.display(),
            loaded = report.records_loaded,
            skipped = report.records_skipped,
            "Loaded call records"
        );
        Ok((store, report))
    }

    /// Build from untyped JSON entries, skipping the ones that do not validate
    pub fn from_values(values: Vec<Value>) -> (Self, LoadReport) {
        let mut report = LoadReport::new();
        let mut records: Vec<CallRecord> = Vec::with_capacity(values.len());
        let mut by_id: HashMap<CallId, usize> = HashMap::with_capacity(values.len());

        for (position, value) in values.into_iter().enumerate() {
            let source = format!("record #{}", position + 1);

            let parsed = serde_json::from_value::<RawCallRecord>(value)
                .map_err(|e| LoadError::warning(&source, format!("Malformed record: {}", e)))
                .and_then(|raw| {
                    CallRecord::try_from(raw).map_err(|e| LoadError::from_core_error(&source, &e))
                });

            let record = match parsed {
                Ok(record) => record,
                Err(error) => {
                    warn!(%source, "Skipping call record: {}", error.message);
                    report.records_skipped += 1;
                    report.add_error(error);
                    continue;
                }
            };

            if by_id.contains_key(&record.id) {
                let error = CoreError::DuplicateRecordId {
                    id: record.id.to_string(),
                };
                warn!(%source, "Skipping call record: {}", error);
                report.records_skipped += 1;
                report.add_error(LoadError::from_core_error(&source, &error));
                continue;
            }

            by_id.insert(record.id.clone(), records.len());
            records.push(record);
        }

        report.records_loaded = records.len();
        debug!(
            loaded = report.records_loaded,
            skipped = report.records_skipped,
            "Built record store"
        );

        let store = Self {
            records: Arc::from(records),
            by_id: Arc::new(by_id),
        };
        (store, report)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, CallRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&CallRecord> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    /// Earliest and latest call dates, if any
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date()).min()?;
        let last = self.records.iter().map(|r| r.date()).max()?;
        Some((first, last))
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a CallRecord;
    type IntoIter = std::slice::Iter<'a, CallRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Intent;
    use serde_json::json;
    use std::io::Write;

    fn raw(id: &str, duration: &str, date: &str) -> Value {
        json!({
            "id": id,
            "caller": "Test Caller",
            "agent": "AI Agent 1",
            "duration": duration,
            "intent": "Balance Enquiry",
            "audio": "available",
            "transcript": "Balance check.",
            "date": date,
        })
    }

    #[test]
    fn test_builtin_dataset_is_complete() {
        let store = RecordStore::builtin();
        assert_eq!(store.len(), 50);

        let first = store.get("1").unwrap();
        assert_eq!(first.caller, "John Smith");
        assert_eq!(first.duration_seconds(), 154);
        assert_eq!(first.intent, Intent::FraudReporting);

        // The source data lacked the space in this timestamp
        let late = store.get("27").unwrap();
        assert_eq!(late.timestamp_display(), "2025-10-24 11:30");
    }

    #[test]
    fn test_builtin_date_span() {
        let (first, last) = RecordStore::builtin().date_span().unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 10, 19).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 10, 24).unwrap());
    }

    #[test]
    fn test_new_rejects_duplicate_ids() {
        let record: CallRecord = serde_json::from_value(raw("1", "1:00", "2025-10-23 09:00")).unwrap();
        let result = RecordStore::new(vec![record.clone(), record]);
        assert!(matches!(result, Err(CoreError::DuplicateRecordId { .. })));
    }

    #[test]
    fn test_from_values_skips_bad_entries() {
        let values = vec![
            raw("a", "1:00", "2025-10-23 09:00"),
            raw("b", "1:7", "2025-10-23 09:00"),
            raw("c", "1:00", "2025-10-2309:00"),
            json!({"id": "d"}),
            raw("a", "2:00", "2025-10-23 10:00"),
            raw("e", "3:00", "2025-10-23 11:00"),
        ];

        let (store, report) = RecordStore::from_values(values);
        assert_eq!(store.len(), 2);
        assert_eq!(report.records_loaded, 2);
        assert_eq!(report.records_skipped, 4);
        assert_eq!(report.errors.len(), 4);
        assert_eq!(store.get("a").unwrap().duration_seconds(), 60);
        assert!(store.get("b").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let values = json!([raw("x", "2:00", "2025-11-01 08:00")]);
        write!(file, "{}", values).unwrap();

        let (store, report) = RecordStore::load_from_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_load_from_file_not_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"id\": 1}}").unwrap();

        let result = RecordStore::load_from_file(file.path());
        assert!(matches!(result, Err(CoreError::JsonParse { .. })));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = RecordStore::load_from_file(Path::new("/nonexistent/calls.json"));
        assert!(matches!(result, Err(CoreError::FileRead { .. })));
    }
}
