//! Selection state: the current period selection and its persistence
//!
//! The selection is kept in memory and written through to a key-value store on every
//! change. Persistence is best-effort: a failing store is logged once and the state
//! carries on in memory for the rest of the session.
//!
//! Stored keys hold plain strings:
//! - `selectedDate`: `YYYY-MM-DD` (day, week) or `YYYY-MM` (month)
//! - `selectedPeriod`: `day` | `week` | `month`
//! - `selectedCategory`: `all` or an intent label
//!
//! A separate, session-scoped store carries the `sessionId` marker. When the marker
//! does not match the current session the stored date is stale and the anchor resets
//! to today, keeping the stored granularity and category.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::models::{CategoryFilter, PeriodSelection};
use crate::period::{self, DateRange, Granularity};

pub const KEY_DATE: &str = "selectedDate";
pub const KEY_PERIOD: &str = "selectedPeriod";
pub const KEY_CATEGORY: &str = "selectedCategory";
pub const KEY_SESSION: &str = "sessionId";

/// Synchronous string key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&mut self, key: &str) -> Result<(), CoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        (**self).remove(key)
    }
}

/// In-process store, lost when the process exits
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file
///
/// A corrupt file reads as empty and is replaced on the next write. Writes go to a
/// sibling temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self, key: &str) -> Result<BTreeMap<String, String>, CoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(CoreError::storage(key, e)),
        };

        match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
            Ok(map) => Ok(map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k, s)),
                    _ => None,
                })
                .collect()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt state file, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, key: &str, map: &BTreeMap<String, String>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::storage(key, e))?;
        }
        let content = serde_json::to_string_pretty(map).map_err(|e| CoreError::storage(key, e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| CoreError::storage(key, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CoreError::storage(key, e))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.read_map(key)?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut map = self.read_map(key)?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(key, &map)
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        let mut map = self.read_map(key)?;
        if map.remove(key).is_some() {
            self.write_map(key, &map)?;
        }
        Ok(())
    }
}

/// String stored under `selectedDate` for a selection
pub fn stored_date(selection: &PeriodSelection) -> String {
    match selection.granularity {
        Granularity::Month => period::anchor_key(selection.anchor, Granularity::Month),
        Granularity::Day | Granularity::Week => selection.anchor.format("%Y-%m-%d").to_string(),
    }
}

/// Read a previously saved selection
///
/// `Ok(None)` when nothing usable is stored: missing keys and malformed values are
/// both treated as absent. Only a failing store is an error.
pub fn load_selection(store: &dyn KeyValueStore) -> Result<Option<PeriodSelection>, CoreError> {
    let (Some(date), Some(granularity)) = (store.get(KEY_DATE)?, store.get(KEY_PERIOD)?) else {
        return Ok(None);
    };
    let category = store.get(KEY_CATEGORY)?.unwrap_or_else(|| "all".to_string());

    match PeriodSelection::parse(&date, &granularity, &category) {
        Ok(selection) => Ok(Some(selection)),
        Err(e) => {
            warn!(%date, %granularity, %category, error = %e, "Ignoring malformed saved selection");
            Ok(None)
        }
    }
}

/// Write a selection under the fixed keys
///
/// Writes the period, then the date, then the category, stopping at the first
/// failure. Earlier keys keep their new values.
pub fn save_selection(
    store: &mut dyn KeyValueStore,
    selection: &PeriodSelection,
) -> Result<(), CoreError> {
    store.set(KEY_PERIOD, selection.granularity.as_str())?;
    store.set(KEY_DATE, &stored_date(selection))?;
    store.set(KEY_CATEGORY, &selection.category.to_string())
}

/// Selection held for one dashboard session, written through to `S`
#[derive(Debug)]
pub struct SelectionState<S: KeyValueStore> {
    selection: PeriodSelection,
    store: S,
    /// Cleared after the first failed write
    persisting: bool,
    fresh_session: bool,
}

impl<S: KeyValueStore> SelectionState<S> {
    /// Rehydrate from storage, or default to (today, day, all)
    ///
    /// On a fresh session the anchor moves to `today` while the stored granularity and
    /// category are kept, and the session marker is written.
    pub fn load(
        store: S,
        session: &mut dyn KeyValueStore,
        session_id: &str,
        today: NaiveDate,
    ) -> Self {
        let mut persisting = true;
        let stored = match load_selection(&store) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Selection storage unavailable, keeping selection in memory");
                persisting = false;
                None
            }
        };

        let fresh_session = match session.get(KEY_SESSION) {
            Ok(marker) => marker.as_deref() != Some(session_id),
            Err(e) => {
                warn!(error = %e, "Session marker unreadable, treating as new session");
                true
            }
        };

        if fresh_session {
            if let Err(e) = session.set(KEY_SESSION, session_id) {
                warn!(error = %e, "Could not write session marker");
            }
        }

        let selection = match stored {
            Some(stored) if fresh_session => {
                debug!(stale = %stored.anchor, %today, "New session, resetting anchor date");
                stored.with_anchor(today)
            }
            Some(stored) => stored,
            None => PeriodSelection::default_for(today),
        };

        let mut state = Self {
            selection,
            store,
            persisting,
            fresh_session,
        };
        if state.fresh_session {
            state.persist();
        }
        info!(
            date = %state.selection.anchor_key(),
            period = %state.selection.granularity,
            category = %state.selection.category,
            fresh_session,
            "Selection loaded"
        );
        state
    }

    pub fn selection(&self) -> &PeriodSelection {
        &self.selection
    }

    /// Range of the current selection
    pub fn range(&self) -> Result<DateRange, CoreError> {
        period::compute_range(&self.selection)
    }

    pub fn is_fresh_session(&self) -> bool {
        self.fresh_session
    }

    /// False once a write has failed this session
    pub fn is_persisting(&self) -> bool {
        self.persisting
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn set_date(&mut self, anchor: NaiveDate) {
        self.update(self.selection.with_anchor(anchor));
    }

    /// Parse a date in the form expected by the current granularity
    pub fn set_date_str(&mut self, text: &str) -> Result<(), CoreError> {
        let anchor = period::parse_anchor(text, self.selection.granularity)?;
        self.set_date(anchor);
        Ok(())
    }

    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.update(self.selection.with_granularity(granularity));
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.update(self.selection.with_category(category));
    }

    /// Back to (today, day, all)
    pub fn reset(&mut self, today: NaiveDate) {
        self.update(PeriodSelection::default_for(today));
    }

    fn update(&mut self, selection: PeriodSelection) {
        self.selection = selection;
        self.persist();
    }

    fn persist(&mut self) {
        if !self.persisting {
            return;
        }
        if let Err(e) = save_selection(&mut self.store, &self.selection) {
            warn!(error = %e, "Failed to persist selection, continuing in memory");
            self.persisting = false;
        }
    }
}
