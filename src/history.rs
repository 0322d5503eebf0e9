//! BMI history management
//!
//! The history store owns the list of saved entries, newest first, and keeps
//! it mirrored to a single key in durable storage. The in-memory list is
//! always updated before the durable write, so a failed write leaves the two
//! diverged and is reported as a non-fatal [`BmiError::PersistenceWrite`].

use crate::error::BmiError;
use crate::storage::KeyValueStorage;
use crate::types::BmiEntry;
use serde::Serialize;
use tracing::{debug, warn};

/// Default storage key for the history blob
pub const DEFAULT_STORAGE_KEY: &str = "bmi-history";

/// Lifecycle of a history store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Ready,
}

/// Outcome of loading persisted history
#[derive(Debug, Default, Serialize)]
pub struct LoadReport {
    /// Entries kept after validation
    pub loaded: usize,
    /// Records rejected by validation
    pub discarded: usize,
    /// Why the blob as a whole could not be used, if it couldn't
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<BmiError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.discarded == 0 && self.error.is_none()
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<BmiError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// History store backed by a key-value storage
#[derive(Debug)]
pub struct HistoryStore<S: KeyValueStorage> {
    storage: S,
    key: String,
    entries: Vec<BmiEntry>,
    state: StoreState,
}

impl<S: KeyValueStorage> HistoryStore<S> {
    /// Create an unloaded store using the default key
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Create an unloaded store using a custom key
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            entries: Vec::new(),
            state: StoreState::Uninitialized,
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the backing storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load persisted history, replacing the in-memory list.
    ///
    /// Never fails: unreadable or malformed state yields an empty history
    /// and is described in the returned report.
    pub fn load(&mut self) -> LoadReport {
        self.state = StoreState::Ready;
        self.entries.clear();

        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no persisted history");
                return LoadReport::default();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read BMI history");
                return LoadReport {
                    error: Some(BmiError::PersistenceRead(e.to_string())),
                    ..Default::default()
                };
            }
        };

        let (entries, discarded) = match parse_entries(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to parse BMI history");
                return LoadReport {
                    error: Some(e),
                    ..Default::default()
                };
            }
        };

        if discarded > 0 {
            warn!(key = %self.key, discarded, "discarded invalid history records");
        }

        self.entries = entries;
        debug!(key = %self.key, loaded = self.entries.len(), "loaded BMI history");

        LoadReport {
            loaded: self.entries.len(),
            discarded,
            error: None,
        }
    }

    /// Insert an entry at the head and persist the full list.
    ///
    /// Entries that would be rejected on load are refused up front.
    pub fn append(&mut self, entry: BmiEntry) -> Result<(), BmiError> {
        self.ensure_ready()?;
        entry.validate().map_err(|field| {
            BmiError::InvalidInput(format!("entry {:?} has invalid {}", entry.id, field))
        })?;
        debug!(id = %entry.id, "appending history entry");
        self.entries.insert(0, entry);
        self.persist()
    }

    /// Remove the first entry with a matching id; no-op if none matches.
    ///
    /// Returns whether an entry was removed. The list is re-persisted either
    /// way.
    pub fn delete_by_id(&mut self, id: &str) -> Result<bool, BmiError> {
        self.ensure_ready()?;
        let removed = match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        };
        debug!(id, removed, "deleting history entry");
        self.persist()?;
        Ok(removed)
    }

    /// Empty the history and remove the persisted blob
    pub fn clear(&mut self) -> Result<(), BmiError> {
        self.ensure_ready()?;
        self.entries.clear();
        self.storage.remove(&self.key).map_err(|e| {
            warn!(key = %self.key, error = %e, "failed to clear BMI history");
            BmiError::PersistenceWrite(e.to_string())
        })
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[BmiEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&BmiEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Most recently inserted entry
    pub fn latest(&self) -> Option<&BmiEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the current list in the persisted format
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    fn ensure_ready(&self) -> Result<(), BmiError> {
        match self.state {
            StoreState::Ready => Ok(()),
            StoreState::Uninitialized => Err(BmiError::StoreNotReady),
        }
    }

    fn persist(&mut self) -> Result<(), BmiError> {
        let json = self.to_json()?;
        self.storage.set(&self.key, &json).map_err(|e| {
            warn!(key = %self.key, error = %e, "failed to persist BMI history");
            BmiError::PersistenceWrite(e.to_string())
        })
    }
}

/// Parse a persisted blob, validating each record on its own.
///
/// Fails only when the blob is not a JSON array. Returns the valid entries
/// in stored order plus the number of rejected records.
pub fn parse_entries(raw: &str) -> Result<(Vec<BmiEntry>, usize), BmiError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| BmiError::PersistenceRead(e.to_string()))?;

    let records = match value {
        serde_json::Value::Array(records) => records,
        other => {
            return Err(BmiError::PersistenceRead(format!(
                "expected an array of entries, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut entries = Vec::with_capacity(records.len());
    let mut discarded = 0;

    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<BmiEntry>(record) {
            Ok(entry) => match entry.validate() {
                Ok(()) => entries.push(entry),
                Err(field) => {
                    debug!(index, field, "rejecting history record");
                    discarded += 1;
                }
            },
            Err(e) => {
                debug!(index, error = %e, "rejecting history record");
                discarded += 1;
            }
        }
    }

    Ok((entries, discarded))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
