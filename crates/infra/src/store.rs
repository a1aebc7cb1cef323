//! Persistence boundary for ledger snapshots.
//!
//! A store holds exactly one snapshot (one named slot). Loading distinguishes
//! "nothing saved" (`Ok(None)`) from "something saved but unusable"
//! (`StoreError::Corrupt`); the latter is never replaced behind the caller's
//! back.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use uuid::Uuid;

use singil_ledger::{LedgerState, seed_ledger};

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored ledger is corrupt: {0}")]
    Corrupt(String),

    #[error("ledger serialization failed: {0}")]
    Serialize(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Load/save of the single ledger snapshot.
pub trait LedgerStore: Send + Sync {
    /// The saved snapshot, or `None` when nothing (or an empty ledger) is saved.
    fn load(&self) -> Result<Option<LedgerState>, StoreError>;

    /// Replace the saved snapshot.
    fn save(&self, state: &LedgerState) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        (**self).load()
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        (**self).save(state)
    }
}

impl<S> LedgerStore for Box<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        (**self).load()
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        (**self).save(state)
    }
}

fn encode(state: &LedgerState) -> Result<String, StoreError> {
    serde_json::to_string_pretty(state).map_err(|e| StoreError::Serialize(e.to_string()))
}

fn decode(origin: &str, raw: &str) -> Result<Option<LedgerState>, StoreError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let state: LedgerState = serde_json::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("{origin}: {e}")))?;
    if state.is_empty() {
        return Ok(None);
    }
    state
        .validate()
        .map_err(|e| StoreError::Corrupt(format!("{origin}: {e}")))?;
    Ok(Some(state))
}

/// Saved snapshot, or the seed ledger when nothing usable is saved.
///
/// Corrupt snapshots are returned as errors, not replaced.
pub fn load_or_seed<S: LedgerStore + ?Sized>(store: &S) -> Result<LedgerState, StoreError> {
    match store.load()? {
        Some(state) => {
            tracing::info!(borrowers = state.borrowers().len(), "loaded saved ledger");
            Ok(state)
        }
        None => {
            tracing::info!("no saved ledger; starting from the seed ledger");
            Ok(seed_ledger())
        }
    }
}

/// In-memory store for tests/dev. Holds the serialized form so loads go
/// through the same decoding as the file store.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Option<String>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with raw text (which may be garbage).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Some(raw.into())),
        }
    }

    /// Raw text of the last save.
    pub fn raw(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_deref() {
            Some(raw) => decode("memory", raw),
            None => Ok(None),
        }
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        let raw = encode(state)?;
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        Ok(())
    }
}

/// One named slot on disk: `<dir>/<slot>.json`.
///
/// Saves write a sibling temp file and rename it over the slot, so a crash
/// mid-save leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileLedgerStore {
    dir: PathBuf,
    slot: String,
}

impl JsonFileLedgerStore {
    pub fn new(dir: impl Into<PathBuf>, slot: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            slot: slot.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.slot))
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no saved ledger file");
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let state = decode(&path.display().to_string(), &raw)?;
        tracing::debug!(path = %path.display(), found = state.is_some(), "read ledger file");
        Ok(state)
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        let raw = encode(state)?;
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path();
        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", self.slot, Uuid::now_v7().simple()));
        fs::write(&temp, raw).map_err(|e| StoreError::io(&temp, e))?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::io(&path, e));
        }
        tracing::debug!(path = %path.display(), "saved ledger file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use singil_core::SequentialIdGenerator;
    use singil_ledger::LedgerEngine;
    use tempfile::TempDir;

    #[test]
    fn file_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLedgerStore::new(dir.path(), "lendingAppData");
        let state = seed_ledger();

        store.save(&state).unwrap();
        assert!(dir.path().join("lendingAppData.json").exists());
        assert_eq!(store.load().unwrap(), Some(state));

        // Only the slot file is left behind.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLedgerStore::new(dir.path().join("not-yet"), "slot");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn empty_ledger_loads_as_none() {
        let store = InMemoryLedgerStore::new();
        store.save(&LedgerState::default()).unwrap();
        assert_eq!(store.load().unwrap(), None);

        let store = InMemoryLedgerStore::with_raw(r#"{"borrowers":[]}"#);
        assert_eq!(store.load().unwrap(), None);

        let store = InMemoryLedgerStore::with_raw("   \n");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("slot.json"), "{not json").unwrap();
        let store = JsonFileLedgerStore::new(dir.path(), "slot");
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));

        // Corrupt data stays put.
        assert!(matches!(load_or_seed(&store), Err(StoreError::Corrupt(_))));
        assert_eq!(
            fs::read_to_string(dir.path().join("slot.json")).unwrap(),
            "{not json"
        );
    }

    #[test]
    fn snapshot_breaking_invariants_is_corrupt() {
        let mut value = serde_json::to_value(seed_ledger()).unwrap();
        value["borrowers"][0]["loans"][0]["remainingBalance"] = serde_json::json!("999");
        let store = InMemoryLedgerStore::with_raw(value.to_string());

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(err.to_string().contains("remaining balance"));
    }

    #[test]
    fn stored_layout_uses_camel_case() {
        let store = InMemoryLedgerStore::new();
        store.save(&seed_ledger()).unwrap();
        let raw = store.raw().unwrap();
        assert!(raw.contains("\"borrowers\""));
        assert!(raw.contains("\"remainingBalance\""));
        assert!(raw.contains("\"nextSingilDate\""));
        assert!(raw.contains("\"type\": \"disbursement\""));
    }

    #[test]
    fn load_or_seed_prefers_saved_state() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(load_or_seed(&store).unwrap(), seed_ledger());

        let engine = LedgerEngine::new(SequentialIdGenerator::new());
        let (state, _) = engine.add_borrower(&LedgerState::default(), "Bilbo").unwrap();
        store.save(&state).unwrap();
        assert_eq!(load_or_seed(&store).unwrap(), state);
    }

    #[test]
    fn stores_work_behind_shared_pointers() {
        let shared: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        shared.save(&seed_ledger()).unwrap();
        let boxed: Box<dyn LedgerStore> = Box::new(Arc::clone(&shared));
        assert_eq!(boxed.load().unwrap(), Some(seed_ledger()));
    }
}
