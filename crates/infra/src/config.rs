//! Configuration loading from the process environment.
//!
//! | Variable            | Meaning                              | Default               |
//! |---------------------|--------------------------------------|-----------------------|
//! | `SINGIL_DATA_DIR`   | directory holding the slot file      | `<data dir>/singil`   |
//! | `SINGIL_SLOT`       | slot name (file stem)                | `lendingAppData`      |
//! | `SINGIL_STORE`      | `file` or `memory`                   | `file`                |
//! | `SINGIL_LOG_FORMAT` | `json` or `pretty`                   | `pretty`              |
//!
//! Empty values count as unset.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use singil_observability::LogFormat;

use crate::store::{InMemoryLedgerStore, JsonFileLedgerStore, LedgerStore};

pub const DEFAULT_SLOT: &str = "lendingAppData";

pub const ENV_DATA_DIR: &str = "SINGIL_DATA_DIR";
pub const ENV_SLOT: &str = "SINGIL_SLOT";
pub const ENV_STORE: &str = "SINGIL_STORE";
pub const ENV_LOG_FORMAT: &str = "SINGIL_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("could not resolve a data directory; set SINGIL_DATA_DIR")]
    NoDataDir,
}

/// Where snapshots live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    File,
    /// Nothing survives the process (demos, dry runs).
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store `{other}` (expected `file` or `memory`)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub slot: String,
    pub store: StoreKind,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match get(ENV_DATA_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        let slot = get(ENV_SLOT).unwrap_or_else(|| DEFAULT_SLOT.to_string());
        validate_slot(&slot).map_err(|message| ConfigError::Invalid {
            key: ENV_SLOT,
            message,
        })?;

        let store = match get(ENV_STORE) {
            Some(v) => v.parse::<StoreKind>().map_err(|message| ConfigError::Invalid {
                key: ENV_STORE,
                message,
            })?,
            None => StoreKind::default(),
        };

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(v) => v.parse::<LogFormat>().map_err(|e| {
                ConfigError::Invalid {
                    key: ENV_LOG_FORMAT,
                    message: e.to_string(),
                }
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            data_dir,
            slot,
            store,
            log_format,
        })
    }

    /// Replace the slot name, rejecting names that are not plain file stems.
    pub fn with_slot(mut self, slot: impl Into<String>) -> Result<Self, ConfigError> {
        let slot = slot.into();
        validate_slot(&slot).map_err(|message| ConfigError::Invalid {
            key: ENV_SLOT,
            message,
        })?;
        self.slot = slot;
        Ok(self)
    }

    /// The store this configuration points at.
    pub fn open_store(&self) -> Box<dyn LedgerStore> {
        match self.store {
            StoreKind::File => Box::new(JsonFileLedgerStore::new(&self.data_dir, &self.slot)),
            StoreKind::Memory => Box::new(InMemoryLedgerStore::new()),
        }
    }
}

/// `{os data dir}/singil`, falling back to `~/.local/share/singil`.
pub fn default_data_dir() -> Option<PathBuf> {
    let base = dirs::data_dir().or_else(|| {
        dirs::home_dir().map(|mut h| {
            h.push(".local");
            h.push("share");
            h
        })
    })?;
    Some(base.join("singil"))
}

fn validate_slot(slot: &str) -> Result<(), String> {
    if slot.trim().is_empty() {
        return Err("slot name cannot be empty".to_string());
    }
    if slot.contains(['/', '\\']) || slot.starts_with('.') {
        return Err(format!("slot name `{slot}` must be a plain file name"));
    }
    Ok(())
}
