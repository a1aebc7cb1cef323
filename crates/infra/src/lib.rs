//! Infrastructure layer: snapshot persistence, session orchestration, config.

pub mod config;
pub mod session;
pub mod store;

pub use config::{Config, ConfigError, StoreKind};
pub use session::LedgerSession;
pub use store::{InMemoryLedgerStore, JsonFileLedgerStore, LedgerStore, StoreError, load_or_seed};
