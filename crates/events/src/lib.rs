//! Domain events emitted by ledger aggregates.

pub mod event;

pub use event::Event;
