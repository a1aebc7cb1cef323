//! Terminal front end for the lending ledger.

pub mod args;
pub mod commands;
pub mod format;
pub mod render;
