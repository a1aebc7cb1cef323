//! `singil-core`: domain building blocks for the lending ledger.
//!
//! This crate contains **pure domain** primitives (no IO, no storage).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::{Entity, find_by_id, position_of};
pub use error::{DomainError, DomainResult};
pub use id::{
    BorrowerId, IdGenerator, LoanId, SequentialIdGenerator, TransactionId, UuidIdGenerator,
};
pub use value_object::ValueObject;
