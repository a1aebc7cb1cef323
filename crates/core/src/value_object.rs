//! Value object trait: equality by value, not identity.
//!
//! Loan terms and payment allocations are value objects: two allocations with
//! the same portions are interchangeable, and "changing" one means computing a
//! new one.

/// Marker trait for immutable, compared-by-value domain objects.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
