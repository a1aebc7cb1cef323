//! Strongly-typed opaque identifiers and the id generation seam.
//!
//! Ids are plain strings on the wire (`b-…`, `l-…`, `t-…`). The engine never
//! inspects their contents; it only compares them. Fresh ids come from an
//! [`IdGenerator`] supplied by the caller, so the engine itself stays
//! deterministic.

use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Source of globally unique identifiers.
pub trait IdGenerator {
    /// Produce a fresh identifier starting with `prefix`.
    fn next_id(&self, prefix: &str) -> String;
}

impl<G> IdGenerator for &G
where
    G: IdGenerator + ?Sized,
{
    fn next_id(&self, prefix: &str) -> String {
        (**self).next_id(prefix)
    }
}

/// Production generator: `<prefix>-<uuid v7>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::now_v7())
    }
}

/// Deterministic generator: `<prefix>-1`, `<prefix>-2`, ...
///
/// The counter is shared across prefixes.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start numbering after `n` (the first id will end in `n + 1`).
    pub fn starting_after(n: u64) -> Self {
        Self {
            next: AtomicU64::new(n),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }
}

/// Identifier of a borrower.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BorrowerId(String);

/// Identifier of a loan (unique across all borrowers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(String);

/// Identifier of a transaction (unique across all loans).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

macro_rules! impl_ledger_id {
    ($t:ty, $prefix:literal, $name:literal) => {
        impl $t {
            /// Prefix used for freshly generated identifiers.
            pub const PREFIX: &'static str = $prefix;

            /// Draw a fresh identifier from `ids`.
            pub fn generate<G: IdGenerator + ?Sized>(ids: &G) -> Self {
                Self(ids.next_id(Self::PREFIX))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                if s.chars().any(char::is_whitespace) {
                    return Err(DomainError::invalid_id(format!(
                        "{}: contains whitespace",
                        $name
                    )));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_ledger_id!(BorrowerId, "b", "BorrowerId");
impl_ledger_id!(LoanId, "l", "LoanId");
impl_ledger_id!(TransactionId, "t", "TransactionId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_deterministic() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(BorrowerId::generate(&ids).as_str(), "b-1");
        assert_eq!(LoanId::generate(&ids).as_str(), "l-2");
        assert_eq!(TransactionId::generate(&ids).as_str(), "t-3");

        let ids = SequentialIdGenerator::starting_after(10);
        assert_eq!(ids.next_id("x"), "x-11");
    }

    #[test]
    fn uuid_ids_are_prefixed_and_unique() {
        let ids = UuidIdGenerator;
        let a = LoanId::generate(&ids);
        let b = LoanId::generate(&ids);
        assert!(a.as_str().starts_with("l-"));
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_blank_and_whitespace() {
        assert_eq!("  b1 ".parse::<BorrowerId>().unwrap().as_str(), "b1");
        assert!(matches!(
            "".parse::<LoanId>(),
            Err(DomainError::InvalidId(msg)) if msg.contains("LoanId")
        ));
        assert!("t 1".parse::<TransactionId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = BorrowerId::from("b1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b1\"");
    }
}
