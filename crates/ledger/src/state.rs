//! The ledger snapshot: every borrower, loan and transaction.
//!
//! Snapshots are plain values. Engine operations read one snapshot and return
//! a new one, so a caller holding an older snapshot never sees it change.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use singil_core::{AggregateRoot, BorrowerId, DomainError, DomainResult, Entity, LoanId, find_by_id};

use crate::borrower::Borrower;
use crate::loan::Loan;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    borrowers: Vec<Borrower>,
}

/// Position of a loan inside a snapshot: (borrower index, loan index).
pub(crate) type LoanSlot = (usize, usize);

impl LedgerState {
    pub fn new(borrowers: Vec<Borrower>) -> Self {
        Self { borrowers }
    }

    pub fn borrowers(&self) -> &[Borrower] {
        &self.borrowers
    }

    pub fn is_empty(&self) -> bool {
        self.borrowers.is_empty()
    }

    pub fn borrower(&self, id: &BorrowerId) -> Option<&Borrower> {
        find_by_id(&self.borrowers, id)
    }

    /// All loans across all borrowers, borrower by borrower.
    pub fn loans(&self) -> impl Iterator<Item = &Loan> + '_ {
        self.borrowers.iter().flat_map(|b| b.loans().iter())
    }

    pub fn loan(&self, id: &LoanId) -> Option<&Loan> {
        self.loans().find(|loan| loan.id() == id)
    }

    /// Borrower owning the loan `id`.
    pub fn borrower_of_loan(&self, id: &LoanId) -> Option<&Borrower> {
        self.borrowers.iter().find(|b| b.loan(id).is_some())
    }

    pub(crate) fn borrowers_mut(&mut self) -> &mut Vec<Borrower> {
        &mut self.borrowers
    }

    pub(crate) fn loan_slot(&self, id: &LoanId) -> Option<LoanSlot> {
        self.borrowers
            .iter()
            .enumerate()
            .find_map(|(bi, b)| b.loan_position(id).map(|li| (bi, li)))
    }

    /// Check every invariant the engine maintains.
    ///
    /// Snapshots built only through engine operations always pass; this guards
    /// snapshots that arrive from storage.
    pub fn validate(&self) -> DomainResult<()> {
        let mut borrower_ids = HashSet::new();
        let mut loan_ids = HashSet::new();
        let mut transaction_ids = HashSet::new();

        for borrower in &self.borrowers {
            if !borrower_ids.insert(borrower.id()) {
                return Err(DomainError::invariant(format!(
                    "duplicate borrower id {}",
                    borrower.id()
                )));
            }
            if borrower.name().trim().is_empty() {
                return Err(DomainError::invariant(format!(
                    "borrower {} has an empty name",
                    borrower.id()
                )));
            }
            for loan in borrower.loans() {
                if !loan_ids.insert(loan.id()) {
                    return Err(DomainError::invariant(format!(
                        "duplicate loan id {}",
                        loan.id()
                    )));
                }
                loan.check_invariants()?;
                for tx in loan.transactions() {
                    if !transaction_ids.insert(&tx.id) {
                        return Err(DomainError::invariant(format!(
                            "duplicate transaction id {}",
                            tx.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
