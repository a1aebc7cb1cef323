use serde::{Deserialize, Serialize};

use singil_core::{AggregateRoot, BorrowerId, DomainError, DomainResult, Entity, LoanId};

use crate::loan::Loan;

/// A person owing money; owns their loans outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    id: BorrowerId,
    name: String,
    #[serde(default)]
    loans: Vec<Loan>,
}

impl Entity for Borrower {
    type Id = BorrowerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Trimmed display name, or a validation error when nothing is left.
pub fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("borrower name cannot be empty"));
    }
    Ok(name.to_string())
}

impl Borrower {
    pub fn new(id: BorrowerId, name: &str) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: normalize_name(name)?,
            loans: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Loans in creation order.
    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn loan(&self, loan_id: &LoanId) -> Option<&Loan> {
        self.loans.iter().find(|loan| loan.id() == loan_id)
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn push_loan(&mut self, loan: Loan) {
        self.loans.push(loan);
    }

    pub(crate) fn loan_position(&self, loan_id: &LoanId) -> Option<usize> {
        self.loans.iter().position(|loan| loan.id() == loan_id)
    }

    pub(crate) fn replace_loan(&mut self, idx: usize, loan: Loan) {
        self.loans[idx] = loan;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_required() {
        let borrower = Borrower::new("b1".into(), "  Frodo Baggins ").unwrap();
        assert_eq!(borrower.name(), "Frodo Baggins");
        assert!(borrower.loans().is_empty());

        let err = Borrower::new("b2".into(), "   ").unwrap_err();
        assert_eq!(err, DomainError::validation("borrower name cannot be empty"));
    }
}
