//! Demo ledger used when nothing has been saved yet.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use singil_core::{BorrowerId, DomainResult};

use crate::borrower::Borrower;
use crate::loan::{Loan, LoanTerms, OpenLoan, PaymentSchedule};
use crate::state::LedgerState;

struct SeedLoan {
    borrower_id: &'static str,
    name: &'static str,
    loan_id: &'static str,
    disbursement_id: &'static str,
    principal: i64,
    start: (i32, u32, u32),
    schedule: PaymentSchedule,
}

const SEED: [SeedLoan; 2] = [
    SeedLoan {
        borrower_id: "b1",
        name: "Frodo Baggins",
        loan_id: "l1",
        disbursement_id: "t1",
        principal: 1000,
        start: (2025, 10, 1),
        schedule: PaymentSchedule::Monthly,
    },
    SeedLoan {
        borrower_id: "b2",
        name: "Samwise Gamgee",
        loan_id: "l2",
        disbursement_id: "t2",
        principal: 5000,
        start: (2025, 9, 15),
        schedule: PaymentSchedule::Weekly,
    },
];

const SEED_INTEREST_RATE: i64 = 15;

fn build() -> DomainResult<LedgerState> {
    let mut borrowers = Vec::with_capacity(SEED.len());
    for seed in &SEED {
        let (y, m, d) = seed.start;
        let start_date = NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| singil_core::DomainError::invariant("invalid seed date"))?;
        let loan = Loan::open(OpenLoan {
            loan_id: seed.loan_id.into(),
            disbursement_id: seed.disbursement_id.into(),
            terms: LoanTerms::new(
                Decimal::from(seed.principal),
                Decimal::from(SEED_INTEREST_RATE),
                start_date,
                seed.schedule,
            ),
        })?;
        let mut borrower = Borrower::new(BorrowerId::from(seed.borrower_id), seed.name)?;
        borrower.push_loan(loan);
        borrowers.push(borrower);
    }
    Ok(LedgerState::new(borrowers))
}

/// Two borrowers with one untouched loan each (balances 1150 and 5750).
///
/// Deterministic: ids, dates and amounts are fixed.
pub fn seed_ledger() -> LedgerState {
    // The seed terms are constants that satisfy every validation rule.
    build().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use singil_core::AggregateRoot;

    #[test]
    fn seed_is_deterministic_and_valid() {
        let a = seed_ledger();
        let b = seed_ledger();
        assert_eq!(a, b);
        assert_eq!(a.borrowers().len(), 2);
        a.validate().unwrap();
        build().unwrap();
    }

    #[test]
    fn seed_matches_demo_data() {
        let state = seed_ledger();
        let frodo = state.borrower(&"b1".into()).unwrap();
        assert_eq!(frodo.name(), "Frodo Baggins");
        let l1 = &frodo.loans()[0];
        assert_eq!(l1.id().as_str(), "l1");
        assert_eq!(l1.original_interest(), dec!(150));
        assert_eq!(l1.remaining_balance(), dec!(1150));
        assert_eq!(l1.due_date(), NaiveDate::from_ymd_opt(2025, 10, 31).unwrap());

        let l2 = state.loan(&"l2".into()).unwrap();
        assert_eq!(l2.remaining_balance(), dec!(5750));
        assert_eq!(l2.payment_schedule(), PaymentSchedule::Weekly);
        assert_eq!(l2.next_singil_date(), NaiveDate::from_ymd_opt(2025, 10, 15).unwrap());
        assert_eq!(
            state.borrower_of_loan(&"l2".into()).unwrap().name(),
            "Samwise Gamgee"
        );
    }

    #[test]
    fn validate_rejects_seed_with_rewritten_terms() {
        let mut json = serde_json::to_value(seed_ledger()).unwrap();
        let loan = &mut json["borrowers"][0]["loans"][0];
        loan["originalInterest"] = serde_json::json!("42");
        loan["remainingBalance"] = serde_json::json!("99999");
        loan["transactions"][0]["balance"] = serde_json::json!("99999");
        loan["transactions"][0]["amount"] = serde_json::json!("-5");
        let tampered: LedgerState = serde_json::from_value(json).unwrap();

        let err = tampered.validate().unwrap_err();
        assert!(err.to_string().contains("loan l1"), "{err}");
    }
}
