//! Lending ledger domain (borrowers, loans, running-balance history).
//!
//! Pure domain logic only: no IO, no storage, no presentation.

pub mod borrower;
pub mod engine;
pub mod loan;
pub mod seed;
pub mod state;
pub mod summary;
pub mod transaction;

pub use borrower::Borrower;
pub use engine::{
    Change, InterestCharge, LedgerEngine, add_interest, create_loan, delete_transaction,
    payment_preview, record_payment,
};
pub use loan::{
    AddInterest, DeleteTransaction, InterestAdded, Loan, LoanCommand, LoanEvent, LoanOpened,
    LoanTerms, OpenLoan, PaymentRecorded, PaymentSchedule, RecordPayment, TransactionDeleted,
};
pub use seed::seed_ledger;
pub use state::LedgerState;
pub use summary::{
    BorrowerSort, PortfolioSummary, earliest_upcoming_date, most_recent_transaction_date,
    sort_borrowers, total_interest_collected, total_principal, total_remaining,
};
pub use transaction::{PaymentAllocation, Transaction, TransactionKind};
