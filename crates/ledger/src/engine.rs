//! Ledger engine: the operations a presentation layer calls.
//!
//! Two levels are exposed:
//!
//! - **Loan level** ([`create_loan`], [`record_payment`], [`add_interest`],
//!   [`delete_transaction`]): take a loan by reference and return the evolved
//!   copy plus whatever the caller needs to show.
//! - **Ledger level** ([`LedgerEngine`]): address borrowers and loans by id
//!   inside a [`LedgerState`] and return a whole new snapshot.
//!
//! Nothing here mutates its inputs. A rejected operation returns an error and
//! the caller still holds the untouched snapshot. A stale id is not an error:
//! the snapshot comes back unchanged and [`Change::value`] is `None`.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use singil_core::{
    Aggregate, AggregateRoot, BorrowerId, DomainResult, IdGenerator, LoanId, TransactionId,
    UuidIdGenerator, position_of,
};
use singil_events::Event;

use crate::borrower::{Borrower, normalize_name};
use crate::loan::{
    AddInterest, DeleteTransaction, Loan, LoanCommand, LoanEvent, LoanTerms, OpenLoan,
    RecordPayment,
};
use crate::state::LedgerState;
use crate::transaction::{PaymentAllocation, Transaction};

fn trace_events(loan: &Loan, events: &[LoanEvent]) {
    for event in events {
        tracing::debug!(
            loan_id = %loan.id(),
            event = event.event_type(),
            occurred_on = %event.occurred_on(),
            version = loan.version(),
            "applied loan event"
        );
    }
}

fn run(loan: &Loan, command: LoanCommand) -> DomainResult<(Loan, Vec<LoanEvent>)> {
    let (next, events) = loan.execute(&command)?;
    trace_events(&next, &events);
    Ok((next, events))
}

/// Open a new loan with its disbursement.
pub fn create_loan<G: IdGenerator + ?Sized>(ids: &G, terms: LoanTerms) -> DomainResult<Loan> {
    let cmd = OpenLoan {
        loan_id: LoanId::generate(ids),
        disbursement_id: TransactionId::generate(ids),
        terms,
    };
    let loan = Loan::open(cmd)?;
    tracing::debug!(
        loan_id = %loan.id(),
        principal = %loan.principal(),
        balance = %loan.remaining_balance(),
        "opened loan"
    );
    Ok(loan)
}

/// Record a payment. The amount is capped at the remaining balance.
pub fn record_payment<G: IdGenerator + ?Sized>(
    ids: &G,
    loan: &Loan,
    amount: Decimal,
    date: NaiveDate,
    note: Option<String>,
) -> DomainResult<(Loan, Transaction)> {
    let cmd = LoanCommand::RecordPayment(RecordPayment {
        loan_id: loan.id().clone(),
        transaction_id: TransactionId::generate(ids),
        amount,
        date,
        note,
    });
    let (next, events) = run(loan, cmd)?;
    let transaction = events
        .into_iter()
        .find_map(|e| match e {
            LoanEvent::PaymentRecorded(e) => Some(e.transaction),
            _ => None,
        })
        .ok_or_else(|| singil_core::DomainError::invariant("payment produced no transaction"))?;
    Ok((next, transaction))
}

/// Charge interest and roll the due dates forward.
///
/// Returns the evolved loan, the interest entry and the new due date.
pub fn add_interest<G: IdGenerator + ?Sized>(
    ids: &G,
    loan: &Loan,
    amount: Decimal,
    date: NaiveDate,
    note: Option<String>,
) -> DomainResult<(Loan, Transaction, NaiveDate)> {
    let cmd = LoanCommand::AddInterest(AddInterest {
        loan_id: loan.id().clone(),
        transaction_id: TransactionId::generate(ids),
        amount,
        date,
        note,
    });
    let (next, events) = run(loan, cmd)?;
    let (transaction, due_date) = events
        .into_iter()
        .find_map(|e| match e {
            LoanEvent::InterestAdded(e) => Some((e.transaction, e.due_date)),
            _ => None,
        })
        .ok_or_else(|| singil_core::DomainError::invariant("interest produced no transaction"))?;
    Ok((next, transaction, due_date))
}

/// Retract a payment or interest entry and rebuild later running balances.
///
/// Unknown ids leave the loan as it was.
pub fn delete_transaction(loan: &Loan, transaction_id: &TransactionId) -> DomainResult<Loan> {
    Ok(delete_transaction_reporting(loan, transaction_id)?.0)
}

fn delete_transaction_reporting(
    loan: &Loan,
    transaction_id: &TransactionId,
) -> DomainResult<(Loan, Option<Transaction>)> {
    if position_of(loan.transactions(), transaction_id).is_none() {
        tracing::debug!(loan_id = %loan.id(), %transaction_id, "transaction not found; nothing deleted");
        return Ok((loan.clone(), None));
    }
    let cmd = LoanCommand::DeleteTransaction(DeleteTransaction {
        loan_id: loan.id().clone(),
        transaction_id: transaction_id.clone(),
    });
    let (next, events) = run(loan, cmd)?;
    let removed = events.into_iter().find_map(|e| match e {
        LoanEvent::TransactionDeleted(e) => Some(e.transaction),
        _ => None,
    });
    Ok((next, removed))
}

/// Allocation a payment of `amount` would receive right now.
pub fn payment_preview(loan: &Loan, amount: Decimal) -> PaymentAllocation {
    if amount <= Decimal::ZERO {
        return PaymentAllocation::zero();
    }
    loan.allocate_payment(amount)
}

/// Result of a ledger-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    /// The new snapshot (equal to the input when nothing changed).
    pub state: LedgerState,
    /// What the operation produced; `None` when the target id was unknown.
    pub value: Option<T>,
}

impl<T> Change<T> {
    fn applied(state: LedgerState, value: T) -> Self {
        Self {
            state,
            value: Some(value),
        }
    }

    fn unchanged(state: &LedgerState) -> Self {
        Self {
            state: state.clone(),
            value: None,
        }
    }

    /// Whether the operation left the snapshot as it was.
    pub fn is_noop(&self) -> bool {
        self.value.is_none()
    }
}

/// Interest entry plus the due date it rolled the loan to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestCharge {
    pub transaction: Transaction,
    pub due_date: NaiveDate,
}

/// Ledger-level operations over a [`LedgerState`].
///
/// The engine holds nothing but its id source.
#[derive(Debug, Default, Clone)]
pub struct LedgerEngine<G = UuidIdGenerator> {
    ids: G,
}

impl<G: IdGenerator> LedgerEngine<G> {
    pub fn new(ids: G) -> Self {
        Self { ids }
    }

    /// Add a borrower with no loans; returns the new id.
    pub fn add_borrower(
        &self,
        state: &LedgerState,
        name: &str,
    ) -> DomainResult<(LedgerState, BorrowerId)> {
        let borrower = Borrower::new(BorrowerId::generate(&self.ids), name)?;
        let id = singil_core::Entity::id(&borrower).clone();

        let mut next = state.clone();
        next.borrowers_mut().push(borrower);
        tracing::debug!(borrower_id = %id, "added borrower");
        Ok((next, id))
    }

    pub fn rename_borrower(
        &self,
        state: &LedgerState,
        borrower_id: &BorrowerId,
        name: &str,
    ) -> DomainResult<Change<BorrowerId>> {
        let name = normalize_name(name)?;
        let Some(idx) = position_of(state.borrowers(), borrower_id) else {
            tracing::debug!(%borrower_id, "rename of unknown borrower ignored");
            return Ok(Change::unchanged(state));
        };

        let mut next = state.clone();
        next.borrowers_mut()[idx].rename(name);
        Ok(Change::applied(next, borrower_id.clone()))
    }

    /// Remove a borrower together with all of their loans.
    pub fn delete_borrower(&self, state: &LedgerState, borrower_id: &BorrowerId) -> Change<Borrower> {
        let Some(idx) = position_of(state.borrowers(), borrower_id) else {
            tracing::debug!(%borrower_id, "delete of unknown borrower ignored");
            return Change::unchanged(state);
        };

        let mut next = state.clone();
        let removed = next.borrowers_mut().remove(idx);
        tracing::debug!(%borrower_id, loans = removed.loans().len(), "deleted borrower");
        Change::applied(next, removed)
    }

    /// Open a loan for an existing borrower.
    pub fn add_loan(
        &self,
        state: &LedgerState,
        borrower_id: &BorrowerId,
        terms: LoanTerms,
    ) -> DomainResult<Change<LoanId>> {
        let Some(idx) = position_of(state.borrowers(), borrower_id) else {
            tracing::debug!(%borrower_id, "loan for unknown borrower ignored");
            return Ok(Change::unchanged(state));
        };

        let loan = create_loan(&self.ids, terms)?;
        let loan_id = loan.id().clone();

        let mut next = state.clone();
        next.borrowers_mut()[idx].push_loan(loan);
        Ok(Change::applied(next, loan_id))
    }

    pub fn record_payment(
        &self,
        state: &LedgerState,
        loan_id: &LoanId,
        amount: Decimal,
        date: NaiveDate,
        note: Option<String>,
    ) -> DomainResult<Change<Transaction>> {
        self.with_loan(state, loan_id, |loan| {
            record_payment(&self.ids, loan, amount, date, note)
        })
    }

    pub fn add_interest(
        &self,
        state: &LedgerState,
        loan_id: &LoanId,
        amount: Decimal,
        date: NaiveDate,
        note: Option<String>,
    ) -> DomainResult<Change<InterestCharge>> {
        self.with_loan(state, loan_id, |loan| {
            let (next, transaction, due_date) = add_interest(&self.ids, loan, amount, date, note)?;
            Ok((
                next,
                InterestCharge {
                    transaction,
                    due_date,
                },
            ))
        })
    }

    /// Retract a transaction. The value is the removed entry; `None` when
    /// either id is unknown.
    pub fn delete_transaction(
        &self,
        state: &LedgerState,
        loan_id: &LoanId,
        transaction_id: &TransactionId,
    ) -> DomainResult<Change<Transaction>> {
        let change = self.with_loan(state, loan_id, |loan| {
            delete_transaction_reporting(loan, transaction_id)
        })?;
        Ok(match change.value {
            Some(Some(removed)) => Change::applied(change.state, removed),
            _ => Change::unchanged(state),
        })
    }

    fn with_loan<T>(
        &self,
        state: &LedgerState,
        loan_id: &LoanId,
        op: impl FnOnce(&Loan) -> DomainResult<(Loan, T)>,
    ) -> DomainResult<Change<T>> {
        let Some((bi, li)) = state.loan_slot(loan_id) else {
            tracing::debug!(%loan_id, "operation on unknown loan ignored");
            return Ok(Change::unchanged(state));
        };

        let (loan, value) = op(&state.borrowers()[bi].loans()[li])?;

        let mut next = state.clone();
        next.borrowers_mut()[bi].replace_loan(li, loan);
        Ok(Change::applied(next, value))
    }
}
