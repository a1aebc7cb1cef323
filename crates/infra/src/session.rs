//! Apply-then-save orchestration around the ledger engine.
//!
//! ```text
//! call
//!   ↓
//! 1. Run the engine against the current snapshot (pure)
//!   ↓
//! 2. On success, replace the snapshot
//!   ↓
//! 3. Save the snapshot to the store
//! ```
//!
//! A rejected operation stops at step 1 and changes nothing. A failed save
//! keeps the new snapshot in memory and marks the session dirty until a
//! later save (or [`LedgerSession::flush`]) succeeds.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use singil_core::{BorrowerId, DomainResult, IdGenerator, LoanId, TransactionId, UuidIdGenerator};
use singil_ledger::{
    Borrower, Change, InterestCharge, LedgerEngine, LedgerState, LoanTerms, Transaction,
    seed_ledger,
};

use crate::store::{LedgerStore, StoreError};

#[derive(Debug)]
pub struct LedgerSession<S, G = UuidIdGenerator> {
    store: S,
    engine: LedgerEngine<G>,
    state: LedgerState,
    dirty: bool,
}

impl<S, G> LedgerSession<S, G>
where
    S: LedgerStore,
    G: IdGenerator,
{
    /// Session over an already-loaded snapshot. Nothing is saved until the
    /// first change.
    pub fn new(store: S, engine: LedgerEngine<G>, state: LedgerState) -> Self {
        Self {
            store,
            engine,
            state,
            dirty: false,
        }
    }

    /// Load the saved snapshot (or the seed ledger) and open a session on it.
    ///
    /// A freshly seeded ledger is saved right away.
    pub fn open(store: S, engine: LedgerEngine<G>) -> Result<Self, StoreError> {
        let (state, seeded) = match store.load()? {
            Some(state) => (state, false),
            None => (seed_ledger(), true),
        };
        let mut session = Self::new(store, engine, state);
        if seeded {
            session.save();
        }
        tracing::info!(
            borrowers = session.state.borrowers().len(),
            seeded,
            "opened ledger session"
        );
        Ok(session)
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the in-memory snapshot has changes the store does not have.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save the current snapshot, returning the store error if it fails.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.store.save(&self.state)?;
        if self.dirty {
            tracing::info!("ledger saved after earlier failure");
        }
        self.dirty = false;
        Ok(())
    }

    fn save(&mut self) {
        match self.store.save(&self.state) {
            Ok(()) => self.dirty = false,
            Err(error) => {
                tracing::error!(%error, "failed to save ledger; changes kept in memory");
                self.dirty = true;
            }
        }
    }

    fn commit<T>(&mut self, change: Change<T>) -> Option<T> {
        let value = change.value?;
        self.state = change.state;
        self.save();
        Some(value)
    }

    pub fn add_borrower(&mut self, name: &str) -> DomainResult<BorrowerId> {
        let (next, id) = self.engine.add_borrower(&self.state, name)?;
        self.state = next;
        self.save();
        Ok(id)
    }

    pub fn rename_borrower(
        &mut self,
        borrower_id: &BorrowerId,
        name: &str,
    ) -> DomainResult<Option<BorrowerId>> {
        let change = self.engine.rename_borrower(&self.state, borrower_id, name)?;
        Ok(self.commit(change))
    }

    pub fn delete_borrower(&mut self, borrower_id: &BorrowerId) -> Option<Borrower> {
        let change = self.engine.delete_borrower(&self.state, borrower_id);
        self.commit(change)
    }

    pub fn add_loan(
        &mut self,
        borrower_id: &BorrowerId,
        terms: LoanTerms,
    ) -> DomainResult<Option<LoanId>> {
        let change = self.engine.add_loan(&self.state, borrower_id, terms)?;
        Ok(self.commit(change))
    }

    pub fn record_payment(
        &mut self,
        loan_id: &LoanId,
        amount: Decimal,
        date: NaiveDate,
        note: Option<String>,
    ) -> DomainResult<Option<Transaction>> {
        let change = self
            .engine
            .record_payment(&self.state, loan_id, amount, date, note)?;
        Ok(self.commit(change))
    }

    pub fn add_interest(
        &mut self,
        loan_id: &LoanId,
        amount: Decimal,
        date: NaiveDate,
        note: Option<String>,
    ) -> DomainResult<Option<InterestCharge>> {
        let change = self
            .engine
            .add_interest(&self.state, loan_id, amount, date, note)?;
        Ok(self.commit(change))
    }

    pub fn delete_transaction(
        &mut self,
        loan_id: &LoanId,
        transaction_id: &TransactionId,
    ) -> DomainResult<Option<Transaction>> {
        let change = self
            .engine
            .delete_transaction(&self.state, loan_id, transaction_id)?;
        Ok(self.commit(change))
    }
}
