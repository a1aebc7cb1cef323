//! Loan aggregate.
//!
//! A loan is opened with a single disbursement and then evolves through
//! payments, interest charges and retractions of those. Commands are decided
//! by [`Aggregate::handle`] and applied as [`LoanEvent`]s; the stored
//! transaction list is the loan's only history.
//!
//! Invariants held by every opened loan:
//! - `transactions[0]` is the one and only disbursement;
//! - each entry's `balance` equals the previous balance plus the entry's
//!   signed contribution;
//! - `remaining_balance` equals the last entry's `balance`.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use singil_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, LoanId, TransactionId, ValueObject,
    position_of,
};
use singil_events::Event;

use crate::transaction::{
    PaymentAllocation, Transaction, TransactionKind, recompute_suffix_balances,
};

/// Days between a loan start (or an interest charge) and the next due date.
///
/// Applied regardless of [`PaymentSchedule`].
pub const DUE_DATE_OFFSET_DAYS: u64 = 30;

/// Rate (percent of the remaining balance) suggested for late-payment interest.
pub const SUGGESTED_INTEREST_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

pub const DISBURSEMENT_NOTE: &str = "Initial loan";
pub const LATE_INTEREST_NOTE: &str = "Late payment interest";

/// How often the borrower is expected to pay. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentSchedule {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl core::fmt::Display for PaymentSchedule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PaymentSchedule::Daily => "Daily",
            PaymentSchedule::Weekly => "Weekly",
            PaymentSchedule::Monthly => "Monthly",
        })
    }
}

/// Terms agreed when a loan is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTerms {
    pub principal: Decimal,
    /// Percent, e.g. `15` for 15%.
    pub interest_rate: Decimal,
    pub start_date: NaiveDate,
    pub schedule: PaymentSchedule,
}

impl ValueObject for LoanTerms {}

impl LoanTerms {
    pub fn new(
        principal: Decimal,
        interest_rate: Decimal,
        start_date: NaiveDate,
        schedule: PaymentSchedule,
    ) -> Self {
        Self {
            principal,
            interest_rate,
            start_date,
            schedule,
        }
    }

    /// Flat interest on the principal: `principal * rate / 100`.
    pub fn original_interest(&self) -> DomainResult<Decimal> {
        flat_interest(self.principal, self.interest_rate).ok_or_else(too_large)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(DomainError::validation("principal must be positive"));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(DomainError::validation("interest rate cannot be negative"));
        }
        Ok(())
    }
}

fn flat_interest(principal: Decimal, rate: Decimal) -> Option<Decimal> {
    principal
        .checked_mul(rate)
        .and_then(|p| p.checked_div(Decimal::ONE_HUNDRED))
}

fn too_large() -> DomainError {
    DomainError::validation("amount too large")
}

/// `date` plus the fixed due-date offset.
pub fn roll_forward(date: NaiveDate) -> DomainResult<NaiveDate> {
    date.checked_add_days(Days::new(DUE_DATE_OFFSET_DAYS))
        .ok_or_else(|| DomainError::invariant("due date out of range"))
}

/// Aggregate root: Loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    id: LoanId,
    principal: Decimal,
    interest_rate: Decimal,
    original_interest: Decimal,
    remaining_balance: Decimal,
    start_date: NaiveDate,
    due_date: NaiveDate,
    next_singil_date: NaiveDate,
    payment_schedule: PaymentSchedule,
    transactions: Vec<Transaction>,
    #[serde(default)]
    version: u64,
}

impl Loan {
    /// Not-yet-opened instance; only ever used as the target of `OpenLoan`.
    fn empty(id: LoanId) -> Self {
        Self {
            id,
            principal: Decimal::ZERO,
            interest_rate: Decimal::ZERO,
            original_interest: Decimal::ZERO,
            remaining_balance: Decimal::ZERO,
            start_date: NaiveDate::MIN,
            due_date: NaiveDate::MIN,
            next_singil_date: NaiveDate::MIN,
            payment_schedule: PaymentSchedule::default(),
            transactions: Vec::new(),
            version: 0,
        }
    }

    /// Open a loan: validate the terms and record its disbursement.
    pub fn open(cmd: OpenLoan) -> DomainResult<Self> {
        let loan = Self::empty(cmd.loan_id.clone());
        let (loan, _) = loan.execute(&LoanCommand::OpenLoan(cmd))?;
        Ok(loan)
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    pub fn interest_rate(&self) -> Decimal {
        self.interest_rate
    }

    pub fn original_interest(&self) -> Decimal {
        self.original_interest
    }

    pub fn remaining_balance(&self) -> Decimal {
        self.remaining_balance
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn next_singil_date(&self) -> NaiveDate {
        self.next_singil_date
    }

    pub fn payment_schedule(&self) -> PaymentSchedule {
        self.payment_schedule
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_settled(&self) -> bool {
        self.remaining_balance <= Decimal::ZERO
    }

    fn is_opened(&self) -> bool {
        !self.transactions.is_empty()
    }

    /// Interest suggested for a late payment: 15% of the remaining balance,
    /// rounded to cents.
    pub fn suggested_interest(&self) -> Decimal {
        // rate / 100 <= 1, so the product never exceeds the balance.
        (self.remaining_balance * (SUGGESTED_INTEREST_RATE / Decimal::ONE_HUNDRED))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// How a payment of `amount` would be applied, without recording it.
    ///
    /// The amount is capped at the remaining balance. The interest share uses
    /// the ratio of original interest to original total due, independent of
    /// what has already been repaid.
    pub fn allocate_payment(&self, amount: Decimal) -> PaymentAllocation {
        let total = amount.max(Decimal::ZERO).min(self.remaining_balance.max(Decimal::ZERO));
        let original_total = self
            .principal
            .checked_add(self.original_interest)
            .unwrap_or(Decimal::ZERO);
        if total.is_zero() || original_total.is_zero() {
            return PaymentAllocation {
                total,
                interest_portion: Decimal::ZERO,
                principal_portion: total,
            };
        }
        // Multiplying first keeps small amounts exact; the ratio form cannot
        // overflow because the ratio is at most one.
        let interest_portion = total
            .checked_mul(self.original_interest)
            .and_then(|p| p.checked_div(original_total))
            .unwrap_or_else(|| total * (self.original_interest / original_total));
        PaymentAllocation {
            total,
            interest_portion,
            principal_portion: total - interest_portion,
        }
    }

    /// Verify the structural invariants of an opened loan.
    ///
    /// Used when accepting snapshots from outside the engine (storage, tests).
    pub fn check_invariants(&self) -> DomainResult<()> {
        let Some(first) = self.transactions.first() else {
            return Err(DomainError::invariant(format!(
                "loan {} has no transactions",
                self.id
            )));
        };
        if first.kind != TransactionKind::Disbursement {
            return Err(DomainError::invariant(format!(
                "loan {} does not start with a disbursement",
                self.id
            )));
        }
        self.check_terms(first)?;

        let mut seen = HashSet::new();
        let mut running = Decimal::ZERO;
        for (idx, tx) in self.transactions.iter().enumerate() {
            if !seen.insert(&tx.id) {
                return Err(DomainError::invariant(format!(
                    "loan {} repeats transaction id {}",
                    self.id, tx.id
                )));
            }
            if idx > 0 && tx.kind == TransactionKind::Disbursement {
                return Err(DomainError::invariant(format!(
                    "loan {} has a second disbursement {}",
                    self.id, tx.id
                )));
            }
            if tx.amount <= Decimal::ZERO {
                return Err(DomainError::invariant(format!(
                    "transaction {} has a non-positive amount",
                    tx.id
                )));
            }
            if tx.kind == TransactionKind::Payment {
                check_payment_portions(tx)?;
            }
            running = running.checked_add(tx.balance_delta()).ok_or_else(|| {
                DomainError::invariant(format!("loan {} running balance overflows", self.id))
            })?;
            if tx.balance != running {
                return Err(DomainError::invariant(format!(
                    "transaction {} balance {} breaks the running balance {}",
                    tx.id, tx.balance, running
                )));
            }
        }

        if self.remaining_balance != running {
            return Err(DomainError::invariant(format!(
                "loan {} remaining balance {} does not match last transaction balance {}",
                self.id, self.remaining_balance, running
            )));
        }
        Ok(())
    }

    /// Terms fixed at opening must agree with each other and the disbursement.
    fn check_terms(&self, disbursement: &Transaction) -> DomainResult<()> {
        let broken = |what: &str| {
            Err(DomainError::invariant(format!("loan {} {what}", self.id)))
        };
        if self.principal <= Decimal::ZERO {
            return broken("has a non-positive principal");
        }
        if self.interest_rate < Decimal::ZERO {
            return broken("has a negative interest rate");
        }
        if flat_interest(self.principal, self.interest_rate) != Some(self.original_interest) {
            return broken("original interest does not match principal and rate");
        }
        if disbursement.amount != self.principal {
            return broken("disbursement amount does not match the principal");
        }
        if self.principal.checked_add(self.original_interest) != Some(disbursement.balance) {
            return broken("disbursement balance does not match principal plus interest");
        }
        Ok(())
    }
}

fn check_payment_portions(tx: &Transaction) -> DomainResult<()> {
    let (Some(interest), Some(principal)) = (tx.interest_portion, tx.principal_portion) else {
        return Err(DomainError::invariant(format!(
            "payment {} has no interest/principal breakdown",
            tx.id
        )));
    };
    if interest < Decimal::ZERO
        || principal < Decimal::ZERO
        || tx.amount.checked_sub(interest) != Some(principal)
    {
        return Err(DomainError::invariant(format!(
            "payment {} breakdown does not add up to its amount",
            tx.id
        )));
    }
    Ok(())
}

impl AggregateRoot for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLoan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLoan {
    pub loan_id: LoanId,
    pub disbursement_id: TransactionId,
    pub terms: LoanTerms,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub loan_id: LoanId,
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Command: AddInterest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInterest {
    pub loan_id: LoanId,
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Defaults to [`LATE_INTEREST_NOTE`].
    pub note: Option<String>,
}

/// Command: DeleteTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTransaction {
    pub loan_id: LoanId,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanCommand {
    OpenLoan(OpenLoan),
    RecordPayment(RecordPayment),
    AddInterest(AddInterest),
    DeleteTransaction(DeleteTransaction),
}

/// Event: LoanOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOpened {
    pub loan_id: LoanId,
    pub terms: LoanTerms,
    pub original_interest: Decimal,
    pub due_date: NaiveDate,
    pub disbursement: Transaction,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub loan_id: LoanId,
    pub transaction: Transaction,
}

/// Event: InterestAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAdded {
    pub loan_id: LoanId,
    pub transaction: Transaction,
    pub due_date: NaiveDate,
}

/// Event: TransactionDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDeleted {
    pub loan_id: LoanId,
    pub transaction: Transaction,
    /// Shift applied to every later running balance.
    pub impact: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanOpened(LoanOpened),
    PaymentRecorded(PaymentRecorded),
    InterestAdded(InterestAdded),
    TransactionDeleted(TransactionDeleted),
}

impl Event for LoanEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoanEvent::LoanOpened(_) => "ledger.loan.opened",
            LoanEvent::PaymentRecorded(_) => "ledger.loan.payment_recorded",
            LoanEvent::InterestAdded(_) => "ledger.loan.interest_added",
            LoanEvent::TransactionDeleted(_) => "ledger.loan.transaction_deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_on(&self) -> NaiveDate {
        match self {
            LoanEvent::LoanOpened(e) => e.terms.start_date,
            LoanEvent::PaymentRecorded(e) => e.transaction.date,
            LoanEvent::InterestAdded(e) => e.transaction.date,
            LoanEvent::TransactionDeleted(e) => e.transaction.date,
        }
    }
}

impl Aggregate for Loan {
    type Command = LoanCommand;
    type Event = LoanEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LoanEvent::LoanOpened(e) => {
                self.id = e.loan_id.clone();
                self.principal = e.terms.principal;
                self.interest_rate = e.terms.interest_rate;
                self.original_interest = e.original_interest;
                self.start_date = e.terms.start_date;
                self.due_date = e.due_date;
                self.next_singil_date = e.due_date;
                self.payment_schedule = e.terms.schedule;
                self.remaining_balance = e.disbursement.balance;
                self.transactions = vec![e.disbursement.clone()];
            }
            LoanEvent::PaymentRecorded(e) => {
                self.remaining_balance = e.transaction.balance;
                self.transactions.push(e.transaction.clone());
            }
            LoanEvent::InterestAdded(e) => {
                self.remaining_balance = e.transaction.balance;
                self.due_date = e.due_date;
                self.next_singil_date = e.due_date;
                self.transactions.push(e.transaction.clone());
            }
            LoanEvent::TransactionDeleted(e) => {
                if let Some(idx) = position_of(&self.transactions, &e.transaction.id) {
                    self.transactions.remove(idx);
                    recompute_suffix_balances(&mut self.transactions, idx, e.impact);
                }
                if let Some(last) = self.transactions.last() {
                    self.remaining_balance = last.balance;
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LoanCommand::OpenLoan(cmd) => self.handle_open(cmd),
            LoanCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            LoanCommand::AddInterest(cmd) => self.handle_add_interest(cmd),
            LoanCommand::DeleteTransaction(cmd) => self.handle_delete_transaction(cmd),
        }
    }
}

impl Loan {
    fn ensure_loan_id(&self, loan_id: &LoanId) -> Result<(), DomainError> {
        if &self.id != loan_id {
            return Err(DomainError::invariant("loan_id mismatch"));
        }
        Ok(())
    }

    fn ensure_opened(&self, loan_id: &LoanId) -> Result<(), DomainError> {
        if !self.is_opened() {
            return Err(DomainError::not_found());
        }
        self.ensure_loan_id(loan_id)
    }

    fn ensure_fresh_transaction_id(&self, id: &TransactionId) -> Result<(), DomainError> {
        if position_of(&self.transactions, id).is_some() {
            return Err(DomainError::invariant(format!(
                "transaction id {id} is already used on this loan"
            )));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenLoan) -> Result<Vec<LoanEvent>, DomainError> {
        if self.is_opened() {
            return Err(DomainError::invariant("loan is already open"));
        }
        self.ensure_loan_id(&cmd.loan_id)?;
        cmd.terms.validate()?;

        let original_interest = cmd.terms.original_interest()?;
        let total_due = cmd
            .terms
            .principal
            .checked_add(original_interest)
            .ok_or_else(too_large)?;
        let due_date = roll_forward(cmd.terms.start_date)?;

        Ok(vec![LoanEvent::LoanOpened(LoanOpened {
            loan_id: cmd.loan_id.clone(),
            terms: cmd.terms.clone(),
            original_interest,
            due_date,
            disbursement: Transaction::disbursement(
                cmd.disbursement_id.clone(),
                cmd.terms.start_date,
                cmd.terms.principal,
                total_due,
                Some(DISBURSEMENT_NOTE.to_string()),
            ),
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(&cmd.loan_id)?;

        if cmd.amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let allocation = self.allocate_payment(cmd.amount);
        if allocation.total <= Decimal::ZERO {
            return Err(DomainError::validation("loan has no remaining balance"));
        }
        self.ensure_fresh_transaction_id(&cmd.transaction_id)?;

        let balance = self.remaining_balance - allocation.total;
        Ok(vec![LoanEvent::PaymentRecorded(PaymentRecorded {
            loan_id: cmd.loan_id.clone(),
            transaction: Transaction::payment(
                cmd.transaction_id.clone(),
                cmd.date,
                allocation,
                balance,
                cmd.note.clone(),
            ),
        })])
    }

    fn handle_add_interest(&self, cmd: &AddInterest) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(&cmd.loan_id)?;

        if cmd.amount <= Decimal::ZERO {
            return Err(DomainError::validation("interest amount must be positive"));
        }
        self.ensure_fresh_transaction_id(&cmd.transaction_id)?;

        let due_date = roll_forward(cmd.date)?;
        let balance = self
            .remaining_balance
            .checked_add(cmd.amount)
            .ok_or_else(too_large)?;
        let note = cmd
            .note
            .clone()
            .unwrap_or_else(|| LATE_INTEREST_NOTE.to_string());

        Ok(vec![LoanEvent::InterestAdded(InterestAdded {
            loan_id: cmd.loan_id.clone(),
            transaction: Transaction::interest(
                cmd.transaction_id.clone(),
                cmd.date,
                cmd.amount,
                balance,
                Some(note),
            ),
            due_date,
        })])
    }

    fn handle_delete_transaction(
        &self,
        cmd: &DeleteTransaction,
    ) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(&cmd.loan_id)?;

        // Stale reference: nothing to retract.
        let Some(idx) = position_of(&self.transactions, &cmd.transaction_id) else {
            return Ok(vec![]);
        };
        let target = &self.transactions[idx];

        let impact = match target.kind {
            TransactionKind::Disbursement => {
                return Err(DomainError::invariant(
                    "the initial disbursement cannot be deleted; delete the borrower instead",
                ));
            }
            TransactionKind::Payment => target.amount,
            TransactionKind::Interest => -target.amount,
        };
        if self.transactions[idx + 1..]
            .iter()
            .any(|tx| tx.balance.checked_add(impact).is_none())
        {
            return Err(too_large());
        }

        Ok(vec![LoanEvent::TransactionDeleted(TransactionDeleted {
            loan_id: cmd.loan_id.clone(),
            transaction: target.clone(),
            impact,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open(principal: Decimal, rate: Decimal) -> Loan {
        Loan::open(OpenLoan {
            loan_id: "l1".into(),
            disbursement_id: "t1".into(),
            terms: LoanTerms::new(principal, rate, date(2025, 10, 1), PaymentSchedule::Monthly),
        })
        .unwrap()
    }

    fn pay(loan: &Loan, id: &str, amount: Decimal) -> Loan {
        let cmd = LoanCommand::RecordPayment(RecordPayment {
            loan_id: "l1".into(),
            transaction_id: id.into(),
            amount,
            date: date(2025, 10, 10),
            note: None,
        });
        loan.execute(&cmd).unwrap().0
    }

    fn charge(loan: &Loan, id: &str, amount: Decimal) -> Loan {
        let cmd = LoanCommand::AddInterest(AddInterest {
            loan_id: "l1".into(),
            transaction_id: id.into(),
            amount,
            date: date(2025, 10, 20),
            note: None,
        });
        loan.execute(&cmd).unwrap().0
    }

    #[test]
    fn open_loan_seeds_disbursement_and_due_dates() {
        let loan = open(dec!(1000), dec!(15));

        assert_eq!(loan.original_interest(), dec!(150));
        assert_eq!(loan.remaining_balance(), dec!(1150));
        assert_eq!(loan.due_date(), date(2025, 10, 31));
        assert_eq!(loan.next_singil_date(), date(2025, 10, 31));
        assert_eq!(loan.version(), 1);

        let txs = loan.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TransactionKind::Disbursement);
        assert_eq!(txs[0].amount, dec!(1000));
        assert_eq!(txs[0].balance, dec!(1150));
        assert_eq!(txs[0].note.as_deref(), Some(DISBURSEMENT_NOTE));
        loan.check_invariants().unwrap();
    }

    #[test]
    fn due_date_offset_ignores_schedule() {
        for schedule in [PaymentSchedule::Daily, PaymentSchedule::Weekly] {
            let loan = Loan::open(OpenLoan {
                loan_id: "l1".into(),
                disbursement_id: "t1".into(),
                terms: LoanTerms::new(dec!(500), dec!(10), date(2025, 2, 1), schedule),
            })
            .unwrap();
            assert_eq!(loan.due_date(), date(2025, 3, 3));
        }
    }

    #[test]
    fn open_rejects_bad_terms() {
        let bad_principal = Loan::open(OpenLoan {
            loan_id: "l1".into(),
            disbursement_id: "t1".into(),
            terms: LoanTerms::new(dec!(0), dec!(15), date(2025, 1, 1), PaymentSchedule::Monthly),
        });
        assert!(matches!(bad_principal, Err(DomainError::Validation(_))));

        let bad_rate = Loan::open(OpenLoan {
            loan_id: "l1".into(),
            disbursement_id: "t1".into(),
            terms: LoanTerms::new(dec!(100), dec!(-1), date(2025, 1, 1), PaymentSchedule::Monthly),
        });
        assert!(matches!(bad_rate, Err(DomainError::Validation(_))));
    }

    #[test]
    fn zero_rate_loan_allocates_everything_to_principal() {
        let loan = open(dec!(800), dec!(0));
        let allocation = loan.allocate_payment(dec!(100));
        assert_eq!(allocation.interest_portion, dec!(0));
        assert_eq!(allocation.principal_portion, dec!(100));
    }

    #[test]
    fn payment_uses_original_ratio() {
        let loan = open(dec!(1000), dec!(15));
        let loan = pay(&loan, "t2", dec!(230));

        let tx = loan.transactions().last().unwrap();
        assert_eq!(tx.kind, TransactionKind::Payment);
        assert_eq!(tx.interest_portion, Some(dec!(30)));
        assert_eq!(tx.principal_portion, Some(dec!(200)));
        assert_eq!(tx.balance, dec!(920));
        assert_eq!(loan.remaining_balance(), dec!(920));

        // Same ratio after the balance composition changed.
        let allocation = loan.allocate_payment(dec!(115));
        assert_eq!(allocation.interest_portion, dec!(15));
    }

    #[test]
    fn settled_loan_rejects_payment() {
        let loan = pay(&open(dec!(1000), dec!(15)), "t2", dec!(9999));
        assert!(loan.is_settled());

        let err = loan
            .handle(&LoanCommand::RecordPayment(RecordPayment {
                loan_id: "l1".into(),
                transaction_id: "t3".into(),
                amount: dec!(1),
                date: date(2025, 11, 1),
                note: None,
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("loan has no remaining balance"));
    }

    #[test]
    fn interest_rolls_due_dates_forward() {
        let loan = charge(&open(dec!(1000), dec!(15)), "t2", dec!(100));
        assert_eq!(loan.remaining_balance(), dec!(1250));
        assert_eq!(loan.due_date(), date(2025, 11, 19));
        assert_eq!(loan.next_singil_date(), date(2025, 11, 19));
        assert_eq!(
            loan.transactions()[1].note.as_deref(),
            Some(LATE_INTEREST_NOTE)
        );
    }

    #[test]
    fn suggested_interest_is_fifteen_percent_of_balance() {
        let loan = pay(&open(dec!(1000), dec!(15)), "t2", dec!(0.33));
        assert_eq!(loan.remaining_balance(), dec!(1149.67));
        assert_eq!(loan.suggested_interest(), dec!(172.45));
    }

    #[test]
    fn deleting_unknown_transaction_emits_nothing() {
        let loan = open(dec!(1000), dec!(15));
        let events = loan
            .handle(&LoanCommand::DeleteTransaction(DeleteTransaction {
                loan_id: "l1".into(),
                transaction_id: "missing".into(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn disbursement_cannot_be_deleted() {
        let loan = open(dec!(1000), dec!(15));
        let err = loan
            .handle(&LoanCommand::DeleteTransaction(DeleteTransaction {
                loan_id: "l1".into(),
                transaction_id: "t1".into(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("initial disbursement") => {}
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn reused_transaction_id_is_rejected() {
        let loan = pay(&open(dec!(1000), dec!(15)), "t2", dec!(10));
        let err = loan
            .handle(&LoanCommand::AddInterest(AddInterest {
                loan_id: "l1".into(),
                transaction_id: "t2".into(),
                amount: dec!(5),
                date: date(2025, 10, 12),
                note: None,
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn check_invariants_detects_tampered_balance() {
        let loan = pay(&open(dec!(1000), dec!(15)), "t2", dec!(100));
        let mut json = serde_json::to_value(&loan).unwrap();
        json["transactions"][1]["balance"] = serde_json::json!("1000");
        let tampered: Loan = serde_json::from_value(json).unwrap();
        assert!(tampered.check_invariants().is_err());
    }

    fn huge(mantissa: i128, exp: u32) -> Decimal {
        Decimal::from_i128_with_scale(mantissa * 10i128.pow(exp), 0)
    }

    fn tampered(loan: &Loan, edit: impl FnOnce(&mut serde_json::Value)) -> DomainResult<()> {
        let mut json = serde_json::to_value(loan).unwrap();
        edit(&mut json);
        let loan: Loan = serde_json::from_value(json).unwrap();
        loan.check_invariants()
    }

    fn violation_mentions(result: DomainResult<()>, needle: &str) {
        match result {
            Err(DomainError::InvariantViolation(msg)) => {
                assert!(msg.contains(needle), "{msg} does not mention {needle}")
            }
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn open_rejects_terms_too_large_to_represent() {
        let err = Loan::open(OpenLoan {
            loan_id: "l1".into(),
            disbursement_id: "t1".into(),
            terms: LoanTerms::new(huge(1, 28), dec!(15), date(2025, 10, 1), PaymentSchedule::Monthly),
        })
        .unwrap_err();
        assert_eq!(err, DomainError::validation("amount too large"));

        let err = Loan::open(OpenLoan {
            loan_id: "l1".into(),
            disbursement_id: "t1".into(),
            terms: LoanTerms::new(huge(7, 28), dec!(50), date(2025, 10, 1), PaymentSchedule::Monthly),
        })
        .unwrap_err();
        assert_eq!(err, DomainError::validation("amount too large"));
    }

    #[test]
    fn large_payment_falls_back_to_ratio_allocation() {
        let loan = open(huge(1, 16), dec!(15));
        let paid = pay(&loan, "t2", huge(1, 16));
        let tx = &paid.transactions()[1];
        let interest = tx.interest_portion.unwrap();
        assert!(interest > huge(13, 14) && interest < huge(14, 14));
        assert_eq!(tx.amount - interest, tx.principal_portion.unwrap());
        assert_eq!(paid.remaining_balance(), huge(15, 14));
        paid.check_invariants().unwrap();
    }

    #[test]
    fn interest_beyond_representable_balance_is_rejected() {
        let loan = open(huge(7, 28), dec!(0));
        let err = loan
            .execute(&LoanCommand::AddInterest(AddInterest {
                loan_id: "l1".into(),
                transaction_id: "t2".into(),
                amount: huge(2, 28),
                date: date(2025, 10, 20),
                note: None,
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("amount too large"));
        assert_eq!(loan.transactions().len(), 1);
    }

    #[test]
    fn check_invariants_reports_running_balance_overflow() {
        let loan = open(huge(7, 28), dec!(0));
        let result = tampered(&loan, |json| {
            let big = huge(7, 28).to_string();
            json["transactions"]
                .as_array_mut()
                .unwrap()
                .push(serde_json::json!({
                    "id": "t9",
                    "type": "interest",
                    "date": "2025-10-02",
                    "amount": big,
                    "balance": big,
                }));
        });
        violation_mentions(result, "overflows");
    }

    #[test]
    fn check_invariants_detects_inconsistent_terms() {
        let loan = charge(&open(dec!(1000), dec!(15)), "t2", dec!(100));
        loan.check_invariants().unwrap();

        violation_mentions(
            tampered(&loan, |json| json["originalInterest"] = serde_json::json!("42")),
            "original interest",
        );
        violation_mentions(
            tampered(&loan, |json| {
                json["transactions"][0]["balance"] = serde_json::json!("99999");
                json["transactions"][1]["balance"] = serde_json::json!("100099");
                json["remainingBalance"] = serde_json::json!("100099");
            }),
            "disbursement balance",
        );
        violation_mentions(
            tampered(&loan, |json| json["transactions"][1]["amount"] = serde_json::json!("-5")),
            "non-positive amount",
        );
        violation_mentions(
            tampered(&loan, |json| json["transactions"][0]["amount"] = serde_json::json!("900")),
            "disbursement amount",
        );
        violation_mentions(
            tampered(&loan, |json| json["principal"] = serde_json::json!("0")),
            "non-positive principal",
        );
    }

    #[test]
    fn check_invariants_requires_payment_breakdown() {
        let loan = pay(&open(dec!(1000), dec!(15)), "t2", dec!(230));
        loan.check_invariants().unwrap();

        violation_mentions(
            tampered(&loan, |json| {
                json["transactions"][1]
                    .as_object_mut()
                    .unwrap()
                    .remove("interestPortion");
            }),
            "no interest/principal breakdown",
        );
        violation_mentions(
            tampered(&loan, |json| {
                json["transactions"][1]["principalPortion"] = serde_json::json!("150")
            }),
            "does not add up",
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let loan = open(dec!(1000), dec!(15));
        let json = serde_json::to_value(&loan).unwrap();
        assert_eq!(json["nextSingilDate"], "2025-10-31");
        assert_eq!(json["paymentSchedule"], "monthly");
        assert_eq!(json["transactions"][0]["type"], "disbursement");
    }
}
