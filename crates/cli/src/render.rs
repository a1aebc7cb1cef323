//! Text views of the ledger: dashboard and borrower detail.

use std::fmt;

use singil_core::{AggregateRoot, Entity};
use singil_ledger::{
    Borrower, BorrowerSort, LedgerState, Loan, PortfolioSummary, Transaction, TransactionKind,
    sort_borrowers, total_remaining,
};

use crate::format::{currency, date, percent};

fn sort_label(sort: BorrowerSort) -> &'static str {
    match sort {
        BorrowerSort::Name => "Name (A-Z)",
        BorrowerSort::SingilDate => "Singil Date (Earliest)",
        BorrowerSort::RecentTransaction => "Recent Transaction",
    }
}

/// Portfolio totals followed by one line per borrower.
pub struct Dashboard<'a> {
    state: &'a LedgerState,
    sort: BorrowerSort,
}

impl<'a> Dashboard<'a> {
    pub fn new(state: &'a LedgerState, sort: BorrowerSort) -> Self {
        Self { state, sort }
    }
}

impl fmt::Display for Dashboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = PortfolioSummary::from_borrowers(self.state.borrowers());
        writeln!(f, "Total Receivable          {}", currency(summary.total_receivable))?;
        writeln!(f, "Total Principal Lent      {}", currency(summary.total_principal))?;
        writeln!(
            f,
            "Total Interest Collected  {}",
            currency(summary.total_interest_collected)
        )?;
        writeln!(f)?;
        writeln!(f, "All Borrowers (sorted by {})", sort_label(self.sort))?;

        let borrowers = sort_borrowers(self.state.borrowers(), self.sort);
        if borrowers.is_empty() {
            return writeln!(f, "  No borrowers yet.");
        }
        let name_width = borrowers.iter().map(|b| b.name().chars().count()).max().unwrap_or(0);
        for borrower in borrowers {
            let count = borrower.loans().len();
            writeln!(
                f,
                "  {:<name_width$}  {:>2} {:<5}  {:>14}  [{}]",
                borrower.name(),
                count,
                if count == 1 { "loan" } else { "loans" },
                currency(total_remaining(borrower.loans())),
                borrower.id(),
            )?;
        }
        Ok(())
    }
}

/// Everything known about one borrower.
pub struct BorrowerDetail<'a> {
    borrower: &'a Borrower,
}

impl<'a> BorrowerDetail<'a> {
    pub fn new(borrower: &'a Borrower) -> Self {
        Self { borrower }
    }
}

impl fmt::Display for BorrowerDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let borrower = self.borrower;
        writeln!(f, "{} [{}]", borrower.name(), borrower.id())?;
        writeln!(
            f,
            "Total Remaining: {}",
            currency(total_remaining(borrower.loans()))
        )?;

        if borrower.loans().is_empty() {
            writeln!(f)?;
            return writeln!(f, "No loans yet.");
        }
        for (index, loan) in borrower.loans().iter().enumerate() {
            writeln!(f)?;
            write_loan(f, index, loan)?;
        }
        Ok(())
    }
}

fn write_loan(f: &mut fmt::Formatter<'_>, index: usize, loan: &Loan) -> fmt::Result {
    writeln!(
        f,
        "Loan {} [{}]  Remaining Balance {}",
        index + 1,
        loan.id(),
        currency(loan.remaining_balance())
    )?;
    writeln!(f, "  Principal:        {}", currency(loan.principal()))?;
    writeln!(f, "  Interest Rate:    {}", percent(loan.interest_rate()))?;
    writeln!(f, "  Next Singil Date: {}", date(loan.next_singil_date()))?;
    writeln!(f, "  Schedule:         {}", loan.payment_schedule())?;
    writeln!(f, "  Transaction History")?;
    for tx in loan.transactions() {
        write_transaction(f, tx)?;
    }
    Ok(())
}

fn write_transaction(f: &mut fmt::Formatter<'_>, tx: &Transaction) -> fmt::Result {
    write!(
        f,
        "    {:<16}  {:<12}  {:>14}  Balance: {}",
        tx.kind.label(),
        date(tx.date),
        format!("{}{}", tx.kind.sign(), currency(tx.amount)),
        currency(tx.balance),
    )?;
    if tx.kind == TransactionKind::Payment {
        if let Some(allocation) = tx.allocation() {
            write!(
                f,
                "  (Principal: {} Interest: {})",
                currency(allocation.principal_portion),
                currency(allocation.interest_portion)
            )?;
        }
    }
    if let Some(note) = tx.note.as_deref() {
        write!(f, "  \"{note}\"")?;
    }
    writeln!(f, "  [{}]", tx.id)
}
