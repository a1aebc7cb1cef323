//! Read-only reductions over loans and borrowers (dashboard figures, ordering).
//!
//! Nothing here is cached; every figure is recomputed from the snapshot.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::borrower::Borrower;
use crate::loan::Loan;
use crate::transaction::TransactionKind;

/// Sum of remaining balances.
pub fn total_remaining<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Decimal {
    loans.into_iter().map(Loan::remaining_balance).sum()
}

/// Sum of principals lent.
pub fn total_principal<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Decimal {
    loans.into_iter().map(Loan::principal).sum()
}

/// Sum of the interest share of every payment received.
pub fn total_interest_collected<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Decimal {
    loans
        .into_iter()
        .flat_map(|loan| loan.transactions())
        .filter(|tx| tx.kind == TransactionKind::Payment)
        .filter_map(|tx| tx.interest_portion)
        .sum()
}

/// Earliest next singil date, `None` without loans.
pub fn earliest_upcoming_date<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Option<NaiveDate> {
    loans.into_iter().map(Loan::next_singil_date).min()
}

/// Latest transaction date (by `date`, not entry order), `None` without loans.
pub fn most_recent_transaction_date<'a>(
    loans: impl IntoIterator<Item = &'a Loan>,
) -> Option<NaiveDate> {
    loans
        .into_iter()
        .flat_map(|loan| loan.transactions())
        .map(|tx| tx.date)
        .max()
}

/// Portfolio-wide figures shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_receivable: Decimal,
    pub total_principal: Decimal,
    pub total_interest_collected: Decimal,
}

impl PortfolioSummary {
    pub fn from_borrowers(borrowers: &[Borrower]) -> Self {
        let loans = || borrowers.iter().flat_map(|b| b.loans());
        Self {
            total_receivable: total_remaining(loans()),
            total_principal: total_principal(loans()),
            total_interest_collected: total_interest_collected(loans()),
        }
    }
}

/// Dashboard ordering for the borrower list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorrowerSort {
    /// A–Z, case-insensitive.
    #[default]
    Name,
    /// Earliest upcoming singil date first.
    SingilDate,
    /// Most recent transaction first.
    RecentTransaction,
}

/// Missing dates (borrowers without loans) always sort last.
fn dates_last(a: Option<NaiveDate>, b: Option<NaiveDate>, newest_first: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if newest_first => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Borrowers in display order. Ties keep ledger order.
pub fn sort_borrowers(borrowers: &[Borrower], sort: BorrowerSort) -> Vec<&Borrower> {
    let mut sorted: Vec<&Borrower> = borrowers.iter().collect();
    match sort {
        BorrowerSort::Name => sorted.sort_by_cached_key(|b| b.name().to_lowercase()),
        BorrowerSort::SingilDate => sorted.sort_by(|a, b| {
            dates_last(
                earliest_upcoming_date(a.loans()),
                earliest_upcoming_date(b.loans()),
                false,
            )
        }),
        BorrowerSort::RecentTransaction => sorted.sort_by(|a, b| {
            dates_last(
                most_recent_transaction_date(a.loans()),
                most_recent_transaction_date(b.loans()),
                true,
            )
        }),
    }
    sorted
}
