//! Command execution against a ledger session.

use std::io::Write;

use anyhow::Context;
use chrono::NaiveDate;

use singil_core::{DomainError, IdGenerator, LoanId};
use singil_infra::{LedgerSession, LedgerStore, StoreError};
use singil_ledger::{LoanTerms, payment_preview};

use crate::args::{AddLoanArgs, BorrowerCommand, Command, LoanCommand};
use crate::format::{currency, date};
use crate::render::{BorrowerDetail, Dashboard};

fn not_found(what: &str) -> anyhow::Error {
    anyhow::Error::new(DomainError::not_found()).context(format!("{what} not found."))
}

/// Run one command. `today` fills in omitted dates.
pub fn execute<S, G>(
    session: &mut LedgerSession<S, G>,
    command: Command,
    today: NaiveDate,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    S: LedgerStore,
    G: IdGenerator,
{
    match command {
        Command::Dashboard { sort } => {
            write!(out, "{}", Dashboard::new(session.state(), sort.into()))?;
        }
        Command::Borrower(command) => borrower(session, command, out)?,
        Command::Loan(command) => loan(session, command, today, out)?,
    }
    Ok(())
}

fn borrower<S, G>(
    session: &mut LedgerSession<S, G>,
    command: BorrowerCommand,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    S: LedgerStore,
    G: IdGenerator,
{
    match command {
        BorrowerCommand::Add { name } => {
            let id = session.add_borrower(&name)?;
            let name = session.state().borrower(&id).map(|b| b.name()).unwrap_or_default();
            writeln!(out, "Added borrower {name} [{id}]")?;
        }
        BorrowerCommand::Rename { id, name } => {
            session
                .rename_borrower(&id, &name)?
                .ok_or_else(|| not_found("Borrower"))?;
            writeln!(out, "Renamed borrower [{id}] to {}", name.trim())?;
        }
        BorrowerCommand::Delete { id } => {
            let removed = session.delete_borrower(&id).ok_or_else(|| not_found("Borrower"))?;
            writeln!(
                out,
                "Deleted borrower {} and {} loan(s)",
                removed.name(),
                removed.loans().len()
            )?;
        }
        BorrowerCommand::Show { id } => {
            let borrower = session.state().borrower(&id).ok_or_else(|| not_found("Borrower"))?;
            write!(out, "{}", BorrowerDetail::new(borrower))?;
        }
    }
    Ok(())
}

fn loan<S, G>(
    session: &mut LedgerSession<S, G>,
    command: LoanCommand,
    today: NaiveDate,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    S: LedgerStore,
    G: IdGenerator,
{
    match command {
        LoanCommand::Add(AddLoanArgs {
            borrower_id,
            principal,
            rate,
            start,
            schedule,
        }) => {
            let terms = LoanTerms::new(principal, rate, start.unwrap_or(today), schedule.into());
            let loan_id = session
                .add_loan(&borrower_id, terms)?
                .ok_or_else(|| not_found("Borrower"))?;
            let loan = session
                .state()
                .loan(&loan_id)
                .context("new loan missing from ledger")?;
            writeln!(
                out,
                "Opened loan [{loan_id}]: {} due, first singil on {}",
                currency(loan.remaining_balance()),
                date(loan.next_singil_date())
            )?;
        }
        LoanCommand::Pay {
            loan_id,
            amount,
            date: on,
            note,
        } => {
            let tx = session
                .record_payment(&loan_id, amount, on.unwrap_or(today), note)?
                .ok_or_else(|| not_found("Loan"))?;
            let allocation = tx.allocation().context("payment recorded without a breakdown")?;
            if allocation.total < amount {
                writeln!(
                    out,
                    "Payment capped at the remaining balance of {}",
                    currency(allocation.total)
                )?;
            }
            writeln!(
                out,
                "Recorded payment [{}] of {} (Principal: {} Interest: {}); balance {}",
                tx.id,
                currency(allocation.total),
                currency(allocation.principal_portion),
                currency(allocation.interest_portion),
                currency(tx.balance)
            )?;
        }
        LoanCommand::Preview { loan_id, amount } => {
            let loan = find_loan(session, &loan_id)?;
            let preview = payment_preview(loan, amount);
            writeln!(
                out,
                "A payment of {} applies {} (Principal: {} Interest: {}); balance after {}",
                currency(amount),
                currency(preview.total),
                currency(preview.principal_portion),
                currency(preview.interest_portion),
                currency(loan.remaining_balance() - preview.total)
            )?;
        }
        LoanCommand::Interest {
            loan_id,
            amount,
            date: on,
            note,
        } => {
            let amount = match amount {
                Some(amount) => amount,
                None => find_loan(session, &loan_id)?.suggested_interest(),
            };
            let charge = session
                .add_interest(&loan_id, amount, on.unwrap_or(today), note)?
                .ok_or_else(|| not_found("Loan"))?;
            writeln!(
                out,
                "Added interest [{}] of {}; balance {}, next singil date {}",
                charge.transaction.id,
                currency(charge.transaction.amount),
                currency(charge.transaction.balance),
                date(charge.due_date)
            )?;
        }
        LoanCommand::DeleteTx {
            loan_id,
            transaction_id,
        } => {
            find_loan(session, &loan_id)?;
            let removed = session
                .delete_transaction(&loan_id, &transaction_id)?
                .ok_or_else(|| not_found("Transaction"))?;
            let balance = find_loan(session, &loan_id)?.remaining_balance();
            writeln!(
                out,
                "Deleted {} [{}] of {}; balance {}",
                removed.kind.label().to_lowercase(),
                removed.id,
                currency(removed.amount),
                currency(balance)
            )?;
        }
    }
    Ok(())
}

fn find_loan<'a, S, G>(
    session: &'a LedgerSession<S, G>,
    loan_id: &LoanId,
) -> anyhow::Result<&'a singil_ledger::Loan>
where
    S: LedgerStore,
    G: IdGenerator,
{
    session.state().loan(loan_id).ok_or_else(|| not_found("Loan"))
}

/// Combine the command outcome with the final save.
///
/// A failed save is always an error; when the command failed too, its error
/// is kept as context so neither is lost.
pub fn conclude(result: anyhow::Result<()>, saved: Result<(), StoreError>) -> anyhow::Result<()> {
    let Err(save_error) = saved else {
        return result;
    };
    let save_error = anyhow::Error::new(save_error).context("ledger changes could not be saved");
    match result {
        Ok(()) => Err(save_error),
        Err(command_error) => Err(save_error.context(format!("{command_error:#}"))),
    }
}
