//! Command-line surface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use singil_core::{BorrowerId, LoanId, TransactionId};
use singil_infra::config::{ENV_DATA_DIR, ENV_SLOT, ENV_STORE};
use singil_ledger::{BorrowerSort, PaymentSchedule};

#[derive(Parser, Debug)]
#[command(name = "singil", version, about = "Personal lending ledger")]
pub struct Cli {
    /// Directory holding the ledger file (overrides SINGIL_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Slot (file stem) of the ledger (overrides SINGIL_SLOT)
    #[arg(long, global = true, value_name = "NAME")]
    pub slot: Option<String>,

    /// Keep the ledger in memory only; nothing is written to disk
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Value a flag supplies for a configuration key, if any.
    pub fn override_for(&self, key: &str) -> Option<String> {
        match key {
            ENV_DATA_DIR => self.data_dir.as_ref().map(|d| d.display().to_string()),
            ENV_SLOT => self.slot.clone(),
            ENV_STORE if self.memory => Some("memory".to_string()),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Portfolio totals and the borrower list
    Dashboard {
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
    },
    /// Manage borrowers
    #[command(subcommand)]
    Borrower(BorrowerCommand),
    /// Manage loans and their transactions
    #[command(subcommand)]
    Loan(LoanCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BorrowerCommand {
    /// Add a borrower
    Add { name: String },
    /// Change a borrower's name
    Rename { id: BorrowerId, name: String },
    /// Delete a borrower and all of their loans
    Delete { id: BorrowerId },
    /// Show a borrower's loans and transaction history
    Show { id: BorrowerId },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LoanCommand {
    /// Lend money to a borrower
    Add(AddLoanArgs),
    /// Record a payment (capped at the remaining balance)
    Pay {
        loan_id: LoanId,
        amount: Decimal,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show how a payment would be split without recording it
    Preview { loan_id: LoanId, amount: Decimal },
    /// Charge late-payment interest (defaults to 15% of the balance)
    Interest {
        loan_id: LoanId,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a payment or interest entry
    DeleteTx {
        loan_id: LoanId,
        transaction_id: TransactionId,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AddLoanArgs {
    pub borrower_id: BorrowerId,
    #[arg(long)]
    pub principal: Decimal,
    /// Interest rate in percent of the principal
    #[arg(long, default_value = "15")]
    pub rate: Decimal,
    /// Start date (YYYY-MM-DD), today when omitted
    #[arg(long)]
    pub start: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = ScheduleArg::Monthly)]
    pub schedule: ScheduleArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    SingilDate,
    RecentTransaction,
}

impl From<SortArg> for BorrowerSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => BorrowerSort::Name,
            SortArg::SingilDate => BorrowerSort::SingilDate,
            SortArg::RecentTransaction => BorrowerSort::RecentTransaction,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScheduleArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<ScheduleArg> for PaymentSchedule {
    fn from(value: ScheduleArg) -> Self {
        match value {
            ScheduleArg::Daily => PaymentSchedule::Daily,
            ScheduleArg::Weekly => PaymentSchedule::Weekly,
            ScheduleArg::Monthly => PaymentSchedule::Monthly,
        }
    }
}
