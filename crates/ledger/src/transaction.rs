use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use singil_core::{Entity, TransactionId, ValueObject};

/// What a transaction did to the loan balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Principal lent out; establishes the starting balance.
    #[serde(alias = "loan")]
    Disbursement,
    /// Money received from the borrower; lowers the balance.
    Payment,
    /// Late-payment interest charged; raises the balance.
    Interest,
}

impl TransactionKind {
    /// Human-readable label for history listings.
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Disbursement => "Loan Disbursed",
            TransactionKind::Payment => "Payment Received",
            TransactionKind::Interest => "Interest Added",
        }
    }

    /// Sign shown next to the amount in history listings.
    pub fn sign(self) -> char {
        match self {
            TransactionKind::Payment => '-',
            TransactionKind::Disbursement | TransactionKind::Interest => '+',
        }
    }
}

/// Split of a payment between owed interest and owed principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAllocation {
    /// Amount actually applied (requested amount capped at the balance).
    pub total: Decimal,
    pub interest_portion: Decimal,
    pub principal_portion: Decimal,
}

impl ValueObject for PaymentAllocation {}

impl PaymentAllocation {
    pub fn zero() -> Self {
        Self {
            total: Decimal::ZERO,
            interest_portion: Decimal::ZERO,
            principal_portion: Decimal::ZERO,
        }
    }
}

/// One entry in a loan's history.
///
/// `balance` is an absolute snapshot of the loan balance right after this
/// entry, never a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: NaiveDate,
    /// Always positive; direction comes from `kind`.
    pub amount: Decimal,
    pub balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_portion: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_portion: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Transaction {
    pub fn disbursement(
        id: TransactionId,
        date: NaiveDate,
        principal: Decimal,
        balance: Decimal,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            kind: TransactionKind::Disbursement,
            date,
            amount: principal,
            balance,
            interest_portion: None,
            principal_portion: None,
            note,
        }
    }

    pub fn payment(
        id: TransactionId,
        date: NaiveDate,
        allocation: PaymentAllocation,
        balance: Decimal,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            kind: TransactionKind::Payment,
            date,
            amount: allocation.total,
            balance,
            interest_portion: Some(allocation.interest_portion),
            principal_portion: Some(allocation.principal_portion),
            note,
        }
    }

    pub fn interest(
        id: TransactionId,
        date: NaiveDate,
        amount: Decimal,
        balance: Decimal,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            kind: TransactionKind::Interest,
            date,
            amount,
            balance,
            interest_portion: None,
            principal_portion: None,
            note,
        }
    }

    /// Signed change this entry makes to the running balance.
    ///
    /// A disbursement moves the balance from zero to the initial total due, so
    /// its contribution is its own `balance` (principal plus original interest).
    pub fn balance_delta(&self) -> Decimal {
        match self.kind {
            TransactionKind::Disbursement => self.balance,
            TransactionKind::Payment => -self.amount,
            TransactionKind::Interest => self.amount,
        }
    }

    /// Payment split, if this is a payment.
    pub fn allocation(&self) -> Option<PaymentAllocation> {
        match (self.kind, self.interest_portion, self.principal_portion) {
            (TransactionKind::Payment, Some(interest_portion), Some(principal_portion)) => {
                Some(PaymentAllocation {
                    total: self.amount,
                    interest_portion,
                    principal_portion,
                })
            }
            _ => None,
        }
    }
}

/// Add `impact` to the stored balance of every entry at index `from` or later.
///
/// Because balances are absolute snapshots, retracting one entry shifts every
/// later snapshot by the same amount regardless of the later entries' kinds.
pub fn recompute_suffix_balances(transactions: &mut [Transaction], from: usize, impact: Decimal) {
    if from >= transactions.len() {
        return;
    }
    for tx in &mut transactions[from..] {
        tx.balance += impact;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn balance_delta_follows_kind() {
        let disb = Transaction::disbursement("t1".into(), day(1), dec!(1000), dec!(1150), None);
        let pay = Transaction::payment(
            "t2".into(),
            day(2),
            PaymentAllocation {
                total: dec!(230),
                interest_portion: dec!(30),
                principal_portion: dec!(200),
            },
            dec!(920),
            None,
        );
        let int = Transaction::interest("t3".into(), day(3), dec!(100), dec!(1020), None);

        assert_eq!(disb.balance_delta(), dec!(1150));
        assert_eq!(pay.balance_delta(), dec!(-230));
        assert_eq!(int.balance_delta(), dec!(100));
        assert_eq!(pay.allocation().unwrap().interest_portion, dec!(30));
        assert!(int.allocation().is_none());
    }

    #[test]
    fn suffix_recompute_shifts_only_later_entries() {
        let mut txs = vec![
            Transaction::disbursement("t1".into(), day(1), dec!(1000), dec!(1150), None),
            Transaction::interest("t2".into(), day(2), dec!(100), dec!(1250), None),
            Transaction::interest("t3".into(), day(3), dec!(50), dec!(1300), None),
        ];
        recompute_suffix_balances(&mut txs, 1, dec!(-100));
        let balances: Vec<_> = txs.iter().map(|t| t.balance).collect();
        assert_eq!(balances, vec![dec!(1150), dec!(1150), dec!(1200)]);

        recompute_suffix_balances(&mut txs, 3, dec!(999));
        assert_eq!(txs[2].balance, dec!(1200));
    }

    #[test]
    fn serializes_kind_as_type_and_omits_missing_portions() {
        let tx = Transaction::interest(
            "t9".into(),
            day(1),
            dec!(100),
            dec!(1250),
            Some("Late payment interest".to_string()),
        );
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "interest");
        assert_eq!(json["date"], "2025-10-01");
        assert!(json.get("interestPortion").is_none());
        assert_eq!(json["note"], "Late payment interest");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn accepts_legacy_loan_type_for_disbursement() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id":"t1","type":"loan","date":"2025-10-01","amount":1000,"balance":1150}"#,
        )
        .unwrap();
        assert_eq!(tx.kind, TransactionKind::Disbursement);
        assert_eq!(tx.balance, dec!(1150));
        assert_eq!(serde_json::to_value(&tx).unwrap()["type"], "disbursement");
    }
}
