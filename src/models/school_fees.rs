use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{Entity, Meta};
use crate::database::Collection;
use crate::models::dates;

/// One fee transaction in a student's ledger for a term.
///
/// `bf` is the balance brought forward from the previous transaction and
/// `bal` the balance after this payment. Both are owned by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolFees {
    #[serde(flatten)]
    pub meta: Meta,
    pub student: Uuid,
    pub academic_term: Uuid,
    pub student_class: Uuid,
    #[serde(deserialize_with = "dates::deserialize")]
    pub date: DateTime<Utc>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub bf: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub rn: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub bal: Decimal,
}

impl Entity for SchoolFees {
    const COLLECTION: Collection = Collection::SchoolFees;
    const LABEL: &'static str = "Fee record";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn managed_fields() -> &'static [&'static str] {
        &["bf", "bal"]
    }
}

/// Balance after a payment.
pub fn next_balance(previous: Decimal, amount: Decimal) -> Decimal {
    previous - amount
}

/// `bal` of the latest transaction by date, or zero for an empty ledger.
pub fn current_balance(ledger: &[SchoolFees]) -> Decimal {
    ledger
        .iter()
        .max_by(|a, b| ledger_order(a, b))
        .map(|row| row.bal)
        .unwrap_or(Decimal::ZERO)
}

fn ledger_order(a: &SchoolFees, b: &SchoolFees) -> std::cmp::Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.meta.created_at.cmp(&b.meta.created_at))
}

/// Oldest first by date, then by creation time.
pub fn sort_ledger(ledger: &mut [SchoolFees]) {
    ledger.sort_by(ledger_order);
}

/// Recompute `bf`/`bal` for one student+term ledger, oldest first, starting
/// from zero. Sorts `ledger` in place and returns the ids of rows whose
/// balances changed.
pub fn replay(ledger: &mut [SchoolFees]) -> Vec<Uuid> {
    sort_ledger(ledger);

    let mut changed = Vec::new();
    let mut running = Decimal::ZERO;
    for row in ledger.iter_mut() {
        let bf = running;
        let bal = next_balance(bf, row.amount);
        if row.bf != bf || row.bal != bal {
            row.bf = bf;
            row.bal = bal;
            changed.push(row.meta.id);
        }
        running = bal;
    }
    changed
}

/// Sum of payment amounts.
pub fn total_paid(ledger: &[SchoolFees]) -> Decimal {
    ledger.iter().map(|row| row.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn row(day: u32, amount: i64) -> SchoolFees {
        SchoolFees {
            meta: Meta::new(),
            student: Uuid::nil(),
            academic_term: Uuid::nil(),
            student_class: Uuid::nil(),
            date: Utc.with_ymd_and_hms(2025, 2, day, 9, 0, 0).unwrap(),
            bf: Decimal::ZERO,
            amount: Decimal::from(amount),
            rn: None,
            bal: Decimal::ZERO,
        }
    }

    #[test]
    fn balance_is_previous_minus_amount() {
        assert_eq!(next_balance(Decimal::from(0), Decimal::from(150_000)), Decimal::from(-150_000));
        assert_eq!(next_balance(Decimal::from(-150_000), Decimal::from(-50_000)), Decimal::from(-100_000));
    }

    #[test]
    fn replay_orders_by_date_and_chains_balances() {
        let mut ledger = vec![row(20, 100), row(3, 300), row(10, 200)];
        let changed = replay(&mut ledger);
        assert_eq!(changed.len(), 3);

        let chain: Vec<(Decimal, Decimal, Decimal)> = ledger.iter().map(|r| (r.bf, r.amount, r.bal)).collect();
        let expected: Vec<(Decimal, Decimal, Decimal)> = [(0, 300, -300), (-300, 200, -500), (-500, 100, -600)]
            .into_iter()
            .map(|(bf, amount, bal): (i64, i64, i64)| (Decimal::from(bf), Decimal::from(amount), Decimal::from(bal)))
            .collect();
        assert_eq!(chain, expected);

        // A second replay is a no-op
        assert!(replay(&mut ledger).is_empty());
        assert_eq!(current_balance(&ledger), Decimal::from(-600));
        assert_eq!(total_paid(&ledger), Decimal::from(600));
    }

    #[test]
    fn back_dated_payment_shifts_later_rows() {
        let mut ledger = vec![row(10, 200), row(20, 100)];
        replay(&mut ledger);

        ledger.push(row(5, 50));
        let changed = replay(&mut ledger);
        assert_eq!(changed.len(), 3);
        assert_eq!(ledger[0].amount, Decimal::from(50));
        assert_eq!(current_balance(&ledger), Decimal::from(-350));
    }

    #[test]
    fn empty_ledger_has_zero_balance() {
        assert_eq!(current_balance(&[]), Decimal::ZERO);
    }
}
