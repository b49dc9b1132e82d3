//! Reconciliation arithmetic.
//!
//! Three independent, pure calculations over anything that exposes closure
//! amounts. A missing amount counts as zero, so the same functions serve a
//! fully built record and a half-filled form wanting a live preview.
//!
//! - system total: cash + credit + debit + online + pix (system side).
//!   Terminal card amounts and counts are not part of it.
//! - drawer cash expected: float + reinforcement + system cash
//!   - expenses - deposit.
//! - cash variance: drawer cash expected - counted cash. Positive is a
//!   shortage, negative a surplus.
//!
//! All amounts are integer cents, so every result is already rounded to two
//! decimals.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::field::{ClosureField, FieldKind};
use crate::labels::canonicalize;
use crate::money::Money;
use crate::parse::parse_money;
use crate::raw::RawClosureInput;

/// Amounts a reconciliation can be computed from.
pub trait ClosureAmounts {
    /// The amount stored for a monetary field, `None` when absent.
    fn amount(&self, field: ClosureField) -> Option<Money>;

    fn amount_or_zero(&self, field: ClosureField) -> Money {
        self.amount(field).unwrap_or(Money::ZERO)
    }
}

const SYSTEM_TOTAL_FIELDS: [ClosureField; 5] = [
    ClosureField::CashSystemAmount,
    ClosureField::CreditSystemAmount,
    ClosureField::DebitSystemAmount,
    ClosureField::OnlinePaymentAmount,
    ClosureField::PixAmount,
];

pub fn system_total(record: &impl ClosureAmounts) -> Money {
    SYSTEM_TOTAL_FIELDS
        .iter()
        .map(|f| record.amount_or_zero(*f))
        .sum()
}

pub fn drawer_cash_expected(record: &impl ClosureAmounts) -> Money {
    record.amount_or_zero(ClosureField::OpeningFloat)
        + record.amount_or_zero(ClosureField::ReinforcementAmount)
        + record.amount_or_zero(ClosureField::CashSystemAmount)
        - record.amount_or_zero(ClosureField::ExpensesAmount)
        - record.amount_or_zero(ClosureField::DepositAmount)
}

pub fn cash_variance(record: &impl ClosureAmounts) -> Money {
    drawer_cash_expected(record) - record.amount_or_zero(ClosureField::CountedCashAmount)
}

/// The three derived amounts, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub system_total: Money,
    pub drawer_cash_expected: Money,
    pub cash_variance: Money,
}

impl Reconciliation {
    pub fn of(record: &impl ClosureAmounts) -> Self {
        Self {
            system_total: system_total(record),
            drawer_cash_expected: drawer_cash_expected(record),
            cash_variance: cash_variance(record),
        }
    }
}

/// A sparse set of amounts, e.g. an in-progress form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialAmounts {
    amounts: BTreeMap<ClosureField, Money>,
}

impl PartialAmounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a monetary field. Non-monetary fields are ignored.
    pub fn set(&mut self, field: ClosureField, amount: Money) -> &mut Self {
        if field.kind() == FieldKind::Money {
            self.amounts.insert(field, amount);
        }
        self
    }

    pub fn with(mut self, field: ClosureField, amount: Money) -> Self {
        self.set(field, amount);
        self
    }

    /// Lenient read of a raw submission for previews.
    ///
    /// Labels are normalized as usual; a value that does not parse (or is
    /// negative) is left out and so counts as zero. No validation error is
    /// raised.
    pub fn from_raw(raw: &RawClosureInput) -> Self {
        let input = canonicalize(raw);
        let mut out = Self::new();
        for (field, sourced) in input.fields() {
            if field.kind() != FieldKind::Money {
                continue;
            }
            if let Ok(amount) = parse_money(&sourced.value, false) {
                out.set(field, amount);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

impl ClosureAmounts for PartialAmounts {
    fn amount(&self, field: ClosureField) -> Option<Money> {
        self.amounts.get(&field).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawValue;

    fn units(u: i64) -> Money {
        Money::from_cents(u * 100)
    }

    #[test]
    fn empty_record_is_all_zero() {
        let r = Reconciliation::of(&PartialAmounts::new());
        assert_eq!(r.system_total, Money::ZERO);
        assert_eq!(r.drawer_cash_expected, Money::ZERO);
        assert_eq!(r.cash_variance, Money::ZERO);
    }

    #[test]
    fn system_total_sums_five_channels() {
        let p = PartialAmounts::new()
            .with(ClosureField::CashSystemAmount, units(100))
            .with(ClosureField::CreditSystemAmount, units(20))
            .with(ClosureField::DebitSystemAmount, units(30))
            .with(ClosureField::OnlinePaymentAmount, units(10))
            .with(ClosureField::PixAmount, units(5));
        assert_eq!(system_total(&p), units(165));
    }

    #[test]
    fn system_total_ignores_terminal_amounts() {
        let base = PartialAmounts::new().with(ClosureField::PixAmount, units(5));
        let with_terminal = base
            .clone()
            .with(ClosureField::CreditTerminalAmount, units(900))
            .with(ClosureField::DebitTerminalAmount, units(40));
        assert_eq!(system_total(&base), system_total(&with_terminal));
    }

    #[test]
    fn drawer_and_variance() {
        let p = PartialAmounts::new()
            .with(ClosureField::OpeningFloat, units(50))
            .with(ClosureField::ReinforcementAmount, units(10))
            .with(ClosureField::CashSystemAmount, units(100))
            .with(ClosureField::ExpensesAmount, units(5))
            .with(ClosureField::DepositAmount, units(15))
            .with(ClosureField::CountedCashAmount, units(145));
        assert_eq!(drawer_cash_expected(&p), units(140));
        assert_eq!(cash_variance(&p), units(-5));
    }

    #[test]
    fn shortage_is_positive() {
        let p = PartialAmounts::new()
            .with(ClosureField::CashSystemAmount, Money::from_cents(10_050))
            .with(ClosureField::CountedCashAmount, Money::from_cents(10_000));
        assert_eq!(cash_variance(&p), Money::from_cents(50));
    }

    #[test]
    fn set_ignores_non_money_fields() {
        let mut p = PartialAmounts::new();
        p.set(ClosureField::Notes, units(1));
        p.set(ClosureField::CardDeliveryCount, units(1));
        assert!(p.is_empty());
    }

    #[test]
    fn from_raw_is_lenient() {
        let raw = RawClosureInput::from_pairs([
            ("Dinheiro (Sist)", RawValue::from("100,00")),
            ("pix", RawValue::from("oops")),
            ("gastos", RawValue::from("-3")),
            ("entregaCartao", RawValue::from("4")),
        ]);
        let p = PartialAmounts::from_raw(&raw);
        assert_eq!(p.len(), 1);
        assert_eq!(p.amount(ClosureField::CashSystemAmount), Some(units(100)));
        assert_eq!(p.amount(ClosureField::PixAmount), None);
        assert_eq!(system_total(&p), units(100));
    }
}
