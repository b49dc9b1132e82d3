//! Canonical closure records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::build::check_employee_name;
use crate::error::{ClosureError, FieldError, ValidationErrors};
use crate::field::{ClosureField, FieldKind};
use crate::money::Money;
use crate::parse::ParseError;
use crate::reconcile::{cash_variance, system_total, ClosureAmounts};

/// The base (submitted) fields of a closure, typed.
///
/// Plain data: no derived amounts live here. Nothing is checked until the
/// base becomes a [`CanonicalClosure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureBase {
    pub operation_date: DateTime<Utc>,
    pub employee_name: Option<String>,
    pub cash_system_amount: Money,
    pub credit_system_amount: Money,
    pub debit_system_amount: Money,
    pub credit_terminal_amount: Money,
    pub debit_terminal_amount: Money,
    pub online_payment_amount: Money,
    pub pix_amount: Money,
    pub counted_cash_amount: Money,
    pub opening_float: Money,
    pub reinforcement_amount: Money,
    pub expenses_amount: Money,
    pub deposit_amount: Money,
    pub card_delivery_count: i64,
    pub popsicle_system_count: i64,
    pub notes: Option<String>,
}

impl ClosureBase {
    /// A record dated `operation_date` with every amount and count at zero.
    pub fn empty(operation_date: DateTime<Utc>) -> Self {
        Self {
            operation_date,
            employee_name: None,
            cash_system_amount: Money::ZERO,
            credit_system_amount: Money::ZERO,
            debit_system_amount: Money::ZERO,
            credit_terminal_amount: Money::ZERO,
            debit_terminal_amount: Money::ZERO,
            online_payment_amount: Money::ZERO,
            pix_amount: Money::ZERO,
            counted_cash_amount: Money::ZERO,
            opening_float: Money::ZERO,
            reinforcement_amount: Money::ZERO,
            expenses_amount: Money::ZERO,
            deposit_amount: Money::ZERO,
            card_delivery_count: 0,
            popsicle_system_count: 0,
            notes: None,
        }
    }

    pub(crate) fn money_mut(&mut self, field: ClosureField) -> Option<&mut Money> {
        Some(match field {
            ClosureField::CashSystemAmount => &mut self.cash_system_amount,
            ClosureField::CreditSystemAmount => &mut self.credit_system_amount,
            ClosureField::DebitSystemAmount => &mut self.debit_system_amount,
            ClosureField::CreditTerminalAmount => &mut self.credit_terminal_amount,
            ClosureField::DebitTerminalAmount => &mut self.debit_terminal_amount,
            ClosureField::OnlinePaymentAmount => &mut self.online_payment_amount,
            ClosureField::PixAmount => &mut self.pix_amount,
            ClosureField::CountedCashAmount => &mut self.counted_cash_amount,
            ClosureField::OpeningFloat => &mut self.opening_float,
            ClosureField::ReinforcementAmount => &mut self.reinforcement_amount,
            ClosureField::ExpensesAmount => &mut self.expenses_amount,
            ClosureField::DepositAmount => &mut self.deposit_amount,
            _ => return None,
        })
    }

    fn count(&self, field: ClosureField) -> Option<i64> {
        match field {
            ClosureField::CardDeliveryCount => Some(self.card_delivery_count),
            ClosureField::PopsicleSystemCount => Some(self.popsicle_system_count),
            _ => None,
        }
    }

    /// Re-check the constraints every canonical record holds: amounts and
    /// counts non-negative, employee name (when present) long enough.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for field in ClosureField::ALL {
            let message = match field.kind() {
                FieldKind::Money => self
                    .amount(field)
                    .filter(|m| m.is_negative())
                    .map(|m| ParseError::Negative { raw: m.to_string() }.to_string()),
                FieldKind::Count => self
                    .count(field)
                    .filter(|c| *c < 0)
                    .map(|c| ParseError::Negative { raw: c.to_string() }.to_string()),
                FieldKind::Text if field == ClosureField::EmployeeName => self
                    .employee_name
                    .as_deref()
                    .and_then(|name| check_employee_name(name).err()),
                _ => None,
            };
            if let Some(message) = message {
                errors.push(FieldError::new(field, None, message));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub(crate) fn count_mut(&mut self, field: ClosureField) -> Option<&mut i64> {
        match field {
            ClosureField::CardDeliveryCount => Some(&mut self.card_delivery_count),
            ClosureField::PopsicleSystemCount => Some(&mut self.popsicle_system_count),
            _ => None,
        }
    }
}

impl ClosureAmounts for ClosureBase {
    fn amount(&self, field: ClosureField) -> Option<Money> {
        Some(match field {
            ClosureField::CashSystemAmount => self.cash_system_amount,
            ClosureField::CreditSystemAmount => self.credit_system_amount,
            ClosureField::DebitSystemAmount => self.debit_system_amount,
            ClosureField::CreditTerminalAmount => self.credit_terminal_amount,
            ClosureField::DebitTerminalAmount => self.debit_terminal_amount,
            ClosureField::OnlinePaymentAmount => self.online_payment_amount,
            ClosureField::PixAmount => self.pix_amount,
            ClosureField::CountedCashAmount => self.counted_cash_amount,
            ClosureField::OpeningFloat => self.opening_float,
            ClosureField::ReinforcementAmount => self.reinforcement_amount,
            ClosureField::ExpensesAmount => self.expenses_amount,
            ClosureField::DepositAmount => self.deposit_amount,
            _ => return None,
        })
    }
}

/// A validated closure with its derived amounts.
///
/// `system_total` and `cash_variance` are private and always recomputed from
/// the base. Deserialization goes through [`ClosureBase`] and
/// [`ClosureBase::validate`], so a stored record with a negative amount or a
/// short employee name is refused, and stored derived values are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ClosureBase")]
pub struct CanonicalClosure {
    #[serde(flatten)]
    base: ClosureBase,
    system_total: Money,
    cash_variance: Money,
}

impl CanonicalClosure {
    /// Callers must have validated `base`.
    pub(crate) fn from_base(base: ClosureBase) -> Self {
        let system_total = system_total(&base);
        let cash_variance = cash_variance(&base);
        Self {
            base,
            system_total,
            cash_variance,
        }
    }

    pub fn base(&self) -> &ClosureBase {
        &self.base
    }

    pub fn system_total(&self) -> Money {
        self.system_total
    }

    pub fn cash_variance(&self) -> Money {
        self.cash_variance
    }

    pub fn operation_date(&self) -> DateTime<Utc> {
        self.base.operation_date
    }

    pub fn employee_name(&self) -> Option<&str> {
        self.base.employee_name.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.base.notes.as_deref()
    }

    /// Apply an edit to the base fields. The edited base is validated and
    /// the derived amounts recomputed.
    pub fn with_changes(&self, edit: impl FnOnce(&mut ClosureBase)) -> Result<Self, ClosureError> {
        let mut base = self.base.clone();
        edit(&mut base);
        Self::try_from(base)
    }
}

impl TryFrom<ClosureBase> for CanonicalClosure {
    type Error = ClosureError;

    fn try_from(base: ClosureBase) -> Result<Self, ClosureError> {
        base.validate().map_err(ClosureError::Validation)?;
        Ok(Self::from_base(base))
    }
}

impl ClosureAmounts for CanonicalClosure {
    fn amount(&self, field: ClosureField) -> Option<Money> {
        self.base.amount(field)
    }
}
