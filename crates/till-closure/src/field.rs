//! Canonical closure fields.
//!
//! Every column a till report may carry resolves (through the alias table in
//! `labels.rs`) to exactly one of these identifiers, or is passed through
//! untouched and ignored downstream.

use std::fmt;

/// Value shape of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Calendar instant (UTC).
    Date,
    /// Free or short text, optional.
    Text,
    /// Fixed-point amount, 2 decimals, non-negative.
    Money,
    /// Non-negative integer count.
    Count,
}

/// The 17 base fields of a closure record, in record order.
///
/// The derived amounts (`systemTotal`, `cashVariance`, `drawerCashExpected`)
/// are deliberately absent: they can never be addressed as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClosureField {
    OperationDate,
    EmployeeName,
    CashSystemAmount,
    CreditSystemAmount,
    DebitSystemAmount,
    CreditTerminalAmount,
    DebitTerminalAmount,
    OnlinePaymentAmount,
    PixAmount,
    CountedCashAmount,
    OpeningFloat,
    ReinforcementAmount,
    ExpensesAmount,
    DepositAmount,
    CardDeliveryCount,
    PopsicleSystemCount,
    Notes,
}

impl ClosureField {
    pub const ALL: [ClosureField; 17] = [
        ClosureField::OperationDate,
        ClosureField::EmployeeName,
        ClosureField::CashSystemAmount,
        ClosureField::CreditSystemAmount,
        ClosureField::DebitSystemAmount,
        ClosureField::CreditTerminalAmount,
        ClosureField::DebitTerminalAmount,
        ClosureField::OnlinePaymentAmount,
        ClosureField::PixAmount,
        ClosureField::CountedCashAmount,
        ClosureField::OpeningFloat,
        ClosureField::ReinforcementAmount,
        ClosureField::ExpensesAmount,
        ClosureField::DepositAmount,
        ClosureField::CardDeliveryCount,
        ClosureField::PopsicleSystemCount,
        ClosureField::Notes,
    ];

    /// Canonical identifier, as it appears in serialized records.
    pub fn name(&self) -> &'static str {
        match self {
            ClosureField::OperationDate => "operationDate",
            ClosureField::EmployeeName => "employeeName",
            ClosureField::CashSystemAmount => "cashSystemAmount",
            ClosureField::CreditSystemAmount => "creditSystemAmount",
            ClosureField::DebitSystemAmount => "debitSystemAmount",
            ClosureField::CreditTerminalAmount => "creditTerminalAmount",
            ClosureField::DebitTerminalAmount => "debitTerminalAmount",
            ClosureField::OnlinePaymentAmount => "onlinePaymentAmount",
            ClosureField::PixAmount => "pixAmount",
            ClosureField::CountedCashAmount => "countedCashAmount",
            ClosureField::OpeningFloat => "openingFloat",
            ClosureField::ReinforcementAmount => "reinforcementAmount",
            ClosureField::ExpensesAmount => "expensesAmount",
            ClosureField::DepositAmount => "depositAmount",
            ClosureField::CardDeliveryCount => "cardDeliveryCount",
            ClosureField::PopsicleSystemCount => "popsicleSystemCount",
            ClosureField::Notes => "notes",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ClosureField::OperationDate => FieldKind::Date,
            ClosureField::EmployeeName | ClosureField::Notes => FieldKind::Text,
            ClosureField::CardDeliveryCount | ClosureField::PopsicleSystemCount => {
                FieldKind::Count
            }
            _ => FieldKind::Money,
        }
    }

    /// Exact (case-sensitive) lookup by canonical identifier.
    pub fn from_name(name: &str) -> Option<ClosureField> {
        ClosureField::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for ClosureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
