//! Field-by-field comparison of two closure snapshots.
//!
//! Only fields whose value changed appear in the result. Dates are held as
//! UTC instants, so two spellings of the same moment compare equal. A field
//! that became empty shows up with `after: null`; an unchanged field does not
//! show up at all.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::field::ClosureField;
use crate::money::Money;
use crate::reconcile::ClosureAmounts;
use crate::record::CanonicalClosure;

// ---------------------------------------------------------------------------
// Tracked fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackedField {
    Base(ClosureField),
    SystemTotal,
    CashVariance,
}

impl TrackedField {
    pub fn name(&self) -> &'static str {
        match self {
            TrackedField::Base(f) => f.name(),
            TrackedField::SystemTotal => "systemTotal",
            TrackedField::CashVariance => "cashVariance",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every base field in record order, then the two stored derived amounts.
pub const TRACKED_FIELDS: [TrackedField; 19] = [
    TrackedField::Base(ClosureField::OperationDate),
    TrackedField::Base(ClosureField::EmployeeName),
    TrackedField::Base(ClosureField::CashSystemAmount),
    TrackedField::Base(ClosureField::CreditSystemAmount),
    TrackedField::Base(ClosureField::DebitSystemAmount),
    TrackedField::Base(ClosureField::CreditTerminalAmount),
    TrackedField::Base(ClosureField::DebitTerminalAmount),
    TrackedField::Base(ClosureField::OnlinePaymentAmount),
    TrackedField::Base(ClosureField::PixAmount),
    TrackedField::Base(ClosureField::CountedCashAmount),
    TrackedField::Base(ClosureField::OpeningFloat),
    TrackedField::Base(ClosureField::ReinforcementAmount),
    TrackedField::Base(ClosureField::ExpensesAmount),
    TrackedField::Base(ClosureField::DepositAmount),
    TrackedField::Base(ClosureField::CardDeliveryCount),
    TrackedField::Base(ClosureField::PopsicleSystemCount),
    TrackedField::Base(ClosureField::Notes),
    TrackedField::SystemTotal,
    TrackedField::CashVariance,
];

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single field value as reported in a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Date(DateTime<Utc>),
    Text(String),
    Money(Money),
    Count(i64),
}

impl FieldValue {
    pub fn of(record: &CanonicalClosure, field: TrackedField) -> FieldValue {
        let base = record.base();
        let field = match field {
            TrackedField::SystemTotal => return FieldValue::Money(record.system_total()),
            TrackedField::CashVariance => return FieldValue::Money(record.cash_variance()),
            TrackedField::Base(f) => f,
        };
        match field {
            ClosureField::OperationDate => FieldValue::Date(base.operation_date),
            ClosureField::EmployeeName => text_or_null(base.employee_name.as_deref()),
            ClosureField::Notes => text_or_null(base.notes.as_deref()),
            ClosureField::CardDeliveryCount => FieldValue::Count(base.card_delivery_count),
            ClosureField::PopsicleSystemCount => FieldValue::Count(base.popsicle_system_count),
            money => match base.amount(money) {
                Some(amount) => FieldValue::Money(amount),
                None => FieldValue::Null,
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

fn text_or_null(s: Option<&str>) -> FieldValue {
    s.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string()))
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub before: FieldValue,
    pub after: FieldValue,
}

/// Changed fields in tracked order. Serializes as
/// `{ "<field>": { "before": .., "after": .. }, .. }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureDiff {
    entries: Vec<(TrackedField, DiffEntry)>,
}

impl ClosureDiff {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Lookup by canonical field name (`"notes"`, `"systemTotal"`, ...).
    pub fn get(&self, name: &str) -> Option<&DiffEntry> {
        self.entries
            .iter()
            .find(|(f, _)| f.name() == name)
            .map(|(_, e)| e)
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(f, _)| f.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackedField, &DiffEntry)> {
        self.entries.iter().map(|(f, e)| (*f, e))
    }
}

impl Serialize for ClosureDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, entry) in &self.entries {
            map.serialize_entry(field.name(), entry)?;
        }
        map.end()
    }
}

/// Compare two records over [`TRACKED_FIELDS`].
pub fn diff(before: &CanonicalClosure, after: &CanonicalClosure) -> ClosureDiff {
    let entries = TRACKED_FIELDS
        .iter()
        .filter_map(|field| {
            let b = FieldValue::of(before, *field);
            let a = FieldValue::of(after, *field);
            (b != a).then_some((*field, DiffEntry { before: b, after: a }))
        })
        .collect();
    ClosureDiff { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ClosureBase;
    use chrono::TimeZone;

    fn record() -> CanonicalClosure {
        let mut base = ClosureBase::empty(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        base.employee_name = Some("Ana".into());
        base.cash_system_amount = Money::from_cents(10_000);
        CanonicalClosure::from_base(base)
    }

    #[test]
    fn tracked_fields_cover_every_base_field() {
        for f in ClosureField::ALL {
            assert!(TRACKED_FIELDS.contains(&TrackedField::Base(f)));
        }
        assert_eq!(TRACKED_FIELDS.len(), ClosureField::ALL.len() + 2);
    }

    #[test]
    fn self_diff_is_empty() {
        let r = record();
        assert!(diff(&r, &r).is_empty());
        assert!(diff(&r, &r.clone()).is_empty());
    }

    #[test]
    fn cleared_field_reports_null_after() {
        let before = record();
        let after = before.with_changes(|b| b.employee_name = None).unwrap();
        let d = diff(&before, &after);
        assert_eq!(d.changed_fields(), vec!["employeeName"]);
        let entry = d.get("employeeName").unwrap();
        assert_eq!(entry.before, FieldValue::Text("Ana".into()));
        assert!(entry.after.is_null());
        assert!(d.get("notes").is_none());
    }

    #[test]
    fn amount_change_carries_derived_changes() {
        let before = record();
        let after = before.with_changes(|b| b.pix_amount = Money::from_cents(250)).unwrap();
        let d = diff(&before, &after);
        assert_eq!(d.changed_fields(), vec!["pixAmount", "systemTotal"]);
    }

    #[test]
    fn serializes_as_field_map() {
        let before = record();
        let after = before.with_changes(|b| b.notes = Some("conferido".into())).unwrap();
        let v = serde_json::to_value(diff(&before, &after)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "notes": { "before": null, "after": "conferido" } })
        );
    }
}
