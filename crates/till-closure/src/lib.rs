//! till-closure
//!
//! Cash-register closing reconciliation.
//!
//! Architectural decisions:
//! - Raw submissions are free-form label/value lists; labels are resolved
//!   through a static alias table, unknown labels pass through untouched
//! - Amounts are integer cents end to end, never floats
//! - Validation collects every field error in one pass; no partial record
//! - Derived amounts are computed, never accepted as input
//! - Diffs report changed fields only, dates compared by instant
//!
//! Deterministic, pure logic. No IO. No logging.

mod build;
mod diff;
mod error;
mod field;
mod labels;
mod money;
mod parse;
mod present;
mod raw;
mod reconcile;
mod record;

pub use build::{
    build, build_at, build_canonical, build_canonical_at, parse_date_text, BuildOptions,
    MIN_EMPLOYEE_NAME_CHARS,
};
pub use diff::{diff, ClosureDiff, DiffEntry, FieldValue, TrackedField, TRACKED_FIELDS};
pub use error::{ClosureError, ErrorKind, FieldError, ValidationErrors};
pub use field::{ClosureField, FieldKind};
pub use labels::{
    alias_table, canonicalize, fold_label, normalize_label, CanonicalInput, Label, SourcedValue,
};
pub use money::{round2, Money, CENTS_SCALE, MAX_ABS_CENTS};
pub use parse::{parse_count, parse_count_text, parse_money, parse_money_text, ParseError};
pub use present::{present, PresentedClosure};
pub use raw::{RawClosureInput, RawValue};
pub use reconcile::{
    cash_variance, drawer_cash_expected, system_total, ClosureAmounts, PartialAmounts,
    Reconciliation,
};
pub use record::{CanonicalClosure, ClosureBase};
