//! Closure validation and construction.
//!
//! One pass over every canonical field. Each field parser failure is recorded
//! against its field and replaced by a zero placeholder, so a single call
//! reports every bad field at once. A record is produced only when nothing
//! was recorded.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{ClosureError, FieldError, ValidationErrors};
use crate::field::{ClosureField, FieldKind};
use crate::labels::{canonicalize, CanonicalInput};
use crate::parse::{parse_count, parse_money};
use crate::raw::{RawClosureInput, RawValue};
use crate::record::{CanonicalClosure, ClosureBase};

/// Shortest accepted employee name, in characters.
pub const MIN_EMPLOYEE_NAME_CHARS: usize = 3;

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];
const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Used when the submission carries no (or a blank) employee name.
    pub default_employee_name: Option<String>,
}

impl BuildOptions {
    pub fn with_default_employee(name: impl Into<String>) -> Self {
        Self {
            default_employee_name: Some(name.into()),
        }
    }
}

/// Build a canonical closure, dating it "now" when the input has no date.
pub fn build(raw: &RawClosureInput, options: &BuildOptions) -> Result<CanonicalClosure, ClosureError> {
    build_at(raw, options, Utc::now())
}

/// Same as [`build`] with the fallback instant supplied by the caller.
pub fn build_at(
    raw: &RawClosureInput,
    options: &BuildOptions,
    now: DateTime<Utc>,
) -> Result<CanonicalClosure, ClosureError> {
    let input = canonicalize(raw);
    build_canonical_at(&input, options, now)
}

/// Build from input that has already been re-keyed with [`canonicalize`],
/// dating it "now" when the input has no date.
pub fn build_canonical(
    input: &CanonicalInput,
    options: &BuildOptions,
) -> Result<CanonicalClosure, ClosureError> {
    build_canonical_at(input, options, Utc::now())
}

/// Same as [`build_canonical`] with the fallback instant supplied by the caller.
pub fn build_canonical_at(
    input: &CanonicalInput,
    options: &BuildOptions,
    now: DateTime<Utc>,
) -> Result<CanonicalClosure, ClosureError> {
    let mut errors = ValidationErrors::default();
    let mut base = ClosureBase::empty(now);

    for field in ClosureField::ALL {
        let sourced = input.get(field);
        let source_key = sourced.map(|s| s.source_key.as_str());
        let value = sourced.map(|s| &s.value).unwrap_or(&RawValue::Null);

        match field.kind() {
            FieldKind::Date => match parse_operation_date(value) {
                Ok(Some(date)) => base.operation_date = date,
                Ok(None) => {}
                Err(message) => errors.push(FieldError::new(field, source_key, message)),
            },
            FieldKind::Text if field == ClosureField::EmployeeName => {
                let (name, from_default) = match value.trimmed_text() {
                    Some(name) => (Some(name), false),
                    None => (default_employee_name(options), true),
                };
                if let Some(Err(message)) = name.as_deref().map(check_employee_name) {
                    let key = if from_default { None } else { source_key };
                    errors.push(FieldError::new(field, key, message));
                }
                base.employee_name = name;
            }
            FieldKind::Text => base.notes = value.trimmed_text(),
            FieldKind::Money => match parse_money(value, false) {
                Ok(amount) => {
                    if let Some(slot) = base.money_mut(field) {
                        *slot = amount;
                    }
                }
                Err(e) => errors.push(FieldError::new(field, source_key, e.to_string())),
            },
            FieldKind::Count => match parse_count(value, false) {
                Ok(count) => {
                    if let Some(slot) = base.count_mut(field) {
                        *slot = count;
                    }
                }
                Err(e) => errors.push(FieldError::new(field, source_key, e.to_string())),
            },
        }
    }

    if !errors.is_empty() {
        return Err(ClosureError::Validation(errors));
    }
    Ok(CanonicalClosure::from_base(base))
}

/// Length is counted in characters, not bytes.
pub(crate) fn check_employee_name(name: &str) -> Result<(), String> {
    let chars = name.chars().count();
    if chars < MIN_EMPLOYEE_NAME_CHARS {
        return Err(format!(
            "must have at least {MIN_EMPLOYEE_NAME_CHARS} characters (got {chars})"
        ));
    }
    Ok(())
}

fn default_employee_name(options: &BuildOptions) -> Option<String> {
    options
        .default_employee_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `Ok(None)` means "not supplied".
fn parse_operation_date(value: &RawValue) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Number(n) => {
            let millis = match n.as_i64() {
                Some(ms) => Some(ms),
                None => n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64),
            };
            millis
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(Some)
                .ok_or_else(|| format!("'{n}' is not a valid date"))
        }
        RawValue::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            parse_date_text(t)
                .map(Some)
                .ok_or_else(|| format!("'{t}' is not a valid date"))
        }
    }
}

/// Accepted spellings, tried in order: RFC 3339 with any offset, naive
/// date-times (read as UTC), then plain dates at midnight UTC.
pub fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
