//! Locale-tolerant value parsing for monetary amounts and counts.
//!
//! Till reports arrive from manual entry and spreadsheet exports, so the same
//! amount shows up as `1234.56`, `"1234,56"`, `"1.234,56"` or `"R$ 1.234,56"`.
//! Text is normalized to a plain `digits[.digits]` form before any value is
//! computed:
//!
//! - both `.` and `,` present: `.` is a thousands separator, `,` the decimal
//! - only `,` present: `,` is the decimal separator
//! - only `.` present: `.` is the decimal separator
//!
//! Conversion to cents is done on the decimal digits themselves (no floats);
//! a third fractional digit of 5 or more rounds the cent away from zero.

use thiserror::Error;

use crate::money::{Money, CENTS_SCALE, MAX_ABS_CENTS};
use crate::raw::RawValue;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a single raw value could not be turned into an amount or a count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{raw}' is not a valid number")]
    InvalidNumber { raw: String },

    #[error("must not be negative (got {raw})")]
    Negative { raw: String },

    #[error("'{raw}' is out of range")]
    OutOfRange { raw: String },
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Parse a raw value as a monetary amount.
///
/// Null, empty and whitespace-only values are `0.00`. Negative results are
/// rejected unless `allow_negative` is set.
pub fn parse_money(value: &RawValue, allow_negative: bool) -> Result<Money, ParseError> {
    match value {
        RawValue::Null => Ok(Money::ZERO),
        RawValue::Text(s) => parse_money_text(s, allow_negative),
        RawValue::Number(n) => {
            let money = if let Some(i) = n.as_i64() {
                i.checked_mul(CENTS_SCALE)
                    .filter(|c| c.abs() <= MAX_ABS_CENTS)
                    .map(Money::from_cents)
                    .ok_or_else(|| ParseError::OutOfRange { raw: n.to_string() })?
            } else if n.is_u64() {
                return Err(ParseError::OutOfRange { raw: n.to_string() });
            } else {
                let f = n.as_f64().ok_or_else(|| ParseError::InvalidNumber {
                    raw: n.to_string(),
                })?;
                Money::from_f64(f).ok_or_else(|| ParseError::OutOfRange { raw: n.to_string() })?
            };
            check_sign_money(money, allow_negative, || n.to_string())
        }
    }
}

/// Parse a textual amount (see module docs for the separator rules).
pub fn parse_money_text(s: &str, allow_negative: bool) -> Result<Money, ParseError> {
    let trimmed = s.trim();
    let Some(num) = normalize_numeric_text(trimmed)? else {
        return Ok(Money::ZERO);
    };
    let money = decimal_to_cents(num.negative, &num.int_part, &num.frac_part).map_err(|e| {
        match e {
            ParseError::OutOfRange { .. } => ParseError::OutOfRange {
                raw: trimmed.to_string(),
            },
            other => other,
        }
    })?;
    check_sign_money(money, allow_negative, || trimmed.to_string())
}

/// Parse a raw value as a base-10 integer count.
///
/// Uses the same text normalization as [`parse_money`]; any fractional part is
/// truncated toward zero. Null and empty values are `0`.
pub fn parse_count(value: &RawValue, allow_negative: bool) -> Result<i64, ParseError> {
    match value {
        RawValue::Null => Ok(0),
        RawValue::Text(s) => parse_count_text(s, allow_negative),
        RawValue::Number(n) => {
            let count = if let Some(i) = n.as_i64() {
                i
            } else if n.is_u64() {
                return Err(ParseError::OutOfRange { raw: n.to_string() });
            } else {
                // f64 rendering never uses exponent notation.
                let f = n.as_f64().ok_or_else(|| ParseError::InvalidNumber {
                    raw: n.to_string(),
                })?;
                return parse_count_text(&format!("{f}"), allow_negative);
            };
            if count < 0 && !allow_negative {
                return Err(ParseError::Negative { raw: n.to_string() });
            }
            Ok(count)
        }
    }
}

/// Parse a textual count.
pub fn parse_count_text(s: &str, allow_negative: bool) -> Result<i64, ParseError> {
    let trimmed = s.trim();
    let Some(num) = normalize_numeric_text(trimmed)? else {
        return Ok(0);
    };
    let magnitude = if num.int_part.is_empty() {
        0
    } else {
        num.int_part
            .parse::<i64>()
            .map_err(|_| ParseError::OutOfRange {
                raw: trimmed.to_string(),
            })?
    };
    if num.negative && magnitude != 0 {
        if !allow_negative {
            return Err(ParseError::Negative {
                raw: trimmed.to_string(),
            });
        }
        return Ok(-magnitude);
    }
    Ok(magnitude)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// A textual number split into sign, integer digits and fractional digits.
#[derive(Debug, PartialEq, Eq)]
struct DecimalText {
    negative: bool,
    int_part: String,
    frac_part: String,
}

/// Normalize separators and validate the digit layout.
///
/// Returns `Ok(None)` for empty input (which callers read as zero).
fn normalize_numeric_text(s: &str) -> Result<Option<DecimalText>, ParseError> {
    let invalid = || ParseError::InvalidNumber { raw: s.to_string() };

    let body = s.trim();
    if body.is_empty() {
        return Ok(None);
    }

    // The currency marker may sit on either side of the sign, but only once.
    let (marked, body) = match strip_currency(body) {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (negative, body) = if let Some(rest) = body.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = body.strip_prefix('+') {
        (false, rest)
    } else {
        (false, body)
    };
    let body = body.trim_start();
    let body = if marked {
        body
    } else {
        strip_currency(body).unwrap_or(body)
    };

    let has_dot = body.contains('.');
    let has_comma = body.contains(',');
    let canonical: String = match (has_dot, has_comma) {
        (true, true) => body
            .chars()
            .filter(|c| *c != '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect(),
        (false, true) => body.replace(',', "."),
        _ => body.to_string(),
    };

    let (int_part, frac_part) = match canonical.split_once('.') {
        Some((i, f)) => (i, f),
        None => (canonical.as_str(), ""),
    };

    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }

    Ok(Some(DecimalText {
        negative,
        int_part: int_part.trim_start_matches('0').to_string(),
        frac_part: frac_part.to_string(),
    }))
}

fn strip_currency(s: &str) -> Option<&str> {
    s.strip_prefix("R$")
        .or_else(|| s.strip_prefix('$'))
        .map(str::trim_start)
}

/// Convert validated decimal digits to cents, rounding half away from zero.
pub(crate) fn decimal_to_cents(
    negative: bool,
    int_part: &str,
    frac_part: &str,
) -> Result<Money, ParseError> {
    let raw = || {
        let sign = if negative { "-" } else { "" };
        format!("{sign}{int_part}.{frac_part}")
    };

    let int_part = int_part.trim_start_matches('0');
    // 13 integer digits is the ceiling imposed by MAX_ABS_CENTS.
    if int_part.len() > 13 {
        return Err(ParseError::OutOfRange { raw: raw() });
    }
    let units: i64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber { raw: raw() })?
    };

    let mut frac = frac_part.bytes().map(|b| i64::from(b - b'0'));
    let tenths = frac.next().unwrap_or(0);
    let hundredths = frac.next().unwrap_or(0);
    let round_up = frac.next().is_some_and(|d| d >= 5);

    let mut cents = units * CENTS_SCALE + tenths * 10 + hundredths;
    if round_up {
        cents += 1;
    }
    if cents > MAX_ABS_CENTS {
        return Err(ParseError::OutOfRange { raw: raw() });
    }

    Ok(Money::from_cents(if negative { -cents } else { cents }))
}

fn check_sign_money(
    money: Money,
    allow_negative: bool,
    raw: impl FnOnce() -> String,
) -> Result<Money, ParseError> {
    if money.is_negative() && !allow_negative {
        return Err(ParseError::Negative { raw: raw() });
    }
    Ok(money)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Result<Money, ParseError> {
        parse_money(&RawValue::from(s), false)
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    // --- parse_money: separators ---

    #[test]
    fn both_decimal_conventions_agree() {
        assert_eq!(money("1.234,56").unwrap(), cents(123_456));
        assert_eq!(money("1234.56").unwrap(), cents(123_456));
        assert_eq!(money("1234,56").unwrap(), cents(123_456));
        assert_eq!(
            parse_money(&RawValue::from(1234.56), false).unwrap(),
            cents(123_456)
        );
    }

    #[test]
    fn multiple_thousands_groups() {
        assert_eq!(money("1.234.567,89").unwrap(), cents(123_456_789));
    }

    #[test]
    fn only_dot_is_decimal() {
        // A lone dot is never a thousands separator.
        assert_eq!(money("1.234").unwrap(), cents(123));
    }

    #[test]
    fn currency_marker_and_whitespace() {
        assert_eq!(money("  R$ 1.234,56 ").unwrap(), cents(123_456));
        assert_eq!(money("$10").unwrap(), cents(1000));
        assert_eq!(money("+7,5").unwrap(), cents(750));
    }

    #[test]
    fn currency_marker_on_either_side_of_sign() {
        let neg = |s: &str| parse_money(&RawValue::from(s), true).unwrap();
        assert_eq!(neg("-R$ 10"), cents(-1000));
        assert_eq!(neg("R$ -10"), cents(-1000));
        assert_eq!(neg("R$-1.234,56"), cents(-123_456));
        assert_eq!(neg("$ +5"), cents(500));
        assert_eq!(
            money("R$ -10").unwrap_err(),
            ParseError::Negative { raw: "R$ -10".into() }
        );
        for bad in ["R$ -R$ 10", "$R$10", "R$ $5"] {
            assert!(
                matches!(money(bad), Err(ParseError::InvalidNumber { .. })),
                "{bad:?} should be invalid"
            );
        }
    }

    #[test]
    fn empty_and_null_are_zero() {
        assert_eq!(money("").unwrap(), Money::ZERO);
        assert_eq!(money("   ").unwrap(), Money::ZERO);
        assert_eq!(parse_money(&RawValue::Null, false).unwrap(), Money::ZERO);
    }

    #[test]
    fn leading_and_trailing_separator() {
        assert_eq!(money(",5").unwrap(), cents(50));
        assert_eq!(money("10.").unwrap(), cents(1000));
    }

    // --- parse_money: rounding ---

    #[test]
    fn rounds_half_away_from_zero_on_digits() {
        assert_eq!(money("1,005").unwrap(), cents(101));
        assert_eq!(money("1,004").unwrap(), cents(100));
        assert_eq!(money("2.675").unwrap(), cents(268));
        assert_eq!(money("0.999").unwrap(), cents(100));
        assert_eq!(
            parse_money(&RawValue::from("-1.005"), true).unwrap(),
            cents(-101)
        );
    }

    #[test]
    fn float_input_rounded_to_cents() {
        assert_eq!(
            parse_money(&RawValue::from(0.1 + 0.2), false).unwrap(),
            cents(30)
        );
        assert_eq!(parse_money(&RawValue::from(100_i64), false).unwrap(), cents(10_000));
    }

    // --- parse_money: rejection ---

    #[test]
    fn rejects_negative_unless_allowed() {
        let err = money("-10").unwrap_err();
        assert_eq!(err, ParseError::Negative { raw: "-10".into() });
        assert_eq!(
            parse_money(&RawValue::from("-10"), true).unwrap(),
            cents(-1000)
        );
        let err = parse_money(&RawValue::from(-3_i64), false).unwrap_err();
        assert!(matches!(err, ParseError::Negative { .. }));
    }

    #[test]
    fn negative_that_rounds_to_zero_is_accepted() {
        assert_eq!(money("-0,001").unwrap(), Money::ZERO);
    }

    #[test]
    fn rejects_non_numeric_text() {
        for bad in ["abc", "NaN", "Infinity", "inf", "1e3", "12abc", "1,2,3", "1..2", "-", "R$"] {
            let err = money(bad).unwrap_err();
            assert!(
                matches!(err, ParseError::InvalidNumber { .. }),
                "{bad:?} should be invalid, got {err:?}"
            );
        }
    }

    #[test]
    fn rejects_non_finite_float() {
        let err = parse_money(&RawValue::from(f64::NAN), false).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
        let err = parse_money(&RawValue::from(f64::INFINITY), false).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
    }

    #[test]
    fn rejects_out_of_range() {
        let err = money("99999999999999").unwrap_err();
        assert!(matches!(err, ParseError::OutOfRange { .. }));
        let err = parse_money(&RawValue::from(i64::MAX), false).unwrap_err();
        assert!(matches!(err, ParseError::OutOfRange { .. }));
        assert_eq!(money("9999999999999,99").unwrap(), cents(999_999_999_999_999));
    }

    // --- parse_count ---

    #[test]
    fn count_parses_integers() {
        assert_eq!(parse_count(&RawValue::from("12"), false).unwrap(), 12);
        assert_eq!(parse_count(&RawValue::from(7_i64), false).unwrap(), 7);
        assert_eq!(parse_count(&RawValue::from("1.234,0"), false).unwrap(), 1234);
        assert_eq!(parse_count(&RawValue::Null, false).unwrap(), 0);
        assert_eq!(parse_count(&RawValue::from(""), false).unwrap(), 0);
    }

    #[test]
    fn count_truncates_fraction() {
        assert_eq!(parse_count(&RawValue::from("12,9"), false).unwrap(), 12);
        assert_eq!(parse_count(&RawValue::from(3.7), false).unwrap(), 3);
        assert_eq!(parse_count(&RawValue::from("-0,5"), false).unwrap(), 0);
    }

    #[test]
    fn count_rejects_negative_and_garbage() {
        let err = parse_count(&RawValue::from("-2"), false).unwrap_err();
        assert_eq!(err, ParseError::Negative { raw: "-2".into() });
        assert_eq!(parse_count(&RawValue::from("-2"), true).unwrap(), -2);
        let err = parse_count(&RawValue::from("dois"), false).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
        let err = parse_count(&RawValue::from(f64::NAN), false).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
    }

    // --- error Display ---

    #[test]
    fn error_display() {
        assert_eq!(
            ParseError::InvalidNumber { raw: "abc".into() }.to_string(),
            "'abc' is not a valid number"
        );
        assert_eq!(
            ParseError::Negative { raw: "-10".into() }.to_string(),
            "must not be negative (got -10)"
        );
    }
}
