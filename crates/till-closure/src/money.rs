//! Fixed-point money.
//!
//! Amounts are stored as integer cents (1 unit = 100 cents). Nothing in this
//! crate adds, subtracts or rounds money through floating point; `f64` only
//! appears at the serialization edge and in [`round2`] for float callers.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parse::{decimal_to_cents, parse_money_text, ParseError};

/// Cents per currency unit.
pub const CENTS_SCALE: i64 = 100;

/// Largest accepted magnitude, in cents (10^13 currency units).
///
/// Every parsed amount is bounded by this, so any sum or difference of up to
/// seven amounts stays far inside `i64`.
pub const MAX_ABS_CENTS: i64 = 1_000_000_000_000_000;

/// A monetary amount with exactly two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Lossy view for display and JSON output.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / CENTS_SCALE as f64
    }

    /// Round a float to the nearest cent, half away from zero.
    ///
    /// The float is rendered through its shortest round-trip decimal text and
    /// rounded on those digits, so `0.1 + 0.2` becomes exactly `0.30` and
    /// `1.005` becomes `1.01`. Returns `None` for NaN, infinities, and
    /// magnitudes above [`MAX_ABS_CENTS`].
    pub fn from_f64(value: f64) -> Option<Money> {
        if !value.is_finite() {
            return None;
        }
        let text = format!("{value}");
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.as_str()),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        decimal_to_cents(negative, int_part, frac_part).ok()
    }
}

/// Round to 2 decimals, half away from zero. Idempotent.
///
/// Values that cannot be represented as [`Money`] (non-finite or out of
/// range) are returned unchanged.
pub fn round2(value: f64) -> f64 {
    Money::from_f64(value).map(Money::to_f64).unwrap_or(value)
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:02}",
            abs / CENTS_SCALE as u64,
            abs % CENTS_SCALE as u64
        )
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount as a number or a decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(CENTS_SCALE)
            .filter(|c| c.abs() <= MAX_ABS_CENTS)
            .map(Money)
            .ok_or_else(|| E::custom(ParseError::OutOfRange { raw: v.to_string() }))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        let signed = i64::try_from(v)
            .map_err(|_| E::custom(ParseError::OutOfRange { raw: v.to_string() }))?;
        self.visit_i64(signed)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_f64(v).ok_or_else(|| E::custom(ParseError::OutOfRange { raw: v.to_string() }))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        parse_money_text(v, true).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(123_456).to_string(), "1234.56");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-500).to_string(), "-5.00");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn from_f64_rounds_half_away_from_zero() {
        assert_eq!(Money::from_f64(1.005), Some(Money::from_cents(101)));
        assert_eq!(Money::from_f64(-1.005), Some(Money::from_cents(-101)));
        assert_eq!(Money::from_f64(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_f64(2.344), Some(Money::from_cents(234)));
        assert_eq!(Money::from_f64(f64::NAN), None);
        assert_eq!(Money::from_f64(f64::INFINITY), None);
        assert_eq!(Money::from_f64(1e20), None);
    }

    #[test]
    fn round2_is_idempotent() {
        let samples = [
            0.0, 0.005, 0.015, 1.005, 2.675, 1234.5678, -7.125, 0.1 + 0.2, 99.999, 1e-9,
            123_456_789.123,
        ];
        for x in samples {
            let once = round2(x);
            assert_eq!(round2(once), once, "round2 not idempotent for {x}");
        }
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn arithmetic_is_exact() {
        let total: Money = [10, 20, 30].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(60));
        assert_eq!(
            Money::from_cents(100) - Money::from_cents(250),
            Money::from_cents(-150)
        );
        assert_eq!(-Money::from_cents(5), Money::from_cents(-5));
    }

    #[test]
    fn serde_number_and_string() {
        let m: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(m, Money::from_cents(1250));
        let m: Money = serde_json::from_str("\"1.234,56\"").unwrap();
        assert_eq!(m, Money::from_cents(123_456));
        let m: Money = serde_json::from_str("\"-5\"").unwrap();
        assert_eq!(m, Money::from_cents(-500));
        let m: Money = serde_json::from_str("7").unwrap();
        assert_eq!(m, Money::from_cents(700));

        assert_eq!(
            serde_json::to_string(&Money::from_cents(123_456)).unwrap(),
            "1234.56"
        );
        assert_eq!(serde_json::to_string(&Money::from_cents(16_500)).unwrap(), "165.0");
    }
}
