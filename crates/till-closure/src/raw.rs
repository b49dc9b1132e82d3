//! Raw, schema-less closure submissions.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// One raw cell value.
///
/// Anything that is not a string, a number or null (booleans, arrays,
/// objects) is kept as its JSON text so the parsers can reject it with a
/// field-scoped message.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Number(Number),
}

impl RawValue {
    /// Trimmed textual view; `None` when blank.
    pub fn trimmed_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            RawValue::Number(n) => Some(n.to_string()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("null"),
            RawValue::Text(s) => write!(f, "{s:?}"),
            RawValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Number(Number::from(v))
    }
}

impl From<f64> for RawValue {
    /// Non-finite floats have no JSON number form; they become their text
    /// (`"NaN"`, `"inf"`) and fail parsing downstream.
    fn from(v: f64) -> Self {
        match Number::from_f64(v) {
            Some(n) => RawValue::Number(n),
            None => RawValue::Text(v.to_string()),
        }
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Null)
    }
}

impl From<Value> for RawValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => RawValue::Null,
            Value::String(s) => RawValue::Text(s),
            Value::Number(n) => RawValue::Number(n),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// An ordered list of `(label, value)` pairs as submitted.
///
/// Order matters: when two labels resolve to the same canonical field, the
/// later one wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawClosureInput {
    entries: Vec<(String, RawValue)>,
}

impl RawClosureInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object, keeping document order and repeated keys.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl<'de> Deserialize<'de> for RawClosureInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawInputVisitor)
    }
}

struct RawInputVisitor;

impl<'de> Visitor<'de> for RawInputVisitor {
    type Value = RawClosureInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of label -> value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.push((key, RawValue::from(value)));
        }
        Ok(RawClosureInput { entries })
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawClosureInput::default())
    }
}
