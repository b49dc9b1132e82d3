//! Validation errors for closure construction.
//!
//! Field problems are collected into [`ValidationErrors`] during a single
//! pass and surface once, as [`ClosureError::Validation`]. No partial record
//! is ever returned alongside them.

use std::fmt;

use thiserror::Error;

use crate::field::ClosureField;

/// Classification an outer layer maps to a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The submitted data is wrong; retrying the same input cannot succeed.
    BadRequest,
}

/// One field that failed to parse or violated a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: ClosureField,
    /// The raw label the value arrived under, when there was one.
    pub source_key: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: ClosureField, source_key: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            field,
            source_key: source_key.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_key {
            Some(key) if key != self.field.name() => {
                write!(f, "{} (from \"{}\"): {}.", self.field, key, self.message)
            }
            _ => write!(f, "{}: {}.", self.field, self.message),
        }
    }
}

/// All field errors of one validation pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Messages in the order they were recorded.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn has_field(&self, field: ClosureField) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(" "))
    }
}

/// Error returned by [`crate::build`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClosureError {
    #[error("{0}")]
    Validation(ValidationErrors),
}

impl ClosureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClosureError::Validation(_) => ErrorKind::BadRequest,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::BadRequest
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        match self {
            ClosureError::Validation(errors) => errors,
        }
    }
}
