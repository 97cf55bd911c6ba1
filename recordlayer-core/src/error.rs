//! Error types and result types for record and store operations.
//!
//! Field validation failures are reported as [`ValidationError`]. Everything else that can go
//! wrong while persisting or loading a record is a [`RecordError`]. Use [`RecordResult<T>`] as the
//! return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

use crate::{backend::WriteResult, fields::FieldLabel};

/// Which sign a numeric field is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Positive => f.write_str("positive"),
            Sign::Negative => f.write_str("negative"),
        }
    }
}

/// A field value failed its type or constraint checks.
///
/// Every variant names the field (and its kind) so the message can be surfaced as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The field is required, has no default, and the value was null or absent.
    #[error("{field} is a required field, found null")]
    MissingRequired { field: FieldLabel },
    /// The value is not of (or could not be converted to) the field's type.
    #[error("{field} expected {expected}, found {value}")]
    WrongType {
        field: FieldLabel,
        expected: &'static str,
        value: String,
    },
    /// The value violates a `positive_only` / `negative_only` constraint.
    #[error("{field} must be a {expected} value, found {value}")]
    WrongSign {
        field: FieldLabel,
        expected: Sign,
        value: String,
    },
    /// The value has more integral digits than `max_digits` allows.
    #[error("{field} allows at most {max_digits} digits, found {value}")]
    TooManyDigits {
        field: FieldLabel,
        max_digits: u32,
        value: String,
    },
    /// The value has more fractional digits than `max_decimals` allows.
    #[error("{field} allows at most {max_decimals} decimals, found {value}")]
    TooManyDecimals {
        field: FieldLabel,
        max_decimals: u32,
        value: String,
    },
    /// The text is shorter than `min_length`.
    #[error("{field} too short, constrained to at least {min} chars, currently {length}: \"{preview}\"")]
    TooShort {
        field: FieldLabel,
        min: usize,
        length: usize,
        preview: String,
    },
    /// The text is longer than `max_length`.
    #[error("{field} too long, constrained to at most {max} chars, currently {length}: \"{preview}\"")]
    TooLong {
        field: FieldLabel,
        max: usize,
        length: usize,
        preview: String,
    },
    /// The value could not be interpreted as a boolean (only 0 and 1 are accepted).
    #[error("{field} could not be converted to boolean, expected 0 or 1, found {value}")]
    NotBoolean { field: FieldLabel, value: String },
}

impl ValidationError {
    /// Returns the label of the field that failed validation.
    pub fn field(&self) -> &FieldLabel {
        match self {
            ValidationError::MissingRequired { field }
            | ValidationError::WrongType { field, .. }
            | ValidationError::WrongSign { field, .. }
            | ValidationError::TooManyDigits { field, .. }
            | ValidationError::TooManyDecimals { field, .. }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::NotBoolean { field, .. } => field,
        }
    }
}

/// Represents all possible errors that can occur when persisting or loading records.
///
/// This enum covers field validation, write-result interpretation, and backend-specific errors.
#[derive(Error, Debug)]
pub enum RecordError {
    /// A declared field failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    /// The store reported more than one error while inserting a record.
    #[error("Insert failed: {0}")]
    InsertConflict(WriteResult),
    /// The store reported errors while updating a record.
    #[error("Update failed: {0}")]
    UpdateConflict(WriteResult),
    /// An update filtered by identifier touched no rows.
    #[error("Update matched no rows in collection {collection}: {result}")]
    UpdateNotFound {
        collection: String,
        result: WriteResult,
    },
    /// A strict `get` found no row.
    #[error("Row not found in collection {0}")]
    RowNotFound(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RecordError {
    /// Returns `true` for both flavours of "nothing matched": a no-op update and a strict `get`
    /// that found no row.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecordError::UpdateNotFound { .. } | RecordError::RowNotFound(_)
        )
    }

    /// Returns the raw write result embedded in the error, if any.
    pub fn write_result(&self) -> Option<&WriteResult> {
        match self {
            RecordError::InsertConflict(result)
            | RecordError::UpdateConflict(result)
            | RecordError::UpdateNotFound { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// A specialized `Result` type for record and store operations.
pub type RecordResult<T> = Result<T, RecordError>;

impl From<BsonError> for RecordError {
    fn from(err: BsonError) -> Self {
        RecordError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RecordError {
    fn from(err: SerdeJsonError) -> Self {
        RecordError::Serialization(err.to_string())
    }
}
