//! Unified error model and mapping helpers.
//! `TableError` is the status vocabulary of the virtual-table iteration contract,
//! `DictionaryError` covers record mapping for dictionary entities, and `AppError`
//! is the serializable envelope surfaced to frontends (CLI, wire protocols).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Storage-engine style handler codes, kept numerically compatible with the
/// host engine so callers can forward them unchanged.
pub const HA_ERR_INTERNAL_ERROR: i32 = 122;
pub const HA_ERR_RECORD_DELETED: i32 = 134;
pub const HA_ERR_END_OF_FILE: i32 = 137;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Scan exhausted normally. Terminates iteration; not a failure.
    #[error("end of data")]
    EndOfData,
    /// A seek target is out of range or its class no longer resolves.
    #[error("row deleted: position is no longer valid")]
    RowDeleted,
    /// `read_row_values` called without a successfully materialised row.
    #[error("row not available")]
    RowUnavailable,
    /// Schema/implementation mismatch, e.g. an unknown field ordinal.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
    /// An opaque position token that does not decode to a position.
    #[error("malformed position token: {0}")]
    BadToken(String),
}

impl TableError {
    pub fn code_str(&self) -> &'static str {
        match self {
            TableError::EndOfData => "end_of_data",
            TableError::RowDeleted => "row_deleted",
            TableError::RowUnavailable => "row_unavailable",
            TableError::InternalInvariantViolation(_) => "internal_invariant",
            TableError::BadToken(_) => "bad_token",
        }
    }

    /// Handler code for the host execution engine.
    pub fn handler_code(&self) -> i32 {
        match self {
            TableError::EndOfData => HA_ERR_END_OF_FILE,
            TableError::RowDeleted | TableError::RowUnavailable | TableError::BadToken(_) => {
                HA_ERR_RECORD_DELETED
            }
            TableError::InternalInvariantViolation(_) => HA_ERR_INTERNAL_ERROR,
        }
    }

    /// True for the two statuses that end a fetch without indicating a fault.
    pub fn is_end_of_rows(&self) -> bool {
        matches!(self, TableError::EndOfData | TableError::RowDeleted)
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        TableError::InternalInvariantViolation(msg.into())
    }
}

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("field {0} is out of range for this record")]
    FieldOutOfRange(usize),
    #[error("field {field} holds {found}, expected {expected}")]
    TypeMismatch {
        field: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field {0} is NULL")]
    NullField(usize),
    #[error("object id {0} does not fit the record's integer column")]
    IdOverflow(u64),
}

pub type DdResult<T> = Result<T, DictionaryError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Exec { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Exec { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Exec { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }

    /// Wire mapping: return (sqlstate, severity, message)
    pub fn sqlstate_fields(&self) -> (&'static str, &'static str, String) {
        let msg = self.message().to_string();
        match self {
            AppError::UserInput { .. } => ("22000", "ERROR", msg), // data exception
            AppError::NotFound { .. } => ("42S02", "ERROR", msg),  // no such table
            AppError::Exec { .. } => ("HY000", "ERROR", msg),
            AppError::Internal { .. } => ("XX000", "ERROR", msg),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        let code = err.code_str().to_string();
        match err {
            TableError::InternalInvariantViolation(_) => AppError::Internal { code, message: err.to_string() },
            TableError::BadToken(_) => AppError::UserInput { code, message: err.to_string() },
            _ => AppError::Exec { code, message: err.to_string() },
        }
    }
}

impl From<DictionaryError> for AppError {
    fn from(err: DictionaryError) -> Self {
        AppError::Exec { code: "dictionary_error".into(), message: err.to_string() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Exec unless downcasted elsewhere
        AppError::Exec { code: "exec_error".into(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
