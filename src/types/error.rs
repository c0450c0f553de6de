use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PageId;

/// Line/column of the token a SQL statement failed to parse at (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u64,
    pub column: u64,
}

impl Position {
    pub fn new(line: u64, column: u64) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Cannot open database: {reason}")]
    Open { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at {position}: {message}")]
    Syntax { position: Position, message: String },

    #[error("Table '{name}' not found")]
    UnknownTable { name: String },

    #[error("Table '{name}' already exists")]
    DuplicateTable { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    UnknownColumn { name: String, table: String },

    #[error("Type mismatch for column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Table '{table}' has {expected} columns but {actual} values were supplied")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Constraint violation: {details}")]
    ConstraintViolation { details: String },

    #[error("Row of {size} bytes exceeds the maximum of {max} bytes")]
    RowTooLarge { size: usize, max: usize },

    #[error("Database is not open")]
    NotOpen,

    #[error("Invalid page id {0}")]
    InvalidPageId(PageId),

    #[error("Invalid page size: {expected} bytes, got {actual} bytes")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Corruption detected: {reason}")]
    Corruption { reason: String },
}

/// Fieldless classification of [`DatabaseError`], for callers that map
/// failures to a status code rather than a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Open,
    Io,
    Syntax,
    UnknownTable,
    DuplicateTable,
    UnknownColumn,
    TypeMismatch,
    Constraint,
    NotOpen,
    InvalidPageId,
    Corruption,
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::Open { .. } => ErrorKind::Open,
            DatabaseError::Io(_) => ErrorKind::Io,
            DatabaseError::Syntax { .. } => ErrorKind::Syntax,
            DatabaseError::UnknownTable { .. } => ErrorKind::UnknownTable,
            DatabaseError::DuplicateTable { .. } => ErrorKind::DuplicateTable,
            DatabaseError::UnknownColumn { .. } => ErrorKind::UnknownColumn,
            DatabaseError::TypeMismatch { .. } | DatabaseError::ColumnCountMismatch { .. } => {
                ErrorKind::TypeMismatch
            }
            DatabaseError::ConstraintViolation { .. } | DatabaseError::RowTooLarge { .. } => {
                ErrorKind::Constraint
            }
            DatabaseError::NotOpen => ErrorKind::NotOpen,
            DatabaseError::InvalidPageId(_) => ErrorKind::InvalidPageId,
            DatabaseError::InvalidPageSize { .. } | DatabaseError::Corruption { .. } => {
                ErrorKind::Corruption
            }
        }
    }

    pub(crate) fn corruption(reason: impl Into<String>) -> Self {
        DatabaseError::Corruption {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
