use thiserror::Error;

use crate::model::{FieldKind, Role};

#[derive(Debug, Error)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (duplicate field, bad weight, unknown unit, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A compared field has no kind in the scoring config.
    #[error("field '{0}' has no kind (expected \"numeric\" or \"text\")")]
    UnknownFieldKind(String),
    /// A record lacks one of the required fields.
    #[error("{role} row {row}: missing required field '{field}'")]
    MissingField { role: Role, row: usize, field: String },
    /// A single record, compared outside any collection, lacks a field.
    #[error("{role} record: missing required field '{field}'")]
    MissingRecordField { role: Role, field: String },
    /// A tabular input lacks a required column.
    #[error("{role}: missing column '{column}'")]
    MissingColumn { role: Role, column: String },
    /// A value's variant does not belong to the field's kind.
    #[error("field '{field}': value is not a {kind} value")]
    KindMismatch { field: String, kind: FieldKind },
    /// Candidate payload could not be decoded into records.
    #[error("cannot decode candidate payload: {0}")]
    Decode(String),
    /// No ground-truth rows found for the requested evaluation unit.
    #[error("no ground-truth rows found for unit '{unit}'")]
    Selection { unit: String },
    /// A linkage refers to a row the collections do not have.
    #[error("invalid linkage: {0}")]
    InvalidLinkage(String),
    /// CSV read error.
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Coarse error class, used by callers that map failures onto exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Schema,
    Decode,
    Selection,
    Io,
}

impl LinkageError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::UnknownFieldKind(_) => {
                ErrorCategory::Config
            }
            Self::MissingField { .. }
            | Self::MissingRecordField { .. }
            | Self::MissingColumn { .. }
            | Self::KindMismatch { .. }
            | Self::InvalidLinkage(_) => ErrorCategory::Schema,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Selection { .. } => ErrorCategory::Selection,
            Self::Csv(_) => ErrorCategory::Io,
        }
    }
}

impl From<csv::Error> for LinkageError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}
