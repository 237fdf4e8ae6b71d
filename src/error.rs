//! Error taxonomy for timecard generation
//!
//! Fatal conditions abort a run before any output is written and are carried
//! by [`TimecardError`]. Recoverable per-employee conditions are not errors;
//! they are collected as [`RunWarning`](crate::model::RunWarning) values and
//! reported after the run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type TimecardResult<T> = Result<T, TimecardError>;

/// Stable identifiers for each failure class, used in logs and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Source spreadsheet missing, corrupt or without worksheets
    SourceUnreadable,
    /// Two fields wired to the same output column
    FieldCodeCollision,
    /// Field code is not a column letter
    InvalidFieldCode,
    /// Enrichment backend could not answer
    LookupFailed,
    /// Output workbook could not be written
    ReportWrite,
}

impl ErrorCode {
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::SourceUnreadable => "input_error",
            ErrorCode::FieldCodeCollision | ErrorCode::InvalidFieldCode => "wiring_error",
            ErrorCode::LookupFailed => "subsystem_error",
            ErrorCode::ReportWrite => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::SourceUnreadable => "source-unreadable",
            ErrorCode::FieldCodeCollision => "field-code-collision",
            ErrorCode::InvalidFieldCode => "invalid-field-code",
            ErrorCode::LookupFailed => "lookup-failed",
            ErrorCode::ReportWrite => "report-write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum TimecardError {
    #[error("unable to read spreadsheet {path:?}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("spreadsheet {path:?} contains no worksheets")]
    NoWorksheet { path: PathBuf },

    #[error("field code '{code}' is already set for employee '{employee}'")]
    FieldCodeCollision { code: String, employee: String },

    #[error("invalid field code '{code}': expected one or two column letters")]
    InvalidFieldCode { code: String },

    #[error("distribution lookup for employee '{employee}' failed: {reason}")]
    LookupFailed { employee: String, reason: String },

    #[error("unable to write timecard workbook {path:?}: {reason}")]
    ReportWrite { path: PathBuf, reason: String },
}

impl TimecardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TimecardError::SourceUnreadable { .. } | TimecardError::NoWorksheet { .. } => {
                ErrorCode::SourceUnreadable
            }
            TimecardError::FieldCodeCollision { .. } => ErrorCode::FieldCodeCollision,
            TimecardError::InvalidFieldCode { .. } => ErrorCode::InvalidFieldCode,
            TimecardError::LookupFailed { .. } => ErrorCode::LookupFailed,
            TimecardError::ReportWrite { .. } => ErrorCode::ReportWrite,
        }
    }

    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        TimecardError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn lookup_failed(employee: impl Into<String>, reason: impl fmt::Display) -> Self {
        TimecardError::LookupFailed {
            employee: employee.into(),
            reason: reason.to_string(),
        }
    }

    pub fn report_write(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        TimecardError::ReportWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_worksheet_reports_as_unreadable_source() {
        let err = TimecardError::NoWorksheet {
            path: PathBuf::from("empty.xlsx"),
        };
        assert_eq!(err.code(), ErrorCode::SourceUnreadable);
        assert_eq!(err.code().category(), "input_error");
    }

    #[test]
    fn collision_message_names_code_and_employee() {
        let err = TimecardError::FieldCodeCollision {
            code: "BB".to_string(),
            employee: "42".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'BB'"));
        assert!(message.contains("'42'"));
        assert_eq!(err.code().to_string(), "field-code-collision");
    }

    #[test]
    fn error_code_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorCode::LookupFailed).unwrap();
        assert_eq!(json, "\"lookup-failed\"");
    }
}
