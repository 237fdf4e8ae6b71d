use crate::utils::cell_address;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell position. Columns and rows are both 1-based. Coordinates are only
/// ever compared per axis, so no total order is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub column: u32,
    pub row: u32,
}

impl Coordinate {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cell_address(self.column, self.row))
    }
}

/// Inclusive rectangle between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl BoundingBox {
    pub fn new(min: Coordinate, max: Coordinate) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        coordinate.column >= self.min.column
            && coordinate.column <= self.max.column
            && coordinate.row >= self.min.row
            && coordinate.row <= self.max.row
    }

    /// The single-column box spanning every row of `self` at `column`.
    pub fn column_slice(&self, column: u32) -> Self {
        Self::new(
            Coordinate::new(column, self.min.row),
            Coordinate::new(column, self.max.row),
        )
    }

    pub fn extend(&mut self, coordinate: Coordinate) {
        self.min.column = self.min.column.min(coordinate.column);
        self.min.row = self.min.row.min(coordinate.row);
        self.max.column = self.max.column.max(coordinate.column);
        self.max.row = self.max.row.max(coordinate.row);
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.min, self.max)
    }
}

/// A cell value as stored in the source grid. Date- and time-formatted
/// numbers are converted to `Temporal` when the grid is loaded; deciding
/// whether a temporal value is a date or a clock time is left to the
/// classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Temporal(NaiveDateTime),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// Semantic category of a cell, resolved once by the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellKind {
    Empty,
    /// A calendar date with no time-of-day component.
    Date(NaiveDate),
    /// A clock time or duration, anchored on the spreadsheet epoch.
    Time(NaiveDateTime),
    /// A date carrying a time of day; neither a calendar date nor a clock time.
    Timestamp(NaiveDateTime),
    Number(f64),
    Text,
}

/// A value destined for an output cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl From<&RawValue> for FieldValue {
    fn from(raw: &RawValue) -> Self {
        match raw {
            RawValue::Empty => FieldValue::Empty,
            RawValue::Text(text) => FieldValue::Text(text.clone()),
            RawValue::Number(number) => match integral(*number) {
                Some(value) => FieldValue::Integer(value),
                None => FieldValue::Number(*number),
            },
            RawValue::Bool(flag) => FieldValue::Text(if *flag { "TRUE" } else { "FALSE" }.into()),
            RawValue::Temporal(stamp) => {
                if stamp.time() == chrono::NaiveTime::MIN {
                    FieldValue::Date(stamp.date())
                } else {
                    FieldValue::Text(stamp.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
        }
    }
}

/// Returns the integer a float represents exactly, if any.
pub fn integral(number: f64) -> Option<i64> {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 9.0e15 {
        Some(number as i64)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    LookupNotFound,
    EmptyEntitySet,
}

/// A recoverable condition observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWarning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<String>,
    pub message: String,
}

impl RunWarning {
    pub fn lookup_not_found(employee: &str) -> Self {
        Self {
            kind: WarningKind::LookupNotFound,
            employee: Some(employee.to_string()),
            message: format!(
                "no distribution record found for employee '{employee}'; enrichment fields left blank"
            ),
        }
    }

    pub fn empty_entity_set() -> Self {
        Self {
            kind: WarningKind::EmptyEntitySet,
            employee: None,
            message: "no employee has attributable hours; timecard workbook contains headings only"
                .to_string(),
        }
    }
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.employee {
            Some(employee) => write!(f, "[{employee}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
