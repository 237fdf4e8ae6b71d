//! Payroll distribution lookup and enrichment.
//!
//! Each employee that survived attribution is looked up once, in order. A
//! miss is a warning; a backend failure aborts the run.

use crate::employees::{Employee, EmployeeId, FieldSpec};
use crate::error::{TimecardError, TimecardResult};
use crate::model::{FieldValue, RunWarning};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const OVERTIME_SCHEDULE: FieldSpec = FieldSpec::new("Y", "OTSCHED");
pub const CATEGORY: FieldSpec = FieldSpec::new("E", "CATEGORY");
pub const EARNING_DEDUCTION: FieldSpec = FieldSpec::new("F", "EARNDED");
pub const DISTRIBUTION_CODE: FieldSpec = FieldSpec::new("BB", "DISTCODE");
pub const EXPENSE_ACCOUNT: FieldSpec = FieldSpec::new("T", "EXPACCT");
pub const OVERTIME_ACCOUNT: FieldSpec = FieldSpec::new("V", "OTACCT");

pub const DEFAULT_DISTRIBUTION_QUERY: &str = "SELECT otsched, category, earnded, distcode, expacct, otacct \
     FROM employee_distribution WHERE employee = ?1";

/// A scalar returned by a lookup backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupScalar {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl LookupScalar {
    /// Text loses spaces and hyphens and becomes an integer when it can.
    pub fn normalize(&self) -> FieldValue {
        match self {
            LookupScalar::Null => FieldValue::Empty,
            LookupScalar::Integer(value) => FieldValue::Integer(*value),
            LookupScalar::Real(value) => FieldValue::Number(*value),
            LookupScalar::Text(text) => {
                let stripped: String = text.chars().filter(|ch| !matches!(ch, ' ' | '-')).collect();
                if stripped.is_empty() {
                    FieldValue::Empty
                } else if let Ok(value) = stripped.parse::<i64>() {
                    FieldValue::Integer(value)
                } else {
                    FieldValue::Text(stripped)
                }
            }
        }
    }
}

impl From<&str> for LookupScalar {
    fn from(text: &str) -> Self {
        LookupScalar::Text(text.to_string())
    }
}

impl From<i64> for LookupScalar {
    fn from(value: i64) -> Self {
        LookupScalar::Integer(value)
    }
}

/// The six distribution values of one employee.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionRecord {
    pub otsched: LookupScalar,
    pub category: LookupScalar,
    pub earnded: LookupScalar,
    pub distcode: LookupScalar,
    pub expacct: LookupScalar,
    pub otacct: LookupScalar,
}

impl DistributionRecord {
    pub fn from_values(values: [LookupScalar; 6]) -> Self {
        let [otsched, category, earnded, distcode, expacct, otacct] = values;
        Self {
            otsched,
            category,
            earnded,
            distcode,
            expacct,
            otacct,
        }
    }

    /// Values paired with the field each one is written to, in lookup order.
    pub fn fields(&self) -> [(FieldSpec, &LookupScalar); 6] {
        [
            (OVERTIME_SCHEDULE, &self.otsched),
            (CATEGORY, &self.category),
            (EARNING_DEDUCTION, &self.earnded),
            (DISTRIBUTION_CODE, &self.distcode),
            (EXPENSE_ACCOUNT, &self.expacct),
            (OVERTIME_ACCOUNT, &self.otacct),
        ]
    }
}

/// Source of per-employee distribution records. `Ok(None)` means the
/// employee is unknown to the source; `Err` means the source itself failed.
pub trait DistributionLookup {
    fn lookup(&self, employee: &EmployeeId) -> TimecardResult<Option<DistributionRecord>>;
}

impl<F> DistributionLookup for F
where
    F: Fn(&EmployeeId) -> Option<DistributionRecord>,
{
    fn lookup(&self, employee: &EmployeeId) -> TimecardResult<Option<DistributionRecord>> {
        Ok(self(employee))
    }
}

pub struct SqliteLookup {
    conn: Connection,
    query: String,
}

impl SqliteLookup {
    /// Opens the database read-only and checks that the query prepares.
    pub fn open(path: &Path, query: Option<&str>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open distribution database {}", path.display()))?;
        Self::from_connection(conn, query)
    }

    pub fn from_connection(conn: Connection, query: Option<&str>) -> Result<Self> {
        let query = query.unwrap_or(DEFAULT_DISTRIBUTION_QUERY).to_string();
        {
            let stmt = conn
                .prepare_cached(&query)
                .with_context(|| format!("invalid distribution query: {query}"))?;
            anyhow::ensure!(
                stmt.column_count() >= 6,
                "distribution query must select six columns, got {}",
                stmt.column_count()
            );
        }
        Ok(Self { conn, query })
    }
}

impl DistributionLookup for SqliteLookup {
    fn lookup(&self, employee: &EmployeeId) -> TimecardResult<Option<DistributionRecord>> {
        let failed = |error: rusqlite::Error| TimecardError::lookup_failed(employee.as_str(), error);
        let mut stmt = self.conn.prepare_cached(&self.query).map_err(failed)?;
        let mut rows = stmt.query(params![employee.as_str()]).map_err(failed)?;
        let Some(row) = rows.next().map_err(failed)? else {
            return Ok(None);
        };

        let mut values: [LookupScalar; 6] = Default::default();
        for (index, slot) in values.iter_mut().enumerate() {
            let value: Value = row.get(index).map_err(failed)?;
            *slot = match value {
                Value::Null => LookupScalar::Null,
                Value::Integer(value) => LookupScalar::Integer(value),
                Value::Real(value) => LookupScalar::Real(value),
                Value::Text(text) => LookupScalar::Text(text),
                Value::Blob(_) => {
                    return Err(TimecardError::lookup_failed(
                        employee.as_str(),
                        format!("column {index} is a blob"),
                    ));
                }
            };
        }
        Ok(Some(DistributionRecord::from_values(values)))
    }
}

/// In-memory table of records keyed by employee id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticLookup {
    records: IndexMap<String, DistributionRecord>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, employee: impl Into<String>, record: DistributionRecord) {
        self.records.insert(employee.into(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads a YAML or JSON mapping of employee id to record.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read distribution file {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let lookup = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("invalid YAML distribution file {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("invalid JSON distribution file {}", path.display()))?,
            other => anyhow::bail!("unsupported distribution file extension: {other}"),
        };
        Ok(lookup)
    }
}

impl DistributionLookup for StaticLookup {
    fn lookup(&self, employee: &EmployeeId) -> TimecardResult<Option<DistributionRecord>> {
        Ok(self.records.get(employee.as_str()).cloned())
    }
}

/// Looks up every employee in order and merges the normalized values into
/// its field set. Unknown employees are kept unenriched and reported.
pub fn enrich(
    employees: &mut [Employee],
    lookup: &dyn DistributionLookup,
) -> TimecardResult<Vec<RunWarning>> {
    let mut warnings = Vec::new();
    for employee in employees.iter_mut() {
        let Some(record) = lookup.lookup(employee.id())? else {
            tracing::warn!(employee = %employee.id(), "no distribution record");
            warnings.push(RunWarning::lookup_not_found(employee.id().as_str()));
            continue;
        };
        for (spec, scalar) in record.fields() {
            employee.add_field(spec, scalar.normalize())?;
        }
        tracing::debug!(employee = %employee.id(), "enriched");
    }
    tracing::info!(
        employees = employees.len(),
        missing = warnings.len(),
        "enrichment complete"
    );
    Ok(warnings)
}
