//! Employee records and the key-column resolver.

use crate::classify::decimal_hours;
use crate::error::{TimecardError, TimecardResult};
use crate::grid::Cell;
use crate::model::{Coordinate, FieldValue, RawValue, integral};
use crate::utils::column_name_to_number;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use std::fmt;

/// Output column a field is written to, as detail-sheet column letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldCode(String);

impl FieldCode {
    pub fn new(code: &str) -> TimecardResult<Self> {
        let valid = (1..=2).contains(&code.len()) && code.chars().all(|ch| ch.is_ascii_uppercase());
        if !valid {
            return Err(TimecardError::InvalidFieldCode {
                code: code.to_string(),
            });
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 1-based column number of the code.
    pub fn column(&self) -> u32 {
        column_name_to_number(&self.0).unwrap_or(1)
    }
}

impl fmt::Display for FieldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub code: &'static str,
    pub name: &'static str,
}

impl FieldSpec {
    pub const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }

    pub fn column(&self) -> u32 {
        column_name_to_number(self.code).unwrap_or(1)
    }
}

pub const EMPLOYEE: FieldSpec = FieldSpec::new("A", "EMPLOYEE");
pub const PERIOD_END: FieldSpec = FieldSpec::new("B", "PEREND");
pub const TIMECARD: FieldSpec = FieldSpec::new("C", "TIMECARD");
pub const DAYS: FieldSpec = FieldSpec::new("AV", "DAYS");

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Insertion-ordered fields keyed by code. A code can only be set once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: IndexMap<FieldCode, Field>,
}

impl FieldSet {
    /// Adds a field. Returns the code back when it is already in use.
    pub fn insert(&mut self, code: FieldCode, field: Field) -> Result<(), FieldCode> {
        match self.fields.entry(code) {
            Entry::Occupied(entry) => Err(entry.key().clone()),
            Entry::Vacant(entry) => {
                entry.insert(field);
                Ok(())
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(key, _)| key.as_str() == code)
            .map(|(_, field)| field)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldCode, &Field)> + '_ {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Typed identity of a key cell. Cells compare equal only when both the
/// kind and the value match, so `42` and `"42"` are different employees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Text(String),
    Integer(i64),
    /// Bit pattern of a non-integral number.
    Number(u64),
    Bool(bool),
    Temporal(NaiveDateTime),
}

impl IdentityKey {
    fn render(&self) -> String {
        match self {
            IdentityKey::Text(text) => text.clone(),
            IdentityKey::Integer(value) => value.to_string(),
            IdentityKey::Number(bits) => f64::from_bits(*bits).to_string(),
            IdentityKey::Bool(flag) => if *flag { "TRUE" } else { "FALSE" }.to_string(),
            IdentityKey::Temporal(stamp) => stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Key-column value of an employee. Identity follows the typed key; the
/// rendered text is what lookups and output see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmployeeId {
    key: IdentityKey,
    text: String,
}

impl EmployeeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_key(IdentityKey::Text(id.into()))
    }

    pub fn from_key(key: IdentityKey) -> Self {
        let text = key.render();
        Self { key, text }
    }

    pub fn from_raw(raw: &RawValue) -> Option<Self> {
        let key = match raw {
            _ if raw.is_empty() => return None,
            RawValue::Empty => return None,
            RawValue::Text(text) => IdentityKey::Text(text.clone()),
            RawValue::Number(number) => match integral(*number) {
                Some(value) => IdentityKey::Integer(value),
                None => IdentityKey::Number(number.to_bits()),
            },
            RawValue::Bool(flag) => IdentityKey::Bool(*flag),
            RawValue::Temporal(stamp) => IdentityKey::Temporal(*stamp),
        };
        Some(Self::from_key(key))
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Serialize for EmployeeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One attributed shift. `date` is `None` when no date header sits above the
/// duration cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shift {
    pub date: Option<NaiveDate>,
    pub duration: NaiveDateTime,
    pub source: Coordinate,
}

impl Shift {
    pub fn hours(&self) -> f64 {
        decimal_hours(self.duration)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    id: EmployeeId,
    coordinates: Vec<Coordinate>,
    shifts: Vec<Shift>,
    fields: FieldSet,
}

impl Employee {
    pub fn new(id: EmployeeId, coordinate: Coordinate) -> Self {
        tracing::debug!(employee = %id, at = %coordinate, "employee found");
        Self {
            id,
            coordinates: vec![coordinate],
            shifts: Vec::new(),
            fields: FieldSet::default(),
        }
    }

    pub fn id(&self) -> &EmployeeId {
        &self.id
    }

    /// Every key-column cell this employee's id appeared in, in scan order.
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn add_shift(&mut self, shift: Shift) {
        self.shifts.push(shift);
    }

    pub fn add_field(&mut self, spec: FieldSpec, value: FieldValue) -> TimecardResult<()> {
        let code = FieldCode::new(spec.code)?;
        let field = Field {
            name: spec.name.to_string(),
            value,
        };
        self.fields
            .insert(code, field)
            .map_err(|code| TimecardError::FieldCodeCollision {
                code: code.to_string(),
                employee: self.id.to_string(),
            })
    }

    pub fn total_hours(&self) -> f64 {
        self.shifts.iter().map(Shift::hours).sum()
    }

    pub fn shift_count(&self) -> usize {
        self.shifts.len()
    }

    fn record_occurrence(&mut self, coordinate: Coordinate) {
        self.coordinates.push(coordinate);
    }
}

/// Values every employee record starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedFields {
    pub period_end: Option<NaiveDate>,
    pub timecard: String,
}

/// Builds one employee per distinct key value, in first-sighting order,
/// recording every coordinate where the value recurs. `cells` is expected to
/// be a row-major scan of the key column.
pub fn resolve_employees<'a, I>(cells: I, seed: &SeedFields) -> TimecardResult<Vec<Employee>>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut roster: IndexMap<EmployeeId, Employee> = IndexMap::new();
    for cell in cells {
        let Some(id) = EmployeeId::from_raw(&cell.raw) else {
            continue;
        };
        match roster.entry(id) {
            Entry::Occupied(mut entry) => entry.get_mut().record_occurrence(cell.coordinate),
            Entry::Vacant(entry) => {
                let mut employee = Employee::new(entry.key().clone(), cell.coordinate);
                employee.add_field(EMPLOYEE, FieldValue::from(&cell.raw))?;
                employee.add_field(
                    PERIOD_END,
                    seed.period_end.map(FieldValue::Date).unwrap_or_default(),
                )?;
                employee.add_field(TIMECARD, FieldValue::text(seed.timecard.clone()))?;
                employee.add_field(DAYS, FieldValue::Integer(1))?;
                entry.insert(employee);
            }
        }
    }
    tracing::info!(employees = roster.len(), "resolved key column");
    Ok(roster.into_values().collect())
}
