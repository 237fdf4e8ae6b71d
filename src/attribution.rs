//! Shift attribution.
//!
//! Every positive duration in a row owned by an employee becomes a shift of
//! that employee. Its date is the nearest date header above it in the same
//! column.

use crate::employees::{Employee, Shift};
use crate::grid::Grid;
use crate::weeks::Week;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Column -> `(row, date)` pairs sorted by row, built from every week.
#[derive(Debug, Default)]
pub struct DateIndex {
    columns: HashMap<u32, Vec<(u32, NaiveDate)>>,
}

impl DateIndex {
    pub fn new(weeks: &[Week]) -> Self {
        let mut columns: HashMap<u32, Vec<(u32, NaiveDate)>> = HashMap::new();
        for day in weeks.iter().flat_map(Week::days) {
            columns
                .entry(day.coordinate.column)
                .or_default()
                .push((day.coordinate.row, day.date));
        }
        for entries in columns.values_mut() {
            entries.sort_by_key(|(row, _)| *row);
        }
        Self { columns }
    }

    /// Date with the largest row strictly above `row` in `column`.
    pub fn date_above(&self, column: u32, row: u32) -> Option<NaiveDate> {
        let entries = self.columns.get(&column)?;
        let above = entries.partition_point(|(date_row, _)| *date_row < row);
        above.checked_sub(1).map(|index| entries[index].1)
    }
}

/// Appends a shift to the owning employee for every positive duration cell.
/// A row is owned when its key-column cell was recorded as one of the
/// employee's coordinates. Shifts without a date header above them keep a
/// `None` date. Returns the number of shifts attributed.
pub fn attribute_shifts(
    grid: &Grid,
    weeks: &[Week],
    employees: &mut [Employee],
    key_column: u32,
) -> usize {
    let index = DateIndex::new(weeks);
    let owners: HashMap<u32, usize> = employees
        .iter()
        .enumerate()
        .flat_map(|(position, employee)| {
            employee
                .coordinates()
                .iter()
                .filter(|coordinate| coordinate.column == key_column)
                .map(move |coordinate| (coordinate.row, position))
        })
        .collect();

    let mut attributed = 0;
    for cell in grid.cells() {
        if !cell.kind.is_positive_duration() {
            continue;
        }
        let Some(duration) = cell.kind.as_time() else {
            continue;
        };
        let Some(&owner) = owners.get(&cell.coordinate.row) else {
            continue;
        };
        let date = index.date_above(cell.coordinate.column, cell.coordinate.row);
        if date.is_none() {
            tracing::debug!(at = %cell.coordinate, "duration has no date header above it");
        }
        let employee = &mut employees[owner];
        tracing::debug!(employee = %employee.id(), at = %cell.coordinate, ?date, "shift attributed");
        employee.add_shift(Shift {
            date,
            duration,
            source: cell.coordinate,
        });
        attributed += 1;
    }
    tracing::info!(shifts = attributed, "attributed shifts");
    attributed
}

/// Drops employees that ended up with no shifts.
pub fn retain_with_hours(employees: &mut Vec<Employee>) {
    let before = employees.len();
    employees.retain(|employee| employee.shift_count() > 0);
    let dropped = before - employees.len();
    if dropped > 0 {
        tracing::info!(dropped, remaining = employees.len(), "dropped employees without shifts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employees::{SeedFields, resolve_employees};
    use crate::model::{Coordinate, RawValue};
    use crate::weeks::partition_weeks;
    use chrono::NaiveTime;

    fn ymd(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn date(grid: &mut Grid, column: u32, row: u32, day: u32) {
        grid.set(
            Coordinate::new(column, row),
            RawValue::Temporal(ymd(day).and_time(NaiveTime::MIN)),
        );
    }

    fn hours(grid: &mut Grid, column: u32, row: u32, text: &str) {
        grid.set(Coordinate::new(column, row), RawValue::Text(text.to_string()));
    }

    fn key(grid: &mut Grid, row: u32, id: &str) {
        grid.set(Coordinate::new(1, row), RawValue::Text(id.to_string()));
    }

    fn run(grid: &Grid) -> Vec<Employee> {
        let weeks = partition_weeks(grid.cells());
        let seed = SeedFields {
            period_end: None,
            timecard: "T".into(),
        };
        let key_column = grid.min_bound().column;
        let mut employees =
            resolve_employees(grid.iterate(grid.bounds().column_slice(key_column)), &seed).unwrap();
        attribute_shifts(grid, &weeks, &mut employees, key_column);
        employees
    }

    #[test]
    fn nearest_date_above_in_the_same_column_wins() {
        let mut grid = Grid::new("Sheet1");
        date(&mut grid, 2, 1, 7);
        date(&mut grid, 3, 1, 8);
        key(&mut grid, 2, "Ann");
        hours(&mut grid, 2, 2, "08:00");
        hours(&mut grid, 3, 2, "04:30");
        // Second block: new date header row further down.
        date(&mut grid, 2, 4, 14);
        key(&mut grid, 5, "Ann");
        hours(&mut grid, 2, 5, "06:00");

        let employees = run(&grid);
        assert_eq!(employees.len(), 1);
        let dates: Vec<Option<NaiveDate>> = employees[0].shifts().iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![Some(ymd(7)), Some(ymd(8)), Some(ymd(14))]);
        assert_eq!(employees[0].total_hours(), 18.5);
    }

    #[test]
    fn durations_without_a_date_above_keep_a_null_date() {
        let mut grid = Grid::new("Sheet1");
        date(&mut grid, 2, 1, 7);
        key(&mut grid, 2, "Ann");
        hours(&mut grid, 4, 2, "03:00");

        let employees = run(&grid);
        assert_eq!(employees[0].shift_count(), 1);
        assert_eq!(employees[0].shifts()[0].date, None);
        assert_eq!(employees[0].shifts()[0].source, Coordinate::new(4, 2));
    }

    #[test]
    fn unowned_rows_and_zero_durations_are_ignored() {
        let mut grid = Grid::new("Sheet1");
        date(&mut grid, 2, 1, 7);
        key(&mut grid, 2, "Ann");
        hours(&mut grid, 2, 2, "00:00");
        hours(&mut grid, 2, 3, "05:00");

        let mut employees = run(&grid);
        assert_eq!(employees[0].shift_count(), 0);
        retain_with_hours(&mut employees);
        assert!(employees.is_empty());
    }

    #[test]
    fn date_index_uses_strictly_preceding_rows() {
        let mut grid = Grid::new("Sheet1");
        date(&mut grid, 2, 3, 7);
        date(&mut grid, 2, 6, 14);
        let weeks = partition_weeks(grid.cells());
        let index = DateIndex::new(&weeks);
        assert_eq!(index.date_above(2, 3), None);
        assert_eq!(index.date_above(2, 4), Some(ymd(7)));
        assert_eq!(index.date_above(2, 6), Some(ymd(7)));
        assert_eq!(index.date_above(2, 9), Some(ymd(14)));
        assert_eq!(index.date_above(3, 9), None);
    }
}
