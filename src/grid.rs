//! Read-only view over the first worksheet of a timesheet workbook.

use crate::classify::{classify, is_temporal_format, serial_to_datetime};
use crate::error::{TimecardError, TimecardResult};
use crate::model::{BoundingBox, CellKind, Coordinate, RawValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use umya_spreadsheet::reader::xlsx;
use umya_spreadsheet::{CellRawValue, Worksheet};

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub coordinate: Coordinate,
    pub raw: RawValue,
    pub kind: CellKind,
}

impl Cell {
    pub fn new(coordinate: Coordinate, raw: RawValue) -> Self {
        let kind = classify(&raw);
        Self {
            coordinate,
            raw,
            kind,
        }
    }

    pub fn empty(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            raw: RawValue::Empty,
            kind: CellKind::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, CellKind::Empty)
    }
}

/// In-memory grid of populated cells keyed by `(row, column)`, so that the
/// natural key order is row-major.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    source: Option<PathBuf>,
    sheet_name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    bounds: Option<BoundingBox>,
}

impl Grid {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            ..Self::default()
        }
    }

    /// Loads the first worksheet of an xlsx workbook.
    pub fn open(path: &Path) -> TimecardResult<Self> {
        let book =
            xlsx::read(path).map_err(|error| TimecardError::source_unreadable(path, error))?;
        let sheet = book
            .get_sheet(&0)
            .ok_or_else(|| TimecardError::NoWorksheet {
                path: path.to_path_buf(),
            })?;

        let mut grid = Self::from_worksheet(sheet);
        grid.source = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            sheet = %grid.sheet_name,
            cells = grid.len(),
            bounds = %grid.bounds(),
            "opened timesheet grid"
        );
        Ok(grid)
    }

    pub fn from_worksheet(sheet: &Worksheet) -> Self {
        let mut grid = Self::new(sheet.get_name());
        for cell in sheet.get_cell_collection() {
            let coordinate = cell.get_coordinate();
            let at = Coordinate::new(*coordinate.get_col_num(), *coordinate.get_row_num());
            grid.set(at, cell_to_raw(cell));
        }
        grid
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Stores a value, or clears the cell when the value is empty. Bounds are
    /// kept in step with the populated cells.
    pub fn set(&mut self, coordinate: Coordinate, raw: RawValue) {
        let key = (coordinate.row, coordinate.column);
        if raw.is_empty() {
            if self.cells.remove(&key).is_some() {
                self.recompute_bounds();
            }
            return;
        }
        self.cells.insert(key, Cell::new(coordinate, raw));
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(coordinate),
            None => self.bounds = Some(BoundingBox::new(coordinate, coordinate)),
        }
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self.cells.values().fold(None, |acc, cell| {
            let mut bounds = acc.unwrap_or(BoundingBox::new(cell.coordinate, cell.coordinate));
            bounds.extend(cell.coordinate);
            Some(bounds)
        });
    }

    /// Populated extent. An empty grid reports `A1:A1`.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds.unwrap_or(BoundingBox::new(
            Coordinate::new(1, 1),
            Coordinate::new(1, 1),
        ))
    }

    pub fn min_bound(&self) -> Coordinate {
        self.bounds().min
    }

    pub fn max_bound(&self) -> Coordinate {
        self.bounds().max
    }

    pub fn get(&self, coordinate: Coordinate) -> Option<&Cell> {
        self.cells.get(&(coordinate.row, coordinate.column))
    }

    pub fn cell_at(&self, coordinate: Coordinate) -> Cell {
        self.get(coordinate)
            .cloned()
            .unwrap_or_else(|| Cell::empty(coordinate))
    }

    /// Populated cells inside `region` (inclusive), ascending row then
    /// ascending column. The iterator can be cloned to restart a scan.
    pub fn iterate(&self, region: BoundingBox) -> impl Iterator<Item = &Cell> + Clone + '_ {
        let lower = (region.min.row, region.min.column);
        let upper = (region.max.row, region.max.column);
        let range = if lower <= upper {
            self.cells.range(lower..=upper)
        } else {
            self.cells.range((0, 0)..(0, 0))
        };
        range
            .map(|(_, cell)| cell)
            .filter(move |cell| region.contains(cell.coordinate))
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> + Clone + '_ {
        self.iterate(self.bounds())
    }
}

/// Converts an umya cell into a raw value. Numbers carrying a date or time
/// number format become temporal values.
pub fn cell_to_raw(cell: &umya_spreadsheet::Cell) -> RawValue {
    let temporal = cell
        .get_style()
        .get_number_format()
        .map(|fmt| is_temporal_format(fmt.get_format_code()))
        .unwrap_or(false);
    let value = cell.get_cell_value();
    match value.get_raw_value() {
        CellRawValue::Empty => RawValue::Empty,
        CellRawValue::Numeric(number) => numeric(*number, temporal),
        CellRawValue::Bool(flag) => RawValue::Bool(*flag),
        CellRawValue::String(text) => RawValue::Text(text.to_string()),
        CellRawValue::RichText(text) => RawValue::Text(text.get_text().to_string()),
        _ => {
            let text = value.get_value();
            match text.trim().parse::<f64>() {
                Ok(number) => numeric(number, temporal),
                Err(_) => RawValue::Text(text.to_string()),
            }
        }
    }
}

fn numeric(number: f64, temporal: bool) -> RawValue {
    if temporal && let Some(stamp) = serial_to_datetime(number) {
        return RawValue::Temporal(stamp);
    }
    RawValue::Number(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_of(values: &[((u32, u32), &str)]) -> Grid {
        let mut grid = Grid::new("Sheet1");
        for ((column, row), text) in values {
            grid.set(Coordinate::new(*column, *row), RawValue::Text(text.to_string()));
        }
        grid
    }

    #[test]
    fn iteration_is_row_major() {
        let grid = grid_of(&[((3, 1), "c1"), ((1, 2), "a2"), ((2, 1), "b1"), ((1, 1), "a1")]);
        let order: Vec<String> = grid.cells().map(|cell| cell.coordinate.to_string()).collect();
        assert_eq!(order, vec!["A1", "B1", "C1", "A2"]);
    }

    #[test]
    fn iteration_respects_region_columns() {
        let grid = grid_of(&[((1, 1), "a1"), ((2, 1), "b1"), ((1, 2), "a2"), ((3, 2), "c2")]);
        let region = grid.bounds().column_slice(1);
        let order: Vec<String> = grid.iterate(region).map(|cell| cell.coordinate.to_string()).collect();
        assert_eq!(order, vec!["A1", "A2"]);
    }

    #[test]
    fn iteration_restarts_from_a_clone() {
        let grid = grid_of(&[((1, 1), "a1"), ((1, 2), "a2")]);
        let scan = grid.cells();
        assert_eq!(scan.clone().count(), 2);
        assert_eq!(scan.count(), 2);
    }

    #[test]
    fn bounds_follow_content_changes() {
        let mut grid = grid_of(&[((2, 2), "x"), ((4, 6), "y")]);
        assert_eq!(grid.bounds().to_string(), "B2:D6");
        assert_eq!(grid.min_bound(), Coordinate::new(2, 2));
        assert_eq!(grid.max_bound(), Coordinate::new(4, 6));
        grid.set(Coordinate::new(4, 6), RawValue::Empty);
        assert_eq!(grid.bounds().to_string(), "B2:B2");
        assert_eq!(Grid::new("empty").bounds().to_string(), "A1:A1");
    }

    #[test]
    fn missing_cells_read_as_empty() {
        let grid = grid_of(&[((1, 1), "a1")]);
        let cell = grid.cell_at(Coordinate::new(5, 5));
        assert!(cell.is_empty());
        assert_eq!(cell.coordinate, Coordinate::new(5, 5));
    }

    #[test]
    fn date_formatted_numbers_become_temporal() {
        assert!(matches!(numeric(45_000.0, true), RawValue::Temporal(_)));
        assert_eq!(numeric(45_000.0, false), RawValue::Number(45_000.0));
    }

    #[test]
    fn unreadable_source_is_reported() {
        let err = Grid::open(Path::new("/definitely/not/here.xlsx")).unwrap_err();
        assert!(matches!(err, TimecardError::SourceUnreadable { .. }));
    }
}
