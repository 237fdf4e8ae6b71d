#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use tempfile::{TempDir, tempdir};
use timecard_generator::{LookupSource, SummaryFormat, TimecardConfig};
use umya_spreadsheet::{self, Spreadsheet, Worksheet};

pub const DATE_FORMAT: &str = "yyyy-mm-dd";
pub const TIME_FORMAT: &str = "[h]:mm";

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn serial(date: NaiveDate) -> f64 {
    let epoch = ymd(1899, 12, 30);
    (date - epoch).num_days() as f64
}

pub fn set_date(sheet: &mut Worksheet, column: u32, row: u32, date: NaiveDate) {
    let cell = sheet.get_cell_mut((column, row));
    cell.set_value_number(serial(date));
    cell.get_style_mut()
        .get_number_format_mut()
        .set_format_code(DATE_FORMAT);
}

pub fn set_hours(sheet: &mut Worksheet, column: u32, row: u32, hours: u32, minutes: u32) {
    let cell = sheet.get_cell_mut((column, row));
    cell.set_value_number(f64::from(hours * 60 + minutes) / 1440.0);
    cell.get_style_mut()
        .get_number_format_mut()
        .set_format_code(TIME_FORMAT);
}

pub fn set_text(sheet: &mut Worksheet, column: u32, row: u32, text: &str) {
    sheet.get_cell_mut((column, row)).set_value_string(text);
}

pub fn set_number(sheet: &mut Worksheet, column: u32, row: u32, value: f64) {
    sheet.get_cell_mut((column, row)).set_value_number(value);
}

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Worksheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").expect("default sheet");
    f(sheet);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

pub fn read_workbook(path: &Path) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read(path).expect("read workbook")
}

/// Two weeks of hours for three employees.
///
/// ```text
///      A      B(Sun 7) C(Mon 8) D(Tue 9)
///   1  Name   date     date     date
///   2  42     8:00     7:30
///   3  7                        4:15
///   4  99     0:00     note
///   6         date(14) date(15)
///   7  42     6:00
///   8  7               5:45
/// ```
pub fn standard_timesheet(sheet: &mut Worksheet) {
    set_text(sheet, 1, 1, "Name");
    set_date(sheet, 2, 1, ymd(2024, 1, 7));
    set_date(sheet, 3, 1, ymd(2024, 1, 8));
    set_date(sheet, 4, 1, ymd(2024, 1, 9));

    set_number(sheet, 1, 2, 42.0);
    set_hours(sheet, 2, 2, 8, 0);
    set_hours(sheet, 3, 2, 7, 30);

    set_number(sheet, 1, 3, 7.0);
    set_hours(sheet, 4, 3, 4, 15);

    set_number(sheet, 1, 4, 99.0);
    set_hours(sheet, 2, 4, 0, 0);
    set_text(sheet, 3, 4, "note");

    set_date(sheet, 2, 6, ymd(2024, 1, 14));
    set_date(sheet, 3, 6, ymd(2024, 1, 15));

    set_number(sheet, 1, 7, 42.0);
    set_hours(sheet, 2, 7, 6, 0);

    set_number(sheet, 1, 8, 7.0);
    set_hours(sheet, 3, 8, 5, 45);
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_timesheet<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Worksheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }

    /// SQLite database with one distribution row per `(employee, distcode)`.
    pub fn distribution_db(&self, name: &str, rows: &[(i64, &str)]) -> PathBuf {
        let path = self.path(name);
        let conn = Connection::open(&path).expect("open db");
        conn.execute_batch(
            "CREATE TABLE employee_distribution (
                employee INTEGER PRIMARY KEY,
                otsched TEXT, category INTEGER, earnded TEXT,
                distcode TEXT, expacct TEXT, otacct TEXT
            );",
        )
        .expect("create table");
        for (employee, distcode) in rows {
            conn.execute(
                "INSERT INTO employee_distribution VALUES (?1, 'STD', 1, 'REG', ?2, '5000-10', '5000-20')",
                params![employee, distcode],
            )
            .expect("insert row");
        }
        path
    }

    pub fn config(&self, source: PathBuf, lookup: LookupSource) -> TimecardConfig {
        TimecardConfig {
            source,
            timecard: "JAN-2024-A".to_string(),
            output: self.path("GENERATED-TIMECARDS.xlsx"),
            lookup,
            summary: SummaryFormat::Text,
        }
    }
}
