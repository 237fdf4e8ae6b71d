//! Header/detail projection and the timecard workbook writer.

use crate::classify::date_to_serial;
use crate::employees::{Employee, FieldSpec};
use crate::error::{TimecardError, TimecardResult};
use crate::model::FieldValue;
use crate::utils::absolute_address;
use std::collections::BTreeMap;
use std::path::Path;
use umya_spreadsheet::Worksheet;

pub const HEADER_SHEET: &str = "Timecard_Header";
pub const DETAIL_SHEET: &str = "Timecard_Detail";
pub const DEFAULT_OUTPUT: &str = "GENERATED-TIMECARDS.xlsx";
pub const DATE_FORMAT: &str = "yyyy-mm-dd";

pub const LINE_NUMBER: FieldSpec = FieldSpec::new("D", "LINENUM");
pub const SHIFT_DATE: FieldSpec = FieldSpec::new("H", "EARDEDDATE");
pub const HOURS: FieldSpec = FieldSpec::new("N", "HOURS");
pub const LINE_NUMBER_STEP: i64 = 1000;

/// Header columns written from the employee field set.
const HEADER_FIELD_COLUMNS: [u32; 3] = [1, 2, 3];

#[rustfmt::skip]
pub const HEADER_COLUMNS: [&str; 74] = [
    "EMPLOYEE", "PEREND", "TIMECARD", "TCARDDESC", "TIMESLATE",
    "REUSECARD", "ACTIVE", "SEPARATECK", "PROCESSED", "CREGHRS",
    "CSHIFTHRS", "CVACHRSP", "CVACHRSA", "CSICKHRSP", "CSICKHRSA",
    "CCOMPHRSP", "CCOMPHRSA", "CVACAMTP", "CVACAMTA", "CSICKAMTP",
    "CSICKAMTA", "CCOMPAMTP", "CCOMPAMTA", "CDISIHRSP", "CDISIHRSA",
    "CDISIAMTP", "CDISIAMTA", "LASTNAME", "FIRSTNAME", "MIDDLENAME",
    "GREGHRS", "GSHIFTHRS", "GVACHRSP", "GVACHRSA", "GSICKHRSP",
    "GSICKHRSA", "GCOMPHRSP", "GCOMPHRSA", "GVACAMTP", "GVACAMTA",
    "GSICKAMTP", "GSICKAMTA", "GCOMPAMTP", "GCOMPAMTA", "KEYACTION",
    "GDISIHRSP", "GDISIHRSA", "GDISIAMTP", "GDISIAMTA", "HIREDATE",
    "FIREDATE", "PARTTIME", "PAYFREQ", "OTSCHED", "COMPTIME",
    "SHIFTSCHED", "SHIFTNUM", "WORKPROV", "STATUS", "INACTDATE",
    "PROCESSCMD", "GOTHOURS", "OTCALCTYPE", "HRSPERDAY", "WORKCODE",
    "TOTALJOBS", "USERSEC", "WKLYFLSA", "VALUES", "OTOVERRIDE",
    "COTHOURS", "TCDLINES", "SWJOB", "SRCEAPPL",
];

#[rustfmt::skip]
pub const DETAIL_COLUMNS: [&str; 66] = [
    "EMPLOYEE", "PEREND", "TIMECARD", "LINENUM", "CATEGORY",
    "EARNDED", "EARDEDTYPE", "EARDEDDATE", "STARTTIME", "STOPTIME",
    "GLSEG1", "GLSEG2", "GLSEG3", "HOURS", "CALCMETH", "LIMITBASE",
    "CNTBASE", "RATE", "PAYORACCR", "EXPACCT", "LIABACCT", "OTACCT",
    "SHIFTACCT", "ASSETACCT", "OTSCHED", "SHIFTSCHED", "SHIFTNUM",
    "WCC", "TAXWEEKS", "TAXANNLIZ", "WEEKLYNTRY", "ENTRYTYPE",
    "POOLEDTIPS", "DESC", "GLSEGID1", "GLSEGDESC1", "GLSEGID2",
    "GLSEGDESC2", "GLSEGID3", "GLSEGDESC3", "KEYACTION", "WORKPROV",
    "PROCESSCMD", "NKEMPLOYEE", "NKPEREND", "NKTIMECARD", "NKLINENUM",
    "DAYS", "WCCGROUP", "VALUES", "OTHOURS", "OTRATE", "SWFLSA",
    "DISTCODE", "REXPACCT", "RLIABACCT", "SWALLOCJOB", "JOBS",
    "WORKCODE", "JOBHOURS", "JOBBASE", "RCALCMETH", "RLIMITBASE",
    "RRATEOVER", "RRATE", "DEFRRATE",
];

pub type Row = BTreeMap<u32, FieldValue>;

/// One output sheet: fixed headings on row 1, data rows below.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: &'static str,
    columns: &'static [&'static str],
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Value of column `code` on data row `index` (0-based).
    pub fn value(&self, index: usize, spec: FieldSpec) -> Option<&FieldValue> {
        self.rows.get(index)?.get(&spec.column())
    }

    pub fn last_column(&self) -> u32 {
        let widest_row = self
            .rows
            .iter()
            .filter_map(|row| row.keys().next_back().copied())
            .max()
            .unwrap_or(0);
        (self.columns.len() as u32).max(widest_row).max(1)
    }

    /// Sheet row of the last data row, or the heading row when empty.
    pub fn last_row(&self) -> u32 {
        self.rows.len() as u32 + 1
    }

    /// Absolute reference spanning headings and every data row.
    pub fn named_range(&self) -> String {
        format!(
            "{}!$A$1:{}",
            self.name,
            absolute_address(self.last_column(), self.last_row())
        )
    }

    fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn write_to(&self, sheet: &mut Worksheet) {
        for (index, heading) in self.columns.iter().enumerate() {
            sheet
                .get_cell_mut((index as u32 + 1, 1))
                .set_value_string(*heading);
        }
        for (offset, row) in self.rows.iter().enumerate() {
            let sheet_row = offset as u32 + 2;
            for (column, value) in row {
                write_value(sheet, *column, sheet_row, value);
            }
        }
    }
}

fn write_value(sheet: &mut Worksheet, column: u32, row: u32, value: &FieldValue) {
    if value.is_empty() {
        return;
    }
    let cell = sheet.get_cell_mut((column, row));
    match value {
        FieldValue::Empty => {}
        FieldValue::Text(text) => {
            cell.set_value_string(text.as_str());
        }
        FieldValue::Integer(number) => {
            cell.set_value_number(*number as f64);
        }
        FieldValue::Number(number) => {
            cell.set_value_number(*number);
        }
        FieldValue::Date(date) => {
            cell.set_value_number(date_to_serial(*date));
            cell.get_style_mut()
                .get_number_format_mut()
                .set_format_code(DATE_FORMAT);
        }
    }
}

/// The two linked output tables of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TimecardReport {
    header: Table,
    detail: Table,
}

impl TimecardReport {
    /// One header row per employee and one detail row per shift, both in
    /// employee order. Detail rows repeat every employee field and number
    /// shifts 1000, 2000, ... per employee in attribution order.
    pub fn project(employees: &[Employee]) -> Self {
        let mut header = Table::new(HEADER_SHEET, &HEADER_COLUMNS);
        let mut detail = Table::new(DETAIL_SHEET, &DETAIL_COLUMNS);

        for employee in employees {
            let fields: Row = employee
                .fields()
                .iter()
                .map(|(code, field)| (code.column(), field.value.clone()))
                .collect();

            header.push(
                fields
                    .iter()
                    .filter(|(column, _)| HEADER_FIELD_COLUMNS.contains(*column))
                    .map(|(column, value)| (*column, value.clone()))
                    .collect(),
            );

            for (line, shift) in (1..).zip(employee.shifts()) {
                let mut row = fields.clone();
                row.insert(
                    LINE_NUMBER.column(),
                    FieldValue::Integer(line * LINE_NUMBER_STEP),
                );
                row.insert(
                    SHIFT_DATE.column(),
                    shift.date.map(FieldValue::Date).unwrap_or_default(),
                );
                row.insert(HOURS.column(), FieldValue::Number(shift.hours()));
                detail.push(row);
            }
        }

        tracing::info!(
            header_rows = header.rows.len(),
            detail_rows = detail.rows.len(),
            "projected timecard tables"
        );
        Self { header, detail }
    }

    pub fn header(&self) -> &Table {
        &self.header
    }

    pub fn detail(&self) -> &Table {
        &self.detail
    }

    pub fn is_empty(&self) -> bool {
        self.header.rows.is_empty()
    }

    /// Writes both sheets and their named ranges to a new xlsx file.
    pub fn write(&self, path: &Path) -> TimecardResult<()> {
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        for table in [&self.header, &self.detail] {
            let sheet = book
                .new_sheet(table.name)
                .map_err(|error| TimecardError::report_write(path, error))?;
            table.write_to(sheet);
            sheet
                .add_defined_name(table.name.to_string(), table.named_range())
                .map_err(|error| TimecardError::report_write(path, error))?;
        }
        umya_spreadsheet::writer::xlsx::write(&book, path)
            .map_err(|error| TimecardError::report_write(path, error))?;
        tracing::info!(
            path = %path.display(),
            header = %self.header.named_range(),
            detail = %self.detail.named_range(),
            "timecard workbook written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employees::{DAYS, EMPLOYEE, EmployeeId, PERIOD_END, Shift, TIMECARD};
    use crate::enrichment::DISTRIBUTION_CODE;
    use crate::model::Coordinate;
    use chrono::{NaiveDate, NaiveTime};

    fn ymd(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn employee(id: &str, shifts: &[(Option<u32>, u32, u32)]) -> Employee {
        let mut employee = Employee::new(EmployeeId::new(id), Coordinate::new(1, 2));
        employee.add_field(EMPLOYEE, FieldValue::text(id)).unwrap();
        employee.add_field(PERIOD_END, FieldValue::Date(ymd(13))).unwrap();
        employee.add_field(TIMECARD, FieldValue::text("JAN")).unwrap();
        employee.add_field(DAYS, FieldValue::Integer(1)).unwrap();
        for (column, (day, hour, minute)) in (2..).zip(shifts) {
            let duration = NaiveDate::from_ymd_opt(1899, 12, 30)
                .unwrap()
                .and_time(NaiveTime::from_hms_opt(*hour, *minute, 0).unwrap());
            employee.add_shift(Shift {
                date: day.map(ymd),
                duration,
                source: Coordinate::new(column, 2),
            });
        }
        employee
    }

    #[test]
    fn schemas_have_expected_widths() {
        assert_eq!(HEADER_COLUMNS.len(), 74);
        assert_eq!(DETAIL_COLUMNS.len(), 66);
        assert_eq!(DETAIL_COLUMNS[(LINE_NUMBER.column() - 1) as usize], LINE_NUMBER.name);
        assert_eq!(DETAIL_COLUMNS[(SHIFT_DATE.column() - 1) as usize], SHIFT_DATE.name);
        assert_eq!(DETAIL_COLUMNS[(HOURS.column() - 1) as usize], HOURS.name);
        assert_eq!(DETAIL_COLUMNS[(DAYS.column() - 1) as usize], DAYS.name);
        assert_eq!(
            DETAIL_COLUMNS[(DISTRIBUTION_CODE.column() - 1) as usize],
            DISTRIBUTION_CODE.name
        );
    }

    #[test]
    fn line_numbers_follow_append_order_not_dates() {
        let employees = vec![employee(
            "42",
            &[(Some(12), 8, 0), (Some(8), 1, 30), (Some(10), 0, 45)],
        )];
        let report = TimecardReport::project(&employees);
        let detail = report.detail();
        let lines: Vec<_> = (0..3).map(|i| detail.value(i, LINE_NUMBER).cloned()).collect();
        assert_eq!(
            lines,
            vec![
                Some(FieldValue::Integer(1000)),
                Some(FieldValue::Integer(2000)),
                Some(FieldValue::Integer(3000))
            ]
        );
        assert_eq!(detail.value(0, SHIFT_DATE), Some(&FieldValue::Date(ymd(12))));
        assert_eq!(detail.value(1, HOURS), Some(&FieldValue::Number(1.5)));
        assert_eq!(detail.value(2, HOURS), Some(&FieldValue::Number(0.75)));
    }

    #[test]
    fn header_rows_carry_only_identity_columns() {
        let employees = vec![employee("42", &[(Some(8), 8, 0)]), employee("7", &[(None, 4, 0)])];
        let report = TimecardReport::project(&employees);
        let header = report.header();
        assert_eq!(header.rows().len(), 2);
        assert_eq!(header.rows()[0].keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(header.value(1, EMPLOYEE), Some(&FieldValue::text("7")));

        let detail = report.detail();
        assert_eq!(detail.value(1, LINE_NUMBER), Some(&FieldValue::Integer(1000)));
        assert_eq!(detail.value(1, SHIFT_DATE), Some(&FieldValue::Empty));
        assert_eq!(detail.value(1, DAYS), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn named_ranges_cover_headings_and_rows() {
        let employees = vec![employee("42", &[(Some(8), 8, 0), (Some(9), 8, 0)])];
        let report = TimecardReport::project(&employees);
        assert_eq!(report.header().named_range(), "Timecard_Header!$A$1:$BV$2");
        assert_eq!(report.detail().named_range(), "Timecard_Detail!$A$1:$BN$3");

        let empty = TimecardReport::project(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.detail().named_range(), "Timecard_Detail!$A$1:$BN$1");
    }
}
