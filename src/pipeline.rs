//! Orchestration of one timecard run.

use crate::attribution::{attribute_shifts, retain_with_hours};
use crate::config::{LookupSource, TimecardConfig};
use crate::employees::{Employee, SeedFields, resolve_employees};
use crate::enrichment::{DistributionLookup, SqliteLookup, StaticLookup, enrich};
use crate::error::TimecardResult;
use crate::grid::Grid;
use crate::logging::{run_span, stage_span};
use crate::model::RunWarning;
use crate::report::TimecardReport;
use crate::utils::path_to_forward_slashes;
use crate::weeks::{Week, partition_weeks, period_end};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Everything one run produced, before anything is written.
#[derive(Debug, Clone)]
pub struct TimecardRun {
    pub weeks: Vec<Week>,
    pub period_end: Option<NaiveDate>,
    pub employees: Vec<Employee>,
    pub report: TimecardReport,
    pub warnings: Vec<RunWarning>,
}

/// Runs extraction, enrichment and projection over an in-memory grid.
pub fn generate(
    grid: &Grid,
    lookup: &dyn DistributionLookup,
    timecard: &str,
) -> TimecardResult<TimecardRun> {
    let weeks = {
        let _stage = stage_span("weeks").entered();
        partition_weeks(grid.cells())
    };
    let period_end = period_end(&weeks);
    tracing::info!(weeks = weeks.len(), period_end = ?period_end, "partitioned date row");

    let key_column = grid.min_bound().column;
    let seed = SeedFields {
        period_end,
        timecard: timecard.to_string(),
    };
    let mut employees = {
        let _stage = stage_span("employees").entered();
        resolve_employees(grid.iterate(grid.bounds().column_slice(key_column)), &seed)?
    };

    {
        let _stage = stage_span("attribution").entered();
        attribute_shifts(grid, &weeks, &mut employees, key_column);
        retain_with_hours(&mut employees);
    }

    let mut warnings = Vec::new();
    if employees.is_empty() {
        tracing::warn!("no employee has attributable hours");
        warnings.push(RunWarning::empty_entity_set());
    }

    {
        let _stage = stage_span("enrichment").entered();
        warnings.extend(enrich(&mut employees, lookup)?);
    }

    let report = TimecardReport::project(&employees);
    Ok(TimecardRun {
        weeks,
        period_end,
        employees,
        report,
        warnings,
    })
}

/// After-run report printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timecard: String,
    pub source: String,
    pub output: String,
    pub period_end: Option<String>,
    pub weeks: usize,
    pub employees: usize,
    pub shifts: usize,
    pub total_hours: f64,
    pub warnings: Vec<RunWarning>,
}

impl RunSummary {
    pub fn new(run: &TimecardRun, timecard: &str, source: &Path, output: &Path) -> Self {
        Self {
            timecard: timecard.to_string(),
            source: path_to_forward_slashes(source),
            output: path_to_forward_slashes(output),
            period_end: run
                .period_end
                .map(|date| date.format("%Y-%m-%d").to_string()),
            weeks: run.weeks.iter().filter(|week| !week.is_empty()).count(),
            employees: run.employees.len(),
            shifts: run.employees.iter().map(Employee::shift_count).sum(),
            total_hours: run.employees.iter().map(Employee::total_hours).sum(),
            warnings: run.warnings.clone(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timecard:    {}", self.timecard)?;
        writeln!(f, "source:      {}", self.source)?;
        writeln!(f, "output:      {}", self.output)?;
        writeln!(
            f,
            "period end:  {}",
            self.period_end.as_deref().unwrap_or("-")
        )?;
        writeln!(f, "weeks:       {}", self.weeks)?;
        writeln!(f, "employees:   {}", self.employees)?;
        writeln!(f, "shifts:      {}", self.shifts)?;
        write!(f, "total hours: {:.2}", self.total_hours)?;
        if !self.warnings.is_empty() {
            write!(f, "\nwarnings ({}):", self.warnings.len())?;
            for warning in &self.warnings {
                write!(f, "\n  {warning}")?;
            }
        }
        Ok(())
    }
}

pub fn open_lookup(source: &LookupSource) -> Result<Box<dyn DistributionLookup>> {
    Ok(match source {
        LookupSource::Database { path, query } => {
            Box::new(SqliteLookup::open(path, query.as_deref())?)
        }
        LookupSource::File(path) => Box::new(StaticLookup::load(path)?),
    })
}

/// Reads the source, generates the timecards and writes the workbook. No
/// output is written when any stage fails.
pub fn run(config: &TimecardConfig) -> Result<RunSummary> {
    let span = run_span(&config.timecard);
    let _entered = span.enter();

    let grid = Grid::open(&config.source)?;
    let lookup = open_lookup(&config.lookup)?;
    let run = generate(&grid, lookup.as_ref(), &config.timecard)?;
    run.report.write(&config.output)?;

    let summary = RunSummary::new(&run, &config.timecard, &config.source, &config.output);
    tracing::info!(
        employees = summary.employees,
        shifts = summary.shifts,
        warnings = summary.warnings.len(),
        "run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employees::EmployeeId;
    use crate::enrichment::DistributionRecord;
    use crate::model::{Coordinate, RawValue, WarningKind};

    fn no_records(_: &EmployeeId) -> Option<DistributionRecord> {
        None
    }

    #[test]
    fn grid_without_hours_warns_and_projects_nothing() {
        let mut grid = Grid::new("Sheet1");
        grid.set(Coordinate::new(1, 2), RawValue::Text("Ann".into()));
        let run = generate(&grid, &no_records, "JAN").unwrap();
        assert!(run.employees.is_empty());
        assert!(run.report.is_empty());
        assert_eq!(run.warnings.len(), 1);
        assert_eq!(run.warnings[0].kind, WarningKind::EmptyEntitySet);
        assert_eq!(run.period_end, None);
    }

    #[test]
    fn summary_text_lists_warnings() {
        let grid = Grid::new("Sheet1");
        let run = generate(&grid, &no_records, "JAN").unwrap();
        let summary = RunSummary::new(&run, "JAN", Path::new("in.xlsx"), Path::new("out.xlsx"));
        let text = summary.to_string();
        assert!(text.contains("employees:   0"));
        assert!(text.contains("warnings (1):"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["warnings"][0]["kind"], "empty_entity_set");
    }
}
