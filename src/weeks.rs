//! Week partitioning of the date header row.
//!
//! Dates are consumed in grid order and dropped into the current week
//! bucket. Seeing a weekday name that the current bucket already holds is
//! the signal that a new week has started.

use crate::grid::Cell;
use crate::model::Coordinate;
use chrono::{Datelike, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub coordinate: Coordinate,
}

impl WeekDay {
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

/// Up to seven dates, at most one per weekday name. Entries keep the order
/// in which they were scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Week {
    days: Vec<WeekDay>,
}

impl Week {
    pub fn get(&self, weekday: Weekday) -> Option<&WeekDay> {
        self.days.iter().find(|day| day.weekday() == weekday)
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.get(weekday).is_some()
    }

    /// Adds a day whose weekday name is not yet present. Returns the day back
    /// when the name is taken; names are never overwritten.
    fn try_insert(&mut self, day: WeekDay) -> Result<(), WeekDay> {
        if self.contains(day.weekday()) {
            return Err(day);
        }
        self.days.push(day);
        Ok(())
    }

    /// Days in scan order.
    pub fn days(&self) -> &[WeekDay] {
        &self.days
    }

    /// Days ordered Sunday through Saturday.
    pub fn by_weekday(&self) -> impl Iterator<Item = &WeekDay> + '_ {
        const ORDER: [Weekday; 7] = [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ];
        ORDER.into_iter().filter_map(move |weekday| self.get(weekday))
    }

    pub fn last(&self) -> Option<&WeekDay> {
        self.days.last()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Groups the calendar-date cells of a scan into weeks. The result always
/// holds at least one (possibly empty) week.
pub fn partition_weeks<'a, I>(cells: I) -> Vec<Week>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut weeks = vec![Week::default()];
    for cell in cells {
        if cell.kind.is_clock_time() {
            continue;
        }
        let Some(date) = cell.kind.as_date() else {
            continue;
        };
        let day = WeekDay {
            date,
            coordinate: cell.coordinate,
        };
        let current = weeks.len() - 1;
        if let Err(day) = weeks[current].try_insert(day) {
            tracing::debug!(
                weekday = ?day.weekday(),
                at = %day.coordinate,
                week = weeks.len() + 1,
                "weekday repeated, starting new week"
            );
            let mut next = Week::default();
            next.days.push(day);
            weeks.push(next);
        }
    }
    weeks
}

/// The pay period ends on the last day scanned into the last week.
pub fn period_end(weeks: &[Week]) -> Option<NaiveDate> {
    weeks.last().and_then(Week::last).map(|day| day.date)
}
