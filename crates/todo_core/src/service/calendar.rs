//! Month calendar projection of tasks by due date.
//!
//! Weeks start on Monday. Cells outside the month are `None`.

use crate::model::task::Task;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

/// One in-month day and the tasks due on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Monday..Sunday rows.
    pub weeks: Vec<[Option<CalendarDay>; 7]>,
}

impl CalendarMonth {
    /// Iterates the in-month days that have at least one task.
    pub fn busy_days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.weeks
            .iter()
            .flat_map(|week| week.iter().flatten())
            .filter(|day| !day.tasks.is_empty())
    }
}

/// First and last day of a month, or `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))?;
    Some((first, last))
}

/// Lays out `tasks` into a month grid. Tasks without a due date, or due in
/// another month, are ignored. Tasks keep their input order within a day.
pub fn build_month(year: i32, month: u32, tasks: &[Task]) -> Option<CalendarMonth> {
    let (first, last) = month_bounds(year, month)?;
    let lead = first.weekday().num_days_from_monday() as usize;

    let mut weeks: Vec<[Option<CalendarDay>; 7]> = Vec::new();
    let mut week: [Option<CalendarDay>; 7] = Default::default();
    let mut slot = lead;

    for day in first.iter_days().take_while(|day| *day <= last) {
        let due_today = tasks
            .iter()
            .filter(|task| task.due_date == Some(day))
            .cloned()
            .collect();
        week[slot] = Some(CalendarDay {
            date: day,
            tasks: due_today,
        });
        slot += 1;
        if slot == 7 {
            weeks.push(std::mem::take(&mut week));
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }

    Some(CalendarMonth { year, month, weeks })
}
