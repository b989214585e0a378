// src/irregularity.rs
use chrono::Weekday;
use std::fmt;
use tracing::debug;

use crate::calendar::{days_in_month, weekday_kanji, weekday_of, HolidaySet};
use crate::entry::ScheduleEntry;
use crate::patterns::PatternCatalog;
use crate::resolver::resolve_day;
use crate::schedule::StaffDays;
use crate::staff::Staff;

/// A day whose entered value differs from what the default pattern predicts.
#[derive(Debug, Clone, PartialEq)]
pub struct Irregularity {
    pub month: u32,
    pub day: u32,
    pub weekday: Weekday,
    pub expected: ScheduleEntry,
    pub actual: ScheduleEntry,
}

impl fmt::Display for Irregularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}({}): {}",
            self.month,
            self.day,
            weekday_kanji(self.weekday),
            self.actual.display_or_unfilled()
        )
    }
}

/// Compares a staff member's actual days with their default pattern, in
/// ascending day order. Missing days count as empty.
pub fn detect_irregularities(
    staff: &Staff,
    actual: Option<&StaffDays>,
    catalog: &PatternCatalog,
    holidays: &HolidaySet,
    year: i32,
    month: u32,
) -> Vec<Irregularity> {
    let pattern = staff.default_shift.slots();
    let irregularities: Vec<Irregularity> = (1..=days_in_month(year, month))
        .filter_map(|day| {
            let weekday = weekday_of(year, month, day)?;
            let expected = resolve_day(weekday, holidays.contains(&day), pattern, catalog);
            let actual = actual
                .and_then(|days| days.get(&day))
                .cloned()
                .unwrap_or_default();
            (actual != expected).then_some(Irregularity {
                month,
                day,
                weekday,
                expected,
                actual,
            })
        })
        .collect();

    debug!(
        "{} has {} irregular day(s) in {}-{}",
        staff.id,
        irregularities.len(),
        year,
        month
    );
    irregularities
}

/// [`detect_irregularities`] formatted as `12/3(水): 4` lines.
pub fn find_irregularities(
    staff: &Staff,
    actual: Option<&StaffDays>,
    catalog: &PatternCatalog,
    holidays: &HolidaySet,
    year: i32,
    month: u32,
) -> Vec<String> {
    detect_irregularities(staff, actual, catalog, holidays, year, month)
        .iter()
        .map(ToString::to_string)
        .collect()
}
