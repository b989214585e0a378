// src/resolver.rs
use chrono::Weekday;

use crate::calendar::{is_weekend, weekday_of, HolidaySet};
use crate::entry::ScheduleEntry;
use crate::patterns::{PatternCatalog, PatternSlot};

/// Expected value of one day for a staff member's weekly pattern.
///
/// Weekends and holidays are always `休`. Weekdays use the slot for that
/// day: `休` stays a day off, a known pattern id becomes its work hours and
/// anything unresolvable (no pattern, short pattern, unknown id) is empty.
pub fn resolve_day(
    weekday: Weekday,
    is_holiday: bool,
    pattern: Option<&[PatternSlot]>,
    catalog: &PatternCatalog,
) -> ScheduleEntry {
    if is_holiday || is_weekend(weekday) {
        return ScheduleEntry::day_off();
    }

    let index = weekday.num_days_from_monday() as usize;
    match pattern.and_then(|slots| slots.get(index)) {
        Some(PatternSlot::Off) => ScheduleEntry::day_off(),
        Some(PatternSlot::Shift(id)) => catalog
            .get(id)
            .map(|p| ScheduleEntry::WorkedHours(p.work_hours))
            .unwrap_or_default(),
        None => ScheduleEntry::Empty,
    }
}

/// [`resolve_day`] for a calendar date, with holidays precomputed for the month.
pub fn resolve_date(
    year: i32,
    month: u32,
    day: u32,
    holidays: &HolidaySet,
    pattern: Option<&[PatternSlot]>,
    catalog: &PatternCatalog,
) -> ScheduleEntry {
    match weekday_of(year, month, day) {
        Some(weekday) => resolve_day(weekday, holidays.contains(&day), pattern, catalog),
        None => ScheduleEntry::Empty,
    }
}
