// src/schedule.rs
use tracing::debug;

use crate::calendar::{compute_holidays, days_in_month, HolidaySet};
use crate::entry::ScheduleEntry;
use crate::patterns::{PatternCatalog, PatternSlot};
use crate::resolver::resolve_date;
use crate::staff::{Staff, StaffId};

/// Day number (1..=31) to entry for one staff member.
pub type StaffDays = im::OrdMap<u32, ScheduleEntry>;
/// Staff id to their days, for one month.
pub type MonthSchedule = im::HashMap<StaffId, StaffDays>;
/// Month key (`"2025-12"`) to that month's schedule.
pub type Schedule = im::HashMap<String, MonthSchedule>;

/// Key used for schedule months and per-month approval flags. Months are not
/// zero padded.
pub fn month_key(year: i32, month: u32) -> String {
    format!("{}-{}", year, month)
}

/// Resolves every day of the month for one weekly pattern.
pub fn staff_days_for_month(
    year: i32,
    month: u32,
    holidays: &HolidaySet,
    pattern: Option<&[PatternSlot]>,
    catalog: &PatternCatalog,
) -> StaffDays {
    (1..=days_in_month(year, month))
        .map(|day| {
            (
                day,
                resolve_date(year, month, day, holidays, pattern, catalog),
            )
        })
        .collect()
}

/// Builds a fresh month from every staff member's default shift.
///
/// Pure and deterministic; callers only run it for months that do not exist
/// yet so edited months are never overwritten.
pub fn generate_schedule_for_month(
    year: i32,
    month: u32,
    staff: &[Staff],
    catalog: &PatternCatalog,
) -> MonthSchedule {
    let holidays = compute_holidays(year, month);
    debug!(
        "Generating {} for {} staff ({} holidays)",
        month_key(year, month),
        staff.len(),
        holidays.len()
    );
    staff
        .iter()
        .map(|member| {
            (
                member.id.clone(),
                staff_days_for_month(
                    year,
                    month,
                    &holidays,
                    member.default_shift.slots(),
                    catalog,
                ),
            )
        })
        .collect()
}

/// Regenerates one staff member's month from `pattern`, leaving everyone
/// else untouched, and returns their new days.
pub fn apply_pattern_to_month(
    staff_id: &str,
    pattern: &[PatternSlot],
    year: i32,
    month: u32,
    schedule: &mut MonthSchedule,
    catalog: &PatternCatalog,
) -> StaffDays {
    let holidays = compute_holidays(year, month);
    let days = staff_days_for_month(year, month, &holidays, Some(pattern), catalog);
    debug!(
        "Applied pattern {:?} to {} for {}",
        pattern.iter().map(PatternSlot::as_str).collect::<Vec<_>>(),
        staff_id,
        month_key(year, month)
    );
    schedule.insert(staff_id.to_string(), days.clone());
    days
}
