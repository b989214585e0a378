// src/calendar.rs
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Day numbers (1..=days_in_month) that are holidays in one month.
pub type HolidaySet = BTreeSet<u32>;

// --- Holiday Tables ---

// (month, day, name)
const FIXED_HOLIDAYS: [(u32, u32, &str); 10] = [
    (1, 1, "元日"),
    (2, 11, "建国記念の日"),
    (2, 23, "天皇誕生日"),
    (4, 29, "昭和の日"),
    (5, 3, "憲法記念日"),
    (5, 4, "みどりの日"),
    (5, 5, "こどもの日"),
    (8, 11, "山の日"),
    (11, 3, "文化の日"),
    (11, 23, "勤労感謝の日"),
];

// (month, nth Monday, name)
const HAPPY_MONDAYS: [(u32, u32, &str); 4] = [
    (1, 2, "成人の日"),
    (7, 3, "海の日"),
    (9, 3, "敬老の日"),
    (10, 2, "スポーツの日"),
];

const VERNAL_EQUINOX_BASE: f64 = 20.8431;
const AUTUMNAL_EQUINOX_BASE: f64 = 23.2488;
const EQUINOX_DRIFT_PER_YEAR: f64 = 0.242194;

const WEEKDAY_KANJI: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

// --- Calendar Helpers ---

/// Number of days in the month, or 0 when `month` is not 1..=12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match next_first {
        Some(next) => (next - first).num_days() as u32,
        None => 0,
    }
}

pub fn weekday_of(year: i32, month: u32, day: u32) -> Option<Weekday> {
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.weekday())
}

pub fn weekday_kanji(weekday: Weekday) -> &'static str {
    WEEKDAY_KANJI[weekday.num_days_from_sunday() as usize]
}

pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// One column of the month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub day: u32,
    pub weekday: Weekday,
    pub is_holiday: bool,
}

impl CalendarDay {
    /// Weekends and holidays are closed for staffing purposes.
    pub fn is_closed(&self) -> bool {
        self.is_holiday || is_weekend(self.weekday)
    }

    /// Header label such as `3(月)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.day, weekday_kanji(self.weekday))
    }
}

pub fn month_days(year: i32, month: u32) -> Vec<CalendarDay> {
    let holidays = compute_holidays(year, month);
    (1..=days_in_month(year, month))
        .filter_map(|day| {
            weekday_of(year, month, day).map(|weekday| CalendarDay {
                day,
                weekday,
                is_holiday: holidays.contains(&day),
            })
        })
        .collect()
}

// --- Holiday Rules ---

/// Day of the n-th Monday in the month, scanning forward from the 1st.
pub fn nth_monday(year: i32, month: u32, n: u32) -> Option<u32> {
    let mut count = 0;
    for day in 1..=days_in_month(year, month) {
        if weekday_of(year, month, day) == Some(Weekday::Mon) {
            count += 1;
            if count == n {
                return Some(day);
            }
        }
    }
    None
}

// Approximation only holds for roughly 1980-2099.
fn equinox_day(base: f64, year: i32) -> i64 {
    let elapsed = f64::from(year - 1980);
    (base + EQUINOX_DRIFT_PER_YEAR * elapsed - (elapsed / 4.0).floor()).floor() as i64
}

pub fn vernal_equinox_day(year: i32) -> i64 {
    equinox_day(VERNAL_EQUINOX_BASE, year)
}

pub fn autumnal_equinox_day(year: i32) -> i64 {
    equinox_day(AUTUMNAL_EQUINOX_BASE, year)
}

/// Public holidays of the month before observance rules are applied.
fn statutory_holidays(year: i32, month: u32, days: u32) -> HolidaySet {
    let mut holidays = HolidaySet::new();

    for (m, d, name) in FIXED_HOLIDAYS {
        if m == month {
            debug!("{}-{}: fixed holiday {} on day {}", year, month, name, d);
            holidays.insert(d);
        }
    }

    for (m, n, name) in HAPPY_MONDAYS {
        if m == month {
            match nth_monday(year, month, n) {
                Some(d) => {
                    debug!("{}-{}: {} on day {}", year, month, name, d);
                    holidays.insert(d);
                }
                None => warn!("{}-{}: no Monday #{} for {}", year, month, n, name),
            }
        }
    }

    let equinox = match month {
        3 => Some(vernal_equinox_day(year)),
        9 => Some(autumnal_equinox_day(year)),
        _ => None,
    };
    if let Some(day) = equinox {
        if (1..=i64::from(days)).contains(&day) {
            holidays.insert(day as u32);
        } else {
            warn!("{}-{}: equinox approximation gave day {}, ignored", year, month, day);
        }
    }

    holidays
}

/// All holidays of `(year, month)`, including substitute holidays (振替休日)
/// and citizens' holidays (国民の休日).
///
/// Observance rules only look inside the requested month; a holiday pair
/// straddling a month boundary never yields a citizens' holiday.
pub fn compute_holidays(year: i32, month: u32) -> HolidaySet {
    let days = days_in_month(year, month);
    if days == 0 {
        warn!("compute_holidays called with invalid month {}-{}", year, month);
        return HolidaySet::new();
    }
    let is_sunday = |day: u32| weekday_of(year, month, day) == Some(Weekday::Sun);

    let statutory = statutory_holidays(year, month, days);

    // Ascending order so later substitutes skip the earlier ones.
    let mut substitutes = HolidaySet::new();
    for &day in statutory.iter().filter(|&&day| is_sunday(day)) {
        let mut next = day + 1;
        while statutory.contains(&next) || substitutes.contains(&next) {
            next += 1;
        }
        if next <= days {
            debug!("{}-{}: substitute holiday on day {} for day {}", year, month, next, day);
            substitutes.insert(next);
        }
    }

    let mut holidays: HolidaySet = statutory.union(&substitutes).copied().collect();

    let sandwiched: Vec<u32> = holidays
        .iter()
        .zip(holidays.iter().skip(1))
        .filter(|&(&first, &second)| second - first == 2)
        .map(|(&first, _)| first + 1)
        .filter(|&middle| !is_sunday(middle) && !holidays.contains(&middle))
        .collect();
    for day in sandwiched {
        debug!("{}-{}: citizens' holiday on day {}", year, month, day);
        holidays.insert(day);
    }

    holidays
}
