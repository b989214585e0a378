// src/shortage.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::calendar::{month_days, CalendarDay};
use crate::schedule::MonthSchedule;
use crate::staff::{Staff, Task, TaskId};

/// Day number to task id to number of qualified staff working that day.
pub type TaskCounts = BTreeMap<u32, BTreeMap<TaskId, u32>>;

const CRITICAL_RATIO: Decimal = dec!(0.3);
const WARNING_RATIO: Decimal = dec!(0.6);

/// Counts, per day and task, the staff who are working and can do the task.
///
/// Every listed task appears on every day, starting at zero. Task ids a
/// staff member lists but that no longer exist are ignored.
pub fn compute_task_counts(
    schedule: &MonthSchedule,
    staff: &[Staff],
    tasks: &[Task],
    days_in_month: u32,
) -> TaskCounts {
    (1..=days_in_month)
        .map(|day| {
            let counts = tasks
                .iter()
                .map(|task| {
                    let working = staff
                        .iter()
                        .filter(|member| member.can_do(&task.id))
                        .filter(|member| {
                            schedule
                                .get(&member.id)
                                .and_then(|days| days.get(&day))
                                .is_some_and(|entry| entry.is_working())
                        })
                        .count() as u32;
                    (task.id.clone(), working)
                })
                .collect();
            (day, counts)
        })
        .collect()
}

// --- Coverage ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    Warning,
    Mild,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Mild => "mild",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Sufficient,
    Shortage(Severity),
}

/// Bands a headcount against what the task needs. A ratio of exactly 0.3
/// is critical and exactly 0.6 a warning.
pub fn evaluate_coverage(count: u32, required: u32) -> Coverage {
    if count >= required {
        return Coverage::Sufficient;
    }
    let ratio = Decimal::from(count) / Decimal::from(required);
    let severity = if ratio <= CRITICAL_RATIO {
        Severity::Critical
    } else if ratio <= WARNING_RATIO {
        Severity::Warning
    } else {
        Severity::Mild
    };
    Coverage::Shortage(severity)
}

/// One cell of the shortage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCoverage {
    /// Weekend or holiday.
    NotApplicable,
    /// No count was computed for this day and task.
    Unknown,
    Covered(u32),
    Short {
        count: u32,
        required: u32,
        severity: Severity,
    },
}

impl DayCoverage {
    pub fn is_short(&self) -> bool {
        matches!(self, DayCoverage::Short { .. })
    }
}

impl fmt::Display for DayCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayCoverage::NotApplicable | DayCoverage::Unknown => write!(f, "-"),
            DayCoverage::Covered(count) => write!(f, "{}", count),
            DayCoverage::Short {
                count, required, ..
            } => write!(f, "不足 ({}/{})", count, required),
        }
    }
}

/// Coverage of every task across one month.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortageRow {
    pub task_id: TaskId,
    pub task_name: String,
    pub required: u32,
    pub cells: Vec<(CalendarDay, DayCoverage)>,
}

impl ShortageRow {
    pub fn shortage_days(&self) -> usize {
        self.cells.iter().filter(|(_, cell)| cell.is_short()).count()
    }
}

pub fn shortage_grid(year: i32, month: u32, counts: &TaskCounts, tasks: &[Task]) -> Vec<ShortageRow> {
    let days = month_days(year, month);
    let rows: Vec<ShortageRow> = tasks
        .iter()
        .map(|task| {
            let required = task.required();
            let cells = days
                .iter()
                .map(|day| {
                    let cell = if day.is_closed() {
                        DayCoverage::NotApplicable
                    } else {
                        match counts.get(&day.day).and_then(|tasks| tasks.get(&task.id)) {
                            None => DayCoverage::Unknown,
                            Some(&count) => match evaluate_coverage(count, required) {
                                Coverage::Sufficient => DayCoverage::Covered(count),
                                Coverage::Shortage(severity) => DayCoverage::Short {
                                    count,
                                    required,
                                    severity,
                                },
                            },
                        }
                    };
                    (*day, cell)
                })
                .collect();
            ShortageRow {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
                required,
                cells,
            }
        })
        .collect();

    debug!(
        "Shortage grid for {}-{}: {} short cell(s)",
        year,
        month,
        rows.iter().map(ShortageRow::shortage_days).sum::<usize>()
    );
    rows
}
