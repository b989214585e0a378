// src/lib.rs
//! Monthly shift board engine: Japanese national holidays, weekly default
//! patterns, irregularity detection and per-task shortage counting, plus
//! the state container, persistence, chat notifications and CSV export
//! built around it.

pub mod auth;
pub mod board;
pub mod calendar;
pub mod config;
pub mod entry;
pub mod export;
pub mod irregularity;
pub mod notify;
pub mod patterns;
pub mod resolver;
pub mod schedule;
pub mod shortage;
pub mod staff;
pub mod store;
pub mod summary;

#[cfg(test)]
mod board_tests;

pub use board::{AdminConfig, BoardError, ShiftBoard, StaffUpdate};
pub use calendar::{compute_holidays, days_in_month, HolidaySet};
pub use entry::{ScheduleEntry, SpecialShiftKind, StatusKind};
pub use irregularity::find_irregularities;
pub use patterns::{PatternCatalog, PatternSlot, ShiftPattern};
pub use schedule::{apply_pattern_to_month, generate_schedule_for_month, MonthSchedule, Schedule};
pub use shortage::{compute_task_counts, evaluate_coverage, Coverage, Severity, TaskCounts};
pub use staff::{Staff, Task};
pub use summary::summarize_pattern;
