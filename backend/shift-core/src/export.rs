// src/export.rs
use std::io::Write;
use thiserror::Error;
use tracing::info;

use crate::board::ShiftBoard;
use crate::calendar::{month_days, CalendarDay};
use crate::schedule::month_key;
use crate::summary::summarize_pattern;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CHECKED: &str = "☑";
const STAFF_COLUMNS: [&str; 7] = ["役職", "社員番号", "稼働名前", "基本シフト設定", "提出済", "差戻", "承認済"];
const TASK_COLUMNS: [&str; 8] = ["業務", "担当者", "", "", "", "", "", ""];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

pub fn export_file_name(year: i32, month: u32) -> String {
    format!("shift_schedule_{}_{}.csv", year, month)
}

fn flag(set: bool) -> String {
    if set {
        CHECKED.to_string()
    } else {
        String::new()
    }
}

fn count_cell(count: Option<u32>) -> String {
    match count {
        None => "-".to_string(),
        Some(0) => "不足".to_string(),
        Some(n) => format!("{}人", n),
    }
}

/// Writes the month as a spreadsheet-friendly CSV: one row per staff
/// member, then one row per task with daily headcounts.
pub fn write_month_csv<W: Write>(
    mut writer: W,
    board: &ShiftBoard,
    year: i32,
    month: u32,
) -> Result<(), ExportError> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let days = month_days(year, month);
    let day_headers: Vec<String> = days.iter().map(CalendarDay::label).collect();
    let key = month_key(year, month);

    let header = STAFF_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(day_headers.iter().cloned());
    csv.write_record(header)?;

    for member in &board.staff {
        let summary = summarize_pattern(member.default_shift.slots(), &board.shift_patterns)
            .replace('\n', " ");
        let fixed = [
            member.role.clone(),
            member.employee_id.clone(),
            member.name.clone(),
            summary,
            flag(member.is_submitted(&key)),
            flag(member.is_remanded(&key)),
            flag(member.is_approved(&key)),
        ];
        let entries = days
            .iter()
            .map(|day| board.entry(&member.id, year, month, day.day).display());
        csv.write_record(fixed.into_iter().chain(entries))?;
    }

    let task_header = TASK_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(day_headers.iter().cloned());
    csv.write_record(task_header)?;

    let counts = board.task_counts(year, month);
    for task in &board.tasks {
        let names = board
            .staff
            .iter()
            .filter(|s| s.can_do(&task.id))
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let fixed = std::iter::once(task.name.clone())
            .chain(std::iter::once(names))
            .chain(std::iter::repeat(String::new()).take(TASK_COLUMNS.len() - 2));
        let cells = days.iter().map(|day| {
            count_cell(
                counts
                    .get(&day.day)
                    .and_then(|tasks| tasks.get(&task.id))
                    .copied(),
            )
        });
        csv.write_record(fixed.chain(cells))?;
    }

    csv.flush()?;
    info!(
        "Exported {} staff and {} task(s) for {}",
        board.staff.len(),
        board.tasks.len(),
        key
    );
    Ok(())
}
