// src/board.rs
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, warn};

use crate::calendar::{compute_holidays, days_in_month};
use crate::entry::ScheduleEntry;
use crate::irregularity::{detect_irregularities, Irregularity};
use crate::patterns::{DefaultShift, PatternCatalog, PatternError, PatternSlot, ShiftPattern};
use crate::resolver::resolve_date;
use crate::schedule::{
    apply_pattern_to_month, generate_schedule_for_month, month_key, MonthSchedule, Schedule,
    StaffDays,
};
use crate::shortage::{compute_task_counts, shortage_grid, ShortageRow, TaskCounts};
use crate::staff::{Staff, StaffId, Task, TaskId, DEFAULT_REQUIRED_PERSONNEL};
use crate::summary::summarize_pattern;

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Staff member '{0}' does not exist")]
    UnknownStaff(StaffId),
    #[error("Task '{0}' does not exist")]
    UnknownTask(TaskId),
    #[error("Day {day} of {month_key} is a locked holiday for '{staff_id}'")]
    LockedEntry {
        staff_id: StaffId,
        month_key: String,
        day: u32,
    },
    #[error("Day {day} is outside {month_key}")]
    DayOutOfRange { month_key: String, day: u32 },
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

pub type BoardResult<T> = Result<T, BoardError>;

// --- Board State ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    /// Comma separated chat user ids mentioned on shift submission.
    #[serde(default)]
    pub submission_notification_ids: String,
}

impl AdminConfig {
    pub fn notification_ids(&self) -> Vec<String> {
        self.submission_notification_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Everything the shift board persists: staff, tasks, patterns and every
/// generated or edited month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftBoard {
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub shift_patterns: PatternCatalog,
    #[serde(default)]
    pub admin_config: AdminConfig,
}

/// Tasks a brand new board starts with.
fn seed_tasks() -> Vec<Task> {
    vec![
        Task::new("t1", "早番電話", 3),
        Task::new("t2", "遅番電話", 3),
        Task::new("t3", "メール対応", 2),
        Task::new("t4", "チャット対応", 2),
    ]
}

/// Partial edit of a staff member's profile; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaffUpdate {
    pub name: Option<String>,
    pub employee_id: Option<String>,
    pub role: Option<String>,
    pub pin: Option<String>,
    pub email: Option<String>,
    pub chat_user_id: Option<String>,
}

impl StaffUpdate {
    pub fn is_empty(&self) -> bool {
        *self == StaffUpdate::default()
    }
}

/// Millisecond-stamped id with the given prefix, bumped until it is unused.
fn fresh_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut stamp = Utc::now().timestamp_millis();
    loop {
        let id = format!("{}{}", prefix, stamp);
        if !taken(&id) {
            return id;
        }
        stamp += 1;
    }
}

impl ShiftBoard {
    /// The board used when nothing has been stored yet: the standard phone,
    /// mail and chat tasks and no staff.
    pub fn seeded(admin_config: AdminConfig) -> Self {
        info!("Seeding a new shift board");
        Self {
            tasks: seed_tasks(),
            admin_config,
            ..Default::default()
        }
    }

    pub fn staff_member(&self, staff_id: &str) -> BoardResult<&Staff> {
        self.staff
            .iter()
            .find(|s| s.id == staff_id)
            .ok_or_else(|| BoardError::UnknownStaff(staff_id.to_string()))
    }

    fn staff_member_mut(&mut self, staff_id: &str) -> BoardResult<&mut Staff> {
        self.staff
            .iter_mut()
            .find(|s| s.id == staff_id)
            .ok_or_else(|| BoardError::UnknownStaff(staff_id.to_string()))
    }

    pub fn task(&self, task_id: &str) -> BoardResult<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))
    }

    fn task_mut(&mut self, task_id: &str) -> BoardResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))
    }

    pub fn month(&self, year: i32, month: u32) -> Option<&MonthSchedule> {
        self.schedule.get(&month_key(year, month))
    }

    /// Stored entry for one cell, empty when missing.
    pub fn entry(&self, staff_id: &str, year: i32, month: u32, day: u32) -> ScheduleEntry {
        self.month(year, month)
            .and_then(|m| m.get(staff_id))
            .and_then(|days| days.get(&day))
            .cloned()
            .unwrap_or_default()
    }

    // --- Schedule ---

    /// Generates the month from default shifts if it does not exist yet.
    /// Returns whether anything was generated.
    pub fn ensure_month(&mut self, year: i32, month: u32) -> bool {
        let key = month_key(year, month);
        if self.schedule.contains_key(&key) {
            return false;
        }
        let generated = generate_schedule_for_month(year, month, &self.staff, &self.shift_patterns);
        info!("Generated schedule for {} ({} staff)", key, generated.len());
        self.schedule.insert(key, generated);
        true
    }

    fn write_cell(&mut self, staff_id: &str, key: &str, day: u32, entry: ScheduleEntry) {
        let mut month = self.schedule.get(key).cloned().unwrap_or_default();
        let days = month
            .get(staff_id)
            .cloned()
            .unwrap_or_default()
            .update(day, entry);
        month.insert(staff_id.to_string(), days);
        self.schedule.insert(key.to_string(), month);
    }

    /// Writes one cell. Locked holidays can only be overwritten by an admin.
    pub fn set_entry(
        &mut self,
        actor_is_admin: bool,
        staff_id: &str,
        year: i32,
        month: u32,
        day: u32,
        entry: ScheduleEntry,
    ) -> BoardResult<()> {
        self.staff_member(staff_id)?;
        let key = month_key(year, month);
        if day == 0 || day > days_in_month(year, month) {
            return Err(BoardError::DayOutOfRange {
                month_key: key,
                day,
            });
        }
        if !actor_is_admin && self.entry(staff_id, year, month, day).is_locked() {
            warn!("Rejected edit of locked day {} {} for {}", key, day, staff_id);
            return Err(BoardError::LockedEntry {
                staff_id: staff_id.to_string(),
                month_key: key,
                day,
            });
        }

        info!("Set {} {}/{} to '{}'", staff_id, key, day, entry.display());
        self.write_cell(staff_id, &key, day, entry);
        Ok(())
    }

    /// Makes `pattern` the staff member's default shift and regenerates only
    /// their days of the given month.
    pub fn apply_pattern(
        &mut self,
        staff_id: &str,
        pattern: Vec<PatternSlot>,
        year: i32,
        month: u32,
    ) -> BoardResult<StaffDays> {
        let member = self.staff_member_mut(staff_id)?;
        member.default_shift = DefaultShift::from_slots(pattern.clone());

        let key = month_key(year, month);
        let mut month_schedule = self.schedule.get(&key).cloned().unwrap_or_default();
        let days = apply_pattern_to_month(
            staff_id,
            &pattern,
            year,
            month,
            &mut month_schedule,
            &self.shift_patterns,
        );
        self.schedule.insert(key.clone(), month_schedule);
        info!("Applied new default shift to {} for {}", staff_id, key);
        Ok(days)
    }

    /// Locks the day as a holiday for every staff member, or, when it is
    /// already locked for all of them, restores each one's default value.
    /// Returns whether the day is locked afterwards.
    pub fn toggle_day_holiday(&mut self, year: i32, month: u32, day: u32) -> BoardResult<bool> {
        let key = month_key(year, month);
        if day == 0 || day > days_in_month(year, month) {
            return Err(BoardError::DayOutOfRange {
                month_key: key,
                day,
            });
        }

        let all_locked = !self.staff.is_empty()
            && self
                .staff
                .iter()
                .all(|s| self.entry(&s.id, year, month, day).is_locked());

        let mut month_schedule = self.schedule.get(&key).cloned().unwrap_or_default();
        if all_locked {
            let holidays = compute_holidays(year, month);
            for member in &self.staff {
                let restored = resolve_date(
                    year,
                    month,
                    day,
                    &holidays,
                    member.default_shift.slots(),
                    &self.shift_patterns,
                );
                let days = month_schedule
                    .get(&member.id)
                    .cloned()
                    .unwrap_or_default()
                    .update(day, restored);
                month_schedule.insert(member.id.clone(), days);
            }
            info!("Unlocked {} day {} for {} staff", key, day, self.staff.len());
        } else {
            for member in &self.staff {
                let days = month_schedule
                    .get(&member.id)
                    .cloned()
                    .unwrap_or_default()
                    .update(day, ScheduleEntry::LockedHoliday);
                month_schedule.insert(member.id.clone(), days);
            }
            info!("Locked {} day {} as a holiday for everyone", key, day);
        }
        self.schedule.insert(key, month_schedule);
        Ok(!all_locked)
    }

    // --- Staff ---

    /// Adds a placeholder staff member working pattern `A` every weekday.
    pub fn add_staff(&mut self) -> StaffId {
        let id = fresh_id("s", |candidate| self.staff.iter().any(|s| s.id == candidate));
        self.staff.push(Staff {
            id: id.clone(),
            employee_id: "New".to_string(),
            name: "新規メンバー".to_string(),
            role: "OP".to_string(),
            pin: "0000".to_string(),
            default_shift: DefaultShift::uniform(PatternSlot::from("A")),
            ..Default::default()
        });
        info!("Added staff member {}", id);
        id
    }

    /// Removes the staff member and their entries from every month.
    pub fn delete_staff(&mut self, staff_id: &str) -> BoardResult<Staff> {
        let position = self
            .staff
            .iter()
            .position(|s| s.id == staff_id)
            .ok_or_else(|| BoardError::UnknownStaff(staff_id.to_string()))?;
        let removed = self.staff.remove(position);
        self.schedule = self
            .schedule
            .iter()
            .map(|(key, month)| (key.clone(), month.without(staff_id)))
            .collect();
        info!("Deleted staff member {} ({})", removed.id, removed.name);
        Ok(removed)
    }

    pub fn update_staff_info(&mut self, staff_id: &str, update: StaffUpdate) -> BoardResult<()> {
        let member = self.staff_member_mut(staff_id)?;
        if let Some(name) = update.name {
            member.name = name;
        }
        if let Some(employee_id) = update.employee_id {
            member.employee_id = employee_id;
        }
        if let Some(role) = update.role {
            member.role = role;
        }
        if let Some(pin) = update.pin {
            member.pin = pin;
        }
        if let Some(email) = update.email {
            let email = email.trim().to_string();
            member.email = (!email.is_empty()).then_some(email);
        }
        if let Some(chat_user_id) = update.chat_user_id {
            member.chat_user_id = chat_user_id;
        }
        info!("Updated profile of {}", staff_id);
        Ok(())
    }

    // --- Tasks ---

    pub fn add_task(&mut self, name: &str, required_personnel: Option<u32>) -> TaskId {
        let id = fresh_id("t", |candidate| self.tasks.iter().any(|t| t.id == candidate));
        let required = required_personnel.unwrap_or(DEFAULT_REQUIRED_PERSONNEL);
        self.tasks.push(Task::new(&id, name, required));
        info!("Added task {} '{}' needing {}", id, name, required);
        id
    }

    pub fn rename_task(&mut self, task_id: &str, name: &str) -> BoardResult<()> {
        self.task_mut(task_id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_required_personnel(&mut self, task_id: &str, required: u32) -> BoardResult<()> {
        self.task_mut(task_id)?.required_personnel = Some(required);
        info!("Task {} now needs {}", task_id, required);
        Ok(())
    }

    /// Removes the task and purges it from every staff member's skills.
    pub fn delete_task(&mut self, task_id: &str) -> BoardResult<Task> {
        let position = self
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        let removed = self.tasks.remove(position);
        for member in &mut self.staff {
            member.possible_tasks.remove(task_id);
        }
        info!("Deleted task {} ({})", removed.id, removed.name);
        Ok(removed)
    }

    /// Makes exactly `staff_ids` responsible for the task.
    pub fn assign_task_staff(&mut self, task_id: &str, staff_ids: &[StaffId]) -> BoardResult<()> {
        self.task(task_id)?;
        for member in &mut self.staff {
            if staff_ids.contains(&member.id) {
                member.possible_tasks.insert(task_id.to_string());
            } else {
                member.possible_tasks.remove(task_id);
            }
        }
        info!("Task {} assigned to {} staff", task_id, staff_ids.len());
        Ok(())
    }

    /// Replaces every staff member's skills from a task to staff mapping.
    /// Staff not mentioned end up with no tasks; unknown task ids are skipped.
    pub fn bulk_assign_tasks(&mut self, assignments: &BTreeMap<TaskId, Vec<StaffId>>) {
        let mut per_staff: BTreeMap<&str, BTreeSet<TaskId>> = BTreeMap::new();
        for (task_id, staff_ids) in assignments {
            if self.task(task_id).is_err() {
                warn!("Skipping assignment for unknown task {}", task_id);
                continue;
            }
            for staff_id in staff_ids {
                per_staff
                    .entry(staff_id.as_str())
                    .or_default()
                    .insert(task_id.clone());
            }
        }
        let updated: Vec<BTreeSet<TaskId>> = self
            .staff
            .iter()
            .map(|s| per_staff.get(s.id.as_str()).cloned().unwrap_or_default())
            .collect();
        for (member, tasks) in self.staff.iter_mut().zip(updated) {
            member.possible_tasks = tasks;
        }
        info!("Bulk-assigned {} task(s)", assignments.len());
    }

    // --- Patterns ---

    pub fn add_pattern(
        &mut self,
        symbol: &str,
        start_time: &str,
        end_time: &str,
        break_hours: Decimal,
    ) -> BoardResult<ShiftPattern> {
        let pattern = ShiftPattern::create(symbol, start_time, end_time, break_hours)?;
        self.shift_patterns.insert(pattern.clone())?;
        info!(
            "Added shift pattern {} {} ({} h)",
            pattern.id, pattern.display_time, pattern.work_hours
        );
        Ok(pattern)
    }

    // --- Approval Workflow ---

    pub fn set_submitted(&mut self, staff_id: &str, year: i32, month: u32, value: bool) -> BoardResult<()> {
        let key = month_key(year, month);
        self.staff_member_mut(staff_id)?
            .shift_submitted
            .insert(key.clone(), value);
        info!("{} submitted {} = {}", staff_id, key, value);
        Ok(())
    }

    pub fn set_remanded(&mut self, staff_id: &str, year: i32, month: u32, value: bool) -> BoardResult<()> {
        let key = month_key(year, month);
        self.staff_member_mut(staff_id)?
            .shift_remanded
            .insert(key.clone(), value);
        info!("{} remanded {} = {}", staff_id, key, value);
        Ok(())
    }

    pub fn set_approved(&mut self, staff_id: &str, year: i32, month: u32, value: bool) -> BoardResult<()> {
        let key = month_key(year, month);
        self.staff_member_mut(staff_id)?
            .shift_approved
            .insert(key.clone(), value);
        info!("{} approved {} = {}", staff_id, key, value);
        Ok(())
    }

    pub fn set_submission_notification_ids(&mut self, ids: &str) {
        self.admin_config.submission_notification_ids = ids.trim().to_string();
        info!(
            "Submission notifications now mention {} user(s)",
            self.admin_config.notification_ids().len()
        );
    }

    // --- Views ---

    pub fn task_counts(&self, year: i32, month: u32) -> TaskCounts {
        let empty = MonthSchedule::new();
        let schedule = self.month(year, month).unwrap_or(&empty);
        compute_task_counts(schedule, &self.staff, &self.tasks, days_in_month(year, month))
    }

    pub fn shortages(&self, year: i32, month: u32) -> Vec<ShortageRow> {
        shortage_grid(year, month, &self.task_counts(year, month), &self.tasks)
    }

    pub fn detect_irregularities(&self, staff_id: &str, year: i32, month: u32) -> BoardResult<Vec<Irregularity>> {
        let member = self.staff_member(staff_id)?;
        let actual = self.month(year, month).and_then(|m| m.get(staff_id));
        Ok(detect_irregularities(
            member,
            actual,
            &self.shift_patterns,
            &compute_holidays(year, month),
            year,
            month,
        ))
    }

    pub fn irregularities(&self, staff_id: &str, year: i32, month: u32) -> BoardResult<Vec<String>> {
        Ok(self
            .detect_irregularities(staff_id, year, month)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    pub fn pattern_summary(&self, staff_id: &str) -> BoardResult<String> {
        let member = self.staff_member(staff_id)?;
        Ok(summarize_pattern(
            member.default_shift.slots(),
            &self.shift_patterns,
        ))
    }
}
