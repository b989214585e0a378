// src/staff.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::patterns::DefaultShift;

pub type StaffId = String;
pub type TaskId = String;

/// Headcount assumed for tasks stored without one.
pub const DEFAULT_REQUIRED_PERSONNEL: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: StaffId,
    #[serde(default)]
    pub employee_id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub pin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub chat_user_id: String,
    #[serde(default)]
    pub possible_tasks: BTreeSet<TaskId>,
    #[serde(default)]
    pub default_shift: DefaultShift,
    // Keyed by "year-month".
    #[serde(default)]
    pub shift_submitted: BTreeMap<String, bool>,
    #[serde(default)]
    pub shift_remanded: BTreeMap<String, bool>,
    #[serde(default)]
    pub shift_approved: BTreeMap<String, bool>,
}

impl Staff {
    pub fn can_do(&self, task_id: &str) -> bool {
        self.possible_tasks.contains(task_id)
    }

    pub fn is_submitted(&self, month_key: &str) -> bool {
        self.shift_submitted.get(month_key).copied().unwrap_or(false)
    }

    pub fn is_remanded(&self, month_key: &str) -> bool {
        self.shift_remanded.get(month_key).copied().unwrap_or(false)
    }

    pub fn is_approved(&self, month_key: &str) -> bool {
        self.shift_approved.get(month_key).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_personnel: Option<u32>,
}

impl Task {
    pub fn new(id: &str, name: &str, required_personnel: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            required_personnel: Some(required_personnel),
        }
    }

    pub fn required(&self) -> u32 {
        self.required_personnel.unwrap_or(DEFAULT_REQUIRED_PERSONNEL)
    }
}
