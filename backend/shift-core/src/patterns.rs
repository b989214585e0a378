// src/patterns.rs
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type PatternId = String;

/// Marker used both in weekly patterns and as a schedule status.
pub const DAY_OFF: &str = "休";

/// Monday..Friday.
pub const WEEKDAY_SLOTS: usize = 5;

const WORK_HOURS_DP: u32 = 2;

static TIME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("static regex is valid"));

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern symbol must not be empty")]
    EmptySymbol,
    #[error("Pattern symbol '{0}' is already in use")]
    DuplicateSymbol(String),
    #[error("Break hours must be zero or positive, got {0}")]
    NegativeBreak(Decimal),
    #[error("Time '{0}' is not in HH:MM format")]
    MalformedTime(String),
    #[error("Time '{0}' is not a valid time of day")]
    InvalidTime(String),
    #[error("End time {end} must be after start time {start}")]
    EndNotAfterStart { start: String, end: String },
    #[error("Work hours would be {0}, which is not positive")]
    NonPositiveWorkHours(Decimal),
}

// --- Shift Patterns ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPattern {
    pub id: PatternId,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub break_hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub work_hours: Decimal,
    #[serde(default)]
    pub display_time: String,
}

fn minutes_of_day(time: &str) -> Result<u32, PatternError> {
    if !TIME_FORMAT.is_match(time) {
        return Err(PatternError::MalformedTime(time.to_string()));
    }
    let (hours, minutes) = time
        .split_once(':')
        .ok_or_else(|| PatternError::MalformedTime(time.to_string()))?;
    let hours: u32 = hours
        .parse()
        .map_err(|_| PatternError::MalformedTime(time.to_string()))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| PatternError::MalformedTime(time.to_string()))?;
    if hours > 23 || minutes > 59 {
        return Err(PatternError::InvalidTime(time.to_string()));
    }
    Ok(hours * 60 + minutes)
}

impl ShiftPattern {
    /// Builds a pattern from user input, computing its work hours.
    ///
    /// The symbol is trimmed and upper-cased and doubles as the display name.
    pub fn create(
        symbol: &str,
        start_time: &str,
        end_time: &str,
        break_hours: Decimal,
    ) -> Result<Self, PatternError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(PatternError::EmptySymbol);
        }
        if break_hours < Decimal::ZERO {
            return Err(PatternError::NegativeBreak(break_hours));
        }

        let start = minutes_of_day(start_time)?;
        let end = minutes_of_day(end_time)?;
        if end <= start {
            return Err(PatternError::EndNotAfterStart {
                start: start_time.to_string(),
                end: end_time.to_string(),
            });
        }

        // Hundredths of an hour, so the value survives a trip through an f64.
        let duration = Decimal::from(end - start) / dec!(60);
        let work_hours = (duration - break_hours).round_dp(WORK_HOURS_DP);
        if work_hours <= Decimal::ZERO {
            return Err(PatternError::NonPositiveWorkHours(work_hours));
        }

        Ok(Self {
            id: symbol.clone(),
            name: symbol,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            break_hours,
            work_hours,
            display_time: format!("{} - {}", start_time, end_time),
        })
    }
}

/// Shift patterns ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternCatalog {
    patterns: Vec<ShiftPattern>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns(mut patterns: Vec<ShiftPattern>) -> Self {
        patterns.sort_by(|a, b| a.id.cmp(&b.id));
        Self { patterns }
    }

    pub fn get(&self, id: &str) -> Option<&ShiftPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Adds a pattern, rejecting ids that collide ignoring case.
    pub fn insert(&mut self, pattern: ShiftPattern) -> Result<(), PatternError> {
        let wanted = pattern.id.trim().to_lowercase();
        if self
            .patterns
            .iter()
            .any(|p| p.id.trim().to_lowercase() == wanted)
        {
            return Err(PatternError::DuplicateSymbol(pattern.id));
        }
        let position = self
            .patterns
            .partition_point(|p| p.id.as_str() < pattern.id.as_str());
        self.patterns.insert(position, pattern);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShiftPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// --- Weekly Default Patterns ---

/// One weekday slot of a default shift: a day off or a pattern id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatternSlot {
    Off,
    Shift(PatternId),
}

impl From<String> for PatternSlot {
    fn from(value: String) -> Self {
        if value == DAY_OFF {
            PatternSlot::Off
        } else {
            PatternSlot::Shift(value)
        }
    }
}

impl From<&str> for PatternSlot {
    fn from(value: &str) -> Self {
        PatternSlot::from(value.to_string())
    }
}

impl From<PatternSlot> for String {
    fn from(slot: PatternSlot) -> Self {
        match slot {
            PatternSlot::Off => DAY_OFF.to_string(),
            PatternSlot::Shift(id) => id,
        }
    }
}

impl PatternSlot {
    pub fn as_str(&self) -> &str {
        match self {
            PatternSlot::Off => DAY_OFF,
            PatternSlot::Shift(id) => id,
        }
    }
}

/// A staff member's Monday..Friday template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultShift {
    #[serde(default)]
    pub pattern: Option<Vec<PatternSlot>>,
}

impl DefaultShift {
    pub fn uniform(slot: PatternSlot) -> Self {
        Self {
            pattern: Some(vec![slot; WEEKDAY_SLOTS]),
        }
    }

    pub fn from_slots(slots: Vec<PatternSlot>) -> Self {
        Self {
            pattern: Some(slots),
        }
    }

    pub fn slots(&self) -> Option<&[PatternSlot]> {
        self.pattern.as_deref()
    }
}

/// Parses `A,A,休,休,B` style input.
pub fn parse_slots(input: &str) -> Vec<PatternSlot> {
    input
        .split(',')
        .map(|slot| PatternSlot::from(slot.trim()))
        .collect()
}
