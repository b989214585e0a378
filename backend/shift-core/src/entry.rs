// src/entry.rs
use rust_decimal::prelude::*;
use serde::de::IgnoredAny;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::patterns::DAY_OFF;

/// Display text for a day nobody has filled in.
pub const UNFILLED: &str = "未入力";

/// Whole-day statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// 有 (paid leave)
    PaidLeave,
    /// 休
    DayOff,
    /// 通 (hospital visit)
    Clinic,
    /// 欠
    Absent,
}

impl StatusKind {
    pub const ALL: [StatusKind; 4] = [
        StatusKind::PaidLeave,
        StatusKind::DayOff,
        StatusKind::Clinic,
        StatusKind::Absent,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            StatusKind::PaidLeave => "有",
            StatusKind::DayOff => DAY_OFF,
            StatusKind::Clinic => "通",
            StatusKind::Absent => "欠",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }
}

/// Partial-day shifts that carry their own hour count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialShiftKind {
    Late,
    Early,
    MorningPaidLeave,
    AfternoonPaidLeave,
    MorningOff,
    AfternoonOff,
    MorningClinic,
    AfternoonClinic,
}

impl SpecialShiftKind {
    pub const ALL: [SpecialShiftKind; 8] = [
        SpecialShiftKind::Late,
        SpecialShiftKind::Early,
        SpecialShiftKind::MorningPaidLeave,
        SpecialShiftKind::AfternoonPaidLeave,
        SpecialShiftKind::MorningOff,
        SpecialShiftKind::AfternoonOff,
        SpecialShiftKind::MorningClinic,
        SpecialShiftKind::AfternoonClinic,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            SpecialShiftKind::Late => "遅",
            SpecialShiftKind::Early => "早",
            SpecialShiftKind::MorningPaidLeave => "午前有",
            SpecialShiftKind::AfternoonPaidLeave => "午後有",
            SpecialShiftKind::MorningOff => "午前休",
            SpecialShiftKind::AfternoonOff => "午後休",
            SpecialShiftKind::MorningClinic => "午前通",
            SpecialShiftKind::AfternoonClinic => "午後通",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }
}

/// One staff member's value for one day.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScheduleEntry {
    #[default]
    Empty,
    Status(StatusKind),
    WorkedHours(Decimal),
    SpecialShift {
        kind: SpecialShiftKind,
        hours: Decimal,
    },
    /// Admin-forced day off; only admins may overwrite it.
    LockedHoliday,
}

impl ScheduleEntry {
    pub fn day_off() -> Self {
        ScheduleEntry::Status(StatusKind::DayOff)
    }

    pub fn hours(hours: Decimal) -> Self {
        ScheduleEntry::WorkedHours(hours)
    }

    pub fn special(kind: SpecialShiftKind, hours: Decimal) -> Self {
        ScheduleEntry::SpecialShift { kind, hours }
    }

    /// Only strictly positive hours count as worked.
    pub fn is_working(&self) -> bool {
        match self {
            ScheduleEntry::WorkedHours(hours) => *hours > Decimal::ZERO,
            ScheduleEntry::SpecialShift { hours, .. } => *hours > Decimal::ZERO,
            _ => false,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, ScheduleEntry::LockedHoliday)
    }

    /// Cell text: `8`, `7.5`, `有`, `遅(4)`, `休` for a locked day, `` when empty.
    pub fn display(&self) -> String {
        match self {
            ScheduleEntry::Empty => String::new(),
            ScheduleEntry::Status(kind) => kind.symbol().to_string(),
            ScheduleEntry::WorkedHours(hours) => hours.normalize().to_string(),
            ScheduleEntry::SpecialShift { kind, hours } => {
                format!("{}({})", kind.symbol(), hours.normalize())
            }
            ScheduleEntry::LockedHoliday => DAY_OFF.to_string(),
        }
    }

    /// Like [`display`](Self::display) but blank and zero-hour cells read `未入力`.
    pub fn display_or_unfilled(&self) -> String {
        match self {
            ScheduleEntry::Empty => UNFILLED.to_string(),
            ScheduleEntry::WorkedHours(hours) if hours.is_zero() => UNFILLED.to_string(),
            other => other.display(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not hours, a status (有 休 通 欠) or a special shift such as 遅:4")]
pub struct EntryParseError(pub String);

/// Parses operator input: `` (empty), `8`, `7.5`, `有`, `遅:4`.
impl FromStr for ScheduleEntry {
    type Err = EntryParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(ScheduleEntry::Empty);
        }
        if let Some(kind) = StatusKind::from_symbol(input) {
            return Ok(ScheduleEntry::Status(kind));
        }
        if let Some((kind, hours)) = input.split_once(':') {
            let kind = SpecialShiftKind::from_symbol(kind.trim());
            let hours = Decimal::from_str(hours.trim()).ok();
            return match (kind, hours) {
                (Some(kind), Some(hours)) if hours >= Decimal::ZERO => {
                    Ok(ScheduleEntry::SpecialShift { kind, hours })
                }
                _ => Err(EntryParseError(input.to_string())),
            };
        }
        match Decimal::from_str(input) {
            Ok(hours) if hours >= Decimal::ZERO => Ok(ScheduleEntry::WorkedHours(hours)),
            _ => Err(EntryParseError(input.to_string())),
        }
    }
}

// --- Stored Shape ---
//
// The document store holds entries as "", a status string, a number,
// {"type", "hours"} or {"type": "休", "locked": true}.

fn serialize_hours<S: Serializer>(hours: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let normalized = hours.normalize();
    if normalized.scale() == 0 {
        if let Some(whole) = normalized.to_i64() {
            return serializer.serialize_i64(whole);
        }
    }
    serializer.serialize_f64(normalized.to_f64().unwrap_or_default())
}

struct StoredHours<'a>(&'a Decimal);

impl Serialize for StoredHours<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hours(self.0, serializer)
    }
}

impl Serialize for ScheduleEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScheduleEntry::Empty => serializer.serialize_str(""),
            ScheduleEntry::Status(kind) => serializer.serialize_str(kind.symbol()),
            ScheduleEntry::WorkedHours(hours) => serialize_hours(hours, serializer),
            ScheduleEntry::SpecialShift { kind, hours } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", kind.symbol())?;
                map.serialize_entry("hours", &StoredHours(hours))?;
                map.end()
            }
            ScheduleEntry::LockedHoliday => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", DAY_OFF)?;
                map.serialize_entry("locked", &true)?;
                map.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Number(f64),
    Text(String),
    Tagged {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        hours: Option<f64>,
        #[serde(default)]
        locked: Option<bool>,
    },
    Unrecognized(IgnoredAny),
}

/// Reads stored hours the same way `rust_decimal::serde::float` does, so
/// entries and pattern work hours compare equal after a reload.
fn decimal_hours(value: f64) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}

impl From<StoredEntry> for ScheduleEntry {
    fn from(stored: StoredEntry) -> Self {
        match stored {
            StoredEntry::Number(value) => match decimal_hours(value) {
                Some(hours) => ScheduleEntry::WorkedHours(hours),
                None => {
                    warn!("Schedule entry {} is not a usable number, treating as empty", value);
                    ScheduleEntry::Empty
                }
            },
            StoredEntry::Text(text) if text.is_empty() => ScheduleEntry::Empty,
            StoredEntry::Text(text) => match StatusKind::from_symbol(&text) {
                Some(kind) => ScheduleEntry::Status(kind),
                None => {
                    warn!("Unknown schedule status '{}', treating as empty", text);
                    ScheduleEntry::Empty
                }
            },
            // A truthy `locked` wins over everything else in the object.
            StoredEntry::Tagged {
                locked: Some(true),
                ..
            } => ScheduleEntry::LockedHoliday,
            StoredEntry::Tagged { kind, hours, .. } => {
                if let Some(special) = SpecialShiftKind::from_symbol(&kind) {
                    let hours = hours.and_then(decimal_hours).unwrap_or_default();
                    ScheduleEntry::SpecialShift {
                        kind: special,
                        hours,
                    }
                } else if let Some(status) = StatusKind::from_symbol(&kind) {
                    ScheduleEntry::Status(status)
                } else {
                    warn!("Unknown schedule entry type '{}', treating as empty", kind);
                    ScheduleEntry::Empty
                }
            }
            StoredEntry::Unrecognized(_) => {
                warn!("Unrecognized schedule entry shape, treating as empty");
                ScheduleEntry::Empty
            }
        }
    }
}

impl<'de> Deserialize<'de> for ScheduleEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = Option::<StoredEntry>::deserialize(deserializer)?;
        Ok(stored.map(ScheduleEntry::from).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ScheduleEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn stored_shapes_map_onto_variants() {
        assert_eq!(parse(json!("")), ScheduleEntry::Empty);
        assert_eq!(parse(json!(null)), ScheduleEntry::Empty);
        assert_eq!(parse(json!("休")), ScheduleEntry::day_off());
        assert_eq!(parse(json!("欠")), ScheduleEntry::Status(StatusKind::Absent));
        assert_eq!(parse(json!(8)), ScheduleEntry::hours(dec!(8)));
        assert_eq!(parse(json!(7.5)), ScheduleEntry::hours(dec!(7.5)));
        assert_eq!(
            parse(json!({"type": "午前休", "hours": 4})),
            ScheduleEntry::special(SpecialShiftKind::MorningOff, dec!(4))
        );
        assert_eq!(
            parse(json!({"type": "休", "locked": true})),
            ScheduleEntry::LockedHoliday
        );
    }

    #[test]
    fn locked_key_takes_precedence_over_hours() {
        assert_eq!(
            parse(json!({"type": "遅", "hours": 3, "locked": true})),
            ScheduleEntry::LockedHoliday
        );
    }

    #[test]
    fn unlocked_day_off_stays_a_status() {
        assert_eq!(
            parse(json!({"type": "休", "locked": false})),
            ScheduleEntry::day_off()
        );
        assert_eq!(
            parse(json!({"type": "遅", "hours": 3, "locked": false})),
            ScheduleEntry::special(SpecialShiftKind::Late, dec!(3))
        );
    }

    #[test]
    fn fractional_hours_reload_unchanged() {
        let hours = dec!(7.33);
        let stored = serde_json::to_string(&ScheduleEntry::hours(hours)).unwrap();
        assert_eq!(stored, "7.33");
        let reloaded: ScheduleEntry = serde_json::from_str(&stored).unwrap();
        assert_eq!(reloaded, ScheduleEntry::hours(hours));
        assert_eq!(parse(json!(7.333333333333334)), ScheduleEntry::hours(dec!(7.333333333333334)));
    }

    #[test]
    fn malformed_entries_degrade_to_empty() {
        assert_eq!(parse(json!("???")), ScheduleEntry::Empty);
        assert_eq!(parse(json!({"type": "謎"})), ScheduleEntry::Empty);
        assert_eq!(parse(json!(true)), ScheduleEntry::Empty);
        assert_eq!(parse(json!([1, 2])), ScheduleEntry::Empty);
    }

    #[test]
    fn serializes_back_to_stored_shape() {
        assert_eq!(serde_json::to_value(ScheduleEntry::Empty).unwrap(), json!(""));
        assert_eq!(serde_json::to_value(ScheduleEntry::hours(dec!(8.0))).unwrap(), json!(8));
        assert_eq!(serde_json::to_value(ScheduleEntry::hours(dec!(7.5))).unwrap(), json!(7.5));
        assert_eq!(
            serde_json::to_value(ScheduleEntry::special(SpecialShiftKind::Late, dec!(4.5))).unwrap(),
            json!({"type": "遅", "hours": 4.5})
        );
        assert_eq!(
            serde_json::to_value(ScheduleEntry::LockedHoliday).unwrap(),
            json!({"type": "休", "locked": true})
        );
    }

    #[test]
    fn working_requires_positive_hours() {
        assert!(ScheduleEntry::hours(dec!(8)).is_working());
        assert!(!ScheduleEntry::hours(Decimal::ZERO).is_working());
        assert!(ScheduleEntry::special(SpecialShiftKind::Early, dec!(6)).is_working());
        assert!(!ScheduleEntry::special(SpecialShiftKind::MorningOff, Decimal::ZERO).is_working());
        assert!(!ScheduleEntry::day_off().is_working());
        assert!(!ScheduleEntry::LockedHoliday.is_working());
    }

    #[test]
    fn parses_operator_input() {
        assert_eq!("".parse::<ScheduleEntry>(), Ok(ScheduleEntry::Empty));
        assert_eq!("7.5".parse::<ScheduleEntry>(), Ok(ScheduleEntry::hours(dec!(7.5))));
        assert_eq!(" 欠 ".parse::<ScheduleEntry>(), Ok(ScheduleEntry::Status(StatusKind::Absent)));
        assert_eq!(
            "午前通:3.5".parse::<ScheduleEntry>(),
            Ok(ScheduleEntry::special(SpecialShiftKind::MorningClinic, dec!(3.5)))
        );
        assert!("謎".parse::<ScheduleEntry>().is_err());
        assert!("遅:x".parse::<ScheduleEntry>().is_err());
        assert!("-1".parse::<ScheduleEntry>().is_err());
    }

    #[test]
    fn display_matches_grid_text() {
        assert_eq!(ScheduleEntry::hours(dec!(8.0)).display(), "8");
        assert_eq!(ScheduleEntry::hours(dec!(7.50)).display(), "7.5");
        assert_eq!(
            ScheduleEntry::special(SpecialShiftKind::AfternoonPaidLeave, dec!(4)).display(),
            "午後有(4)"
        );
        assert_eq!(ScheduleEntry::LockedHoliday.display(), "休");
        assert_eq!(ScheduleEntry::Empty.display(), "");
        assert_eq!(ScheduleEntry::Empty.display_or_unfilled(), "未入力");
        assert_eq!(ScheduleEntry::hours(Decimal::ZERO).display_or_unfilled(), "未入力");
        assert_eq!(ScheduleEntry::day_off().display_or_unfilled(), "休");
    }
}
