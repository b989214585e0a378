// src/summary.rs
use crate::patterns::{PatternCatalog, PatternSlot, WEEKDAY_SLOTS};

pub const UNSET: &str = "未設定";
pub const UNKNOWN_PATTERN: &str = "不明なパターン";

const DAY_NAMES: [&str; WEEKDAY_SLOTS] = ["月", "火", "水", "木", "金"];

/// Human-readable summary of a weekly pattern, one line per run of
/// consecutive identical slots:
///
/// ```text
/// 月火 A 9:00～18:00 8.0
/// 水木:休
/// 金 B 9:00～17:30 7.5
/// ```
pub fn summarize_pattern(pattern: Option<&[PatternSlot]>, catalog: &PatternCatalog) -> String {
    let Some(slots) = pattern.filter(|slots| slots.len() == WEEKDAY_SLOTS) else {
        return UNSET.to_string();
    };

    let mut lines = Vec::new();
    let mut start = 0;
    while start < slots.len() {
        let slot = &slots[start];
        let end = slots[start..]
            .iter()
            .position(|other| other != slot)
            .map_or(slots.len(), |offset| start + offset);

        let days: String = DAY_NAMES[start..end].concat();
        let line = match slot {
            PatternSlot::Off => format!("{}:休", days),
            PatternSlot::Shift(id) => match catalog.get(id) {
                Some(p) => format!(
                    "{} {} {}～{} {:.1}",
                    days, p.name, p.start_time, p.end_time, p.work_hours
                ),
                None => format!("{}:{}", days, UNKNOWN_PATTERN),
            },
        };
        lines.push(line);
        start = end;
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{parse_slots, ShiftPattern};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn catalog() -> PatternCatalog {
        let mut a = ShiftPattern::create("A", "09:00", "18:00", dec!(1)).unwrap();
        let mut b = ShiftPattern::create("B", "09:00", "17:30", dec!(1)).unwrap();
        a.start_time = "9:00".to_string();
        b.start_time = "9:00".to_string();
        PatternCatalog::from_patterns(vec![a, b])
    }

    #[test]
    fn groups_consecutive_runs() {
        let slots = parse_slots("A,A,休,休,B");
        assert_eq!(
            summarize_pattern(Some(&slots), &catalog()),
            "月火 A 9:00～18:00 8.0\n水木:休\n金 B 9:00～17:30 7.5"
        );
    }

    #[test]
    fn repeated_value_after_a_gap_starts_a_new_run() {
        let slots = parse_slots("A,休,A,A,A");
        assert_eq!(
            summarize_pattern(Some(&slots), &catalog()),
            "月 A 9:00～18:00 8.0\n火:休\n水木金 A 9:00～18:00 8.0"
        );
    }

    #[test]
    fn unknown_pattern_is_flagged() {
        let slots = parse_slots("Z,Z,Z,Z,Z");
        assert_eq!(summarize_pattern(Some(&slots), &catalog()), "月火水木金:不明なパターン");
    }

    #[test]
    fn missing_or_wrong_length_pattern_is_unset() {
        assert_eq!(summarize_pattern(None, &catalog()), "未設定");
        let short = parse_slots("A,A,A");
        assert_eq!(summarize_pattern(Some(&short), &catalog()), "未設定");
    }
}
