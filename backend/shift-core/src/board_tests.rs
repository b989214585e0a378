// src/board_tests.rs

#[cfg(test)]
mod tests {
    use crate::board::*;
    use crate::calendar::days_in_month;
    use crate::entry::{ScheduleEntry, StatusKind};
    use crate::patterns::{parse_slots, DefaultShift, PatternError, ShiftPattern};
    use crate::schedule::month_key;
    use crate::shortage::{DayCoverage, Severity};
    use crate::staff::{Staff, Task};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    // Helper to build a board with two staff, two tasks and patterns A/B.
    fn create_test_board() -> ShiftBoard {
        let mut board = ShiftBoard::default();
        board
            .shift_patterns
            .insert(ShiftPattern::create("A", "09:00", "18:00", dec!(1)).unwrap())
            .unwrap();
        board
            .shift_patterns
            .insert(ShiftPattern::create("B", "09:00", "17:30", dec!(1)).unwrap())
            .unwrap();
        board.staff = vec![
            create_test_staff("s1", "山田", "A,A,A,A,A", &["t1", "t2"]),
            create_test_staff("s2", "佐藤", "B,B,休,B,B", &["t1"]),
        ];
        board.tasks = vec![Task::new("t1", "電話", 2), Task::new("t2", "メール", 1)];
        board
    }

    fn create_test_staff(id: &str, name: &str, pattern: &str, tasks: &[&str]) -> Staff {
        Staff {
            id: id.to_string(),
            name: name.to_string(),
            role: "OP".to_string(),
            email: Some(format!("{}@example.com", id)),
            default_shift: DefaultShift::from_slots(parse_slots(pattern)),
            possible_tasks: tasks.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ensure_month_generates_once() {
        let mut board = create_test_board();
        assert!(board.ensure_month(2025, 12));
        assert_eq!(board.entry("s1", 2025, 12, 1), ScheduleEntry::hours(dec!(8)));

        board
            .set_entry(false, "s1", 2025, 12, 1, ScheduleEntry::Status(StatusKind::PaidLeave))
            .unwrap();
        assert!(!board.ensure_month(2025, 12));
        assert_eq!(
            board.entry("s1", 2025, 12, 1),
            ScheduleEntry::Status(StatusKind::PaidLeave)
        );
    }

    #[test]
    fn test_set_entry_shares_untouched_months() {
        let mut board = create_test_board();
        board.ensure_month(2025, 11);
        board.ensure_month(2025, 12);
        let before = board.clone();

        board
            .set_entry(false, "s2", 2025, 12, 2, ScheduleEntry::hours(dec!(4)))
            .unwrap();

        assert_eq!(board.month(2025, 11), before.month(2025, 11));
        assert_eq!(
            board.month(2025, 12).unwrap()["s1"],
            before.month(2025, 12).unwrap()["s1"]
        );
        // The snapshot taken before the edit is unchanged.
        assert_eq!(before.entry("s2", 2025, 12, 2), ScheduleEntry::hours(dec!(7.5)));
        assert_eq!(board.entry("s2", 2025, 12, 2), ScheduleEntry::hours(dec!(4)));
    }

    #[test]
    fn test_set_entry_validates_input() {
        let mut board = create_test_board();
        assert_eq!(
            board.set_entry(true, "nobody", 2025, 12, 1, ScheduleEntry::Empty),
            Err(BoardError::UnknownStaff("nobody".to_string()))
        );
        assert_eq!(
            board.set_entry(true, "s1", 2025, 2, 29, ScheduleEntry::Empty),
            Err(BoardError::DayOutOfRange {
                month_key: "2025-2".to_string(),
                day: 29
            })
        );
    }

    #[test]
    fn test_locked_day_only_editable_by_admin() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        assert_eq!(board.toggle_day_holiday(2025, 12, 3), Ok(true));

        let result = board.set_entry(false, "s1", 2025, 12, 3, ScheduleEntry::hours(dec!(8)));
        assert!(matches!(result, Err(BoardError::LockedEntry { day: 3, .. })));
        assert!(board.entry("s1", 2025, 12, 3).is_locked());

        board
            .set_entry(true, "s1", 2025, 12, 3, ScheduleEntry::hours(dec!(8)))
            .unwrap();
        assert_eq!(board.entry("s1", 2025, 12, 3), ScheduleEntry::hours(dec!(8)));
    }

    #[test]
    fn test_toggle_day_holiday_restores_defaults() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        let original = board.clone();

        // 2025-12-03 is a Wednesday: s1 works A, s2 has 休.
        assert_eq!(board.toggle_day_holiday(2025, 12, 3), Ok(true));
        assert!(board.entry("s1", 2025, 12, 3).is_locked());
        assert!(board.entry("s2", 2025, 12, 3).is_locked());

        assert_eq!(board.toggle_day_holiday(2025, 12, 3), Ok(false));
        assert_eq!(board.month(2025, 12), original.month(2025, 12));
    }

    #[test]
    fn test_partially_locked_day_locks_everyone() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        board
            .set_entry(true, "s1", 2025, 12, 4, ScheduleEntry::LockedHoliday)
            .unwrap();

        assert_eq!(board.toggle_day_holiday(2025, 12, 4), Ok(true));
        assert!(board.entry("s2", 2025, 12, 4).is_locked());
    }

    #[test]
    fn test_apply_pattern_updates_default_and_one_month() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        let s2_before = board.month(2025, 12).unwrap()["s2"].clone();

        let days = board
            .apply_pattern("s1", parse_slots("休,B,B,B,B"), 2025, 12)
            .unwrap();

        assert_eq!(days[&1], ScheduleEntry::day_off());
        assert_eq!(days[&2], ScheduleEntry::hours(dec!(7.5)));
        assert_eq!(board.month(2025, 12).unwrap()["s2"], s2_before);
        assert_eq!(
            board.pattern_summary("s1").unwrap(),
            "月:休\n火水木金 B 09:00～17:30 7.5"
        );
        assert!(board.irregularities("s1", 2025, 12).unwrap().is_empty());
    }

    #[test]
    fn test_add_and_delete_staff() {
        let mut board = create_test_board();
        let id = board.add_staff();
        let added = board.staff_member(&id).unwrap().clone();
        assert_eq!(added.employee_id, "New");
        assert_eq!(added.name, "新規メンバー");
        assert_eq!(added.pin, "0000");
        assert_eq!(added.default_shift, DefaultShift::uniform("A".into()));

        board.ensure_month(2025, 11);
        board.ensure_month(2025, 12);
        let removed = board.delete_staff(&id).unwrap();
        assert_eq!(removed.id, id);
        for key in [month_key(2025, 11), month_key(2025, 12)] {
            assert!(!board.schedule[&key].contains_key(&id));
            assert!(board.schedule[&key].contains_key("s1"));
        }
        assert_eq!(
            board.delete_staff(&id),
            Err(BoardError::UnknownStaff(id.clone()))
        );
    }

    #[test]
    fn test_update_staff_info_touches_given_fields() {
        let mut board = create_test_board();
        board
            .update_staff_info(
                "s1",
                StaffUpdate {
                    name: Some("山田 花子".to_string()),
                    pin: Some("1234".to_string()),
                    chat_user_id: Some("users/42".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let member = board.staff_member("s1").unwrap();
        assert_eq!(member.name, "山田 花子");
        assert_eq!(member.pin, "1234");
        assert_eq!(member.chat_user_id, "users/42");
        assert_eq!(member.role, "OP");
        assert_eq!(member.email.as_deref(), Some("s1@example.com"));

        board
            .update_staff_info(
                "s1",
                StaffUpdate {
                    email: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(board.staff_member("s1").unwrap().email, None);
        assert_eq!(
            board.update_staff_info("nobody", StaffUpdate::default()),
            Err(BoardError::UnknownStaff("nobody".to_string()))
        );
    }

    #[test]
    fn test_submission_notification_ids_are_editable() {
        let mut board = create_test_board();
        board.set_submission_notification_ids(" 111, 222 ");
        assert_eq!(board.admin_config.submission_notification_ids, "111, 222");
        assert_eq!(board.admin_config.notification_ids(), vec!["111", "222"]);
    }

    #[test]
    fn test_delete_task_leaves_no_dangling_ids() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        let removed = board.delete_task("t1").unwrap();
        assert_eq!(removed.name, "電話");

        assert!(board.staff.iter().all(|s| !s.possible_tasks.contains("t1")));
        let counts = board.task_counts(2025, 12);
        assert!(counts.values().all(|tasks| !tasks.contains_key("t1")));
        // 2025-12-01 is a Monday: only s1 can do t2.
        assert_eq!(counts[&1]["t2"], 1);
        assert_eq!(board.delete_task("t1"), Err(BoardError::UnknownTask("t1".to_string())));
    }

    #[test]
    fn test_task_editing() {
        let mut board = create_test_board();
        let id = board.add_task("新業務", None);
        assert_eq!(board.task(&id).unwrap().required(), 3);

        board.rename_task(&id, "チャット").unwrap();
        board.set_required_personnel(&id, 1).unwrap();
        let task = board.task(&id).unwrap();
        assert_eq!(task.name, "チャット");
        assert_eq!(task.required(), 1);
        assert_eq!(
            board.rename_task("missing", "x"),
            Err(BoardError::UnknownTask("missing".to_string()))
        );
    }

    #[test]
    fn test_assign_task_staff_is_exact() {
        let mut board = create_test_board();
        board
            .assign_task_staff("t2", &["s2".to_string()])
            .unwrap();
        assert!(!board.staff_member("s1").unwrap().can_do("t2"));
        assert!(board.staff_member("s2").unwrap().can_do("t2"));
        // Other tasks are untouched.
        assert!(board.staff_member("s1").unwrap().can_do("t1"));
    }

    #[test]
    fn test_bulk_assign_replaces_all_skills() {
        let mut board = create_test_board();
        let mut assignments = BTreeMap::new();
        assignments.insert("t2".to_string(), vec!["s2".to_string()]);
        assignments.insert("ghost".to_string(), vec!["s1".to_string()]);
        board.bulk_assign_tasks(&assignments);

        assert!(board.staff_member("s1").unwrap().possible_tasks.is_empty());
        let s2_tasks: Vec<&str> = board
            .staff_member("s2")
            .unwrap()
            .possible_tasks
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(s2_tasks, vec!["t2"]);
    }

    #[test]
    fn test_add_pattern_rejects_duplicates() {
        let mut board = create_test_board();
        let pattern = board.add_pattern("c", "10:00", "19:00", dec!(1)).unwrap();
        assert_eq!(pattern.id, "C");
        assert_eq!(board.shift_patterns.len(), 3);
        assert_eq!(
            board.add_pattern("a", "08:00", "17:00", dec!(1)),
            Err(BoardError::Pattern(PatternError::DuplicateSymbol("A".to_string())))
        );
    }

    #[test]
    fn test_approval_flags_are_per_month() {
        let mut board = create_test_board();
        board.set_submitted("s1", 2025, 12, true).unwrap();
        board.set_remanded("s1", 2025, 12, true).unwrap();
        board.set_approved("s1", 2026, 1, true).unwrap();

        let s1 = board.staff_member("s1").unwrap();
        assert!(s1.is_submitted("2025-12"));
        assert!(s1.is_remanded("2025-12"));
        assert!(!s1.is_approved("2025-12"));
        assert!(s1.is_approved("2026-1"));

        board.set_remanded("s1", 2025, 12, false).unwrap();
        assert!(!board.staff_member("s1").unwrap().is_remanded("2025-12"));
        assert!(board.set_approved("ghost", 2025, 12, true).is_err());
    }

    #[test]
    fn test_shortages_follow_schedule() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        let grid = board.shortages(2025, 12);
        let phone = grid.iter().find(|row| row.task_id == "t1").unwrap();

        // Mon 1st: both work, t1 needs 2.
        assert_eq!(phone.cells[0].1, DayCoverage::Covered(2));
        // Wed 3rd: s2 is off, 1 of 2.
        assert_eq!(
            phone.cells[2].1,
            DayCoverage::Short {
                count: 1,
                required: 2,
                severity: Severity::Warning
            }
        );
        // Sat 6th is not evaluated.
        assert_eq!(phone.cells[5].1, DayCoverage::NotApplicable);
        assert_eq!(phone.cells.len() as u32, days_in_month(2025, 12));
    }

    #[test]
    fn test_irregularities_after_edit() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        board
            .set_entry(false, "s2", 2025, 12, 3, ScheduleEntry::hours(dec!(8)))
            .unwrap();
        board
            .set_entry(false, "s2", 2025, 12, 4, ScheduleEntry::Empty)
            .unwrap();

        assert_eq!(
            board.irregularities("s2", 2025, 12).unwrap(),
            vec!["12/3(水): 8".to_string(), "12/4(木): 未入力".to_string()]
        );
        assert!(board.irregularities("s1", 2025, 12).unwrap().is_empty());
    }

    #[test]
    fn test_board_round_trips_through_json() {
        let mut board = create_test_board();
        board.ensure_month(2025, 12);
        board.toggle_day_holiday(2025, 12, 10).unwrap();
        board
            .set_entry(true, "s1", 2025, 12, 11, ScheduleEntry::hours(dec!(7.5)))
            .unwrap();

        let json = serde_json::to_string(&board).unwrap();
        let restored: ShiftBoard = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, board);
    }
}
