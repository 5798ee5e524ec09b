use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dates;
use crate::models::{AttendanceEvent, PresenceMatrix, StudentRow};

/// Reshape raw attendance events into a per-student, per-valid-day grid.
///
/// Events that resolve to no calendar date are dropped with a diagnostic;
/// the run never aborts on a bad event. A day only counts as a school day
/// when at least one student was present on it, which keeps holidays and
/// weekends out of the column set.
pub fn build_matrix(events: &[AttendanceEvent]) -> PresenceMatrix {
    let mut dated: Vec<(NaiveDate, &AttendanceEvent)> = Vec::with_capacity(events.len());

    for event in events {
        match dates::resolve_event_date(event) {
            Ok(date) => dated.push((date, event)),
            Err(skip) => {
                warn!(student_id = %event.student_id, status = %event.status, %skip, "skipping attendance event");
            }
        }
    }

    let valid_days: BTreeSet<NaiveDate> = dated
        .iter()
        .filter(|(_, event)| event.is_present())
        .map(|(date, _)| *date)
        .collect();
    let valid_days: Vec<NaiveDate> = valid_days.into_iter().collect();
    debug!(valid_days = valid_days.len(), "valid day set computed");

    let day_index: BTreeMap<NaiveDate, usize> = valid_days
        .iter()
        .enumerate()
        .map(|(i, date)| (*date, i))
        .collect();

    let students: BTreeSet<Uuid> = dated.iter().map(|(_, event)| event.student_id).collect();

    let mut present: BTreeSet<(Uuid, usize)> = BTreeSet::new();
    for (date, event) in &dated {
        if !event.is_present() {
            continue;
        }
        if let Some(&col) = day_index.get(date) {
            present.insert((event.student_id, col));
        }
    }

    let rows = students
        .into_iter()
        .map(|student_id| StudentRow {
            student_id,
            student_name: format!("Student-{student_id}"),
            presence: (0..valid_days.len())
                .map(|col| present.contains(&(student_id, col)))
                .collect(),
        })
        .collect();

    PresenceMatrix { valid_days, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawDate;
    use chrono::{TimeZone, Utc};

    fn event(student_id: Uuid, status: &str, date: &str) -> AttendanceEvent {
        AttendanceEvent {
            student_id,
            status: status.to_string(),
            date: Some(RawDate::Text(date.to_string())),
            time_in: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn one_present_one_absent_on_the_same_day() {
        let sid1 = Uuid::new_v4();
        let sid2 = Uuid::new_v4();
        let events = vec![
            event(sid1, "present", "2024-01-01"),
            event(sid2, "absent", "2024-01-01"),
        ];

        let matrix = build_matrix(&events);
        assert_eq!(matrix.valid_days, vec![day(2024, 1, 1)]);
        assert_eq!(matrix.rows.len(), 2);

        for row in &matrix.rows {
            let expected = row.student_id == sid1;
            assert_eq!(row.presence, vec![expected]);
        }
    }

    #[test]
    fn absence_only_days_are_not_valid_days() {
        let sid = Uuid::new_v4();
        let events = vec![
            event(sid, "present", "2024-01-01"),
            event(sid, "absent", "2024-01-02"),
            event(Uuid::new_v4(), "late", "2024-01-02"),
        ];

        let matrix = build_matrix(&events);
        assert_eq!(matrix.valid_days, vec![day(2024, 1, 1)]);
    }

    #[test]
    fn no_present_events_means_no_columns_but_rows_remain() {
        let events = vec![
            event(Uuid::new_v4(), "absent", "2024-01-01"),
            event(Uuid::new_v4(), "absent", "2024-01-02"),
        ];

        let matrix = build_matrix(&events);
        assert!(matrix.valid_days.is_empty());
        assert_eq!(matrix.rows.len(), 2);
        assert!(matrix.rows.iter().all(|row| row.presence.is_empty()));
    }

    #[test]
    fn every_row_has_one_cell_per_valid_day() {
        let sid1 = Uuid::new_v4();
        let sid2 = Uuid::new_v4();
        let events = vec![
            event(sid1, "present", "2024-01-01"),
            event(sid1, "present", "2024-01-03"),
            event(sid2, "present", "2024-01-02"),
        ];

        let matrix = build_matrix(&events);
        assert_eq!(matrix.valid_days.len(), 3);
        for row in &matrix.rows {
            assert_eq!(row.presence.len(), 3);
        }
    }

    #[test]
    fn undatable_event_is_dropped_and_its_student_vanishes() {
        let sid_only_bad = Uuid::new_v4();
        let sid_ok = Uuid::new_v4();
        let events = vec![
            AttendanceEvent {
                student_id: sid_only_bad,
                status: "present".to_string(),
                date: None,
                time_in: None,
            },
            event(sid_ok, "present", "2024-01-01"),
        ];

        let matrix = build_matrix(&events);
        assert_eq!(matrix.rows.len(), 1);
        assert_eq!(matrix.rows[0].student_id, sid_ok);
    }

    #[test]
    fn valid_days_are_chronological_even_when_events_are_not() {
        let sid = Uuid::new_v4();
        let events = vec![
            event(sid, "present", "2024-01-09"),
            event(sid, "present", "2024-01-02"),
            event(sid, "present", "2024-01-05"),
        ];

        let matrix = build_matrix(&events);
        assert_eq!(
            matrix.valid_days,
            vec![day(2024, 1, 2), day(2024, 1, 5), day(2024, 1, 9)]
        );
    }

    #[test]
    fn presence_matches_on_normalized_date_across_representations() {
        let sid = Uuid::new_v4();
        // Same calendar day, one as a string with time, one as time_in.
        let events = vec![
            event(sid, "present", "2024-01-01T09:00:00Z"),
            AttendanceEvent {
                student_id: sid,
                status: "PRESENT".to_string(),
                date: None,
                time_in: Some(Utc.with_ymd_and_hms(2024, 1, 2, 7, 55, 0).unwrap()),
            },
        ];

        let matrix = build_matrix(&events);
        assert_eq!(matrix.valid_days, vec![day(2024, 1, 1), day(2024, 1, 2)]);
        assert_eq!(matrix.rows[0].presence, vec![true, true]);
    }
}
