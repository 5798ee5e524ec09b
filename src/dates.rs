use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{AttendanceEvent, RawDate};

#[derive(Debug, Clone, Error, PartialEq)]
#[error("unparseable date value {value:?}")]
pub struct DateParseError {
    pub value: String,
}

/// Why an event was dropped before it reached the presence matrix.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EventSkip {
    #[error("event has neither date nor time_in")]
    NoDateField,
    #[error(transparent)]
    UnparseableDate(#[from] DateParseError),
}

/// Coerce a raw date value to calendar-date granularity. Structured values
/// pass through with any time-of-day dropped; strings parse their leading
/// ISO date portion (everything before `T` or whitespace).
pub fn normalize(value: &RawDate) -> Result<NaiveDate, DateParseError> {
    match value {
        RawDate::Day(day) => Ok(*day),
        RawDate::Timestamp(ts) => Ok(ts.date_naive()),
        RawDate::Text(text) => {
            let head = text
                .split(|c: char| c == 'T' || c.is_whitespace())
                .next()
                .unwrap_or(text);
            NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| DateParseError {
                value: text.clone(),
            })
        }
    }
}

/// Resolve the calendar date an event belongs to. The `date` field is
/// preferred; `time_in` is the fallback. An unresolvable event is skipped
/// by the caller, never an abort.
pub fn resolve_event_date(event: &AttendanceEvent) -> Result<NaiveDate, EventSkip> {
    if let Some(raw) = &event.date {
        return Ok(normalize(raw)?);
    }
    if let Some(time_in) = &event.time_in {
        return Ok(normalize(&RawDate::Timestamp(*time_in))?);
    }
    Err(EventSkip::NoDateField)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn structured_day_passes_through() {
        let raw = RawDate::Day(day(2024, 1, 15));
        assert_eq!(normalize(&raw).unwrap(), day(2024, 1, 15));
    }

    #[test]
    fn timestamp_truncates_to_calendar_date() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 8, 42, 17).unwrap();
        assert_eq!(normalize(&RawDate::Timestamp(ts)).unwrap(), day(2024, 3, 5));
    }

    #[test]
    fn plain_iso_string_parses() {
        let raw = RawDate::Text("2024-01-01".to_string());
        assert_eq!(normalize(&raw).unwrap(), day(2024, 1, 1));
    }

    #[test]
    fn string_with_time_portion_keeps_leading_date() {
        let raw = RawDate::Text("2024-01-01T08:30:00Z".to_string());
        assert_eq!(normalize(&raw).unwrap(), day(2024, 1, 1));

        let spaced = RawDate::Text("2024-01-01 08:30:00".to_string());
        assert_eq!(normalize(&spaced).unwrap(), day(2024, 1, 1));
    }

    #[test]
    fn garbage_string_reports_original_value() {
        let raw = RawDate::Text("not-a-date".to_string());
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.value, "not-a-date");
    }

    #[test]
    fn date_field_wins_over_time_in() {
        let event = AttendanceEvent {
            student_id: Uuid::new_v4(),
            status: "present".to_string(),
            date: Some(RawDate::Text("2024-02-01".to_string())),
            time_in: Some(Utc.with_ymd_and_hms(2024, 2, 9, 7, 0, 0).unwrap()),
        };
        assert_eq!(resolve_event_date(&event).unwrap(), day(2024, 2, 1));
    }

    #[test]
    fn time_in_is_the_fallback() {
        let event = AttendanceEvent {
            student_id: Uuid::new_v4(),
            status: "present".to_string(),
            date: None,
            time_in: Some(Utc.with_ymd_and_hms(2024, 2, 9, 7, 0, 0).unwrap()),
        };
        assert_eq!(resolve_event_date(&event).unwrap(), day(2024, 2, 9));
    }

    #[test]
    fn missing_both_fields_is_a_distinct_skip() {
        let event = AttendanceEvent {
            student_id: Uuid::new_v4(),
            status: "present".to_string(),
            date: None,
            time_in: None,
        };
        assert_eq!(resolve_event_date(&event).unwrap_err(), EventSkip::NoDateField);
    }

    #[test]
    fn bad_date_field_is_a_parse_skip_not_a_fallback() {
        // A broken date field drops the event even when time_in could
        // have resolved it; the preferred field decides.
        let event = AttendanceEvent {
            student_id: Uuid::new_v4(),
            status: "present".to_string(),
            date: Some(RawDate::Text("??".to_string())),
            time_in: Some(Utc.with_ymd_and_hms(2024, 2, 9, 7, 0, 0).unwrap()),
        };
        assert!(matches!(
            resolve_event_date(&event).unwrap_err(),
            EventSkip::UnparseableDate(_)
        ));
    }
}
