use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// One raw attendance record as the upstream feed delivers it. The date
/// may arrive as a structured value, a timestamp, or a loose string;
/// `date` wins over `time_in` when both are set.
#[derive(Debug, Clone)]
pub struct AttendanceEvent {
    pub student_id: Uuid,
    pub status: String,
    pub date: Option<RawDate>,
    pub time_in: Option<DateTime<Utc>>,
}

/// The three date representations the normalizer accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDate {
    Day(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl AttendanceEvent {
    pub fn is_present(&self) -> bool {
        self.status.eq_ignore_ascii_case("present")
    }
}

/// Per-student, per-valid-day binary attendance grid. Column `i` of every
/// row corresponds to `valid_days[i]`; rows are sorted by student id.
#[derive(Debug, Clone)]
pub struct PresenceMatrix {
    pub valid_days: Vec<NaiveDate>,
    pub rows: Vec<StudentRow>,
}

#[derive(Debug, Clone)]
pub struct StudentRow {
    pub student_id: Uuid,
    pub student_name: String,
    pub presence: Vec<bool>,
}

/// Engineered features for one student, derived from a matrix row.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub student_id: Uuid,
    pub student_name: String,
    pub attendance_pct: f64,
    pub max_consec_absences: u32,
    pub num_long_streaks: u32,
}

#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub student_id: Uuid,
    pub student_name: String,
    pub school_id: String,
    pub attendance_pct: f64,
    pub max_consec_absences: u32,
    pub num_long_streaks: u32,
    pub dropout_prob: f64,
    pub dropout_pred: i32,
}

/// The subset of a scored record written back to the student store.
/// Values are absolute, so re-applying the same update is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentUpdate {
    pub student_id: Uuid,
    pub attendance_percentage: f64,
    pub max_consec_absences: i32,
    pub num_long_streaks: i32,
    pub dropout_risk: f64,
    pub dropout_pred: i32,
}

impl From<&ScoredRecord> for StudentUpdate {
    fn from(record: &ScoredRecord) -> Self {
        StudentUpdate {
            student_id: record.student_id,
            attendance_percentage: record.attendance_pct * 100.0,
            max_consec_absences: record.max_consec_absences as i32,
            num_long_streaks: record.num_long_streaks as i32,
            dropout_risk: record.dropout_prob,
            dropout_pred: record.dropout_pred,
        }
    }
}

/// A scored student row as read back from the store for reporting.
#[derive(Debug, Clone)]
pub struct ScoredStudent {
    pub student_id: Uuid,
    pub full_name: String,
    pub school_id: String,
    pub class_name: Option<String>,
    pub attendance_percentage: f64,
    pub max_consec_absences: i32,
    pub num_long_streaks: i32,
    pub dropout_risk: f64,
    pub dropout_pred: i32,
}
