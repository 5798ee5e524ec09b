use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::{AttendanceEvent, RawDate, ScoredRecord, ScoredStudent, StudentUpdate};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7b0c8894-0b0e-4f0a-9a71-5d6a2f6cfb11")?,
            "SCH-001",
            "Asha Verma",
            Some("7-A"),
        ),
        (
            Uuid::parse_str("2f1d4a6e-51c3-43a8-bb0f-7c3a9ed04e52")?,
            "SCH-001",
            "Rohan Gupta",
            Some("7-A"),
        ),
        (
            Uuid::parse_str("c9e1b7d3-8a42-4d8f-9b6a-1f2e3d4c5b6a")?,
            "SCH-001",
            "Meera Nair",
            Some("7-B"),
        ),
        (
            Uuid::parse_str("5a4b3c2d-1e0f-4a9b-8c7d-6e5f4a3b2c1d")?,
            "SCH-002",
            "Dev Patel",
            None,
        ),
    ];

    for (id, school_id, full_name, class_name) in &students {
        sqlx::query(
            r#"
            INSERT INTO dropout_warning.students (id, school_id, full_name, class_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET school_id = EXCLUDED.school_id,
                full_name = EXCLUDED.full_name,
                class_name = EXCLUDED.class_name
            "#,
        )
        .bind(id)
        .bind(school_id)
        .bind(full_name)
        .bind(class_name)
        .execute(pool)
        .await?;
    }

    let term_start = NaiveDate::from_ymd_opt(2026, 1, 5).context("invalid seed date")?;
    let mut inserted = 0usize;

    // Three weeks of school days for SCH-001. Asha attends throughout,
    // Rohan misses the odd day, Meera disappears after day 4 long enough
    // to trip the long-streak features. Date representations are mixed on
    // purpose, matching what the upstream feed really sends.
    for day_offset in 0..15 {
        let date = term_start + Duration::days(day_offset);
        for (i, (id, school_id, _, _)) in students.iter().enumerate().take(3) {
            let present = match i {
                0 => true,
                1 => day_offset % 5 != 2,
                _ => day_offset < 4,
            };
            let status = if present { "present" } else { "absent" };
            let source_key = format!("seed-{school_id}-{id}-{date}");

            let (event_date, time_in): (Option<String>, Option<DateTime<Utc>>) =
                match day_offset % 3 {
                    0 => (Some(date.format("%Y-%m-%d").to_string()), None),
                    1 => (Some(format!("{date}T08:25:00Z")), None),
                    _ => (
                        None,
                        Some(
                            Utc.from_utc_datetime(
                                &date.and_hms_opt(8, 10, 0).context("invalid seed time")?,
                            ),
                        ),
                    ),
                };

            let result = sqlx::query(
                r#"
                INSERT INTO dropout_warning.attendance_events
                (id, school_id, student_id, status, event_date, time_in, source_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(school_id)
            .bind(id)
            .bind(status)
            .bind(&event_date)
            .bind(time_in)
            .bind(&source_key)
            .execute(pool)
            .await?;
            inserted += result.rows_affected() as usize;
        }
    }

    // SCH-002 has an absence-only feed so scoring short-circuits, plus one
    // malformed row with no usable date at all.
    let (dev_id, dev_school, _, _) = &students[3];
    for (source_key, status, event_date) in [
        ("seed-SCH-002-dev-1", "absent", Some("2026-01-05")),
        ("seed-SCH-002-dev-2", "absent", Some("2026-01-06")),
        ("seed-SCH-002-dev-3", "present", None),
    ] {
        let result = sqlx::query(
            r#"
            INSERT INTO dropout_warning.attendance_events
            (id, school_id, student_id, status, event_date, time_in, source_key)
            VALUES ($1, $2, $3, $4, $5, NULL, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(dev_school)
        .bind(dev_id)
        .bind(status)
        .bind(event_date)
        .bind(source_key)
        .execute(pool)
        .await?;
        inserted += result.rows_affected() as usize;
    }

    debug!(inserted, "seed events written");
    Ok(())
}

/// All attendance events for one school, as the raw feed recorded them.
pub async fn fetch_attendance(
    pool: &PgPool,
    school_id: &str,
) -> anyhow::Result<Vec<AttendanceEvent>> {
    let rows = sqlx::query(
        "SELECT student_id, status, event_date, time_in \
         FROM dropout_warning.attendance_events \
         WHERE school_id = $1",
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let event_date: Option<String> = row.get("event_date");
        events.push(AttendanceEvent {
            student_id: row.get("student_id"),
            status: row.get("status"),
            date: event_date.map(RawDate::Text),
            time_in: row.get("time_in"),
        });
    }

    Ok(events)
}

pub async fn fetch_school_ids(pool: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT DISTINCT school_id FROM dropout_warning.attendance_events ORDER BY school_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("school_id")).collect())
}

/// Merge scored fields into each student record, keyed on the students
/// primary key. A record with no matching student row is a no-op, never
/// an insert; the count returned is rows actually updated. Updates set
/// absolute values, so re-running a scoring pass is idempotent.
pub async fn apply_score_updates(
    pool: &PgPool,
    records: &[ScoredRecord],
) -> anyhow::Result<usize> {
    let mut updated = 0usize;

    for record in records {
        let update = StudentUpdate::from(record);
        let result = sqlx::query(
            r#"
            UPDATE dropout_warning.students
            SET attendance_percentage = $2,
                max_consec_absences = $3,
                num_long_streaks = $4,
                dropout_risk = $5,
                dropout_pred = $6,
                scored_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(update.student_id)
        .bind(update.attendance_percentage)
        .bind(update.max_consec_absences)
        .bind(update.num_long_streaks)
        .bind(update.dropout_risk)
        .bind(update.dropout_pred)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(student_id = %update.student_id, "no student record for scored id, skipping");
        } else {
            updated += 1;
        }
    }

    Ok(updated)
}

/// Scored student records for reporting, highest risk first.
pub async fn fetch_scored_students(
    pool: &PgPool,
    school_id: Option<&str>,
) -> anyhow::Result<Vec<ScoredStudent>> {
    let mut query = String::from(
        "SELECT id, school_id, full_name, class_name, attendance_percentage, \
         max_consec_absences, num_long_streaks, dropout_risk, dropout_pred \
         FROM dropout_warning.students \
         WHERE dropout_risk IS NOT NULL",
    );

    if school_id.is_some() {
        query.push_str(" AND school_id = $1");
    }
    query.push_str(" ORDER BY dropout_risk DESC, full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = school_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut students = Vec::with_capacity(records.len());

    for row in records {
        students.push(ScoredStudent {
            student_id: row.get("id"),
            school_id: row.get("school_id"),
            full_name: row.get("full_name"),
            class_name: row.get("class_name"),
            attendance_percentage: row.get("attendance_percentage"),
            max_consec_absences: row.get("max_consec_absences"),
            num_long_streaks: row.get("num_long_streaks"),
            dropout_risk: row.get("dropout_risk"),
            dropout_pred: row.get("dropout_pred"),
        });
    }

    Ok(students)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        school_id: String,
        student_id: Uuid,
        status: String,
        date: Option<String>,
        time_in: Option<DateTime<Utc>>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO dropout_warning.attendance_events
            (id, school_id, student_id, status, event_date, time_in, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.school_id)
        .bind(row.student_id)
        .bind(&row.status)
        .bind(&row.date)
        .bind(row.time_in)
        .bind(&source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
