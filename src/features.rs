use tracing::warn;

use crate::models::{FeatureRow, PresenceMatrix};

/// Consecutive-absence length at which a streak starts counting as long.
pub const LONG_STREAK_MIN: u32 = 8;

/// Derive per-student features from the presence matrix.
///
/// Returns an empty set when the matrix has no day columns; callers treat
/// that as "no predictions possible", not as an error.
///
/// `num_long_streaks` counts every day on which the running streak is at
/// or past `LONG_STREAK_MIN`, so a 10-day streak contributes 3. The
/// trained model expects this accumulation, so it must not be collapsed
/// to one count per streak.
pub fn extract_features(matrix: &PresenceMatrix) -> Vec<FeatureRow> {
    if matrix.valid_days.is_empty() {
        warn!("presence matrix has no day columns, no features to extract");
        return Vec::new();
    }

    matrix
        .rows
        .iter()
        .map(|row| {
            let day_count = row.presence.len();
            let present_count = row.presence.iter().filter(|&&p| p).count();
            let attendance_pct = present_count as f64 / day_count as f64;

            let mut streak = 0u32;
            let mut max_streak = 0u32;
            let mut long_streaks = 0u32;
            for &present in &row.presence {
                if present {
                    streak = 0;
                } else {
                    streak += 1;
                    max_streak = max_streak.max(streak);
                    if streak >= LONG_STREAK_MIN {
                        long_streaks += 1;
                    }
                }
            }

            FeatureRow {
                student_id: row.student_id,
                student_name: row.student_name.clone(),
                attendance_pct,
                max_consec_absences: max_streak,
                num_long_streaks: long_streaks,
            }
        })
        .collect()
}
