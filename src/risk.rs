use crate::model::{FeatureVector, Forest};
use crate::models::{FeatureRow, ScoredRecord};

/// Apply the loaded classifier to each feature row. The identifier and
/// display name travel through unchanged; probability and label both come
/// from the classifier so there is a single decision boundary.
pub fn score_features(
    features: Vec<FeatureRow>,
    classifier: &Forest,
    school_id: &str,
) -> Vec<ScoredRecord> {
    features
        .into_iter()
        .map(|row| {
            let vector = FeatureVector::from(&row);
            let dropout_prob = classifier.predict_proba(&vector);
            let dropout_pred = classifier.predict(&vector);

            ScoredRecord {
                student_id: row.student_id,
                student_name: row.student_name,
                school_id: school_id.to_string(),
                attendance_pct: row.attendance_pct,
                max_consec_absences: row.max_consec_absences,
                num_long_streaks: row.num_long_streaks,
                dropout_prob,
                dropout_pred,
            }
        })
        .collect()
}
