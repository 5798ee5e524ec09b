use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::features;
use crate::matrix;
use crate::model::Forest;
use crate::models::{AttendanceEvent, ScoredRecord};
use crate::risk;

/// The pure core of a school run: raw events in, scored records out.
///
/// Two degenerate inputs short-circuit to an empty result rather than an
/// error: no events at all, and event sets that produce no feature rows
/// (for example when no day has a single "present" mark). Both are normal
/// for schools with no usable attendance yet.
pub fn score_events(
    events: &[AttendanceEvent],
    classifier: &Forest,
    school_id: &str,
) -> Vec<ScoredRecord> {
    if events.is_empty() {
        info!(school_id, "no attendance events, skipping school");
        return Vec::new();
    }

    info!(school_id, events = events.len(), "scoring school");

    let matrix = matrix::build_matrix(events);
    let features = features::extract_features(&matrix);
    if features.is_empty() {
        info!(school_id, "no features generated, skipping school");
        return Vec::new();
    }

    risk::score_features(features, classifier, school_id)
}

/// Fetch, score and persist one school. Returns the number of student
/// records actually updated; degenerate inputs persist nothing. Store
/// failures propagate to the caller, which decides whether to keep
/// iterating other schools.
pub async fn run_school(
    pool: &PgPool,
    classifier: &Forest,
    school_id: &str,
) -> anyhow::Result<usize> {
    let events = db::fetch_attendance(pool, school_id).await?;
    let scored = score_events(&events, classifier, school_id);

    if scored.is_empty() {
        return Ok(0);
    }

    let updated = db::apply_score_updates(pool, &scored).await?;
    info!(school_id, updated, scored = scored.len(), "school run complete");
    Ok(updated)
}
