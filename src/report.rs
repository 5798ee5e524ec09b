use std::fmt::Write;

use crate::models::ScoredStudent;

#[derive(Debug, Clone)]
pub struct RiskBandSummary {
    pub band: &'static str,
    pub count: usize,
}

pub fn summarize_bands(students: &[ScoredStudent]) -> Vec<RiskBandSummary> {
    let mut high = 0usize;
    let mut elevated = 0usize;
    let mut low = 0usize;

    for student in students {
        if student.dropout_risk >= 0.7 {
            high += 1;
        } else if student.dropout_risk >= 0.4 {
            elevated += 1;
        } else {
            low += 1;
        }
    }

    vec![
        RiskBandSummary {
            band: "high (>= 0.70)",
            count: high,
        },
        RiskBandSummary {
            band: "elevated (0.40-0.69)",
            count: elevated,
        },
        RiskBandSummary {
            band: "low (< 0.40)",
            count: low,
        },
    ]
}

pub fn build_report(school: Option<&str>, students: &[ScoredStudent]) -> String {
    let mut output = String::new();
    let school_label = school.unwrap_or("all schools");

    let _ = writeln!(output, "# Dropout Risk Report");
    let _ = writeln!(output, "Generated for {school_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    if students.is_empty() {
        let _ = writeln!(output, "No scored students on record.");
        return output;
    }

    let flagged = students.iter().filter(|s| s.dropout_pred == 1).count();
    let avg_risk =
        students.iter().map(|s| s.dropout_risk).sum::<f64>() / students.len() as f64;
    let avg_attendance = students
        .iter()
        .map(|s| s.attendance_percentage)
        .sum::<f64>()
        / students.len() as f64;

    let _ = writeln!(output, "- Students scored: {}", students.len());
    let _ = writeln!(output, "- Flagged as likely dropouts: {flagged}");
    let _ = writeln!(output, "- Average risk: {avg_risk:.2}");
    let _ = writeln!(output, "- Average attendance: {avg_attendance:.1}%");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");
    for summary in summarize_bands(students) {
        let _ = writeln!(output, "- {}: {} students", summary.band, summary.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");
    for student in students.iter().take(10) {
        let class_label = student.class_name.as_deref().unwrap_or("-");
        let _ = writeln!(
            output,
            "- {} ({}, class {}) risk {:.2}, attendance {:.1}%, longest absence run {} days",
            student.full_name,
            student.school_id,
            class_label,
            student.dropout_risk,
            student.attendance_percentage,
            student.max_consec_absences
        );
    }

    output
}
