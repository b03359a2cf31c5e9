use tracing::{debug, warn};

use crate::grading::round2;
use crate::models::{
    GradableItem, SubmissionRecord, TimelinessBucket, TimelinessRecord, TimelinessReport,
};

/// Number of (item, student) pairs that should eventually produce a
/// submission. Items without a due date are not tracked.
pub fn expected_submissions(items: &[GradableItem]) -> usize {
    items
        .iter()
        .filter(|item| {
            if item.due_date.is_none() {
                debug!(title = %item.title, "item has no due date; skipped");
            }
            item.due_date.is_some()
        })
        .map(|item| item.assigned_to.len())
        .sum()
}

/// Submissions on items without a due date are left out.
pub fn records_from_submissions(submissions: &[SubmissionRecord]) -> Vec<TimelinessRecord> {
    submissions
        .iter()
        .filter_map(TimelinessRecord::from_submission)
        .collect()
}

fn bucket(count: usize, expected: usize) -> TimelinessBucket {
    let percentage = if expected == 0 {
        0.0
    } else {
        round2(count as f64 / expected as f64 * 100.0)
    };

    TimelinessBucket { count, percentage }
}

pub fn classify_submissions(
    records: &[TimelinessRecord],
    expected_submissions: usize,
) -> TimelinessReport {
    let mut on_time = 0usize;
    let mut late = 0usize;

    for record in records.iter().filter(|record| record.is_submitted) {
        match record.submitted_at {
            Some(submitted_at) if submitted_at > record.due_date => late += 1,
            _ => on_time += 1,
        }
    }

    let submitted = on_time + late;
    let residual_clamped = submitted > expected_submissions;
    if residual_clamped {
        warn!(
            submitted,
            expected_submissions,
            "more submissions than expected; not-submitted count floored at zero"
        );
    }
    let not_submitted = expected_submissions.saturating_sub(submitted);

    TimelinessReport {
        on_time: bucket(on_time, expected_submissions),
        late: bucket(late, expected_submissions),
        not_submitted: bucket(not_submitted, expected_submissions),
        total: expected_submissions,
        residual_clamped,
    }
}
