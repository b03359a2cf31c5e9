use std::fmt::Write;

use crate::grading;
use crate::models::{
    GradeEntry, StudentStanding, StudentStatus, Student, SubmissionRecord, Teacher,
    TimelinessReport, WeeklyActivity,
};

pub fn grade_entries_for(student: &Student, submissions: &[SubmissionRecord]) -> Vec<GradeEntry> {
    submissions
        .iter()
        .filter(|submission| submission.student_id == student.id)
        .filter_map(GradeEntry::from_submission)
        .collect()
}

pub fn student_standing(student: &Student, submissions: &[SubmissionRecord]) -> StudentStanding {
    let entries = grade_entries_for(student, submissions);

    StudentStanding {
        student_id: student.id,
        student_name: student.full_name.clone(),
        student_email: student.email.clone(),
        graded_count: entries.len(),
        summary: grading::summarize_grades(&entries),
    }
}

/// Feedback left on graded work, labelled with the item it belongs to.
pub fn feedback_lines(submissions: &[SubmissionRecord]) -> Vec<String> {
    submissions
        .iter()
        .filter(|submission| submission.graded_at.is_some())
        .filter_map(|submission| {
            submission
                .feedback
                .as_deref()
                .map(|note| format!("{} ({}): {}", submission.item_title, submission.category, note))
        })
        .collect()
}

/// Standings for active students, best final grade first.
pub fn class_standings(
    students: &[Student],
    submissions: &[SubmissionRecord],
) -> Vec<StudentStanding> {
    let mut standings: Vec<StudentStanding> = students
        .iter()
        .filter(|student| student.status == StudentStatus::Active)
        .map(|student| student_standing(student, submissions))
        .collect();

    standings.sort_by(|a, b| {
        b.summary
            .final_grade
            .partial_cmp(&a.summary.final_grade)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
    standings
}

pub fn build_report(
    teacher: &Teacher,
    standings: &[StudentStanding],
    timeliness: &TimelinessReport,
    activity: &[WeeklyActivity],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Gradebook Report");
    let _ = writeln!(
        output,
        "Generated for {} ({})",
        teacher.full_name, teacher.email
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Standings");

    if standings.is_empty() {
        let _ = writeln!(output, "No active students assigned.");
    } else {
        let _ = writeln!(
            output,
            "| Student | Quiz | Assignment | Exam | Class Standing | Final Grade |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for standing in standings {
            let summary = &standing.summary;
            let _ = writeln!(
                output,
                "| {} ({}) | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |",
                standing.student_name,
                standing.student_email,
                summary.quiz_average,
                summary.assignment_average,
                summary.exam_average,
                summary.class_standing,
                summary.final_grade
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Submission Timeliness");

    if timeliness.total == 0 {
        let _ = writeln!(output, "No submissions expected yet.");
    } else {
        let _ = writeln!(
            output,
            "- On time: {} ({:.2}%)",
            timeliness.on_time.count, timeliness.on_time.percentage
        );
        let _ = writeln!(
            output,
            "- Late: {} ({:.2}%)",
            timeliness.late.count, timeliness.late.percentage
        );
        let _ = writeln!(
            output,
            "- Not submitted: {} ({:.2}%)",
            timeliness.not_submitted.count, timeliness.not_submitted.percentage
        );
        let _ = writeln!(output, "- Expected: {}", timeliness.total);
        if timeliness.residual_clamped {
            let _ = writeln!(
                output,
                "\n> More submissions were recorded than assigned; the not-submitted count was floored at zero."
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Activity");

    if activity.is_empty() {
        let _ = writeln!(output, "No weeks requested.");
    } else {
        let _ = writeln!(output, "| Week | Assignments | Quizzes | Exams | Total |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for week in activity {
            let _ = writeln!(
                output,
                "| {} ({} to {}) | {} | {} | {} | {} |",
                week.week_label,
                week.week_start,
                week.week_end,
                week.assignments,
                week.quizzes,
                week.exams,
                week.total
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use uuid::Uuid;

    use crate::models::{Category, TimelinessBucket};

    fn student(name: &str, status: StudentStatus) -> Student {
        Student {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            status,
        }
    }

    fn submission(
        student: &Student,
        category: Category,
        grade: Option<f64>,
        max_score: Option<f64>,
        is_submitted: bool,
    ) -> SubmissionRecord {
        SubmissionRecord {
            item_title: format!("{category} check"),
            student_id: student.id,
            category,
            max_score,
            due_date: None,
            is_submitted,
            submitted_at: Some(Utc::now() - Duration::days(1)),
            grade,
            graded_at: grade.map(|_| Utc::now()),
            feedback: None,
        }
    }

    fn teacher() -> Teacher {
        Teacher {
            id: Uuid::new_v4(),
            full_name: "Morgan Reyes".to_string(),
            email: "morgan.reyes@example.com".to_string(),
        }
    }

    #[test]
    fn ungraded_and_unsubmitted_work_is_ignored() {
        let nadia = student("Nadia", StudentStatus::Active);
        let submissions = vec![
            submission(&nadia, Category::Quiz, Some(8.0), Some(10.0), true),
            submission(&nadia, Category::Quiz, None, Some(10.0), true),
            submission(&nadia, Category::Quiz, Some(0.0), Some(10.0), false),
        ];

        let standing = student_standing(&nadia, &submissions);
        assert_eq!(standing.graded_count, 1);
        assert_eq!(standing.summary.quiz_average, 80.0);
    }

    #[test]
    fn missing_max_score_defaults_to_hundred() {
        let nadia = student("Nadia", StudentStatus::Active);
        let submissions = vec![submission(&nadia, Category::Exam, Some(65.0), None, true)];

        let standing = student_standing(&nadia, &submissions);
        assert_eq!(standing.summary.exam_average, 65.0);
        assert_eq!(standing.summary.final_grade, 26.0);
    }

    #[test]
    fn feedback_is_labelled_with_item_title() {
        let nadia = student("Nadia", StudentStatus::Active);
        let mut graded = submission(&nadia, Category::Quiz, Some(8.0), Some(10.0), true);
        graded.item_title = "Cell Structure Quiz".to_string();
        graded.feedback = Some("Check question 4".to_string());
        let mut pending = submission(&nadia, Category::Exam, None, Some(80.0), true);
        pending.feedback = Some("Draft note".to_string());

        let lines = feedback_lines(&[graded, pending]);
        assert_eq!(lines, vec!["Cell Structure Quiz (quiz): Check question 4".to_string()]);
    }

    #[test]
    fn standings_skip_inactive_and_rank_by_final_grade() {
        let nadia = student("Nadia", StudentStatus::Active);
        let elliot = student("Elliot", StudentStatus::Active);
        let sofia = student("Sofia", StudentStatus::Deleted);
        let submissions = vec![
            submission(&nadia, Category::Exam, Some(50.0), Some(100.0), true),
            submission(&elliot, Category::Exam, Some(90.0), Some(100.0), true),
            submission(&sofia, Category::Exam, Some(100.0), Some(100.0), true),
        ];

        let standings = class_standings(&[nadia, elliot, sofia], &submissions);
        let names: Vec<&str> = standings.iter().map(|s| s.student_name.as_str()).collect();
        assert_eq!(names, vec!["Elliot", "Nadia"]);
    }

    #[test]
    fn report_lists_every_section() {
        let nadia = student("Nadia", StudentStatus::Active);
        let submissions = vec![submission(&nadia, Category::Quiz, Some(9.0), Some(10.0), true)];
        let standings = class_standings(&[nadia], &submissions);
        let timeliness = TimelinessReport {
            on_time: TimelinessBucket {
                count: 1,
                percentage: 50.0,
            },
            late: TimelinessBucket {
                count: 0,
                percentage: 0.0,
            },
            not_submitted: TimelinessBucket {
                count: 1,
                percentage: 50.0,
            },
            total: 2,
            residual_clamped: false,
        };
        let start = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let activity = vec![WeeklyActivity {
            week_label: "Mar 8".to_string(),
            week_start: start,
            week_end: start + Duration::days(6),
            assignments: 0,
            quizzes: 1,
            exams: 0,
            total: 1,
        }];

        let report = build_report(&teacher(), &standings, &timeliness, &activity);
        assert!(report.contains("## Class Standings"));
        assert!(report.contains("| Nadia (nadia@example.com) | 90.00 | 0.00 | 0.00 | 40.50 | 24.30 |"));
        assert!(report.contains("- Not submitted: 1 (50.00%)"));
        assert!(report.contains("| Mar 8 (2026-03-08 to 2026-03-14) | 0 | 1 | 0 | 1 |"));
    }

    #[test]
    fn empty_report_uses_placeholders() {
        let timeliness = crate::timeliness::classify_submissions(&[], 0);
        let report = build_report(&teacher(), &[], &timeliness, &[]);
        assert!(report.contains("No active students assigned."));
        assert!(report.contains("No submissions expected yet."));
        assert!(report.contains("No weeks requested."));
    }
}
