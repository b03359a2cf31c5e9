use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Assignment,
    Quiz,
    Exam,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Assignment => "assignment",
            Category::Quiz => "quiz",
            Category::Exam => "exam",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => Ok(Category::Assignment),
            "quiz" => Ok(Category::Quiz),
            "exam" => Ok(Category::Exam),
            other => anyhow::bail!("unknown item category: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Deactivated,
    Deleted,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Deactivated => "deactivated",
            StudentStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for StudentStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "deactivated" => Ok(StudentStatus::Deactivated),
            "deleted" => Ok(StudentStatus::Deleted),
            other => anyhow::bail!("unknown student status: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub status: StudentStatus,
}

#[derive(Debug, Clone)]
pub struct GradableItem {
    pub title: String,
    pub category: Category,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub assigned_to: Vec<Uuid>,
}

/// A submission joined with the fields of its parent item that the
/// computations need.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub item_title: String,
    pub student_id: Uuid,
    pub category: Category,
    /// `None` when the item was created without an explicit maximum.
    pub max_score: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub grade: Option<f64>,
    pub graded_at: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeEntry {
    pub category: Category,
    pub score: f64,
    pub max_score: f64,
}

impl GradeEntry {
    /// Only submitted and graded records produce an entry.
    pub fn from_submission(submission: &SubmissionRecord) -> Option<Self> {
        if !submission.is_submitted {
            return None;
        }

        submission.grade.map(|score| GradeEntry {
            category: submission.category,
            score,
            max_score: submission.max_score.unwrap_or(DEFAULT_MAX_SCORE),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeSummary {
    pub quiz_average: f64,
    pub assignment_average: f64,
    pub exam_average: f64,
    pub class_standing: f64,
    pub final_grade: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStanding {
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub graded_count: usize,
    pub summary: GradeSummary,
}

#[derive(Debug, Clone, Copy)]
pub struct TimelinessRecord {
    pub is_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
}

impl TimelinessRecord {
    /// Records whose parent item has no due date cannot be classified.
    pub fn from_submission(submission: &SubmissionRecord) -> Option<Self> {
        submission.due_date.map(|due_date| TimelinessRecord {
            is_submitted: submission.is_submitted,
            submitted_at: submission.submitted_at,
            due_date,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelinessBucket {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelinessReport {
    pub on_time: TimelinessBucket,
    pub late: TimelinessBucket,
    pub not_submitted: TimelinessBucket,
    pub total: usize,
    /// Set when more submissions were found than were expected.
    pub residual_clamped: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ActivityEvent {
    pub created_at: DateTime<Utc>,
    pub category: Category,
}

impl From<&GradableItem> for ActivityEvent {
    fn from(item: &GradableItem) -> Self {
        ActivityEvent {
            created_at: item.created_at,
            category: item.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyActivity {
    pub week_label: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub assignments: usize,
    pub quizzes: usize,
    pub exams: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct Teacher {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}
