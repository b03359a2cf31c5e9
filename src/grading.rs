use crate::models::{Category, GradeEntry, GradeSummary};

pub const QUIZ_WEIGHT: f64 = 0.45;
pub const ASSIGNMENT_WEIGHT: f64 = 0.15;
pub const STANDING_WEIGHT: f64 = 0.60;
pub const EXAM_WEIGHT: f64 = 0.40;

pub fn percentage(score: f64, max_score: f64) -> f64 {
    if max_score > 0.0 && max_score.is_finite() && score.is_finite() {
        score / max_score * 100.0
    } else {
        0.0
    }
}

pub fn category_average(entries: &[GradeEntry], category: Category) -> f64 {
    let (sum, count) = entries
        .iter()
        .filter(|entry| entry.category == category)
        .fold((0.0, 0usize), |(sum, count), entry| {
            (sum + percentage(entry.score, entry.max_score), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn class_standing(quiz_average: f64, assignment_average: f64) -> f64 {
    quiz_average * QUIZ_WEIGHT + assignment_average * ASSIGNMENT_WEIGHT
}

pub fn final_grade(class_standing: f64, exam_average: f64) -> f64 {
    class_standing * STANDING_WEIGHT + exam_average * EXAM_WEIGHT
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn summarize_grades(entries: &[GradeEntry]) -> GradeSummary {
    let quiz_average = category_average(entries, Category::Quiz);
    let assignment_average = category_average(entries, Category::Assignment);
    let exam_average = category_average(entries, Category::Exam);
    let standing = class_standing(quiz_average, assignment_average);
    let overall = final_grade(standing, exam_average);

    GradeSummary {
        quiz_average: round2(quiz_average),
        assignment_average: round2(assignment_average),
        exam_average: round2(exam_average),
        class_standing: round2(standing),
        final_grade: round2(overall),
    }
}
