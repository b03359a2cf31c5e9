use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Category, GradableItem, Student, StudentStatus, SubmissionRecord, Teacher};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SEED_STUDENTS: [(&str, &str, &str, StudentStatus); 4] = [
    (
        "5f2a8c61-7d3e-4b90-a6c4-1e8d0b7f3a21",
        "Nadia Okafor",
        "nadia.okafor@school.example",
        StudentStatus::Active,
    ),
    (
        "c84e1d09-2b7a-4f13-9e65-d03a7b5c8e42",
        "Elliot Brandt",
        "elliot.brandt@school.example",
        StudentStatus::Active,
    ),
    (
        "17b9f4e3-6c58-4a2d-b0f1-8e4c2d9a6b63",
        "Sofia Lindqvist",
        "sofia.lindqvist@school.example",
        StudentStatus::Active,
    ),
    (
        "9e4b7a10-5c2d-4b8f-a1e3-7f6d2c9b0a44",
        "Rowan Hale",
        "rowan.hale@school.example",
        StudentStatus::Deactivated,
    ),
];

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let teacher_id = Uuid::parse_str("6b1f3c52-8d0e-4f7a-9c41-2a9e5d7b1c03")?;
    sqlx::query(
        r#"
        INSERT INTO gradebook.teachers (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
        "#,
    )
    .bind(teacher_id)
    .bind("Morgan Reyes")
    .bind("morgan.reyes@school.example")
    .execute(pool)
    .await?;

    let students = SEED_STUDENTS
        .iter()
        .map(|(id, name, email, status)| -> anyhow::Result<_> {
            Ok((Uuid::parse_str(id)?, *name, *email, *status))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    for (id, name, email, status) in &students {
        sqlx::query(
            r#"
            INSERT INTO gradebook.students (id, full_name, email, teacher_id, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                teacher_id = EXCLUDED.teacher_id,
                status = EXCLUDED.status
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(teacher_id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let items = vec![
        (
            Uuid::parse_str("a1c0e2f4-0b6d-4c1e-8f3a-5d7b9e1c2a01")?,
            "Fractions Quiz",
            Category::Quiz,
            Some(20.0),
            now - Duration::days(20),
            now - Duration::days(27),
        ),
        (
            Uuid::parse_str("a1c0e2f4-0b6d-4c1e-8f3a-5d7b9e1c2a02")?,
            "Reading Response",
            Category::Assignment,
            None,
            now - Duration::days(10),
            now - Duration::days(18),
        ),
        (
            Uuid::parse_str("a1c0e2f4-0b6d-4c1e-8f3a-5d7b9e1c2a03")?,
            "Midterm Exam",
            Category::Exam,
            Some(80.0),
            now - Duration::days(3),
            now - Duration::days(9),
        ),
    ];

    for (id, title, category, max_score, due_date, created_at) in &items {
        sqlx::query(
            r#"
            INSERT INTO gradebook.items
            (id, teacher_id, title, category, max_score, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (teacher_id, category, title) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(teacher_id)
        .bind(title)
        .bind(category.as_str())
        .bind(max_score)
        .bind(due_date)
        .bind(created_at)
        .execute(pool)
        .await?;

        for (student_id, _, _, _) in &students {
            sqlx::query(
                r#"
                INSERT INTO gradebook.item_assignees (item_id, student_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(student_id)
            .execute(pool)
            .await?;
        }
    }

    // (student index, item index, hours relative to due date, grade)
    let submissions: Vec<(usize, usize, i64, Option<f64>)> = vec![
        (0, 0, -30, Some(17.0)),
        (0, 1, -2, Some(88.0)),
        (0, 2, -1, Some(66.0)),
        (1, 0, 5, Some(12.0)),
        (1, 1, -20, None),
        (2, 0, -48, Some(19.0)),
        (2, 2, 26, Some(52.0)),
    ];

    for (student_index, item_index, hours, grade) in submissions {
        let (student_id, ..) = students[student_index];
        let (item_id, _, _, _, due_date, _) = items[item_index];
        let submitted_at = due_date + Duration::hours(hours);

        sqlx::query(
            r#"
            INSERT INTO gradebook.submissions
            (id, item_id, student_id, is_submitted, submitted_at, grade, graded_at, feedback)
            VALUES ($1, $2, $3, true, $4, $5, $6, $7)
            ON CONFLICT (item_id, student_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(student_id)
        .bind(submitted_at)
        .bind(grade)
        .bind(grade.map(|_| submitted_at + Duration::days(1)))
        .bind(grade.map(|_| "Reviewed"))
        .execute(pool)
        .await?;
    }

    info!(
        students = students.len(),
        items = items.len(),
        "seeded demo gradebook"
    );
    Ok(())
}

pub async fn fetch_teacher(pool: &PgPool, email: &str) -> anyhow::Result<Teacher> {
    let row = sqlx::query("SELECT id, full_name, email FROM gradebook.teachers WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no teacher with email {email}"))?;

    Ok(Teacher {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
    })
}

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let status: String = row.get("status");
    Ok(Student {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        status: status.parse()?,
    })
}

pub async fn fetch_student(pool: &PgPool, email: &str) -> anyhow::Result<Student> {
    let row = sqlx::query(
        "SELECT id, full_name, email, status FROM gradebook.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student with email {email}"))?;

    student_from_row(&row)
}

pub async fn fetch_students(pool: &PgPool, teacher_id: Uuid) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        "SELECT id, full_name, email, status \
         FROM gradebook.students \
         WHERE teacher_id = $1 \
         ORDER BY full_name",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

pub async fn fetch_items(pool: &PgPool, teacher_id: Uuid) -> anyhow::Result<Vec<GradableItem>> {
    let rows = sqlx::query(
        r#"
        SELECT i.title, i.category, i.due_date, i.created_at,
               COALESCE(
                   array_agg(a.student_id) FILTER (WHERE a.student_id IS NOT NULL),
                   ARRAY[]::uuid[]
               ) AS assigned_to
        FROM gradebook.items i
        LEFT JOIN gradebook.item_assignees a ON a.item_id = i.id
        WHERE i.teacher_id = $1
        GROUP BY i.id
        ORDER BY i.created_at
        "#,
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let category: String = row.get("category");
        items.push(GradableItem {
            title: row.get("title"),
            category: category.parse()?,
            due_date: row.get("due_date"),
            created_at: row.get("created_at"),
            assigned_to: row.get("assigned_to"),
        });
    }

    debug!(count = items.len(), %teacher_id, "fetched items");
    Ok(items)
}

const SUBMISSION_COLUMNS: &str = "i.title AS item_title, s.student_id, i.category, i.max_score, i.due_date, \
     s.is_submitted, s.submitted_at, s.grade, s.graded_at, s.feedback";

fn submission_from_row(row: &PgRow) -> anyhow::Result<SubmissionRecord> {
    let category: String = row.get("category");
    Ok(SubmissionRecord {
        item_title: row.get("item_title"),
        student_id: row.get("student_id"),
        category: category.parse()?,
        max_score: row.get("max_score"),
        due_date: row.get("due_date"),
        is_submitted: row.get("is_submitted"),
        submitted_at: row.get("submitted_at"),
        grade: row.get("grade"),
        graded_at: row.get("graded_at"),
        feedback: row.get("feedback"),
    })
}

pub async fn fetch_teacher_submissions(
    pool: &PgPool,
    teacher_id: Uuid,
) -> anyhow::Result<Vec<SubmissionRecord>> {
    let query = format!(
        "SELECT {SUBMISSION_COLUMNS} \
         FROM gradebook.submissions s \
         JOIN gradebook.items i ON i.id = s.item_id \
         WHERE i.teacher_id = $1"
    );

    let rows = sqlx::query(&query).bind(teacher_id).fetch_all(pool).await?;
    let submissions = rows
        .iter()
        .map(submission_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    debug!(count = submissions.len(), %teacher_id, "fetched submissions");
    Ok(submissions)
}

pub async fn fetch_student_submissions(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<SubmissionRecord>> {
    let query = format!(
        "SELECT {SUBMISSION_COLUMNS} \
         FROM gradebook.submissions s \
         JOIN gradebook.items i ON i.id = s.item_id \
         WHERE s.student_id = $1 \
         ORDER BY s.graded_at NULLS LAST"
    );

    let rows = sqlx::query(&query).bind(student_id).fetch_all(pool).await?;
    rows.iter().map(submission_from_row).collect()
}

pub async fn import_csv(
    pool: &PgPool,
    teacher_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_name: String,
        student_email: String,
        item_title: String,
        category: String,
        max_score: Option<f64>,
        due_date: Option<DateTime<Utc>>,
        created_at: Option<DateTime<Utc>>,
        is_submitted: bool,
        submitted_at: Option<DateTime<Utc>>,
        grade: Option<f64>,
        feedback: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut upserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
        let category: Category = row.category.parse()?;

        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO gradebook.students (id, full_name, email, teacher_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, teacher_id = EXCLUDED.teacher_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.student_name)
        .bind(&row.student_email)
        .bind(teacher_id)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        let item_id: Uuid = sqlx::query(
            r#"
            INSERT INTO gradebook.items
            (id, teacher_id, title, category, max_score, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()))
            ON CONFLICT (teacher_id, category, title) DO UPDATE
            SET max_score = EXCLUDED.max_score, due_date = EXCLUDED.due_date
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(teacher_id)
        .bind(&row.item_title)
        .bind(category.as_str())
        .bind(row.max_score)
        .bind(row.due_date)
        .bind(row.created_at)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO gradebook.item_assignees (item_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(item_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO gradebook.submissions
            (id, item_id, student_id, is_submitted, submitted_at, grade, graded_at, feedback)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (item_id, student_id) DO UPDATE
            SET is_submitted = EXCLUDED.is_submitted,
                submitted_at = EXCLUDED.submitted_at,
                grade = EXCLUDED.grade,
                graded_at = EXCLUDED.graded_at,
                feedback = EXCLUDED.feedback
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(student_id)
        .bind(row.is_submitted)
        .bind(row.submitted_at)
        .bind(row.grade)
        .bind(row.grade.map(|_| Utc::now()))
        .bind(&row.feedback)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            upserted += 1;
        }
    }

    tx.commit().await?;
    Ok(upserted)
}
