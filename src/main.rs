use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

mod activity;
mod db;
mod grading;
mod models;
mod report;
mod timeliness;

use models::ActivityEvent;

#[derive(Parser)]
#[command(name = "gradebook-analytics")]
#[command(about = "Grade standings, submission timeliness and activity trends for a class gradebook", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,
    /// Tracing filter, e.g. `info` or `gradebook_analytics=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo teacher, students and graded work
    Seed,
    /// Import students, items and submissions from a CSV file
    Import {
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show one student's category averages and composite grades
    Grades {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Rank a teacher's active students by final grade
    Standings {
        #[arg(long)]
        teacher: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Break expected submissions into on-time, late and missing
    Timeliness {
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        json: bool,
    },
    /// Count items created per week
    Activity {
        #[arg(long)]
        teacher: String,
        #[arg(
            long,
            default_value_t = activity::DEFAULT_WEEKS as u64,
            value_parser = clap::value_parser!(u64).range(1..=activity::MAX_WEEKS as u64)
        )]
        weeks: u64,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        teacher: String,
        #[arg(
            long,
            default_value_t = activity::DEFAULT_WEEKS as u64,
            value_parser = clap::value_parser!(u64).range(1..=activity::MAX_WEEKS as u64)
        )]
        weeks: u64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;
    debug!(max_connections = cli.max_connections, "connected to Postgres");

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { teacher, csv } => {
            let teacher = db::fetch_teacher(&pool, &teacher).await?;
            let upserted = db::import_csv(&pool, teacher.id, &csv).await?;
            info!(upserted, path = %csv.display(), "import finished");
            println!("Upserted {upserted} submissions from {}.", csv.display());
        }
        Commands::Grades { email, json } => {
            let student = db::fetch_student(&pool, &email).await?;
            let submissions = db::fetch_student_submissions(&pool, student.id).await?;
            let standing = report::student_standing(&student, &submissions);

            if json {
                println!("{}", serde_json::to_string_pretty(&standing)?);
                return Ok(());
            }

            let summary = &standing.summary;
            println!(
                "{} ({}) across {} graded submissions:",
                standing.student_name, standing.student_email, standing.graded_count
            );
            println!("- Quiz average: {:.2}", summary.quiz_average);
            println!("- Assignment average: {:.2}", summary.assignment_average);
            println!("- Exam average: {:.2}", summary.exam_average);
            println!("- Class standing: {:.2}", summary.class_standing);
            println!("- Final grade: {:.2}", summary.final_grade);

            let feedback = report::feedback_lines(&submissions);
            if !feedback.is_empty() {
                println!("Feedback:");
                for note in feedback {
                    println!("- {note}");
                }
            }
        }
        Commands::Standings { teacher, limit } => {
            let teacher = db::fetch_teacher(&pool, &teacher).await?;
            let students = db::fetch_students(&pool, teacher.id).await?;
            let submissions = db::fetch_teacher_submissions(&pool, teacher.id).await?;
            let standings = report::class_standings(&students, &submissions);

            if standings.is_empty() {
                println!("No active students assigned to {}.", teacher.full_name);
                return Ok(());
            }

            println!("Top students by final grade:");
            for standing in standings.iter().take(limit) {
                println!(
                    "- {} ({}) final {:.2}, standing {:.2} across {} graded submissions",
                    standing.student_name,
                    standing.student_email,
                    standing.summary.final_grade,
                    standing.summary.class_standing,
                    standing.graded_count
                );
            }
        }
        Commands::Timeliness { teacher, json } => {
            let teacher = db::fetch_teacher(&pool, &teacher).await?;
            let items = db::fetch_items(&pool, teacher.id).await?;
            let submissions = db::fetch_teacher_submissions(&pool, teacher.id).await?;
            let expected = timeliness::expected_submissions(&items);
            let records = timeliness::records_from_submissions(&submissions);
            let breakdown = timeliness::classify_submissions(&records, expected);

            if json {
                println!("{}", serde_json::to_string_pretty(&breakdown)?);
                return Ok(());
            }

            println!("Submission timeliness for {}:", teacher.full_name);
            println!(
                "- On time: {} ({:.2}%)",
                breakdown.on_time.count, breakdown.on_time.percentage
            );
            println!(
                "- Late: {} ({:.2}%)",
                breakdown.late.count, breakdown.late.percentage
            );
            println!(
                "- Not submitted: {} ({:.2}%)",
                breakdown.not_submitted.count, breakdown.not_submitted.percentage
            );
            println!("- Expected: {}", breakdown.total);
        }
        Commands::Activity {
            teacher,
            weeks,
            json,
        } => {
            let teacher = db::fetch_teacher(&pool, &teacher).await?;
            let items = db::fetch_items(&pool, teacher.id).await?;
            let events: Vec<ActivityEvent> = items.iter().map(ActivityEvent::from).collect();
            let buckets = activity::bucket_weekly_activity(&events, weeks as usize);

            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
                return Ok(());
            }

            println!("Items created per week for {}:", teacher.full_name);
            for week in &buckets {
                println!(
                    "- {} ({} to {}): {} assignments, {} quizzes, {} exams, {} total",
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
        Commands::Report {
            teacher,
            weeks,
            out,
        } => {
            let teacher = db::fetch_teacher(&pool, &teacher).await?;
            let (students, items, submissions) = tokio::try_join!(
                db::fetch_students(&pool, teacher.id),
                db::fetch_items(&pool, teacher.id),
                db::fetch_teacher_submissions(&pool, teacher.id),
            )?;

            let standings = report::class_standings(&students, &submissions);
            let breakdown = timeliness::classify_submissions(
                &timeliness::records_from_submissions(&submissions),
                timeliness::expected_submissions(&items),
            );
            let events: Vec<ActivityEvent> = items.iter().map(ActivityEvent::from).collect();
            let buckets = activity::bucket_weekly_activity(&events, weeks as usize);

            let report = report::build_report(&teacher, &standings, &breakdown, &buckets);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["gradebook-analytics", "--database-url", "postgres://localhost/test"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    #[test]
    fn weeks_defaults_to_twelve() {
        let cli = parse(&["activity", "--teacher", "t@example.com"]).unwrap();
        match cli.command {
            Commands::Activity { weeks, .. } => assert_eq!(weeks, 12),
            _ => panic!("expected activity command"),
        }
    }

    #[test]
    fn weeks_outside_supported_window_is_rejected() {
        assert!(parse(&["activity", "--teacher", "t@example.com", "--weeks", "0"]).is_err());
        assert!(parse(&["activity", "--teacher", "t@example.com", "--weeks", "521"]).is_err());
        assert!(parse(&["report", "--teacher", "t@example.com", "--weeks", "14000000"]).is_err());
        assert!(parse(&["report", "--teacher", "t@example.com", "--weeks", "520"]).is_ok());
    }
}
