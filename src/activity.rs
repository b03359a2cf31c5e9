use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::models::{ActivityEvent, Category, WeeklyActivity};

pub const DEFAULT_WEEKS: usize = 12;
/// Ten years of weekly buckets.
pub const MAX_WEEKS: usize = 520;

/// Sunday that opens the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

pub fn week_label(start: NaiveDate) -> String {
    start.format("%b %-d").to_string()
}

pub fn bucket_weekly_activity(events: &[ActivityEvent], weeks: usize) -> Vec<WeeklyActivity> {
    bucket_weekly_activity_at(events, weeks, Utc::now())
}

pub fn bucket_weekly_activity_at(
    events: &[ActivityEvent],
    weeks: usize,
    now: DateTime<Utc>,
) -> Vec<WeeklyActivity> {
    let current = week_start(now.date_naive());
    let weeks = weeks.min(MAX_WEEKS);

    let mut buckets: Vec<WeeklyActivity> = (0..weeks)
        .rev()
        .filter_map(|weeks_back| {
            let start = current.checked_sub_signed(Duration::weeks(weeks_back as i64))?;
            Some(WeeklyActivity {
                week_label: week_label(start),
                week_start: start,
                week_end: start + Duration::days(6),
                assignments: 0,
                quizzes: 0,
                exams: 0,
                total: 0,
            })
        })
        .collect();

    let index: HashMap<NaiveDate, usize> = buckets
        .iter()
        .enumerate()
        .map(|(position, bucket)| (bucket.week_start, position))
        .collect();

    for event in events {
        let key = week_start(event.created_at.date_naive());
        let Some(&position) = index.get(&key) else {
            continue;
        };

        let bucket = &mut buckets[position];
        match event.category {
            Category::Assignment => bucket.assignments += 1,
            Category::Quiz => bucket.quizzes += 1,
            Category::Exam => bucket.exams += 1,
        }
        bucket.total += 1;
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    // Wednesday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 11, 14, 30, 0).unwrap()
    }

    fn event(created_at: DateTime<Utc>, category: Category) -> ActivityEvent {
        ActivityEvent {
            created_at,
            category,
        }
    }

    #[test]
    fn output_length_matches_window() {
        for weeks in [0, 1, 4, DEFAULT_WEEKS] {
            assert_eq!(bucket_weekly_activity_at(&[], weeks, now()).len(), weeks);
        }
    }

    #[test]
    fn buckets_run_oldest_to_newest_sunday_to_saturday() {
        let buckets = bucket_weekly_activity_at(&[], 3, now());
        let starts: Vec<NaiveDate> = buckets.iter().map(|b| b.week_start).collect();
        assert_eq!(
            starts,
            vec![
                NaiveDate::from_ymd_opt(2026, 2, 22).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            ]
        );
        for bucket in &buckets {
            assert_eq!(bucket.week_start.weekday(), Weekday::Sun);
            assert_eq!(bucket.week_end.weekday(), Weekday::Sat);
            assert_eq!(bucket.total, 0);
        }
        assert_eq!(buckets[2].week_label, "Mar 8");
    }

    #[test]
    fn sunday_midnight_opens_its_own_week() {
        let boundary = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let just_before = boundary - Duration::seconds(1);
        let events = vec![
            event(boundary, Category::Quiz),
            event(just_before, Category::Exam),
        ];

        let buckets = bucket_weekly_activity_at(&events, 2, now());
        assert_eq!(buckets[1].quizzes, 1);
        assert_eq!(buckets[1].exams, 0);
        assert_eq!(buckets[0].exams, 1);
        assert_eq!(buckets[0].quizzes, 0);
    }

    #[test]
    fn counts_each_category_and_drops_outside_window() {
        let events = vec![
            event(now() - Duration::days(1), Category::Assignment),
            event(now() - Duration::days(2), Category::Assignment),
            event(now() - Duration::days(8), Category::Quiz),
            event(now() - Duration::days(9), Category::Exam),
            event(now() - Duration::days(200), Category::Exam),
            event(now() + Duration::days(30), Category::Quiz),
        ];

        let buckets = bucket_weekly_activity_at(&events, 4, now());
        let newest = &buckets[3];
        assert_eq!(newest.assignments, 2);
        assert_eq!(newest.total, 2);
        let previous = &buckets[2];
        assert_eq!(previous.quizzes, 1);
        assert_eq!(previous.exams, 1);
        assert_eq!(previous.total, 2);
        let total: usize = buckets.iter().map(|b| b.total).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn oversized_window_is_capped() {
        let buckets = bucket_weekly_activity_at(&[], 14_000_000, now());
        assert_eq!(buckets.len(), MAX_WEEKS);
        assert_eq!(buckets[MAX_WEEKS - 1].week_start, week_start(now().date_naive()));

        let capped = bucket_weekly_activity_at(&[], usize::MAX, now());
        assert_eq!(capped, buckets);
    }

    #[test]
    fn week_start_of_sunday_is_itself() {
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(week_start(sunday), sunday);
        let saturday = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(week_start(saturday), sunday);
    }
}
