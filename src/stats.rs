//! Derived numbers shown on the dashboard and progress views. All of these are
//! pure functions over lists fetched from storage; none are persisted.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;

use crate::models::{SessionExercise, WeightLog};

/// Trailing window for the body-weight moving average.
pub const MOVING_AVERAGE_WINDOW: usize = 7;
/// A point only gets an average once this many entries are in its window.
pub const MOVING_AVERAGE_MIN_POINTS: usize = 3;

pub fn total_sets(exercises: &[SessionExercise]) -> usize {
    exercises.iter().map(|ex| ex.logged_sets.len()).sum()
}

/// Sum of `weight × reps` over every set that has a weight.
pub fn total_volume(exercises: &[SessionExercise]) -> f64 {
    exercises
        .iter()
        .flat_map(|ex| ex.logged_sets.iter())
        .map(|s| s.volume())
        .sum()
}

/// Consecutive calendar days with at least one workout, counted back from
/// `today`.
///
/// Days are taken in each timestamp's own time zone. If the most recent
/// workout is not on `today` the streak is 0, even when yesterday had one.
pub fn workout_streak<Tz: TimeZone>(started: &[DateTime<Tz>], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = started.iter().map(|d| d.date_naive()).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));

    match days.first() {
        Some(&first) if first == today => {}
        _ => return 0,
    }

    let mut streak = 1;
    let mut reference = today;
    for day in days.into_iter().skip(1) {
        match (reference - day).num_days() {
            0 => continue,
            1 => {
                streak += 1;
                reference = day;
            }
            _ => break,
        }
    }
    streak
}

/// Workouts in the Monday-start week that contains `today`.
pub fn workouts_this_week<Tz: TimeZone>(started: &[DateTime<Tz>], today: NaiveDate) -> usize {
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let week_end = week_start + Duration::days(6);
    started
        .iter()
        .map(|d| d.date_naive())
        .filter(|d| *d >= week_start && *d <= week_end)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightPoint {
    pub logged_at: DateTime<chrono::Utc>,
    pub weight: f64,
    pub moving_average: Option<f64>,
}

/// Weight series in chronological order alongside its trailing 7-entry
/// average, rounded to one decimal.
pub fn moving_average(logs: &[WeightLog]) -> Vec<WeightPoint> {
    let mut sorted: Vec<&WeightLog> = logs.iter().collect();
    sorted.sort_by_key(|l| l.logged_at);

    sorted
        .iter()
        .enumerate()
        .map(|(i, log)| {
            let start = i.saturating_sub(MOVING_AVERAGE_WINDOW - 1);
            let window = &sorted[start..=i];
            let mean = window.iter().map(|l| l.weight).sum::<f64>() / window.len() as f64;

            WeightPoint {
                logged_at: log.logged_at,
                weight: log.weight,
                moving_average: (window.len() >= MOVING_AVERAGE_MIN_POINTS)
                    .then(|| (mean * 10.0).round() / 10.0),
            }
        })
        .collect()
}
