use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use ironlog::{
    stats::{workout_streak, workouts_this_week},
    types::{Units, emit},
    utils::format_minutes,
};
use serde::Serialize;

use super::App;

#[derive(Serialize)]
struct Dashboard {
    total_workouts: usize,
    workouts_this_week: usize,
    streak_days: u32,
    latest_weight: Option<f64>,
    latest_weight_at: Option<DateTime<Utc>>,
    units: Units,
    last_workout: Option<String>,
    last_workout_minutes: Option<i64>,
    session_active: bool,
}

pub async fn handle(app: &App) -> Result<()> {
    let workouts = app.db.list_workouts().await?;
    let weights = app.db.weight_logs().await?;
    let session_active = app.session_store()?.is_active();
    let units = app.units().await?;

    // Calendar days are the user's, not UTC's.
    let started: Vec<DateTime<Local>> = workouts
        .iter()
        .map(|w| w.started_at.with_timezone(&Local))
        .collect();
    let today = app.clock.now().with_timezone(&Local).date_naive();

    let latest_weight = weights.first();
    let last = workouts.first();
    let dash = Dashboard {
        total_workouts: workouts.len(),
        workouts_this_week: workouts_this_week(&started, today),
        streak_days: workout_streak(&started, today),
        latest_weight: latest_weight.map(|w| w.weight),
        latest_weight_at: latest_weight.map(|w| w.logged_at),
        units,
        last_workout: last.map(|w| w.name.clone()),
        last_workout_minutes: last.and_then(|w| w.duration_minutes),
        session_active,
    };

    emit(app.fmt, &dash, || {
        println!("{}", "Training Status".cyan().bold());
        println!();
        println!("{}: {}", "Total workouts".cyan().bold(), dash.total_workouts);
        println!("{}: {}", "This week".cyan().bold(), dash.workouts_this_week);
        let streak = format!(
            "{} day{}",
            dash.streak_days,
            if dash.streak_days == 1 { "" } else { "s" }
        );
        if dash.streak_days > 0 {
            println!("{}: {}", "Streak".cyan().bold(), streak.green().bold());
        } else {
            println!("{}: {}", "Streak".cyan().bold(), streak.dimmed());
        }
        match (dash.latest_weight, dash.latest_weight_at) {
            (Some(w), Some(at)) => println!(
                "{}: {:.1} {} {}",
                "Weight".cyan().bold(),
                w,
                dash.units.weight_suffix(),
                format!("({})", at.with_timezone(&Local).format("%Y-%m-%d")).dimmed()
            ),
            _ => println!("{}: {}", "Weight".cyan().bold(), "-".dimmed()),
        }
        if let Some(name) = &dash.last_workout {
            let took = dash
                .last_workout_minutes
                .map(|m| format!(" ({})", format_minutes(m)))
                .unwrap_or_default();
            println!("{}: {}{}", "Last workout".cyan().bold(), name, took.dimmed());
        }
        if dash.session_active {
            println!();
            println!(
                "{} a session is in progress -- `session show` to resume",
                "info:".blue().bold()
            );
        }
    })
}
