use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use ironlog::{
    models::Workout,
    types::emit,
    utils::{format_minutes, format_weight, plain_len},
};
use serde::Serialize;

use super::{App, position};
use crate::cli::HistoryCmd;

#[derive(Serialize)]
struct WorkoutJson<'a> {
    idx: usize,
    #[serde(flatten)]
    workout: &'a Workout,
}

pub async fn handle(cmd: HistoryCmd, app: &App) -> Result<()> {
    match cmd {
        HistoryCmd::List { limit } => {
            let workouts = app.db.list_workouts().await?;
            let shown = limit.unwrap_or(workouts.len()).min(workouts.len());
            let rows: Vec<WorkoutJson> = workouts[..shown]
                .iter()
                .enumerate()
                .map(|(i, workout)| WorkoutJson { idx: i + 1, workout })
                .collect();

            emit(app.fmt, &rows, || {
                if rows.is_empty() {
                    println!("{}", "  (no workouts yet)".dimmed());
                    return;
                }
                println!("{}", "Workouts:".cyan().bold());

                let idx_w = rows.len().to_string().len();
                let left: Vec<String> = rows
                    .iter()
                    .map(|r| {
                        format!(
                            " {} • {} {}",
                            format!("{:>idx_w$}", r.idx).yellow(),
                            r.workout.name.bold(),
                            r.workout
                                .started_at
                                .with_timezone(&Local)
                                .format("%a %Y-%m-%d %H:%M")
                                .to_string()
                                .dimmed()
                        )
                    })
                    .collect();
                let pad_plain = left.iter().map(|s| plain_len(s)).max().unwrap_or(0);

                for (l, r) in left.iter().zip(&rows) {
                    let pad = pad_plain + (l.len() - plain_len(l));
                    let took = r
                        .workout
                        .duration_minutes
                        .map(format_minutes)
                        .unwrap_or_else(|| "-".into());
                    println!("{:<pad$} {} {}", l, "|".blue(), took.dimmed());
                }
                if shown < workouts.len() {
                    println!(
                        "{}",
                        format!("  … {} older", workouts.len() - shown).dimmed()
                    );
                }
            })?;
        }

        HistoryCmd::Show { workout } => {
            let id = resolve(app, &workout).await?;
            let Some(details) = app.db.workout_details(&id).await? else {
                println!("{} no such workout `{}`", "error:".red().bold(), workout);
                return Ok(());
            };

            let units = app.units().await?;
            emit(app.fmt, &details, || {
                let w = &details.workout;
                println!("{} {}", "Workout:".cyan().bold(), w.name.bold());
                println!(
                    "  {} {}   {} {}",
                    "started".dimmed(),
                    w.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    "took".dimmed(),
                    w.duration_minutes
                        .map(format_minutes)
                        .unwrap_or_else(|| "-".into())
                );
                if let Some(n) = &w.notes {
                    println!("  {}", n.dimmed());
                }

                let mut volume = 0.0;
                let mut sets = 0;
                for (i, ex) in details.exercises.iter().enumerate() {
                    println!("\n {} • {}", format!("{}", i + 1).yellow(), ex.exercise_name.bold());
                    for s in &ex.sets {
                        let mut line = format!(
                            "     {}. {} × {}",
                            s.set_number,
                            format_weight(s.weight, units),
                            s.reps
                        );
                        if let Some(rpe) = s.rpe {
                            line.push_str(&format!("  @RPE {rpe}"));
                        }
                        if s.is_warmup {
                            line.push_str(&format!("  {}", "warm-up".dimmed()));
                        }
                        println!("{line}");
                        volume += s.volume();
                        sets += 1;
                    }
                    if let Some(n) = &ex.notes {
                        println!("     {} {}", "note:".dimmed(), n);
                    }
                }
                println!(
                    "\n{} {} sets, {:.0}{} volume",
                    "Total:".cyan().bold(),
                    sets,
                    volume,
                    units.weight_suffix()
                );
            })?;
        }

        HistoryCmd::Delete { workout } => {
            let id = resolve(app, &workout).await?;
            app.db.delete_workout(&id).await?;
            println!("{} deleted workout `{}`", "ok:".green().bold(), workout);
        }
    }
    Ok(())
}

/// A 1-based index into `history list`, or a workout id.
async fn resolve(app: &App, key: &str) -> Result<String> {
    let key = key.trim();
    match key.parse::<usize>() {
        Ok(idx) => {
            let workouts = app.db.list_workouts().await?;
            let i = position(idx, workouts.len(), "workout")?;
            Ok(workouts[i].id.clone())
        }
        Err(_) => Ok(key.to_string()),
    }
}
