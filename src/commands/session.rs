use std::io::Write;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use ironlog::{
    error::ValidationError,
    types::Units,
    models::{SessionExercise, SetPatch},
    session::{
        SessionStore, SetLogger, complete_workout,
        rest_timer::{self, TICK, format_remaining},
    },
    utils::{format_duration, format_minutes, format_weight, pad},
};

use super::{App, position};
use crate::cli::SessionCmd;

pub async fn handle(cmd: SessionCmd, app: &App) -> Result<()> {
    let mut store = app.session_store()?;

    match cmd {
        SessionCmd::Start {
            routine,
            name,
            exercises,
        } => {
            if store.is_active() {
                println!(
                    "{} a session is already running: `{}` -- finish it with `session complete` or drop it with `session cancel`",
                    "warning:".yellow().bold(),
                    store.session().name
                );
                return Ok(());
            }

            let (routine_id, default_name, planned) = match routine {
                Some(key) => {
                    let r = app.db.resolve_routine(&key).await?;
                    if r.exercises.is_empty() {
                        bail!("routine `{}` has no exercises", r.name);
                    }
                    let planned: Vec<SessionExercise> = r
                        .exercises
                        .iter()
                        .map(|re| SessionExercise::new(re.exercise.to_ref(), re.order_index))
                        .collect();
                    (Some(r.id), r.name, planned)
                }
                None => {
                    let mut planned = Vec::with_capacity(exercises.len());
                    for (i, key) in exercises.iter().enumerate() {
                        let ex = app
                            .db
                            .resolve_exercise(key)
                            .await
                            .with_context(|| format!("Unknown exercise `{key}`"))?;
                        planned.push(SessionExercise::new(ex.to_ref(), i as u32));
                    }
                    (None, "Workout".to_string(), planned)
                }
            };

            let name = name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or(default_name);
            let count = planned.len();
            store.start_session(routine_id, &name, planned)?;

            println!(
                "{} started `{}` with {} exercise{}",
                "ok:".green().bold(),
                name.bold(),
                count,
                if count == 1 { "" } else { "s" }
            );
            print_current(&store);
        }

        SessionCmd::Show => {
            require_active(&store)?;
            show(&store, app, app.units().await?)?;
        }

        SessionCmd::Log {
            weight,
            reps,
            exercise,
            rpe,
            warmup,
            rest,
        } => {
            require_active(&store)?;
            let idx = match exercise {
                Some(i) => position(i, store.session().exercises.len(), "exercise")?,
                None => store.session().current_exercise_index,
            };

            let mut logger = SetLogger::new(rest.unwrap_or(app.settings.rest_seconds));
            logger.weight = weight;
            logger.reps = reps;
            logger.rpe = rpe.unwrap_or_default();
            logger.is_warmup = warmup;
            let set = logger.submit(&mut store, idx)?;
            let units = app.units().await?;

            let ex_name = &store.session().exercises[idx].exercise_ref.name;
            println!(
                "{} {} set {}: {} × {}{}",
                "ok:".green().bold(),
                ex_name.bold(),
                set.set_number,
                format_weight(set.weight, units),
                set.reps,
                set.rpe
                    .map(|r| format!(" @RPE {r}").dimmed().to_string())
                    .unwrap_or_default()
            );
            println!(
                "{} rest {} -- `session timer` to watch it",
                "info:".blue().bold(),
                format_remaining(u64::from(logger.rest_seconds()))
            );
        }

        SessionCmd::Edit {
            exercise,
            set,
            weight,
            reps,
            rpe,
            warmup,
        } => {
            require_active(&store)?;
            let (ex_idx, set_idx) = set_position(&store, exercise, set)?;

            let patch = SetPatch {
                set_number: None,
                weight: weight
                    .as_deref()
                    .map(ironlog::session::set_logger::parse_weight)
                    .transpose()?,
                reps: reps
                    .as_deref()
                    .map(ironlog::session::set_logger::parse_reps)
                    .transpose()?,
                rpe: rpe
                    .as_deref()
                    .map(ironlog::session::set_logger::parse_rpe)
                    .transpose()?,
                is_warmup: warmup,
            };
            if patch == SetPatch::default() {
                println!("{} nothing to change", "info:".blue().bold());
                return Ok(());
            }
            store.update_set(ex_idx, set_idx, &patch)?;
            println!("{} set {} of exercise {} updated", "ok:".green().bold(), set, exercise);
        }

        SessionCmd::Remove { exercise, set } => {
            require_active(&store)?;
            let (ex_idx, set_idx) = set_position(&store, exercise, set)?;
            store.remove_set(ex_idx, set_idx)?;
            println!("{} removed set {} of exercise {}", "ok:".green().bold(), set, exercise);
        }

        SessionCmd::Note { exercise, note } => {
            require_active(&store)?;
            let idx = position(exercise, store.session().exercises.len(), "exercise")?;
            let cleared = note.trim().is_empty();
            store.set_notes(idx, Some(note))?;
            if cleared {
                println!("{} note cleared", "ok:".green().bold());
            } else {
                println!("{} note saved", "ok:".green().bold());
            }
        }

        SessionCmd::Goto { exercise } => {
            require_active(&store)?;
            let idx = position(exercise, store.session().exercises.len(), "exercise")?;
            store.set_current_exercise(idx)?;
            print_current(&store);
        }

        SessionCmd::Next => step(&mut store, true)?,

        SessionCmd::Prev => step(&mut store, false)?,

        SessionCmd::Rest { seconds, clear } => {
            require_active(&store)?;
            if clear {
                store.clear_rest_timer()?;
                println!("{} rest timer cleared", "ok:".green().bold());
            } else {
                let secs = seconds.unwrap_or(app.settings.rest_seconds);
                if secs == 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "seconds",
                        reason: "rest must be at least one second".into(),
                    }
                    .into());
                }
                store.start_rest_timer(secs)?;
                println!(
                    "{} rest {} started",
                    "ok:".green().bold(),
                    format_remaining(u64::from(secs))
                );
            }
        }

        SessionCmd::Timer => {
            let Some(deadline) = store.session().rest_timer_deadline else {
                println!("{} no rest timer running", "info:".blue().bold());
                return Ok(());
            };
            let clock = app.clock.clone();
            rest_timer::run(deadline, clock.as_ref(), TICK, |tick| {
                print!("\r{} {}  ", "Rest:".cyan().bold(), format_remaining(tick.remaining));
                let _ = std::io::stdout().flush();
                if tick.completed {
                    println!("\r{} rest over, next set!\x07", "ok:".green().bold());
                }
            })
            .await;
        }

        SessionCmd::Complete => {
            let stats = complete_workout(&mut store, &app.db).await?;
            let units = app.units().await?;
            ironlog::types::emit(app.fmt, &stats, || {
                println!("{} workout saved", "ok:".green().bold());
                println!(
                    "  {} {}   {} {}   {} {}   {} {:.0}{}",
                    "Duration:".dimmed(),
                    format_minutes(stats.duration_minutes),
                    "Exercises:".dimmed(),
                    stats.exercises_recorded,
                    "Sets:".dimmed(),
                    stats.total_sets,
                    "Volume:".dimmed(),
                    stats.total_volume,
                    units.weight_suffix()
                );
            })?;
        }

        SessionCmd::Cancel => {
            if !store.is_active() {
                println!("{} no active session", "info:".blue().bold());
                return Ok(());
            }
            let name = store.session().name.clone();
            store.reset()?;
            println!("{} session `{}` discarded", "ok:".green().bold(), name);
        }
    }

    Ok(())
}

fn require_active(store: &SessionStore) -> Result<()> {
    if !store.is_active() {
        return Err(ValidationError::NoActiveSession.into());
    }
    Ok(())
}

fn set_position(store: &SessionStore, exercise: usize, set: usize) -> Result<(usize, usize)> {
    let exercises = &store.session().exercises;
    let ex_idx = position(exercise, exercises.len(), "exercise")?;
    let set_idx = position(set, exercises[ex_idx].logged_sets.len(), "set")?;
    Ok((ex_idx, set_idx))
}

fn step(store: &mut SessionStore, forward: bool) -> Result<()> {
    require_active(store)?;
    let len = store.session().exercises.len();
    let cur = store.session().current_exercise_index;
    let target = if forward {
        (cur + 1 < len).then_some(cur + 1)
    } else {
        cur.checked_sub(1)
    };
    match target {
        Some(idx) => {
            store.set_current_exercise(idx)?;
            print_current(store);
        }
        None => println!(
            "{} already at the {} exercise",
            "info:".blue().bold(),
            if forward { "last" } else { "first" }
        ),
    }
    Ok(())
}

fn print_current(store: &SessionStore) {
    let s = store.session();
    if let Some(ex) = store.current_exercise() {
        println!(
            "{} {}/{} {} ({})",
            "Now:".cyan().bold(),
            s.current_exercise_index + 1,
            s.exercises.len(),
            ex.exercise_ref.name.bold(),
            ex.exercise_ref.primary_muscle_group.to_string().yellow()
        );
    }
}

fn show(store: &SessionStore, app: &App, units: Units) -> Result<()> {
    let s = store.session();
    ironlog::types::emit(app.fmt, s, || {
        let now = app.clock.now();
        let elapsed = s
            .started_at
            .map(|t| now - t)
            .unwrap_or_else(chrono::Duration::zero);

        println!(
            "{} {} (started {}, elapsed {})",
            "Session:".cyan().bold(),
            s.name.bold(),
            s.started_at
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            format_duration(elapsed)
        );
        if let Some(deadline) = s.rest_timer_deadline {
            let left = rest_timer::remaining_seconds(deadline, now);
            if left > 0 {
                println!("{} {}", "Rest:".cyan().bold(), format_remaining(left));
            } else {
                println!("{} {}", "Rest:".cyan().bold(), "done".green());
            }
        }

        println!("\n{}", "Exercises:".cyan().bold());
        let idx_w = s.exercises.len().to_string().len();
        let name_w = s
            .exercises
            .iter()
            .map(|e| e.exercise_ref.name.chars().count())
            .max()
            .unwrap_or(0);

        for (i, ex) in s.exercises.iter().enumerate() {
            let marker = if i == s.current_exercise_index {
                "▶".green().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "{} {} • {} {}",
                marker,
                format!("{:>idx_w$}", i + 1).yellow(),
                pad(&ex.exercise_ref.name.bold().to_string(), name_w),
                format!("({} sets)", ex.logged_sets.len()).dimmed()
            );
            for (n, set) in ex.logged_sets.iter().enumerate() {
                let mut line = format!(
                    "{:>w$}  {}. {} × {}",
                    "",
                    n + 1,
                    format_weight(set.weight, units),
                    set.reps,
                    w = idx_w + 3
                );
                if let Some(r) = set.rpe {
                    line.push_str(&format!("  @RPE {r}"));
                }
                if set.is_warmup {
                    line.push_str(&format!("  {}", "warm-up".dimmed()));
                }
                if n + 1 != set.set_number as usize {
                    line.push_str(&format!("  {}", format!("(set #{})", set.set_number).dimmed()));
                }
                println!("{line}");
            }
            if let Some(note) = &ex.notes {
                println!("{:>w$}  {} {}", "", "note:".dimmed(), note, w = idx_w + 3);
            }
        }

        let sets = ironlog::stats::total_sets(&s.exercises);
        let volume = ironlog::stats::total_volume(&s.exercises);
        println!(
            "\n{} {} sets, {:.0}{} volume",
            "Total:".cyan().bold(),
            sets,
            volume,
            units.weight_suffix()
        );
    })
}
