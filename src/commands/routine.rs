use std::collections::HashMap;

use anyhow::{Context, Result};
use colored::Colorize;
use itertools::Itertools;
use ironlog::{
    error::PersistenceError,
    models::{CreateRoutine, CreateRoutineExercise, Routine},
    storage::RoutineSummary,
    types::{RoutineDef, emit},
    utils::plain_len,
};

use super::App;
use crate::cli::RoutineCmd;

const DEFAULT_SETS: u32 = 3;
const DEFAULT_REPS_MIN: u32 = 8;
const DEFAULT_REPS_MAX: u32 = 12;
const DEFAULT_REST_SECONDS: u32 = 90;

pub async fn handle(cmd: RoutineCmd, app: &App) -> Result<()> {
    match cmd {
        RoutineCmd::Import { files } => {
            if files.is_empty() {
                println!("{} no routine file provided", "warning:".yellow().bold());
            }
            for f in files {
                if let Err(e) = import_single_routine(app, &f).await {
                    match e.downcast_ref::<std::io::Error>() {
                        Some(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                            println!(
                                "{} cannot open file `{}` – file not found",
                                "error:".red().bold(),
                                f
                            );
                        }
                        _ => return Err(e),
                    }
                }
            }
        }

        RoutineCmd::List => {
            let routines = app.db.list_routines().await?;
            emit(app.fmt, &routines, || pretty_print(&routines))?;
        }

        RoutineCmd::Show { routine } => {
            let r = match app.db.resolve_routine(&routine).await {
                Ok(r) => r,
                Err(PersistenceError::NotFound { .. }) => {
                    println!("{} no such routine `{}`", "error:".red().bold(), routine);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            emit(app.fmt, &r, || show(&r))?;
        }

        RoutineCmd::Delete { routine } => {
            let r = match app.db.resolve_routine(&routine).await {
                Ok(r) => r,
                Err(PersistenceError::NotFound { .. }) => {
                    println!("{} no such routine `{}`", "error:".red().bold(), routine);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            app.db.delete_routine(&r.id).await?;
            println!("{} deleted routine `{}`", "ok:".green().bold(), r.name);
        }
    }
    Ok(())
}

async fn import_single_routine(app: &App, file: &str) -> Result<()> {
    let toml_str = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading `{file}`"))?;
    let def: RoutineDef =
        toml::from_str(&toml_str).with_context(|| format!("parsing `{file}`"))?;

    if def.name.trim().is_empty() {
        println!("{} routine in `{}` has no name – skipping", "warning:".yellow().bold(), file);
        return Ok(());
    }
    if def.exercises.is_empty() {
        println!(
            "{} routine `{}` lists no exercises – skipping",
            "warning:".yellow().bold(),
            def.name
        );
        return Ok(());
    }

    let mut ids = HashMap::<String, String>::new();
    let mut missing = Vec::<&str>::new();
    for e in &def.exercises {
        match app.db.exercise_by_name(&e.name).await? {
            Some(ex) => {
                ids.insert(e.name.clone(), ex.id);
            }
            None => missing.push(&e.name),
        }
    }
    if !missing.is_empty() {
        println!(
            "{} cannot import routine `{}` – missing exercises: {}",
            "warning:".yellow().bold(),
            def.name,
            missing.iter().unique().join(", ")
        );
        return Ok(());
    }

    let routine = match to_create_routine(&def, &ids) {
        Ok(r) => r,
        Err(reason) => {
            println!(
                "{} cannot import routine `{}` – {}",
                "warning:".yellow().bold(),
                def.name,
                reason
            );
            return Ok(());
        }
    };

    match app.db.create_routine(&routine).await {
        Ok(_) => println!("{} `{}`", "ok:".green().bold(), routine.name),
        Err(PersistenceError::Duplicate { .. }) => println!(
            "{} routine `{}` already exists – skipping",
            "warning:".yellow().bold(),
            routine.name
        ),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Apply defaults and check rep ranges. `ids` maps every exercise name in
/// `def` to its library id.
fn to_create_routine(
    def: &RoutineDef,
    ids: &HashMap<String, String>,
) -> std::result::Result<CreateRoutine, String> {
    let exercises = def
        .exercises
        .iter()
        .map(|e| {
            let exercise_id = ids
                .get(&e.name)
                .cloned()
                .ok_or_else(|| format!("unknown exercise `{}`", e.name))?;
            let target_sets = e.target_sets.unwrap_or(DEFAULT_SETS);
            if target_sets == 0 {
                return Err(format!("`{}` needs at least one set", e.name));
            }
            let min = e.target_reps_min.unwrap_or(DEFAULT_REPS_MIN);
            let max = e.target_reps_max.unwrap_or(DEFAULT_REPS_MAX.max(min));
            if min > max {
                return Err(format!("`{}` has reps {min}-{max}", e.name));
            }
            Ok(CreateRoutineExercise {
                exercise_id,
                target_sets,
                target_reps_min: Some(min),
                target_reps_max: Some(max),
                rest_period_seconds: e.rest_period_seconds.unwrap_or(DEFAULT_REST_SECONDS),
                notes: e.notes.clone(),
            })
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    Ok(CreateRoutine {
        name: def.name.trim().to_string(),
        description: def.description.clone(),
        exercises,
    })
}

fn pretty_print(routines: &[RoutineSummary]) {
    if routines.is_empty() {
        println!("{}", "  (no routines found)".dimmed());
        return;
    }

    println!("{}", "Routines:".cyan().bold());

    let idx_w = routines
        .iter()
        .map(|r| r.idx.to_string().len())
        .max()
        .unwrap_or(1);
    let mut left = Vec::<String>::new();
    let mut right = Vec::<String>::new();

    for r in routines {
        let idx = format!("{:>width$}", r.idx, width = idx_w).yellow();
        let desc = match &r.description {
            Some(d) if !d.is_empty() => format!("– {}", d).dimmed().to_string(),
            _ => String::new(),
        };
        left.push(format!(" {} • {} {}", idx, r.name.bold(), desc));
        right.push(
            format!(
                "{} exercise{}",
                r.exercises,
                if r.exercises == 1 { "" } else { "s" }
            )
            .dimmed()
            .to_string(),
        );
    }

    let pad_plain = left.iter().map(|s| plain_len(s)).max().unwrap_or(0);
    for (l, r) in left.into_iter().zip(right) {
        let pad = pad_plain + (l.len() - plain_len(&l));
        println!("{:<pad$} {} {}", l, "|".blue(), r, pad = pad);
    }
}

fn show(r: &Routine) {
    println!("{} {}", "Routine:".cyan().bold(), r.name.bold());
    if let Some(d) = &r.description {
        println!("  {}", d.dimmed());
    }
    println!();

    let idx_w = r.exercises.len().to_string().len();
    for (i, re) in r.exercises.iter().enumerate() {
        let connector = if i + 1 == r.exercises.len() {
            "└─"
        } else {
            "├─"
        };
        let reps = match (re.target_reps_min, re.target_reps_max) {
            (Some(a), Some(b)) if a == b => format!("{a}"),
            (Some(a), Some(b)) => format!("{a}-{b}"),
            (Some(a), None) | (None, Some(a)) => format!("{a}"),
            (None, None) => "?".to_string(),
        };
        println!(
            " {} {} • {} {} {}",
            connector,
            format!("{:>width$}", i + 1, width = idx_w).yellow(),
            re.exercise.name.bold(),
            format!("{}×{}", re.target_sets, reps).green(),
            format!("rest {}s", re.rest_period_seconds).dimmed()
        );
        if let Some(n) = &re.notes {
            println!("   {}   {}", " ".repeat(idx_w), n.dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironlog::types::RoutineExerciseDef;

    fn entry(name: &str) -> RoutineExerciseDef {
        RoutineExerciseDef {
            name: name.into(),
            target_sets: None,
            target_reps_min: None,
            target_reps_max: None,
            rest_period_seconds: None,
            notes: None,
        }
    }

    fn ids() -> HashMap<String, String> {
        HashMap::from([
            ("Squat".to_string(), "ex-squat".to_string()),
            ("Row".to_string(), "ex-row".to_string()),
        ])
    }

    #[test]
    fn defaults_fill_missing_targets() {
        let def = RoutineDef {
            name: "  Legs  ".into(),
            description: None,
            exercises: vec![entry("Squat"), entry("Row")],
        };
        let r = to_create_routine(&def, &ids()).unwrap();
        assert_eq!(r.name, "Legs");
        assert_eq!(r.exercises.len(), 2);
        let squat = &r.exercises[0];
        assert_eq!(squat.exercise_id, "ex-squat");
        assert_eq!(squat.target_sets, 3);
        assert_eq!(squat.target_reps_min, Some(8));
        assert_eq!(squat.target_reps_max, Some(12));
        assert_eq!(squat.rest_period_seconds, 90);
    }

    #[test]
    fn high_min_lifts_default_max() {
        let mut e = entry("Squat");
        e.target_reps_min = Some(15);
        let def = RoutineDef {
            name: "Pump".into(),
            description: None,
            exercises: vec![e],
        };
        let r = to_create_routine(&def, &ids()).unwrap();
        assert_eq!(r.exercises[0].target_reps_max, Some(15));
    }

    #[test]
    fn inverted_rep_range_is_rejected() {
        let mut e = entry("Row");
        e.target_reps_min = Some(10);
        e.target_reps_max = Some(5);
        let def = RoutineDef {
            name: "Bad".into(),
            description: None,
            exercises: vec![e],
        };
        assert!(to_create_routine(&def, &ids()).unwrap_err().contains("10-5"));
    }
}
