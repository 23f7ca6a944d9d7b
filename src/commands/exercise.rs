use std::{collections::BTreeSet, path::Path};

use anyhow::{Context, Result};
use colored::Colorize;
use ironlog::{
    error::PersistenceError,
    models::{Exercise, ExerciseFilter},
    storage::NewExercise,
    types::{
        ALLOWED_MUSCLES, Difficulty, Equipment, ExerciseDef, ExerciseImport, ExerciseType,
        best_muscle_suggestion, canonical_muscle, emit,
    },
    utils::plain_len,
};
use serde::Serialize;

use super::App;
use crate::cli::ExerciseCmd;

#[derive(Serialize)]
struct ExJson<'a> {
    idx: usize,
    #[serde(flatten)]
    exercise: &'a Exercise,
}

pub async fn handle(cmd: ExerciseCmd, app: &App) -> Result<()> {
    match cmd {
        ExerciseCmd::Add {
            name,
            muscle,
            equipment,
            difficulty,
            exercise_type,
            desc,
            instructions,
            image_url,
            video_url,
        } => {
            if name.trim().is_empty() {
                return Err(ironlog::error::ValidationError::EmptyField { field: "name" }.into());
            }
            let new = NewExercise {
                name: name.trim().to_string(),
                description: desc,
                instructions,
                primary_muscle_group: muscle,
                equipment,
                difficulty,
                exercise_type,
                image_url,
                video_url,
            };

            match app.db.add_exercise(&new).await {
                Ok(_) => println!("{} Exercise \"{}\" added", "info:".blue().bold(), new.name),
                Err(PersistenceError::Duplicate { .. }) => println!(
                    "{} Exercise \"{}\" already exists -- use `ex list` to view all exercises",
                    "warning:".yellow().bold(),
                    new.name
                ),
                Err(e) => return Err(e.into()),
            }
        }

        ExerciseCmd::Import { file } => {
            let path = Path::new(&file);
            let toml_str = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Could not read file: `{}`", file))?;

            let import: ExerciseImport = toml::from_str(&toml_str)
                .context("Failed to parse TOML: Expected `[[exercise]] entries`")?;

            if import.exercise.is_empty() {
                println!(
                    "{}",
                    "warning: no [[exercise]] entries found".yellow().bold()
                );
                return Ok(());
            }

            let mut inserted = 0;
            let mut skipped = 0;
            let mut unknowns: BTreeSet<String> = BTreeSet::new();

            for def in import.exercise {
                if def.name.trim().is_empty() {
                    println!("{} entry without a name skipped", "warning:".yellow().bold());
                    skipped += 1;
                    continue;
                }

                let new = match to_new_exercise(&def) {
                    Ok(new) => new,
                    Err(reason) => {
                        println!(
                            "{} `{}` skipped – {}",
                            "warning:".yellow().bold(),
                            def.name,
                            reason
                        );
                        if canonical_muscle(&def.primary_muscle_group).is_none() {
                            unknowns.insert(def.primary_muscle_group.clone());
                        }
                        skipped += 1;
                        continue;
                    }
                };

                let res = app
                    .db
                    .import_exercise(&new)
                    .await
                    .with_context(|| format!("DB error inserting `{}`", def.name))?;

                if res.is_some() {
                    inserted += 1;
                    println!("{} `{}`", "ok:".green().bold(), def.name);
                } else {
                    skipped += 1;
                    println!("{} `{}` (already exists)", "info:".blue().bold(), def.name);
                }
            }

            println!(
                "\n{} {} inserted, {} skipped",
                "Summary:".cyan().bold(),
                inserted,
                skipped
            );

            if !unknowns.is_empty() {
                let mut allowed: Vec<&str> = ALLOWED_MUSCLES.iter().copied().collect();
                allowed.sort_unstable();
                let bad = unknowns.into_iter().collect::<Vec<_>>().join(", ");

                println!();
                println!("{} {}", "Unknown muscles:".yellow().bold(), bad);
                println!("{} {}", "Allowed muscles:".cyan().bold(), allowed.join(", "));
                println!(
                    "{} Any casing works (e.g. `chest` == `CHEST` == `Chest`)",
                    "Note:".blue().bold()
                )
            }
        }

        ExerciseCmd::List {
            muscle,
            equipment,
            difficulty,
            search,
        } => {
            let filter = ExerciseFilter {
                muscle_group: muscle,
                equipment,
                difficulty,
                search,
            };
            let exercises = app.db.list_exercises(&filter).await?;
            let rows: Vec<ExJson> = exercises
                .iter()
                .enumerate()
                .map(|(i, exercise)| ExJson { idx: i + 1, exercise })
                .collect();

            emit(app.fmt, &rows, || {
                println!("{}", "Exercises:".cyan().bold());

                let idx_w = rows.len().to_string().len();
                let mut left = Vec::<String>::new();
                let mut right = Vec::<String>::new();

                for row in &rows {
                    let ex = row.exercise;
                    let idx_col = format!("{:>width$}", row.idx, width = idx_w).yellow();
                    let desc = match &ex.description {
                        Some(d) if !d.is_empty() => format!("– {}", d).dimmed().to_string(),
                        _ => String::new(),
                    };
                    left.push(format!(
                        " {} • {} ({}) {}",
                        idx_col,
                        ex.name.bold(),
                        ex.primary_muscle_group.to_string().yellow(),
                        desc
                    ));
                    right.push(
                        format!("{}, {}", ex.equipment, ex.difficulty)
                            .dimmed()
                            .to_string(),
                    );
                }

                let printable_pad = left.iter().map(|s| plain_len(s)).max().unwrap_or(0);

                for (l, r) in left.into_iter().zip(right) {
                    let extra_hidden = l.len() - plain_len(&l);
                    let total_pad = printable_pad + extra_hidden;
                    println!("{:<total_pad$} {} {}", l, "|".blue(), r);
                }

                if rows.is_empty() {
                    println!("{}", "  (no exercises found)".dimmed());
                }
            })?;
        }

        ExerciseCmd::Show { exercise } => {
            let key = exercise.join(" ");
            let ex = match app.db.resolve_exercise(&key).await {
                Ok(ex) => ex,
                Err(PersistenceError::NotFound { .. }) => {
                    println!("{} no such exercise `{}`", "error:".red().bold(), key);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            emit(app.fmt, &ex, || {
                println!("{} {}", "Exercise:".cyan().bold(), ex.name.bold());
                let field = |label: &str, value: String| {
                    println!("  {:<13} {}", format!("{label}:").dimmed(), value);
                };
                field("Muscle", ex.primary_muscle_group.to_string().yellow().to_string());
                field("Equipment", ex.equipment.to_string());
                field("Difficulty", ex.difficulty.to_string());
                field("Type", ex.exercise_type.to_string());
                field("Custom", if ex.is_custom { "yes" } else { "no" }.to_string());
                if let Some(d) = &ex.description {
                    field("Description", d.clone());
                }
                if let Some(url) = &ex.image_url {
                    field("Image", url.clone());
                }
                if let Some(url) = &ex.video_url {
                    field("Video", url.clone());
                }
                if let Some(steps) = &ex.instructions {
                    println!("\n{}", "Instructions:".cyan().bold());
                    for line in steps.lines() {
                        println!("  {}", line);
                    }
                }
                println!("  {} {}", "id:".dimmed(), ex.id.dimmed());
            })?;
        }

        ExerciseCmd::Delete { exercise } => {
            let ex = match app.db.resolve_exercise(&exercise).await {
                Ok(ex) => ex,
                Err(PersistenceError::NotFound { .. }) => {
                    println!("{} no such exercise `{}`", "error:".red().bold(), exercise);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            match app.db.delete_exercise(&ex.id).await {
                Ok(()) => println!("{} deleted exercise `{}`", "ok:".green().bold(), ex.name),
                Err(PersistenceError::InUse { .. }) => println!(
                    "{} `{}` appears in logged workouts and can't be deleted",
                    "error:".red().bold(),
                    ex.name
                ),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

/// Validate one `[[exercise]]` entry. The error is a human-readable reason.
fn to_new_exercise(def: &ExerciseDef) -> std::result::Result<NewExercise, String> {
    let muscle = match canonical_muscle(&def.primary_muscle_group) {
        Some(m) => m,
        None => {
            let hint = best_muscle_suggestion(&def.primary_muscle_group)
                .map(|s| format!(" -- did you mean: `{}`?", s.green()))
                .unwrap_or_default();
            return Err(format!(
                "unknown muscle `{}`{}",
                def.primary_muscle_group, hint
            ));
        }
    };

    fn or_default<T: std::str::FromStr<Err = String>>(
        raw: &Option<String>,
        default: T,
    ) -> std::result::Result<T, String> {
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(v) => v.parse(),
        }
    }

    Ok(NewExercise {
        name: def.name.trim().to_string(),
        description: def.description.clone(),
        instructions: def.instructions.clone(),
        primary_muscle_group: muscle,
        equipment: or_default(&def.equipment, Equipment::Other)?,
        difficulty: or_default(&def.difficulty, Difficulty::Beginner)?,
        exercise_type: or_default(&def.exercise_type, ExerciseType::Compound)?,
        image_url: def.image_url.clone(),
        video_url: def.video_url.clone(),
    })
}
