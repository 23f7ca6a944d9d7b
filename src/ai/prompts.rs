use tracing::debug;

use crate::{
    ai::{
        AiFeature, ExerciseContext, ProfileContext, RoutineContext, UserContext, WorkoutContext,
        WorkoutExerciseContext,
    },
    error::PersistenceError,
    models::ExerciseFilter,
    storage::Database,
};

const RECENT_WORKOUTS_SENT: usize = 5;
const EXERCISES_SENT: usize = 20;

// Upper bounds on what is gathered locally before per-feature trimming.
const RECENT_WORKOUTS_GATHERED: usize = 10;
const EXERCISES_GATHERED: usize = 50;
const ROUTINES_GATHERED: usize = 10;

pub fn system_prompt(feature: AiFeature) -> &'static str {
    match feature {
        AiFeature::RoutineSuggestion => {
            "You are a strength coach. Suggest a concise, practical workout routine that fits the \
             user's experience level and goal. List exercises with sets, reps and rest periods."
        }
        AiFeature::WorkoutAnalysis => {
            "You are a training analyst. Review the user's recent workouts and point out trends, \
             imbalances and concrete next steps. Be brief and specific."
        }
        AiFeature::FormTips => {
            "You are a personal trainer. Give clear technique cues for the exercise the user asks \
             about: setup, execution, common mistakes and breathing."
        }
        AiFeature::GeneralQa => {
            "You are a friendly fitness assistant. Answer training and nutrition questions \
             accurately and concisely. Recommend a professional for medical concerns."
        }
    }
}

/// Render the parts of `ctx` relevant to `feature`. Empty when there is
/// nothing worth sending.
pub fn build_context_prompt(ctx: &UserContext, feature: AiFeature) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(p) = &ctx.profile {
        let mut lines = vec![
            "User Profile:".to_string(),
            format!("- Experience Level: {}", p.experience_level),
            format!("- Primary Goal: {}", p.primary_goal),
        ];
        if let Some(w) = p.current_weight {
            lines.push(format!(
                "- Current Weight: {w} {}",
                p.preferred_units.weight_suffix()
            ));
        }
        if let Some(h) = p.height {
            lines.push(format!("- Height: {h} {}", p.preferred_units.length_suffix()));
        }
        parts.push(lines.join("\n"));
    }

    if !ctx.recent_workouts.is_empty()
        && matches!(feature, AiFeature::WorkoutAnalysis | AiFeature::RoutineSuggestion)
    {
        let summary = ctx
            .recent_workouts
            .iter()
            .take(RECENT_WORKOUTS_SENT)
            .map(|w| format!("{} ({}): {} exercises", w.name, w.date, w.exercises.len()))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("Recent Workouts (last {RECENT_WORKOUTS_SENT}):\n{summary}"));
    }

    if !ctx.routines.is_empty() && feature == AiFeature::RoutineSuggestion {
        let summary = ctx
            .routines
            .iter()
            .map(|r| format!("{}: {}", r.name, r.exercises.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("Existing Routines:\n{summary}"));
    }

    if !ctx.exercises.is_empty() && feature == AiFeature::FormTips {
        let list = ctx
            .exercises
            .iter()
            .take(EXERCISES_SENT)
            .map(|e| format!("{} ({}, {})", e.name, e.muscle_group, e.difficulty))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Available Exercises: {list}"));
    }

    parts.join("\n\n")
}

/// Summarise the local database for the model.
pub async fn load_context(db: &Database) -> Result<UserContext, PersistenceError> {
    let profile = db.profile().await?.map(|p| ProfileContext {
        experience_level: p
            .experience_level
            .map(|e| e.to_string())
            .unwrap_or_else(|| "intermediate".into()),
        primary_goal: p
            .primary_goal
            .map(|g| g.to_string())
            .unwrap_or_else(|| "general_fitness".into()),
        current_weight: p.current_weight,
        height: p.height,
        preferred_units: p.preferred_units,
    });

    let mut recent_workouts = Vec::new();
    for w in db
        .list_workouts()
        .await?
        .into_iter()
        .take(RECENT_WORKOUTS_GATHERED)
    {
        let Some(details) = db.workout_details(&w.id).await? else {
            continue;
        };
        recent_workouts.push(WorkoutContext {
            name: w.name,
            date: w.started_at.date_naive().to_string(),
            exercises: details
                .exercises
                .into_iter()
                .map(|e| WorkoutExerciseContext {
                    name: e.exercise_name,
                    sets: e.sets.len(),
                    reps: e.sets.iter().map(|s| s.reps).sum(),
                })
                .collect(),
        });
    }

    let exercises = db
        .list_exercises(&ExerciseFilter::default())
        .await?
        .into_iter()
        .take(EXERCISES_GATHERED)
        .map(|e| ExerciseContext {
            name: e.name,
            muscle_group: e.primary_muscle_group.to_string(),
            difficulty: e.difficulty.to_string(),
        })
        .collect();

    let mut routines = Vec::new();
    for summary in db.list_routines().await?.into_iter().take(ROUTINES_GATHERED) {
        if let Some(r) = db.routine(&summary.id).await? {
            routines.push(RoutineContext {
                name: r.name,
                exercises: r.exercises.into_iter().map(|e| e.exercise.name).collect(),
            });
        }
    }

    debug!(
        workouts = recent_workouts.len(),
        routines = routines.len(),
        "chat context gathered"
    );
    Ok(UserContext {
        profile,
        recent_workouts,
        exercises,
        routines,
    })
}
