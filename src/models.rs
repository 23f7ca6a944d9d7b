use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Difficulty, Equipment, ExerciseType, ExperienceLevel, Gender, MuscleGroup, PrimaryGoal, Units,
};

/// The in-progress workout. Lives in the key/value store until it is either
/// committed to the database or abandoned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub routine_id: Option<String>,
    pub name: String,
    /// Set once when the session begins. `Some` iff the session is active.
    pub started_at: Option<DateTime<Utc>>,
    pub exercises: Vec<SessionExercise>,
    pub current_exercise_index: usize,
    pub rest_timer_deadline: Option<DateTime<Utc>>,
}

impl WorkoutSession {
    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub exercise_ref: ExerciseRef,
    pub order_index: u32,
    pub logged_sets: Vec<LoggedSet>,
    pub notes: Option<String>,
}

impl SessionExercise {
    pub fn new(exercise_ref: ExerciseRef, order_index: u32) -> Self {
        Self {
            exercise_ref,
            order_index,
            logged_sets: Vec::new(),
            notes: None,
        }
    }
}

/// Read-only reference data copied out of the exercise library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRef {
    pub id: String,
    pub name: String,
    pub primary_muscle_group: MuscleGroup,
    pub equipment: Equipment,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
    /// 1-based; assigned at append time and never renumbered.
    pub set_number: u32,
    /// `None` means bodyweight.
    pub weight: Option<f64>,
    pub reps: u32,
    pub rpe: Option<f32>,
    #[serde(default)]
    pub is_warmup: bool,
}

impl LoggedSet {
    pub fn volume(&self) -> f64 {
        self.weight.map(|w| w * self.reps as f64).unwrap_or(0.0)
    }
}

/// Partial update merged into an existing [`LoggedSet`]. `Some(None)` clears
/// an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetPatch {
    pub set_number: Option<u32>,
    pub weight: Option<Option<f64>>,
    pub reps: Option<u32>,
    pub rpe: Option<Option<f32>>,
    pub is_warmup: Option<bool>,
}

impl SetPatch {
    pub fn apply(&self, set: &mut LoggedSet) {
        if let Some(n) = self.set_number {
            set.set_number = n;
        }
        if let Some(w) = self.weight {
            set.weight = w;
        }
        if let Some(r) = self.reps {
            set.reps = r;
        }
        if let Some(r) = self.rpe {
            set.rpe = r;
        }
        if let Some(w) = self.is_warmup {
            set.is_warmup = w;
        }
    }
}

//
// Persistence payloads and records
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkout {
    pub routine_id: Option<String>,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub exercises: Vec<CreateWorkoutExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkoutExercise {
    pub exercise_id: String,
    pub order_index: u32,
    pub notes: Option<String>,
    pub sets: Vec<LoggedSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub routine_id: Option<String>,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutDetails {
    #[serde(flatten)]
    pub workout: Workout,
    pub exercises: Vec<WorkoutExerciseDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutExerciseDetails {
    pub exercise_id: String,
    pub exercise_name: String,
    pub order_index: u32,
    pub notes: Option<String>,
    pub sets: Vec<LoggedSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLog {
    pub id: String,
    pub weight: f64,
    pub logged_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub primary_muscle_group: MuscleGroup,
    pub equipment: Equipment,
    pub difficulty: Difficulty,
    pub exercise_type: ExerciseType,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub is_custom: bool,
}

impl Exercise {
    pub fn to_ref(&self) -> ExerciseRef {
        ExerciseRef {
            id: self.id.clone(),
            name: self.name.clone(),
            primary_muscle_group: self.primary_muscle_group,
            equipment: self.equipment,
            image_url: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseFilter {
    pub muscle_group: Option<MuscleGroup>,
    pub equipment: Option<Equipment>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Routine {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub exercises: Vec<RoutineExercise>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutineExercise {
    pub exercise: Exercise,
    pub order_index: u32,
    pub target_sets: u32,
    pub target_reps_min: Option<u32>,
    pub target_reps_max: Option<u32>,
    pub rest_period_seconds: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateRoutine {
    pub name: String,
    pub description: Option<String>,
    pub exercises: Vec<CreateRoutineExercise>,
}

#[derive(Debug, Clone)]
pub struct CreateRoutineExercise {
    pub exercise_id: String,
    pub target_sets: u32,
    pub target_reps_min: Option<u32>,
    pub target_reps_max: Option<u32>,
    pub rest_period_seconds: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub gender: Option<Gender>,
    pub current_weight: Option<f64>,
    pub height: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub target_weight: Option<f64>,
    pub experience_level: Option<ExperienceLevel>,
    pub primary_goal: Option<PrimaryGoal>,
    pub preferred_units: Units,
    pub onboarding_completed: bool,
}
