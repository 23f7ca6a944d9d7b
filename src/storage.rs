//! Everything that lives in SQLite: the exercise library, routines, finished
//! workouts, body-weight logs and the user profile.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::PersistenceError,
    models::{
        CreateRoutine, CreateWorkout, Exercise, ExerciseFilter, LoggedSet, Profile, Routine,
        RoutineExercise, WeightLog, Workout, WorkoutDetails, WorkoutExerciseDetails,
    },
    types::{Difficulty, Equipment, ExerciseType, MuscleGroup},
};

type Result<T> = std::result::Result<T, PersistenceError>;

/// Persistence collaborator for the completion flow.
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    /// Store the workout with all of its exercises and sets as one unit.
    async fn create_workout_record(
        &self,
        payload: &CreateWorkout,
        completed_at: DateTime<Utc>,
    ) -> Result<Workout>;
}

#[derive(Debug, Clone)]
pub struct NewExercise {
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub primary_muscle_group: MuscleGroup,
    pub equipment: Equipment,
    pub difficulty: Difficulty,
    pub exercise_type: ExerciseType,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutineSummary {
    pub idx: i64,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub exercises: i64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

pub fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(table: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt {
            table,
            reason: format!("bad timestamp `{raw}`: {e}"),
        })
}

fn parse_text<T: FromStr<Err = String>>(table: &'static str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|reason| PersistenceError::Corrupt { table, reason })
}

fn parse_opt_text<T: FromStr<Err = String>>(
    table: &'static str,
    raw: Option<String>,
) -> Result<Option<T>> {
    raw.map(|r| parse_text(table, &r)).transpose()
}

fn to_u32(table: &'static str, v: i64) -> Result<u32> {
    u32::try_from(v).map_err(|_| PersistenceError::Corrupt {
        table,
        reason: format!("value {v} out of range"),
    })
}

fn exercise_from_row(r: &SqliteRow) -> Result<Exercise> {
    Ok(Exercise {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        description: r.try_get("description")?,
        instructions: r.try_get("instructions")?,
        primary_muscle_group: parse_text("exercises", r.try_get("primary_muscle_group")?)?,
        equipment: parse_text("exercises", r.try_get("equipment")?)?,
        difficulty: parse_text("exercises", r.try_get("difficulty")?)?,
        exercise_type: parse_text("exercises", r.try_get("exercise_type")?)?,
        image_url: r.try_get("image_url")?,
        video_url: r.try_get("video_url")?,
        is_custom: r.try_get("is_custom")?,
    })
}

fn workout_from_row(r: &SqliteRow) -> Result<Workout> {
    let completed: Option<String> = r.try_get("completed_at")?;
    Ok(Workout {
        id: r.try_get("id")?,
        routine_id: r.try_get("routine_id")?,
        name: r.try_get("name")?,
        started_at: parse_ts("workouts", r.try_get("started_at")?)?,
        completed_at: completed
            .map(|c| parse_ts("workouts", &c))
            .transpose()?,
        duration_minutes: r.try_get("duration_minutes")?,
        notes: r.try_get("notes")?,
    })
}

fn weight_from_row(r: &SqliteRow) -> Result<WeightLog> {
    Ok(WeightLog {
        id: r.try_get("id")?,
        weight: r.try_get("weight")?,
        logged_at: parse_ts("weight_logs", r.try_get("logged_at")?)?,
        notes: r.try_get("notes")?,
    })
}

const EXERCISE_COLUMNS: &str = "e.id, e.name, e.description, e.instructions, e.primary_muscle_group, \
     e.equipment, e.difficulty, e.exercise_type, e.image_url, e.video_url, e.is_custom";

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /* ───────────────────────────── exercises ───────────────────────────── */

    pub async fn add_exercise(&self, new: &NewExercise) -> Result<Exercise> {
        self.insert_exercise(new, false)
            .await?
            .ok_or_else(|| PersistenceError::Duplicate {
                kind: "exercise",
                name: new.name.clone(),
            })
    }

    /// Insert unless an exercise with the same name exists. Returns `None`
    /// when it was skipped.
    pub async fn import_exercise(&self, new: &NewExercise) -> Result<Option<Exercise>> {
        self.insert_exercise(new, true).await
    }

    async fn insert_exercise(&self, new: &NewExercise, or_ignore: bool) -> Result<Option<Exercise>> {
        let id = Uuid::new_v4().to_string();
        let verb = if or_ignore { "INSERT OR IGNORE" } else { "INSERT" };
        let q = format!(
            r#"
            {verb} INTO exercises
              (id, name, description, instructions, primary_muscle_group, equipment,
               difficulty, exercise_type, image_url, video_url, is_custom, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11)
            "#
        );

        let res = sqlx::query(&q)
            .bind(&id)
            .bind(new.name.trim())
            .bind(&new.description)
            .bind(&new.instructions)
            .bind(new.primary_muscle_group.as_str())
            .bind(new.equipment.as_str())
            .bind(new.difficulty.as_str())
            .bind(new.exercise_type.as_str())
            .bind(&new.image_url)
            .bind(&new.video_url)
            .bind(ts(Utc::now()))
            .execute(&self.pool)
            .await;

        match res {
            Ok(info) if info.rows_affected() == 1 => {
                debug!(name = %new.name, "exercise added");
                self.exercise_by_id(&id).await
            }
            Ok(_) => Ok(None),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(PersistenceError::Duplicate {
                    kind: "exercise",
                    name: new.name.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Library ordered by name; the 1-based position in this list is the
    /// index shown to the user.
    pub async fn list_exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>> {
        let q = format!(
            r#"
            SELECT {EXERCISE_COLUMNS}
            FROM exercises e
            WHERE (?1 IS NULL OR e.primary_muscle_group = ?1)
              AND (?2 IS NULL OR e.equipment = ?2)
              AND (?3 IS NULL OR e.difficulty = ?3)
              AND (?4 IS NULL OR e.name LIKE '%' || ?4 || '%')
            ORDER BY e.name COLLATE NOCASE
            "#
        );

        let rows = sqlx::query(&q)
            .bind(filter.muscle_group.map(|m| m.as_str()))
            .bind(filter.equipment.map(|e| e.as_str()))
            .bind(filter.difficulty.map(|d| d.as_str()))
            .bind(filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(exercise_from_row).collect()
    }

    pub async fn exercise_by_id(&self, id: &str) -> Result<Option<Exercise>> {
        let q = format!("SELECT {EXERCISE_COLUMNS} FROM exercises e WHERE e.id = ?");
        sqlx::query(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(exercise_from_row)
            .transpose()
    }

    pub async fn exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let q = format!("SELECT {EXERCISE_COLUMNS} FROM exercises e WHERE e.name = ? COLLATE NOCASE");
        sqlx::query(&q)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(exercise_from_row)
            .transpose()
    }

    /// Look an exercise up by list index, id, or name.
    pub async fn resolve_exercise(&self, key: &str) -> Result<Exercise> {
        let key = key.trim();
        if let Ok(idx) = key.parse::<usize>() {
            let all = self.list_exercises(&ExerciseFilter::default()).await?;
            return idx
                .checked_sub(1)
                .and_then(|i| all.into_iter().nth(i))
                .ok_or_else(|| PersistenceError::NotFound {
                    kind: "exercise",
                    id: key.to_string(),
                });
        }
        if let Some(ex) = self.exercise_by_id(key).await? {
            return Ok(ex);
        }
        self.exercise_by_name(key)
            .await?
            .ok_or_else(|| PersistenceError::NotFound {
                kind: "exercise",
                id: key.to_string(),
            })
    }

    /// Refuses to delete an exercise that appears in workout history.
    pub async fn delete_exercise(&self, id: &str) -> Result<()> {
        let res = sqlx::query("DELETE FROM exercises WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await;

        match res {
            Ok(info) if info.rows_affected() == 0 => Err(PersistenceError::NotFound {
                kind: "exercise",
                id: id.to_string(),
            }),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(PersistenceError::InUse {
                    kind: "exercise",
                    name: id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /* ───────────────────────────── routines ───────────────────────────── */

    /// Routine row plus all of its exercises, in one transaction.
    /// `order_index` is assigned 0.. in the order given.
    pub async fn create_routine(&self, routine: &CreateRoutine) -> Result<String> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4().to_string();
        let now = ts(Utc::now());

        let res = sqlx::query(
            "INSERT INTO routines (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(routine.name.trim())
        .bind(&routine.description)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &res {
            if db_err.is_unique_violation() {
                return Err(PersistenceError::Duplicate {
                    kind: "routine",
                    name: routine.name.clone(),
                });
            }
        }
        res?;

        for (order_index, ex) in routine.exercises.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO routine_exercises
                  (id, routine_id, exercise_id, order_index, target_sets,
                   target_reps_min, target_reps_max, rest_period_seconds, notes)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(&ex.exercise_id)
            .bind(order_index as i64)
            .bind(ex.target_sets)
            .bind(ex.target_reps_min)
            .bind(ex.target_reps_max)
            .bind(ex.rest_period_seconds)
            .bind(&ex.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(routine = %routine.name, exercises = routine.exercises.len(), "routine created");
        Ok(id)
    }

    pub async fn list_routines(&self) -> Result<Vec<RoutineSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT ROW_NUMBER() OVER (ORDER BY r.name) AS idx,
                   r.id, r.name, r.description,
                   (SELECT COUNT(*) FROM routine_exercises re WHERE re.routine_id = r.id) AS exercises
            FROM routines r
            ORDER BY r.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(RoutineSummary {
                    idx: r.try_get("idx")?,
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    description: r.try_get("description")?,
                    exercises: r.try_get("exercises")?,
                })
            })
            .collect()
    }

    pub async fn routine(&self, id: &str) -> Result<Option<Routine>> {
        let Some(head) = sqlx::query("SELECT id, name, description FROM routines WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let q = format!(
            r#"
            SELECT {EXERCISE_COLUMNS},
                   re.order_index, re.target_sets, re.target_reps_min, re.target_reps_max,
                   re.rest_period_seconds, re.notes AS re_notes
            FROM routine_exercises re
            JOIN exercises e ON e.id = re.exercise_id
            WHERE re.routine_id = ?
            ORDER BY re.order_index
            "#
        );
        let rows = sqlx::query(&q).bind(id).fetch_all(&self.pool).await?;

        let exercises = rows
            .iter()
            .map(|r| {
                let reps_min: Option<i64> = r.try_get("target_reps_min")?;
                let reps_max: Option<i64> = r.try_get("target_reps_max")?;
                Ok(RoutineExercise {
                    exercise: exercise_from_row(r)?,
                    order_index: to_u32("routine_exercises", r.try_get("order_index")?)?,
                    target_sets: to_u32("routine_exercises", r.try_get("target_sets")?)?,
                    target_reps_min: reps_min.map(|v| to_u32("routine_exercises", v)).transpose()?,
                    target_reps_max: reps_max.map(|v| to_u32("routine_exercises", v)).transpose()?,
                    rest_period_seconds: to_u32(
                        "routine_exercises",
                        r.try_get("rest_period_seconds")?,
                    )?,
                    notes: r.try_get("re_notes")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Routine {
            id: head.try_get("id")?,
            name: head.try_get("name")?,
            description: head.try_get("description")?,
            exercises,
        }))
    }

    /// Look a routine up by list index, id, or exact name.
    pub async fn resolve_routine(&self, key: &str) -> Result<Routine> {
        let key = key.trim();
        let id: Option<String> = if let Ok(idx) = key.parse::<i64>() {
            sqlx::query_scalar(
                r#"
                SELECT id
                FROM (
                  SELECT id, ROW_NUMBER() OVER (ORDER BY name) AS rn
                  FROM routines
                ) t
                WHERE t.rn = ?
                "#,
            )
            .bind(idx)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT id FROM routines WHERE id = ?1 OR name = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?
        };

        let not_found = || PersistenceError::NotFound {
            kind: "routine",
            id: key.to_string(),
        };
        match id {
            Some(id) => self.routine(&id).await?.ok_or_else(not_found),
            None => Err(not_found()),
        }
    }

    pub async fn delete_routine(&self, id: &str) -> Result<()> {
        let info = sqlx::query("DELETE FROM routines WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if info.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                kind: "routine",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /* ───────────────────────────── workouts ───────────────────────────── */

    /// Newest first.
    pub async fn list_workouts(&self) -> Result<Vec<Workout>> {
        let rows = sqlx::query(
            r#"
            SELECT id, routine_id, name, started_at, completed_at, duration_minutes, notes
            FROM workouts
            ORDER BY started_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(workout_from_row).collect()
    }

    pub async fn workout_details(&self, id: &str) -> Result<Option<WorkoutDetails>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, routine_id, name, started_at, completed_at, duration_minutes, notes
            FROM workouts WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let workout = workout_from_row(&row)?;

        let rows = sqlx::query(
            r#"
            SELECT we.id AS we_id, we.exercise_id, e.name AS exercise_name, we.order_index, we.notes,
                   ws.set_number, ws.weight, ws.reps, ws.rpe, ws.is_warmup
            FROM workout_exercises we
            JOIN exercises e ON e.id = we.exercise_id
            LEFT JOIN workout_sets ws ON ws.workout_exercise_id = we.id
            WHERE we.workout_id = ?
            ORDER BY we.order_index, ws.rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut exercises: Vec<(String, WorkoutExerciseDetails)> = Vec::new();
        for r in &rows {
            let we_id: String = r.try_get("we_id")?;
            if exercises.last().map(|(id, _)| id != &we_id).unwrap_or(true) {
                exercises.push((
                    we_id.clone(),
                    WorkoutExerciseDetails {
                        exercise_id: r.try_get("exercise_id")?,
                        exercise_name: r.try_get("exercise_name")?,
                        order_index: to_u32("workout_exercises", r.try_get("order_index")?)?,
                        notes: r.try_get("notes")?,
                        sets: Vec::new(),
                    },
                ));
            }

            let set_number: Option<i64> = r.try_get("set_number")?;
            if let (Some(set_number), Some((_, current))) = (set_number, exercises.last_mut()) {
                let rpe: Option<f64> = r.try_get("rpe")?;
                current.sets.push(LoggedSet {
                    set_number: to_u32("workout_sets", set_number)?,
                    weight: r.try_get("weight")?,
                    reps: to_u32("workout_sets", r.try_get("reps")?)?,
                    rpe: rpe.map(|v| v as f32),
                    is_warmup: r.try_get("is_warmup")?,
                });
            }
        }

        Ok(Some(WorkoutDetails {
            workout,
            exercises: exercises.into_iter().map(|(_, ex)| ex).collect(),
        }))
    }

    /// Removes the workout together with its exercises and sets.
    pub async fn delete_workout(&self, id: &str) -> Result<()> {
        let info = sqlx::query("DELETE FROM workouts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if info.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                kind: "workout",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /* ───────────────────────────── weight ───────────────────────────── */

    pub async fn add_weight_log(
        &self,
        weight: f64,
        logged_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<WeightLog> {
        let log = WeightLog {
            id: Uuid::new_v4().to_string(),
            weight,
            logged_at,
            notes,
        };
        sqlx::query(
            "INSERT INTO weight_logs (id, weight, logged_at, notes, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&log.id)
        .bind(log.weight)
        .bind(ts(log.logged_at))
        .bind(&log.notes)
        .bind(ts(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(log)
    }

    /// Newest first.
    pub async fn weight_logs(&self) -> Result<Vec<WeightLog>> {
        let rows = sqlx::query(
            "SELECT id, weight, logged_at, notes FROM weight_logs ORDER BY logged_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(weight_from_row).collect()
    }

    pub async fn delete_weight_log(&self, id: &str) -> Result<()> {
        let info = sqlx::query("DELETE FROM weight_logs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if info.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                kind: "weight log",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /* ───────────────────────────── profile ───────────────────────────── */

    pub async fn save_profile(&self, p: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO profile
              (id, full_name, date_of_birth, gender, current_weight, height, body_fat_percentage,
               target_weight, experience_level, primary_goal, preferred_units,
               onboarding_completed, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.full_name)
        .bind(p.date_of_birth.map(|d| d.to_string()))
        .bind(p.gender.map(|g| g.as_str()))
        .bind(p.current_weight)
        .bind(p.height)
        .bind(p.body_fat_percentage)
        .bind(p.target_weight)
        .bind(p.experience_level.map(|e| e.as_str()))
        .bind(p.primary_goal.map(|g| g.as_str()))
        .bind(p.preferred_units.as_str())
        .bind(p.onboarding_completed)
        .bind(ts(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn profile(&self) -> Result<Option<Profile>> {
        let Some(r) = sqlx::query("SELECT * FROM profile WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let dob: Option<String> = r.try_get("date_of_birth")?;
        let units: String = r.try_get("preferred_units")?;
        Ok(Some(Profile {
            full_name: r.try_get("full_name")?,
            date_of_birth: dob
                .map(|d| {
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| {
                        PersistenceError::Corrupt {
                            table: "profile",
                            reason: e.to_string(),
                        }
                    })
                })
                .transpose()?,
            gender: parse_opt_text("profile", r.try_get("gender")?)?,
            current_weight: r.try_get("current_weight")?,
            height: r.try_get("height")?,
            body_fat_percentage: r.try_get("body_fat_percentage")?,
            target_weight: r.try_get("target_weight")?,
            experience_level: parse_opt_text("profile", r.try_get("experience_level")?)?,
            primary_goal: parse_opt_text("profile", r.try_get("primary_goal")?)?,
            preferred_units: parse_text("profile", &units)?,
            onboarding_completed: r.try_get("onboarding_completed")?,
        }))
    }
}

#[async_trait]
impl WorkoutRepository for Database {
    async fn create_workout_record(
        &self,
        payload: &CreateWorkout,
        completed_at: DateTime<Utc>,
    ) -> Result<Workout> {
        let workout = Workout {
            id: Uuid::new_v4().to_string(),
            routine_id: payload.routine_id.clone(),
            name: payload.name.clone(),
            started_at: payload.started_at,
            completed_at: Some(completed_at),
            duration_minutes: Some((completed_at - payload.started_at).num_minutes().max(0)),
            notes: None,
        };

        // Workout, exercises and sets commit together or not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workouts
              (id, routine_id, name, started_at, completed_at, duration_minutes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&workout.id)
        .bind(&workout.routine_id)
        .bind(&workout.name)
        .bind(ts(workout.started_at))
        .bind(ts(completed_at))
        .bind(workout.duration_minutes)
        .bind(ts(Utc::now()))
        .execute(&mut *tx)
        .await?;

        for ex in &payload.exercises {
            let we_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO workout_exercises (id, workout_id, exercise_id, order_index, notes) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&we_id)
            .bind(&workout.id)
            .bind(&ex.exercise_id)
            .bind(ex.order_index)
            .bind(&ex.notes)
            .execute(&mut *tx)
            .await?;

            for set in &ex.sets {
                sqlx::query(
                    r#"
                    INSERT INTO workout_sets
                      (id, workout_exercise_id, set_number, weight, reps, rpe, is_warmup)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&we_id)
                .bind(set.set_number)
                .bind(set.weight)
                .bind(set.reps)
                .bind(set.rpe.map(f64::from))
                .bind(set.is_warmup)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(workout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::{CreateRoutineExercise, CreateWorkoutExercise},
        session::test_support::set,
        types::Units,
    };
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    async fn database() -> Database {
        Database::new(db::open_in_memory().await.unwrap())
    }

    fn new_exercise(name: &str, muscle: MuscleGroup) -> NewExercise {
        NewExercise {
            name: name.into(),
            description: None,
            instructions: None,
            primary_muscle_group: muscle,
            equipment: Equipment::Barbell,
            difficulty: Difficulty::Intermediate,
            exercise_type: ExerciseType::Compound,
            image_url: None,
            video_url: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn exercise_names_are_unique_ignoring_case() {
        let db = database().await;
        db.add_exercise(&new_exercise("Bench Press", MuscleGroup::Chest))
            .await
            .unwrap();

        assert_matches!(
            db.add_exercise(&new_exercise("bench press", MuscleGroup::Chest)).await,
            Err(PersistenceError::Duplicate { kind: "exercise", .. })
        );
        assert!(db
            .import_exercise(&new_exercise("BENCH PRESS", MuscleGroup::Chest))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_filters_and_resolves_by_index_id_or_name() {
        let db = database().await;
        let squat = db.add_exercise(&new_exercise("Squat", MuscleGroup::Legs)).await.unwrap();
        db.add_exercise(&new_exercise("Bench Press", MuscleGroup::Chest)).await.unwrap();
        db.add_exercise(&new_exercise("Incline Bench", MuscleGroup::Chest)).await.unwrap();

        let chest = db
            .list_exercises(&ExerciseFilter {
                muscle_group: Some(MuscleGroup::Chest),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(chest.len(), 2);

        let search = db
            .list_exercises(&ExerciseFilter {
                search: Some("BENCH".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 2);

        assert_eq!(db.resolve_exercise("3").await.unwrap().name, "Squat");
        assert_eq!(db.resolve_exercise(&squat.id).await.unwrap().id, squat.id);
        assert_eq!(db.resolve_exercise("squat").await.unwrap().id, squat.id);
        assert_matches!(
            db.resolve_exercise("9").await,
            Err(PersistenceError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn routine_exercises_come_back_in_order() {
        let db = database().await;
        let a = db.add_exercise(&new_exercise("Deadlift", MuscleGroup::Back)).await.unwrap();
        let b = db.add_exercise(&new_exercise("Row", MuscleGroup::Back)).await.unwrap();

        let entry = |id: &str, sets| CreateRoutineExercise {
            exercise_id: id.into(),
            target_sets: sets,
            target_reps_min: Some(8),
            target_reps_max: Some(12),
            rest_period_seconds: 90,
            notes: None,
        };
        let id = db
            .create_routine(&CreateRoutine {
                name: "Pull".into(),
                description: None,
                exercises: vec![entry(&b.id, 4), entry(&a.id, 3)],
            })
            .await
            .unwrap();

        let routine = db.resolve_routine("Pull").await.unwrap();
        assert_eq!(routine.id, id);
        let names: Vec<&str> = routine.exercises.iter().map(|e| e.exercise.name.as_str()).collect();
        assert_eq!(names, vec!["Row", "Deadlift"]);
        assert_eq!(routine.exercises[1].order_index, 1);
        assert_eq!(db.list_routines().await.unwrap()[0].exercises, 2);
    }

    #[tokio::test]
    async fn workout_record_round_trips_with_sets() {
        let db = database().await;
        let ex = db.add_exercise(&new_exercise("Squat", MuscleGroup::Legs)).await.unwrap();

        let payload = CreateWorkout {
            routine_id: None,
            name: "Legs".into(),
            started_at: t0(),
            exercises: vec![CreateWorkoutExercise {
                exercise_id: ex.id.clone(),
                order_index: 0,
                notes: Some("felt strong".into()),
                sets: vec![set(1, Some(100.0), 5), set(3, None, 12)],
            }],
        };
        let saved = db
            .create_workout_record(&payload, t0() + Duration::seconds(45 * 60 + 30))
            .await
            .unwrap();
        assert_eq!(saved.duration_minutes, Some(45));

        let details = db.workout_details(&saved.id).await.unwrap().unwrap();
        assert_eq!(details.workout, saved);
        assert_eq!(details.exercises.len(), 1);
        let sets: Vec<u32> = details.exercises[0].sets.iter().map(|s| s.set_number).collect();
        assert_eq!(sets, vec![1, 3]);
        assert_eq!(details.exercises[0].sets[1].weight, None);

        assert_matches!(
            db.delete_exercise(&ex.id).await,
            Err(PersistenceError::InUse { .. })
        );
        db.delete_workout(&saved.id).await.unwrap();
        assert!(db.list_workouts().await.unwrap().is_empty());
        db.delete_exercise(&ex.id).await.unwrap();
    }

    #[tokio::test]
    async fn failed_workout_insert_leaves_nothing_behind() {
        let db = database().await;
        let payload = CreateWorkout {
            routine_id: None,
            name: "Ghost".into(),
            started_at: t0(),
            exercises: vec![CreateWorkoutExercise {
                exercise_id: "missing".into(),
                order_index: 0,
                notes: None,
                sets: vec![set(1, Some(20.0), 10)],
            }],
        };

        assert_matches!(
            db.create_workout_record(&payload, t0()).await,
            Err(PersistenceError::Database(_))
        );
        assert!(db.list_workouts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn weight_logs_newest_first() {
        let db = database().await;
        db.add_weight_log(80.0, t0(), None).await.unwrap();
        let later = db
            .add_weight_log(79.4, t0() + Duration::days(1), Some("post-cut".into()))
            .await
            .unwrap();

        let logs = db.weight_logs().await.unwrap();
        assert_eq!(logs[0], later);
        db.delete_weight_log(&later.id).await.unwrap();
        assert_eq!(db.weight_logs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_is_a_singleton() {
        let db = database().await;
        assert!(db.profile().await.unwrap().is_none());

        let mut p = Profile {
            full_name: Some("Sam".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 1),
            preferred_units: Units::Imperial,
            ..Default::default()
        };
        db.save_profile(&p).await.unwrap();
        p.onboarding_completed = true;
        db.save_profile(&p).await.unwrap();

        assert_eq!(db.profile().await.unwrap(), Some(p));
    }
}
