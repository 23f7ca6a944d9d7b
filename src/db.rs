use std::{path::Path, str::FromStr};

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub type DB = SqlitePool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS exercises (
    id                   TEXT PRIMARY KEY,
    name                 TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description          TEXT,
    instructions         TEXT,
    primary_muscle_group TEXT NOT NULL,
    equipment            TEXT NOT NULL,
    difficulty           TEXT NOT NULL,
    exercise_type        TEXT NOT NULL,
    image_url            TEXT,
    video_url            TEXT,
    is_custom            INTEGER NOT NULL DEFAULT 1,
    created_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS routines (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS routine_exercises (
    id                  TEXT PRIMARY KEY,
    routine_id          TEXT NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
    exercise_id         TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    order_index         INTEGER NOT NULL,
    target_sets         INTEGER NOT NULL,
    target_reps_min     INTEGER,
    target_reps_max     INTEGER,
    rest_period_seconds INTEGER NOT NULL,
    notes               TEXT
);

CREATE TABLE IF NOT EXISTS workouts (
    id               TEXT PRIMARY KEY,
    routine_id       TEXT REFERENCES routines(id) ON DELETE SET NULL,
    name             TEXT NOT NULL,
    started_at       TEXT NOT NULL,
    completed_at     TEXT,
    duration_minutes INTEGER,
    notes            TEXT,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workout_exercises (
    id          TEXT PRIMARY KEY,
    workout_id  TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
    exercise_id TEXT NOT NULL REFERENCES exercises(id),
    order_index INTEGER NOT NULL,
    notes       TEXT
);

CREATE TABLE IF NOT EXISTS workout_sets (
    id                  TEXT PRIMARY KEY,
    workout_exercise_id TEXT NOT NULL REFERENCES workout_exercises(id) ON DELETE CASCADE,
    set_number          INTEGER NOT NULL,
    weight              REAL,
    reps                INTEGER NOT NULL CHECK (reps > 0),
    rpe                 REAL,
    is_warmup           INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS weight_logs (
    id         TEXT PRIMARY KEY,
    weight     REAL NOT NULL CHECK (weight > 0),
    logged_at  TEXT NOT NULL,
    notes      TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profile (
    id                   INTEGER PRIMARY KEY CHECK (id = 1),
    full_name            TEXT,
    date_of_birth        TEXT,
    gender               TEXT,
    current_weight       REAL,
    height               REAL,
    body_fat_percentage  REAL,
    target_weight        REAL,
    experience_level     TEXT,
    primary_goal         TEXT,
    preferred_units      TEXT NOT NULL DEFAULT 'metric',
    onboarding_completed INTEGER NOT NULL DEFAULT 0,
    updated_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workouts_started_at ON workouts(started_at);
CREATE INDEX IF NOT EXISTS idx_weight_logs_logged_at ON weight_logs(logged_at);
"#;

pub async fn open(path: &Path) -> Result<DB> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    migrate(&pool).await?;
    Ok(pool)
}

/// A private in-memory database. Pinned to a single connection that never
/// expires, otherwise each pooled connection would see its own empty database.
pub async fn open_in_memory() -> Result<DB> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &DB) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .context("Failed to apply schema")?;
    Ok(())
}
