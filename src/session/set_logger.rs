use tracing::debug;

use crate::{
    error::{Error, ValidationError},
    models::LoggedSet,
    session::SessionStore,
};

pub const DEFAULT_REST_SECONDS: u32 = 90;

/// Raw input fields for the next set of the exercise in view. Validates them,
/// appends the set through [`SessionStore::add_set`], clears itself and arms
/// the rest timer.
#[derive(Debug, Clone)]
pub struct SetLogger {
    pub weight: String,
    pub reps: String,
    pub rpe: String,
    pub is_warmup: bool,
    rest_seconds: u32,
}

impl Default for SetLogger {
    fn default() -> Self {
        Self::new(DEFAULT_REST_SECONDS)
    }
}

impl SetLogger {
    pub fn new(rest_seconds: u32) -> Self {
        Self {
            weight: String::new(),
            reps: String::new(),
            rpe: String::new(),
            is_warmup: false,
            rest_seconds,
        }
    }

    pub fn rest_seconds(&self) -> u32 {
        self.rest_seconds
    }

    pub fn clear(&mut self) {
        self.weight.clear();
        self.reps.clear();
        self.rpe.clear();
        self.is_warmup = false;
    }

    /// Nothing in `store` changes unless every field validates.
    pub fn submit(
        &mut self,
        store: &mut SessionStore,
        exercise_index: usize,
    ) -> Result<LoggedSet, Error> {
        let reps = parse_reps(&self.reps)?;
        let weight = parse_weight(&self.weight)?;
        let rpe = parse_rpe(&self.rpe)?;
        if self.rest_seconds == 0 {
            return Err(ValidationError::OutOfRange {
                field: "rest_seconds",
                reason: "rest must be at least one second".into(),
            }
            .into());
        }

        let logged = store
            .session()
            .exercises
            .get(exercise_index)
            .map(|ex| ex.logged_sets.len())
            .ok_or(ValidationError::NoSuchExercise(exercise_index + 1))?;

        let set = LoggedSet {
            set_number: logged as u32 + 1,
            weight,
            reps,
            rpe,
            is_warmup: self.is_warmup,
        };

        store.add_set(exercise_index, set.clone())?;
        self.clear();
        store.start_rest_timer(self.rest_seconds)?;
        debug!(rest_seconds = self.rest_seconds, "rest timer armed");

        Ok(set)
    }
}

pub fn parse_reps(raw: &str) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingReps);
    }
    let n: i64 = raw
        .parse()
        .map_err(|_| ValidationError::InvalidReps(raw.to_string()))?;
    if n <= 0 {
        return Err(ValidationError::NonPositiveReps);
    }
    u32::try_from(n).map_err(|_| ValidationError::InvalidReps(raw.to_string()))
}

/// Empty means bodyweight.
pub fn parse_weight(raw: &str) -> Result<Option<f64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("bw") {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(w) if w.is_finite() && w >= 0.0 => Ok(Some(w)),
        _ => Err(ValidationError::InvalidWeight(raw.to_string())),
    }
}

pub fn parse_rpe(raw: &str) -> Result<Option<f32>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f32>() {
        Ok(r) if (1.0..=10.0).contains(&r) => Ok(Some(r)),
        _ => Err(ValidationError::InvalidRpe(raw.to_string())),
    }
}
