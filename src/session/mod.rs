//! The in-progress workout and everything that mutates it.
//!
//! [`SessionStore`] is the single owner of the [`WorkoutSession`]. It is an
//! explicit value handed to whoever needs it, and it writes the full session
//! to its key/value backend after every mutation.

pub mod completion;
pub mod rest_timer;
pub mod set_logger;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::StoreError,
    kv::KeyValueStore,
    models::{LoggedSet, SessionExercise, SetPatch, WorkoutSession},
};

pub use completion::{CompletionStats, build_payload, complete_workout};
pub use rest_timer::{RestTimer, Tick, remaining_seconds};
pub use set_logger::{DEFAULT_REST_SECONDS, SetLogger};

/// Fixed key the session blob is stored under.
pub const SESSION_KEY: &str = "workout-session";

/// Lifecycle as seen from outside. Completion happens while the caller holds
/// `&mut SessionStore` across the submit, so it has no stored variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
}

pub struct SessionStore {
    session: WorkoutSession,
    kv: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Restore whatever session was last persisted. An unreadable blob is
    /// logged and replaced by an empty session.
    pub fn load(kv: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let session = match kv.get(SESSION_KEY)? {
            Some(blob) => match serde_json::from_str::<WorkoutSession>(&blob) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable session blob");
                    WorkoutSession::default()
                }
            },
            None => WorkoutSession::default(),
        };

        Ok(Self { session, kv, clock })
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn phase(&self) -> Phase {
        if self.session.is_active() {
            Phase::Active
        } else {
            Phase::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn current_exercise(&self) -> Option<&SessionExercise> {
        self.session
            .exercises
            .get(self.session.current_exercise_index)
    }

    /// Begin a new session. Returns `Ok(false)` without touching anything if a
    /// session is already active.
    pub fn start_session(
        &mut self,
        routine_id: Option<String>,
        name: impl Into<String>,
        exercises: Vec<SessionExercise>,
    ) -> Result<bool, StoreError> {
        if self.session.is_active() {
            debug!("start_session ignored: a session is already active");
            return Ok(false);
        }
        debug_assert!(!exercises.is_empty(), "a session needs at least one exercise");

        self.session = WorkoutSession {
            routine_id,
            name: name.into(),
            started_at: Some(self.clock.now()),
            exercises,
            current_exercise_index: 0,
            rest_timer_deadline: None,
        };
        info!(name = %self.session.name, exercises = self.session.exercises.len(), "session started");
        self.persist()?;
        Ok(true)
    }

    /// Append a set to the exercise at `exercise_index`. Performs no
    /// validation; see [`SetLogger`].
    pub fn add_set(&mut self, exercise_index: usize, set: LoggedSet) -> Result<(), StoreError> {
        match self.session.exercises.get_mut(exercise_index) {
            Some(ex) => {
                debug!(exercise = %ex.exercise_ref.name, set = set.set_number, reps = set.reps, "set logged");
                ex.logged_sets.push(set);
            }
            None => warn!(exercise_index, "add_set: exercise index out of range"),
        }
        self.persist()
    }

    pub fn update_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        patch: &SetPatch,
    ) -> Result<(), StoreError> {
        let set = self
            .session
            .exercises
            .get_mut(exercise_index)
            .and_then(|ex| ex.logged_sets.get_mut(set_index));

        debug_assert!(
            set.is_some(),
            "update_set: position ({exercise_index}, {set_index}) out of range"
        );
        match set {
            Some(set) => patch.apply(set),
            None => warn!(exercise_index, set_index, "update_set: position out of range"),
        }
        self.persist()
    }

    /// Remove by position. Later sets keep their `set_number`.
    pub fn remove_set(&mut self, exercise_index: usize, set_index: usize) -> Result<(), StoreError> {
        if let Some(ex) = self.session.exercises.get_mut(exercise_index) {
            if set_index < ex.logged_sets.len() {
                ex.logged_sets.remove(set_index);
            }
        }
        self.persist()
    }

    pub fn set_notes(
        &mut self,
        exercise_index: usize,
        notes: Option<String>,
    ) -> Result<(), StoreError> {
        if let Some(ex) = self.session.exercises.get_mut(exercise_index) {
            ex.notes = notes.filter(|n| !n.trim().is_empty());
        }
        self.persist()
    }

    /// Move the cursor. Bounds are the caller's responsibility.
    pub fn set_current_exercise(&mut self, index: usize) -> Result<(), StoreError> {
        self.session.current_exercise_index = index;
        self.persist()
    }

    /// Arm the rest timer `seconds` from now, replacing any running countdown.
    pub fn start_rest_timer(&mut self, seconds: u32) -> Result<(), StoreError> {
        let deadline = self.clock.now() + chrono::Duration::seconds(i64::from(seconds));
        self.session.rest_timer_deadline = Some(deadline);
        self.persist()
    }

    pub fn clear_rest_timer(&mut self) -> Result<(), StoreError> {
        self.session.rest_timer_deadline = None;
        self.persist()
    }

    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.session = WorkoutSession::default();
        info!("session reset");
        self.persist()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.session).map_err(|source| StoreError::Serde {
            key: SESSION_KEY.to_string(),
            source,
        })?;
        self.kv.set(SESSION_KEY, &blob)
    }
}
