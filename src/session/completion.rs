use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    clock::Clock,
    error::{Error, ValidationError},
    models::{CreateWorkout, CreateWorkoutExercise, Workout, WorkoutSession},
    session::SessionStore,
    stats,
    storage::WorkoutRepository,
};

/// What the user is shown once a workout has been saved.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionStats {
    pub workout: Workout,
    /// Counted over every exercise in the session, including empty ones.
    pub total_sets: usize,
    pub duration_minutes: i64,
    pub total_volume: f64,
    /// Exercises that actually made it into the saved workout.
    pub exercises_recorded: usize,
}

/// Payload for the persistence layer. Exercises without sets are left out.
/// `None` when no session is active.
pub fn build_payload(session: &WorkoutSession) -> Option<CreateWorkout> {
    let started_at = session.started_at?;
    Some(CreateWorkout {
        routine_id: session.routine_id.clone(),
        name: session.name.clone(),
        started_at,
        exercises: session
            .exercises
            .iter()
            .filter(|ex| !ex.logged_sets.is_empty())
            .map(|ex| CreateWorkoutExercise {
                exercise_id: ex.exercise_ref.id.clone(),
                order_index: ex.order_index,
                notes: ex.notes.clone(),
                sets: ex.logged_sets.clone(),
            })
            .collect(),
    })
}

/// Commit the active session and reset the store.
///
/// Rejected up front, with no side effects, when there is no active session
/// or no set has been logged. If the repository fails the store is left
/// exactly as it was so the user can retry.
pub async fn complete_workout<R>(
    store: &mut SessionStore,
    repo: &R,
) -> Result<CompletionStats, Error>
where
    R: WorkoutRepository + ?Sized,
{
    let session = store.session();
    let Some(started_at) = session.started_at else {
        return Err(ValidationError::NoActiveSession.into());
    };
    if session.exercises.iter().all(|ex| ex.logged_sets.is_empty()) {
        return Err(ValidationError::NoSetsLogged.into());
    }

    let now = store.clock().now();
    let total_sets = stats::total_sets(&session.exercises);
    let total_volume = stats::total_volume(&session.exercises);
    let duration_minutes = (now - started_at).num_minutes().max(0);
    let Some(payload) = build_payload(session) else {
        return Err(ValidationError::NoActiveSession.into());
    };
    let exercises_recorded = payload.exercises.len();

    let workout = match repo.create_workout_record(&payload, now).await {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, "saving workout failed; session kept for retry");
            return Err(e.into());
        }
    };
    info!(workout = %workout.id, total_sets, duration_minutes, "workout saved");

    // Already committed: a failed reset is logged, not returned.
    if let Err(e) = store.reset() {
        error!(error = %e, "workout saved but the session could not be cleared");
    }

    Ok(CompletionStats {
        workout,
        total_sets,
        duration_minutes,
        total_volume,
        exercises_recorded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PersistenceError,
        models::{LoggedSet, WorkoutSession},
        session::test_support::*,
    };
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRepo {
        calls: Mutex<Vec<CreateWorkout>>,
        fail: bool,
    }

    #[async_trait]
    impl WorkoutRepository for RecordingRepo {
        async fn create_workout_record(
            &self,
            payload: &CreateWorkout,
            completed_at: DateTime<Utc>,
        ) -> Result<Workout, PersistenceError> {
            self.calls.lock().unwrap().push(payload.clone());
            if self.fail {
                return Err(PersistenceError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(Workout {
                id: "w1".into(),
                routine_id: payload.routine_id.clone(),
                name: payload.name.clone(),
                started_at: payload.started_at,
                completed_at: Some(completed_at),
                duration_minutes: Some((completed_at - payload.started_at).num_minutes()),
                notes: None,
            })
        }
    }

    fn sets(n: u32) -> Vec<LoggedSet> {
        (1..=n).map(|i| set(i, Some(50.0), 10)).collect()
    }

    #[tokio::test]
    async fn submits_only_exercises_with_sets_but_counts_all() {
        let clock = clock();
        let mut store = store(&clock);
        store
            .start_session(
                Some("r1".into()),
                "Full body",
                vec![exercise("A", 0), exercise("B", 1), exercise("C", 2)],
            )
            .unwrap();
        for s in sets(2) {
            store.add_set(0, s).unwrap();
        }
        store.add_set(2, set(1, None, 15)).unwrap();
        clock.advance(Duration::seconds(47 * 60 + 59));

        let repo = RecordingRepo::default();
        let stats = complete_workout(&mut store, &repo).await.unwrap();

        let calls = repo.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let ids: Vec<&str> = calls[0].exercises.iter().map(|e| e.exercise_id.as_str()).collect();
        assert_eq!(ids, vec!["ex-A", "ex-C"]);
        assert_eq!(calls[0].exercises[1].order_index, 2);

        assert_eq!(stats.total_sets, 3);
        assert_eq!(stats.exercises_recorded, 2);
        assert_eq!(stats.duration_minutes, 47);
        assert_eq!(stats.total_volume, 1000.0);
        assert_eq!(store.session(), &WorkoutSession::default());
    }

    #[tokio::test]
    async fn rejects_session_without_sets_with_no_side_effects() {
        let clock = clock();
        let mut store = store(&clock);
        store
            .start_session(None, "Empty", vec![exercise("A", 0), exercise("B", 1)])
            .unwrap();
        let before = store.session().clone();

        let repo = RecordingRepo::default();
        assert_matches!(
            complete_workout(&mut store, &repo).await,
            Err(Error::Validation(ValidationError::NoSetsLogged))
        );
        assert!(repo.calls.lock().unwrap().is_empty());
        assert_eq!(store.session(), &before);
    }

    #[tokio::test]
    async fn rejects_when_idle() {
        let clock = clock();
        let mut store = store(&clock);
        let repo = RecordingRepo::default();
        assert_matches!(
            complete_workout(&mut store, &repo).await,
            Err(Error::Validation(ValidationError::NoActiveSession))
        );
        assert!(repo.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_session_for_retry() {
        let clock = clock();
        let mut store = store(&clock);
        store.start_session(None, "Push", vec![exercise("A", 0)]).unwrap();
        store.add_set(0, set(1, Some(100.0), 3)).unwrap();
        store.start_rest_timer(90).unwrap();
        let before = store.session().clone();

        let failing = RecordingRepo {
            fail: true,
            ..Default::default()
        };
        assert_matches!(
            complete_workout(&mut store, &failing).await,
            Err(Error::Persistence(_))
        );
        assert_eq!(store.session(), &before);

        let ok = RecordingRepo::default();
        let stats = complete_workout(&mut store, &ok).await.unwrap();
        assert_eq!(stats.total_sets, 1);
        assert!(!store.is_active());
    }
}
