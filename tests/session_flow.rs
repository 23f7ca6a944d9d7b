use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ironlog::{
    Error,
    clock::{Clock, ManualClock},
    db,
    error::{PersistenceError, ValidationError},
    kv::{FileStore, KeyValueStore},
    models::{CreateRoutine, CreateRoutineExercise, CreateWorkout, SessionExercise, Workout},
    session::{SESSION_KEY, SessionStore, SetLogger, complete_workout, remaining_seconds},
    storage::{Database, NewExercise, WorkoutRepository},
    types::{Difficulty, Equipment, ExerciseType, MuscleGroup},
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

fn new_exercise(name: &str, muscle: MuscleGroup) -> NewExercise {
    NewExercise {
        name: name.to_string(),
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

fn load(dir: &std::path::Path, clock: &ManualClock) -> SessionStore {
    let kv = FileStore::open(dir).unwrap();
    SessionStore::load(Box::new(kv), Arc::new(clock.clone())).unwrap()
}

async fn push_day(db: &Database) -> (String, Vec<SessionExercise>) {
    let bench = db
        .add_exercise(&new_exercise("Bench Press", MuscleGroup::Chest))
        .await
        .unwrap();
    let ohp = db
        .add_exercise(&new_exercise("Overhead Press", MuscleGroup::Shoulders))
        .await
        .unwrap();
    let dips = db
        .add_exercise(&new_exercise("Dips", MuscleGroup::Triceps))
        .await
        .unwrap();

    let id = db
        .create_routine(&CreateRoutine {
            name: "Push".into(),
            description: None,
            exercises: [&bench, &ohp, &dips]
                .iter()
                .map(|e| CreateRoutineExercise {
                    exercise_id: e.id.clone(),
                    target_sets: 3,
                    target_reps_min: Some(8),
                    target_reps_max: Some(12),
                    rest_period_seconds: 90,
                    notes: None,
                })
                .collect(),
        })
        .await
        .unwrap();

    let routine = db.resolve_routine("Push").await.unwrap();
    assert_eq!(routine.id, id);
    let planned = routine
        .exercises
        .iter()
        .map(|re| SessionExercise::new(re.exercise.to_ref(), re.order_index))
        .collect();
    (id, planned)
}

fn log(store: &mut SessionStore, idx: usize, weight: &str, reps: &str) {
    let mut logger = SetLogger::new(90);
    logger.weight = weight.into();
    logger.reps = reps.into();
    logger.submit(store, idx).unwrap();
}

#[tokio::test]
async fn routine_session_is_saved_as_one_workout() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(db::open_in_memory().await.unwrap());
    let clock = ManualClock::new(t0());
    let (routine_id, planned) = push_day(&db).await;

    let mut store = load(dir.path(), &clock);
    assert!(store.start_session(Some(routine_id.clone()), "Push", planned).unwrap());

    log(&mut store, 0, "60", "10");
    clock.advance(Duration::minutes(3));
    log(&mut store, 0, "62.5", "8");
    log(&mut store, 2, "", "12");
    clock.advance(Duration::seconds(47 * 60 + 30 - 180));

    let stats = complete_workout(&mut store, &db).await.unwrap();
    assert_eq!(stats.total_sets, 3);
    assert_eq!(stats.duration_minutes, 47);
    assert_eq!(stats.exercises_recorded, 2);
    assert!((stats.total_volume - (600.0 + 500.0)).abs() < 1e-9);
    assert!(!store.is_active());

    let details = db.workout_details(&stats.workout.id).await.unwrap().unwrap();
    assert_eq!(details.workout.routine_id.as_deref(), Some(routine_id.as_str()));
    assert_eq!(details.workout.duration_minutes, Some(47));
    let names: Vec<_> = details.exercises.iter().map(|e| e.exercise_name.as_str()).collect();
    assert_eq!(names, ["Bench Press", "Dips"]);
    assert_eq!(details.exercises[0].sets.len(), 2);
    assert_eq!(details.exercises[1].sets[0].weight, None);

    // The reset is durable too.
    assert!(!load(dir.path(), &clock).is_active());
}

#[tokio::test]
async fn session_and_rest_deadline_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(db::open_in_memory().await.unwrap());
    let clock = ManualClock::new(t0());
    let (_, planned) = push_day(&db).await;

    {
        let mut store = load(dir.path(), &clock);
        store.start_session(None, "Push", planned).unwrap();
        log(&mut store, 1, "40", "6");
        store.set_current_exercise(1).unwrap();
    }

    clock.advance(Duration::seconds(30));
    let store = load(dir.path(), &clock);
    let s = store.session();
    assert!(store.is_active());
    assert_eq!(s.current_exercise_index, 1);
    assert_eq!(s.exercises[1].logged_sets.len(), 1);
    let deadline = s.rest_timer_deadline.unwrap();
    assert_eq!(remaining_seconds(deadline, clock.now()), 60);

    clock.advance(Duration::hours(2));
    assert_eq!(remaining_seconds(deadline, clock.now()), 0);
}

#[tokio::test]
async fn unreadable_session_blob_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut kv = FileStore::open(dir.path()).unwrap();
    kv.set(SESSION_KEY, "{not json").unwrap();

    let store = load(dir.path(), &ManualClock::new(t0()));
    assert!(!store.is_active());
    assert!(store.session().exercises.is_empty());
}

struct BrokenRepo;

#[async_trait]
impl WorkoutRepository for BrokenRepo {
    async fn create_workout_record(
        &self,
        _payload: &CreateWorkout,
        _completed_at: DateTime<Utc>,
    ) -> Result<Workout, PersistenceError> {
        Err(PersistenceError::Corrupt {
            table: "workouts",
            reason: "disk full".into(),
        })
    }
}

#[tokio::test]
async fn failed_save_keeps_the_session_for_a_retry() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(db::open_in_memory().await.unwrap());
    let clock = ManualClock::new(t0());
    let (_, planned) = push_day(&db).await;

    let mut store = load(dir.path(), &clock);

    // Nothing logged yet.
    assert_matches!(
        complete_workout(&mut store, &db).await,
        Err(Error::Validation(ValidationError::NoActiveSession))
    );
    store.start_session(None, "Push", planned).unwrap();
    assert_matches!(
        complete_workout(&mut store, &db).await,
        Err(Error::Validation(ValidationError::NoSetsLogged))
    );

    log(&mut store, 0, "70", "5");
    let before = store.session().clone();
    assert_matches!(
        complete_workout(&mut store, &BrokenRepo).await,
        Err(Error::Persistence(PersistenceError::Corrupt { .. }))
    );
    assert_eq!(store.session(), &before);
    assert_eq!(load(dir.path(), &clock).session(), &before);
    assert!(db.list_workouts().await.unwrap().is_empty());

    let stats = complete_workout(&mut store, &db).await.unwrap();
    assert_eq!(stats.total_sets, 1);
    assert_eq!(db.list_workouts().await.unwrap().len(), 1);
}
