//! Integration tests for the session log.
//!
//! Feeds real engine completions into an on-disk database and reads the
//! statistics back.

use chrono::Utc;
use focusroom_core::timer::ManualSource;
use focusroom_core::storage::SessionFilter;
use focusroom_core::{Database, DatabaseError, FocusEngine, Phase, SessionConfig};

#[test]
fn test_engine_completions_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focusroom.db");

    let source = ManualSource::new();
    let mut engine = FocusEngine::with_source(SessionConfig::default(), source.clone()).unwrap();
    engine.start().unwrap();

    {
        let db = Database::open_at(&path).unwrap();
        source.advance_secs(25 * 60);
        let work = engine.tick().unwrap();
        db.record_completion(&work, Some("task-42")).unwrap();
        source.advance_secs(5 * 60);
        let rest = engine.tick().unwrap();
        db.record_completion(&rest, None).unwrap();
    }

    // Reopen to make sure the rows were persisted.
    let db = Database::open_at(&path).unwrap();
    let rows = db.list_sessions(10).unwrap();
    assert_eq!(rows.len(), 2);
    let work = rows.iter().find(|r| r.phase == Phase::Work).unwrap();
    assert_eq!(work.duration_min, 25);
    assert_eq!(work.task_id.as_deref(), Some("task-42"));
    assert!(!work.skipped);

    let today = db.daily_stats(Utc::now().date_naive()).unwrap();
    assert_eq!(today.total_pomodoros, 1);
    assert_eq!(today.total_minutes, 25);

    let week = db.weekly_stats(None).unwrap();
    assert_eq!(week.total_pomodoros, 1);
    assert_eq!(week.daily_breakdown.len(), 7);

    assert_eq!(today.task_breakdown.len(), 1);
    assert_eq!(today.task_breakdown[0].task_id, "task-42");
    assert_eq!(today.task_breakdown[0].minutes, 25);

    let task = db.task_stats("task-42").unwrap();
    assert_eq!(task.total_pomodoros, 1);
    assert_eq!(task.total_minutes, 25);
    assert_eq!(task.first_session, task.last_session);
    assert_eq!(task.daily_counts.len(), 1);

    let filter = SessionFilter {
        task_id: Some("task-42".to_string()),
        ..SessionFilter::default()
    };
    let tagged = db.query_sessions(&filter, 10).unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].phase, Phase::Work);
}

#[test]
fn test_delete_session() {
    let db = Database::open_memory().unwrap();
    let now = Utc::now();
    let id = db
        .record_session(Phase::Work, 25, now, now, None, false)
        .unwrap();
    db.delete_session(id).unwrap();
    assert!(matches!(
        db.delete_session(id),
        Err(DatabaseError::NotFound(missing)) if missing == id
    ));
}
