mod common;

use common::{at, memory_db, seed_subject, subject, RecordingNotifier};
use timetable_core::ports::PersistenceService;
use timetable_core::transfer::TransferError;
use timetable_lib::error::AppError;
use timetable_lib::file_format::{export_to_path, import_from_path};
use timetable_lib::tasks::TaskPlanner;

#[tokio::test]
async fn test_export_then_import_on_another_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timetable.json");

    let (source, _pool) = memory_db().await;
    seed_subject(source.as_ref(), subject("Web Design", Some("Tanaka"), Some("101")), 0, 2).await;
    seed_subject(source.as_ref(), subject("Marketing", None, Some("305")), 3, 4).await;
    export_to_path(source.as_ref(), &path).await.unwrap();

    let (target, _pool) = memory_db().await;
    seed_subject(target.as_ref(), subject("Old", None, None), 1, 1).await;
    let planner = TaskPlanner::new(target.clone(), RecordingNotifier::new(at(2024, 6, 10, 12)), 9);
    let expanded = import_from_path(&planner, &path).await.unwrap();

    assert!(expanded.skipped.is_empty());
    let restored = target.export_all().await.unwrap();
    assert_eq!(restored.subjects.len(), 2);
    // Unlike codes, files keep the room.
    assert_eq!(restored.subjects[0].room.as_deref(), Some("101"));
    assert_eq!(restored.subjects[1].teacher, None);
    let marketing = restored.subjects[1].id;
    assert!(restored
        .classes
        .iter()
        .any(|c| c.subject_id == marketing && c.day_of_week == 3 && c.period == 4));
}

#[tokio::test]
async fn test_malformed_file_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    tokio::fs::write(&path, r#"{"classes": []}"#).await.unwrap();

    let (db, _pool) = memory_db().await;
    seed_subject(db.as_ref(), subject("History", None, None), 2, 2).await;
    let before = db.export_all().await.unwrap();
    let planner = TaskPlanner::new(db.clone(), RecordingNotifier::new(at(2024, 6, 10, 12)), 9);

    let result = import_from_path(&planner, &path).await;

    assert!(matches!(
        result,
        Err(AppError::Transfer(TransferError::MalformedPayload(_)))
    ));
    assert_eq!(db.export_all().await.unwrap(), before);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let (db, _pool) = memory_db().await;
    let planner = TaskPlanner::new(db, RecordingNotifier::new(at(2024, 6, 10, 12)), 9);

    let result = import_from_path(&planner, &dir.path().join("absent.json")).await;

    assert!(matches!(result, Err(AppError::Io(_))));
}
