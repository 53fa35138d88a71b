mod common;

use common::{break_subject_inserts, date, memory_db, seed_subject, subject};
use timetable_core::domain::{ClassInput, NewTask, ReminderHandle, Slot, TimetableImport};
use timetable_core::ports::{PersistenceService, PortError};

fn new_task(subject_id: i64, content: &str, due: chrono::NaiveDate) -> NewTask {
    NewTask {
        subject_id,
        content: content.to_string(),
        due_date: due,
    }
}

#[tokio::test]
async fn test_subject_with_class_round_trip() {
    let (db, _pool) = memory_db().await;
    let id = seed_subject(db.as_ref(), subject("Web Design", Some("Tanaka"), Some("101")), 0, 2).await;

    let (stored, classes) = db.get_subject(id).await.unwrap();
    assert_eq!(stored.name, "Web Design");
    assert_eq!(stored.teacher.as_deref(), Some("Tanaka"));
    assert_eq!(stored.room.as_deref(), Some("101"));
    assert_eq!(classes.len(), 1);
    assert_eq!((classes[0].day_of_week, classes[0].period), (0, 2));

    db.update_class_slot(id, Slot { day_of_week: 3, period: 4 })
        .await
        .unwrap();
    let (_, classes) = db.get_subject(id).await.unwrap();
    assert_eq!((classes[0].day_of_week, classes[0].period), (3, 4));
}

#[tokio::test]
async fn test_deleting_subject_cascades() {
    let (db, _pool) = memory_db().await;
    let keep = seed_subject(db.as_ref(), subject("Art", None, None), 1, 1).await;
    let gone = seed_subject(db.as_ref(), subject("Math", None, None), 0, 1).await;
    db.add_task(&new_task(gone, "Problem set 3", date(2024, 6, 12)), None)
        .await
        .unwrap();
    db.add_task(&new_task(keep, "Sketchbook", date(2024, 6, 13)), None)
        .await
        .unwrap();

    db.delete_subject(gone).await.unwrap();

    let timetable = db.export_all().await.unwrap();
    assert_eq!(timetable.subjects.len(), 1);
    assert!(timetable.classes.iter().all(|c| c.subject_id == keep));
    let tasks = db.all_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].subject_name, "Art");
    assert!(matches!(
        db.get_subject(gone).await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_import_replaces_everything() {
    let (db, _pool) = memory_db().await;
    let old = seed_subject(db.as_ref(), subject("History", None, None), 2, 2).await;
    db.add_task(&new_task(old, "Read chapter 4", date(2024, 6, 12)), None)
        .await
        .unwrap();

    let data = TimetableImport {
        subjects: vec![subject("Math", Some("Suzuki"), None), subject("Art", None, None)],
        classes: vec![
            ClassInput {
                subject_index: 1,
                day_of_week: 4,
                period: 5,
            },
            ClassInput {
                subject_index: 0,
                day_of_week: 0,
                period: 1,
            },
        ],
    };
    db.import_all(&data).await.unwrap();

    let timetable = db.export_all().await.unwrap();
    let names: Vec<&str> = timetable.subjects.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Math", "Art"]);

    let art = timetable.subjects[1].id;
    let friday = timetable
        .classes
        .iter()
        .find(|c| c.day_of_week == 4)
        .unwrap();
    assert_eq!(friday.subject_id, art);
    assert_eq!(friday.period, 5);

    assert!(db.all_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_rejects_bad_index_without_changes() {
    let (db, _pool) = memory_db().await;
    seed_subject(db.as_ref(), subject("History", None, None), 2, 2).await;
    let before = db.export_all().await.unwrap();

    let data = TimetableImport {
        subjects: vec![subject("Math", None, None)],
        classes: vec![ClassInput {
            subject_index: 5,
            day_of_week: 0,
            period: 1,
        }],
    };
    let result = db.import_all(&data).await;

    assert!(matches!(result, Err(PortError::InvalidInput(_))));
    assert_eq!(db.export_all().await.unwrap(), before);
}

#[tokio::test]
async fn test_import_failure_rolls_back() {
    let (db, pool) = memory_db().await;
    let id = seed_subject(db.as_ref(), subject("History", None, None), 2, 2).await;
    db.add_task(&new_task(id, "Essay", date(2024, 6, 20)), None)
        .await
        .unwrap();
    let before = db.export_all().await.unwrap();
    break_subject_inserts(&pool).await;

    let data = TimetableImport {
        subjects: vec![subject("Math", None, None)],
        classes: vec![],
    };
    let result = db.import_all(&data).await;

    assert!(matches!(result, Err(PortError::Unexpected(_))));
    assert_eq!(db.export_all().await.unwrap(), before);
    assert_eq!(db.all_tasks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_task_ordering_and_counts() {
    let (db, _pool) = memory_db().await;
    let math = seed_subject(db.as_ref(), subject("Math", None, None), 0, 1).await;
    let art = seed_subject(db.as_ref(), subject("Art", None, None), 1, 1).await;

    let late = db
        .add_task(&new_task(math, "Exam prep", date(2024, 7, 1)), None)
        .await
        .unwrap();
    let done = db
        .add_task(&new_task(art, "Poster", date(2024, 6, 1)), None)
        .await
        .unwrap();
    let soon = db
        .add_task(&new_task(math, "Worksheet", date(2024, 6, 15)), None)
        .await
        .unwrap();
    db.add_task(&new_task(art, "Clay model", date(2024, 6, 20)), None)
        .await
        .unwrap();
    db.set_task_status(done, true, None).await.unwrap();

    let order: Vec<i64> = db
        .all_tasks()
        .await
        .unwrap()
        .iter()
        .map(|t| t.task.id)
        .collect();
    assert_eq!(order[0], soon);
    assert_eq!(order[2], late);
    assert_eq!(order[3], done);

    let math_tasks = db.tasks_for_subject(math).await.unwrap();
    assert_eq!(math_tasks[0].content, "Worksheet");

    assert_eq!(db.incomplete_task_count().await.unwrap(), 3);
    let by_subject = db.incomplete_counts_by_subject().await.unwrap();
    assert_eq!(by_subject.get(&math), Some(&2));
    assert_eq!(by_subject.get(&art), Some(&1));
}

#[tokio::test]
async fn test_reminder_handles_are_stored() {
    let (db, _pool) = memory_db().await;
    let math = seed_subject(db.as_ref(), subject("Math", None, None), 0, 1).await;
    let handle = ReminderHandle("reminder-1".to_string());

    let with = db
        .add_task(&new_task(math, "Quiz", date(2024, 6, 15)), Some(&handle))
        .await
        .unwrap();
    db.add_task(&new_task(math, "Notes", date(2024, 6, 16)), None)
        .await
        .unwrap();

    assert_eq!(db.get_task(with).await.unwrap().reminder, Some(handle.clone()));
    assert_eq!(
        db.reminder_handles_for_subject(math).await.unwrap(),
        vec![handle]
    );

    db.set_task_reminder(with, None).await.unwrap();
    assert!(db.reminder_handles_for_subject(math).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_rows_are_not_found() {
    let (db, _pool) = memory_db().await;

    assert!(matches!(db.get_task(42).await, Err(PortError::NotFound(_))));
    assert!(matches!(db.delete_task(42).await, Err(PortError::NotFound(_))));
    assert!(matches!(db.delete_subject(42).await, Err(PortError::NotFound(_))));
    assert!(matches!(
        db.set_task_status(42, true, None).await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_clear_reminder_by_handle() {
    let (db, _pool) = memory_db().await;
    let math = seed_subject(db.as_ref(), subject("Math", None, None), 0, 1).await;
    let handle = ReminderHandle("reminder-7".to_string());
    let id = db
        .add_task(&new_task(math, "Quiz", date(2024, 6, 15)), Some(&handle))
        .await
        .unwrap();

    db.clear_reminder(&handle).await.unwrap();
    // Unknown handles are fine; the task may have been deleted meanwhile.
    db.clear_reminder(&ReminderHandle("gone".to_string()))
        .await
        .unwrap();

    assert_eq!(db.get_task(id).await.unwrap().reminder, None);
}
