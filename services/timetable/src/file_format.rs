//! services/timetable/src/file_format.rs
//!
//! The JSON document used to back up or share a timetable as a file.
//!
//! ```json
//! {
//!   "subjects": [{ "name": "...", "teacher": "...", "room": "...", "color": "#4caf50" }],
//!   "classes": [{ "subjectIndex": 0, "day_of_week": 0, "period": 1 }]
//! }
//! ```
//!
//! Like the QR payload, classes point at subjects by position. Unlike it, the
//! room travels too.

use crate::error::AppError;
use crate::tasks::TaskPlanner;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use timetable_core::domain::{SubjectId, SubjectInput, TimetableExport};
use timetable_core::ports::PersistenceService;
use timetable_core::transfer::{reconcile, Expanded, TransferError, UncheckedClass};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSubject {
    pub name: String,
    #[serde(default)]
    pub teacher: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileClass {
    #[serde(rename = "subjectIndex")]
    pub subject_index: i64,
    pub day_of_week: i64,
    pub period: i64,
}

/// Both lists are optional on read so a document missing either one is
/// reported as malformed rather than as a JSON error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableFile {
    #[serde(default)]
    pub subjects: Option<Vec<FileSubject>>,
    #[serde(default)]
    pub classes: Option<Vec<FileClass>>,
}

impl TimetableFile {
    pub fn from_export(timetable: &TimetableExport) -> Self {
        let index_of: HashMap<SubjectId, usize> = timetable
            .subjects
            .iter()
            .enumerate()
            .map(|(index, subject)| (subject.id, index))
            .collect();

        let subjects = timetable
            .subjects
            .iter()
            .map(|s| FileSubject {
                name: s.name.clone(),
                teacher: s.teacher.clone(),
                room: s.room.clone(),
                color: s.color.clone(),
            })
            .collect();

        let classes = timetable
            .classes
            .iter()
            .filter_map(|c| {
                index_of.get(&c.subject_id).map(|&index| FileClass {
                    subject_index: index as i64,
                    day_of_week: c.day_of_week.into(),
                    period: c.period.into(),
                })
            })
            .collect();

        Self {
            subjects: Some(subjects),
            classes: Some(classes),
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a document and checks it the same way a scanned payload is checked.
    pub fn parse(text: &str) -> Result<Expanded, AppError> {
        let file: TimetableFile = serde_json::from_str(text)?;
        file.into_import()
    }

    pub fn into_import(self) -> Result<Expanded, AppError> {
        let (subjects, classes) = match (self.subjects, self.classes) {
            (Some(subjects), Some(classes)) => (subjects, classes),
            _ => {
                return Err(TransferError::MalformedPayload(
                    "document needs both `subjects` and `classes`".to_string(),
                )
                .into())
            }
        };

        let subjects = subjects
            .into_iter()
            .map(|s| SubjectInput {
                name: s.name,
                teacher: s.teacher.filter(|t| !t.trim().is_empty()),
                room: s.room.filter(|r| !r.trim().is_empty()),
                color: s.color,
            })
            .collect();
        let classes = classes
            .into_iter()
            .map(|c| UncheckedClass {
                subject_index: c.subject_index,
                day_of_week: c.day_of_week,
                period: c.period,
            })
            .collect();

        Ok(reconcile(subjects, classes)?)
    }
}

/// Writes the stored timetable to `path`.
pub async fn export_to_path(db: &dyn PersistenceService, path: &Path) -> Result<(), AppError> {
    let timetable = db.export_all().await?;
    let json = TimetableFile::from_export(&timetable).to_json()?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), subjects = timetable.subjects.len(), "Timetable exported.");
    Ok(())
}

/// Replaces the stored timetable with the document at `path`.
pub async fn import_from_path(planner: &TaskPlanner, path: &Path) -> Result<Expanded, AppError> {
    let text = tokio::fs::read_to_string(path).await?;
    let expanded = TimetableFile::parse(&text)?;
    planner.replace_timetable(&expanded.data).await?;
    info!(
        path = %path.display(),
        subjects = expanded.data.subjects.len(),
        classes = expanded.data.classes.len(),
        skipped = expanded.skipped.len(),
        "Timetable imported."
    );
    Ok(expanded)
}
