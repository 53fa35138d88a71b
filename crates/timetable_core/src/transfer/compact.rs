//! Compact, array-indexed representation of a timetable.
//!
//! # Format
//!
//! ```text
//! { "s": [ { "n": name, "t"?: teacher, "c": color }, ... ],
//!   "c": [ { "i": subject index, "d": day_of_week, "p": period }, ... ] }
//! ```
//!
//! Persisted identifiers mean nothing on another device, so classes refer to
//! subjects by their position in `s`. Fresh identifiers are assigned only when
//! the receiving side inserts the data.

use crate::domain::{
    ClassInput, ClassSession, Subject, SubjectId, SubjectInput, TimetableImport, DAYS_PER_WEEK,
};
use crate::transfer::error::{TransferError, TransferResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactSubject {
    pub n: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    pub c: String,
}

/// Integers are kept wide so that out-of-range values from a foreign encoder
/// are reported as skipped classes instead of failing the whole parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactClass {
    pub i: i64,
    pub d: i64,
    pub p: i64,
}

/// The top-level lists are optional so that their absence surfaces as
/// `MalformedPayload` from [`expand`] rather than as a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<Vec<CompactSubject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<Vec<CompactClass>>,
}

/// A class slot as read from an external document, before any checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UncheckedClass {
    pub subject_index: i64,
    pub day_of_week: i64,
    pub period: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownSubject,
    DayOutOfRange,
    PeriodOutOfRange,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownSubject => f.write_str("subject index out of range"),
            SkipReason::DayOutOfRange => f.write_str("day of week out of range"),
            SkipReason::PeriodOutOfRange => f.write_str("period must be at least 1"),
        }
    }
}

/// A class that was left out of an import, with its position in the source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedClass {
    pub position: usize,
    pub class: UncheckedClass,
    pub reason: SkipReason,
}

/// Result of expanding a payload: the importable timetable plus what had to be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expanded {
    pub data: TimetableImport,
    pub skipped: Vec<SkippedClass>,
}

impl UncheckedClass {
    fn check(self, subject_count: usize) -> Result<ClassInput, SkipReason> {
        let subject_index = usize::try_from(self.subject_index)
            .ok()
            .filter(|&i| i < subject_count)
            .ok_or(SkipReason::UnknownSubject)?;
        let day_of_week = u8::try_from(self.day_of_week)
            .ok()
            .filter(|&d| d < DAYS_PER_WEEK)
            .ok_or(SkipReason::DayOutOfRange)?;
        let period = u32::try_from(self.period)
            .ok()
            .filter(|&p| p >= 1)
            .ok_or(SkipReason::PeriodOutOfRange)?;

        Ok(ClassInput {
            subject_index,
            day_of_week,
            period,
        })
    }
}

/// Whitespace-only text counts as absent. Anything else is kept verbatim.
fn non_blank(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(str::to_string)
}

/// Builds the compact form of a stored timetable.
///
/// Subjects keep their input order. A class whose subject is not in `subjects`
/// cannot be represented and is left out; the rest of the export goes ahead.
pub fn compact(subjects: &[Subject], classes: &[ClassSession]) -> CompactPayload {
    let index_of: HashMap<SubjectId, usize> = subjects
        .iter()
        .enumerate()
        .map(|(index, subject)| (subject.id, index))
        .collect();

    let s = subjects
        .iter()
        .map(|subject| CompactSubject {
            n: subject.name.clone(),
            t: non_blank(subject.teacher.as_deref()),
            c: subject.color.clone(),
        })
        .collect();

    let c = classes
        .iter()
        .filter_map(|class| match index_of.get(&class.subject_id) {
            Some(&index) => Some(CompactClass {
                i: index as i64,
                d: class.day_of_week.into(),
                p: class.period.into(),
            }),
            None => {
                warn!(
                    class_id = class.id,
                    subject_id = class.subject_id,
                    "Class refers to a subject outside the export; leaving it out."
                );
                None
            }
        })
        .collect();

    CompactPayload {
        s: Some(s),
        c: Some(c),
    }
}

/// Turns a received compact payload back into an importable timetable.
///
/// # Errors
/// - `MalformedPayload` if `s` or `c` is absent, or if [`reconcile`] rejects the result
pub fn expand(payload: CompactPayload) -> TransferResult<Expanded> {
    let subjects = payload
        .s
        .ok_or_else(|| TransferError::MalformedPayload("subject list `s` is missing".into()))?;
    let classes = payload
        .c
        .ok_or_else(|| TransferError::MalformedPayload("class list `c` is missing".into()))?;

    let subjects = subjects
        .into_iter()
        .map(|subject| SubjectInput {
            name: subject.n,
            teacher: non_blank(subject.t.as_deref()),
            room: None,
            color: subject.c,
        })
        .collect();

    let classes = classes
        .into_iter()
        .map(|class| UncheckedClass {
            subject_index: class.i,
            day_of_week: class.d,
            period: class.p,
        })
        .collect();

    reconcile(subjects, classes)
}

/// Checks an incoming timetable before it may replace the stored one.
///
/// A class with an unusable subject index, day or period is dropped and
/// reported in [`Expanded::skipped`]; a partial timetable is still imported.
///
/// # Errors
/// - `MalformedPayload` if there are no subjects, a subject has a blank name,
///   or classes were offered but none of them survived
pub fn reconcile(
    subjects: Vec<SubjectInput>,
    classes: Vec<UncheckedClass>,
) -> TransferResult<Expanded> {
    if subjects.is_empty() {
        return Err(TransferError::MalformedPayload(
            "payload contains no subjects".into(),
        ));
    }
    if let Some(position) = subjects.iter().position(|s| s.name.trim().is_empty()) {
        return Err(TransferError::MalformedPayload(format!(
            "subject {} has no name",
            position
        )));
    }

    let offered = classes.len();
    let mut kept = Vec::with_capacity(offered);
    let mut skipped = Vec::new();

    for (position, class) in classes.into_iter().enumerate() {
        match class.check(subjects.len()) {
            Ok(input) => kept.push(input),
            Err(reason) => {
                warn!(position, %reason, "Skipping class that cannot be imported.");
                skipped.push(SkippedClass {
                    position,
                    class,
                    reason,
                });
            }
        }
    }

    if offered > 0 && kept.is_empty() {
        return Err(TransferError::MalformedPayload(format!(
            "none of the {} classes can be imported",
            offered
        )));
    }

    Ok(Expanded {
        data: TimetableImport {
            subjects,
            classes: kept,
        },
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: SubjectId, name: &str, teacher: Option<&str>, color: &str) -> Subject {
        Subject {
            id,
            name: name.to_string(),
            teacher: teacher.map(str::to_string),
            room: Some("101".to_string()),
            color: color.to_string(),
        }
    }

    fn class(id: i64, subject_id: SubjectId, day_of_week: u8, period: u32) -> ClassSession {
        ClassSession {
            id,
            subject_id,
            day_of_week,
            period,
        }
    }

    fn compact_subject(n: &str, c: &str) -> CompactSubject {
        CompactSubject {
            n: n.to_string(),
            t: None,
            c: c.to_string(),
        }
    }

    #[test]
    fn test_compact_uses_positions_not_ids() {
        let subjects = vec![
            subject(41, "Math", Some("Suzuki"), "#f00"),
            subject(7, "Art", None, "#0f0"),
        ];
        let classes = vec![class(1, 7, 2, 3), class(2, 41, 0, 1)];

        let payload = compact(&subjects, &classes);

        let s = payload.s.unwrap();
        assert_eq!(s[0].n, "Math");
        assert_eq!(s[0].t.as_deref(), Some("Suzuki"));
        assert_eq!(s[1].t, None);
        assert_eq!(
            payload.c.unwrap(),
            vec![
                CompactClass { i: 1, d: 2, p: 3 },
                CompactClass { i: 0, d: 0, p: 1 },
            ]
        );
    }

    #[test]
    fn test_compact_drops_class_with_unknown_subject() {
        let subjects = vec![subject(1, "Math", None, "#f00")];
        let classes = vec![class(1, 1, 0, 1), class(2, 99, 1, 2)];

        let payload = compact(&subjects, &classes);

        assert_eq!(payload.c.unwrap().len(), 1);
    }

    #[test]
    fn test_two_subject_scenario_resolves_to_art() {
        let payload = CompactPayload {
            s: Some(vec![compact_subject("Math", "#f00"), compact_subject("Art", "#0f0")]),
            c: Some(vec![CompactClass { i: 1, d: 2, p: 3 }]),
        };

        let expanded = expand(payload).unwrap();
        let class = expanded.data.classes[0];
        let subject = &expanded.data.subjects[class.subject_index];

        assert_eq!(subject.name, "Art");
        assert_eq!(subject.color, "#0f0");
        assert_eq!(class.day_of_week, 2);
        assert_eq!(class.period, 3);
        assert!(expanded.skipped.is_empty());
    }

    #[test]
    fn test_compact_expand_preserves_fields() {
        let subjects = vec![
            subject(10, "Linear Algebra", Some("Suzuki"), "#f44336"),
            subject(11, "Web Design", Some("  "), "#4caf50"),
        ];
        let classes = vec![class(1, 10, 0, 1), class(2, 11, 0, 2), class(3, 10, 3, 1)];

        let expanded = expand(compact(&subjects, &classes)).unwrap();

        assert_eq!(expanded.data.subjects[0].name, "Linear Algebra");
        assert_eq!(expanded.data.subjects[0].teacher.as_deref(), Some("Suzuki"));
        assert_eq!(expanded.data.subjects[1].teacher, None);
        // Room does not travel.
        assert_eq!(expanded.data.subjects[0].room, None);
        let slots: Vec<(String, u8, u32)> = expanded
            .data
            .classes
            .iter()
            .map(|c| {
                (
                    expanded.data.subjects[c.subject_index].name.clone(),
                    c.day_of_week,
                    c.period,
                )
            })
            .collect();
        assert_eq!(
            slots,
            vec![
                ("Linear Algebra".to_string(), 0, 1),
                ("Web Design".to_string(), 0, 2),
                ("Linear Algebra".to_string(), 3, 1),
            ]
        );
    }

    #[test]
    fn test_surrounding_whitespace_survives_transfer() {
        use crate::transfer::compressor::{decode, encode};

        let subjects = vec![
            subject(1, " Seminar ", Some(" Dr. Lee "), "#2196f3"),
            subject(2, "Art", Some("\t"), "#0f0"),
        ];
        let classes = vec![class(1, 1, 2, 3), class(2, 2, 4, 1)];

        let text = encode(&compact(&subjects, &classes)).unwrap();
        let expanded = expand(decode(&text).unwrap()).unwrap();

        assert_eq!(expanded.data.subjects[0].name, " Seminar ");
        assert_eq!(expanded.data.subjects[0].teacher.as_deref(), Some(" Dr. Lee "));
        assert_eq!(expanded.data.subjects[1].teacher, None);
    }

    #[test]
    fn test_out_of_range_index_is_skipped() {
        let payload = CompactPayload {
            s: Some(vec![compact_subject("Math", "#f00"), compact_subject("Art", "#0f0")]),
            c: Some(vec![
                CompactClass { i: 0, d: 0, p: 1 },
                CompactClass { i: 5, d: 1, p: 2 },
            ]),
        };

        let expanded = expand(payload).unwrap();

        assert_eq!(expanded.data.subjects.len(), 2);
        assert_eq!(expanded.data.classes.len(), 1);
        assert_eq!(expanded.skipped.len(), 1);
        assert_eq!(expanded.skipped[0].position, 1);
        assert_eq!(expanded.skipped[0].reason, SkipReason::UnknownSubject);
    }

    #[test]
    fn test_bad_day_and_period_are_skipped() {
        let subjects = vec![compact_subject("Math", "#f00")];
        let payload = CompactPayload {
            s: Some(subjects),
            c: Some(vec![
                CompactClass { i: 0, d: 7, p: 1 },
                CompactClass { i: 0, d: 1, p: 0 },
                CompactClass { i: -1, d: 1, p: 1 },
                CompactClass { i: 0, d: 4, p: 5 },
            ]),
        };

        let expanded = expand(payload).unwrap();

        let reasons: Vec<SkipReason> = expanded.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::DayOutOfRange,
                SkipReason::PeriodOutOfRange,
                SkipReason::UnknownSubject,
            ]
        );
        assert_eq!(expanded.data.classes.len(), 1);
    }

    #[test]
    fn test_missing_lists_are_malformed() {
        let no_subjects = CompactPayload {
            s: None,
            c: Some(vec![]),
        };
        let no_classes = CompactPayload {
            s: Some(vec![compact_subject("Math", "#f00")]),
            c: None,
        };

        assert!(matches!(
            expand(no_subjects),
            Err(TransferError::MalformedPayload(_))
        ));
        assert!(matches!(
            expand(no_classes),
            Err(TransferError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_rejects_when_nothing_usable_remains() {
        let payload = CompactPayload {
            s: Some(vec![compact_subject("Math", "#f00")]),
            c: Some(vec![CompactClass { i: 3, d: 0, p: 1 }]),
        };

        assert!(matches!(
            expand(payload),
            Err(TransferError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_rejects_empty_subject_list_and_blank_names() {
        let empty = CompactPayload {
            s: Some(vec![]),
            c: Some(vec![]),
        };
        let blank = CompactPayload {
            s: Some(vec![compact_subject(" ", "#f00")]),
            c: Some(vec![]),
        };

        assert!(matches!(expand(empty), Err(TransferError::MalformedPayload(_))));
        assert!(matches!(expand(blank), Err(TransferError::MalformedPayload(_))));
    }

    #[test]
    fn test_subjects_without_classes_are_accepted() {
        let payload = CompactPayload {
            s: Some(vec![compact_subject("Math", "#f00")]),
            c: Some(vec![]),
        };

        let expanded = expand(payload).unwrap();

        assert_eq!(expanded.data.subjects.len(), 1);
        assert!(expanded.data.classes.is_empty());
    }
}
