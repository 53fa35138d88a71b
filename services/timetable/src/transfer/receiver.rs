//! services/timetable/src/transfer/receiver.rs
//!
//! Scan-side orchestration.
//!
//! The camera keeps reporting the same code while it stays in view, so the
//! controller locks itself whenever it puts a prompt in front of the user and
//! drops every scan until that prompt is answered. Nothing is written to
//! storage until the user confirms the decoded timetable.
//!
//! ```text
//! on_scan ──> busy? ──yes──> Ignored
//!               │no
//!             parse ──err──> Prompt(InvalidFrame)
//!               │
//!             ingest ──dup──> Duplicate (stays unlocked)
//!               ├── mismatch ──> Prompt(SessionMismatch)   resolve -> reset
//!               ├── accepted ──> Prompt(Progress)          resolve -> unlock
//!               └── complete ──> decode/expand
//!                                  ├── ok ──> Prompt(ConfirmImport)  resolve(Confirm) -> import, reset
//!                                  └── err ─> Prompt(RestoreFailed)  (already reset)
//! ```

use crate::error::AppError;
use crate::tasks::TaskPlanner;
use std::fmt;
use std::io::Write;
use timetable_core::domain::TimetableImport;
use timetable_core::transfer::{
    decode, expand, parse, Expanded, IngestResult, SessionState, TransferError, TransferSession,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

/// Counts shown to the user before an import is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportPreview {
    pub subjects: usize,
    pub classes: usize,
    pub skipped: usize,
}

impl ImportPreview {
    fn of(expanded: &Expanded) -> Self {
        Self {
            subjects: expanded.data.subjects.len(),
            classes: expanded.data.classes.len(),
            skipped: expanded.skipped.len(),
        }
    }
}

/// Something the user has to look at before scanning resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Progress { received: usize, total: u32 },
    InvalidFrame { reason: String },
    SessionMismatch { expected: u32, actual: u32 },
    ConfirmImport(ImportPreview),
    RestoreFailed { reason: String },
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Progress { received, total } => {
                write!(f, "Scanned {received} of {total}. Scan the next code.")
            }
            Prompt::InvalidFrame { reason } => {
                write!(f, "This is not a timetable code ({reason}).")
            }
            Prompt::SessionMismatch { expected, actual } => write!(
                f,
                "This code belongs to a different transfer ({actual} parts, expected {expected}). Starting over."
            ),
            Prompt::ConfirmImport(preview) => {
                write!(
                    f,
                    "Received {} subjects and {} classes.",
                    preview.subjects, preview.classes
                )?;
                if preview.skipped > 0 {
                    write!(f, " {} classes could not be placed and will be left out.", preview.skipped)?;
                }
                write!(f, " Replace the current timetable? All tasks will be deleted.")
            }
            Prompt::RestoreFailed { reason } => write!(f, "Could not restore the timetable: {reason}"),
        }
    }
}

impl Prompt {
    /// Whether `answer` closes this prompt. An import needs a yes or a no;
    /// everything else is acknowledged.
    pub fn accepts(&self, answer: Answer) -> bool {
        match self {
            Prompt::ConfirmImport(_) => matches!(answer, Answer::Confirm | Answer::Cancel),
            _ => answer == Answer::Acknowledge,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Prompt::ConfirmImport(_) => "Type y to replace the timetable or n to keep it.",
            _ => "Type ok to continue.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A prompt is open; the scan was dropped.
    Ignored,
    /// The part was already held.
    Duplicate,
    Prompt(Prompt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Acknowledge,
    Confirm,
    Cancel,
}

/// One line read at the receiving console.
///
/// Scanner input and typed answers share the line stream, so only a few
/// explicit words count as answers. Everything else is a scan, which the
/// busy gate drops while a prompt is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Scan(String),
    Answer(Answer),
    Blank,
}

impl ConsoleInput {
    pub fn classify(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleInput::Blank;
        }
        match line.to_ascii_lowercase().as_str() {
            "y" | "yes" => ConsoleInput::Answer(Answer::Confirm),
            "n" | "no" => ConsoleInput::Answer(Answer::Cancel),
            "ok" => ConsoleInput::Answer(Answer::Acknowledge),
            _ => ConsoleInput::Scan(line.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Scanning continues with the current session.
    Resumed,
    /// The session was discarded; scanning starts from scratch.
    Reset,
    Imported(ImportPreview),
}

pub struct ReceiveController {
    planner: TaskPlanner,
    session: TransferSession,
    busy: bool,
    pending: Option<Prompt>,
    staged: Option<TimetableImport>,
}

impl ReceiveController {
    pub fn new(planner: TaskPlanner) -> Self {
        Self {
            planner,
            session: TransferSession::new(),
            busy: false,
            pending: None,
            staged: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn pending(&self) -> Option<&Prompt> {
        self.pending.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Status line for the scanner view, e.g. `Scanning: 2 / 5`.
    pub fn progress(&self) -> Option<String> {
        match self.session.state() {
            SessionState::Idle => None,
            SessionState::Collecting { received, total } => {
                Some(format!("Scanning: {received} / {total}"))
            }
            SessionState::Complete { total } => Some(format!("Scanning: {total} / {total}")),
        }
    }

    /// Handles one decoded scan.
    pub fn on_scan(&mut self, raw: &str) -> ScanOutcome {
        if self.busy {
            debug!("Prompt open, dropping scan.");
            return ScanOutcome::Ignored;
        }
        self.busy = true;

        let chunk = match parse(raw.trim()) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Rejected scan: {}", e);
                return self.open(Prompt::InvalidFrame {
                    reason: e.to_string(),
                });
            }
        };
        let (part, total) = (chunk.part(), chunk.total());

        match self.session.ingest(chunk) {
            IngestResult::DuplicateIgnored => {
                debug!(part, total, "Duplicate scan.");
                self.busy = false;
                ScanOutcome::Duplicate
            }
            IngestResult::SessionMismatch { expected, actual } => {
                warn!(expected, actual, "Scan from another transfer.");
                self.open(Prompt::SessionMismatch { expected, actual })
            }
            IngestResult::Accepted(received) => {
                info!(part, received, total, "Part scanned.");
                self.open(Prompt::Progress { received, total })
            }
            IngestResult::Complete(text) => {
                info!(total, encoded_len = text.len(), "All parts scanned.");
                match decode(&text).and_then(expand) {
                    Ok(expanded) => {
                        let preview = ImportPreview::of(&expanded);
                        for skipped in &expanded.skipped {
                            warn!(position = skipped.position, "Class left out: {}", skipped.reason);
                        }
                        self.staged = Some(expanded.data);
                        self.open(Prompt::ConfirmImport(preview))
                    }
                    Err(e) => {
                        error!("Could not restore scanned payload: {}", e);
                        self.session.reset();
                        self.open(Prompt::RestoreFailed {
                            reason: e.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Answers the open prompt. Without one this does nothing.
    ///
    /// A confirmed import that fails to persist leaves the stored timetable
    /// untouched, resets the session, and returns the error.
    pub async fn resolve(&mut self, answer: Answer) -> Result<Resolution, AppError> {
        let Some(prompt) = self.pending.take() else {
            return Ok(Resolution::Resumed);
        };

        match prompt {
            Prompt::Progress { .. } | Prompt::InvalidFrame { .. } | Prompt::RestoreFailed { .. } => {
                self.busy = false;
                Ok(Resolution::Resumed)
            }
            Prompt::SessionMismatch { .. } => {
                self.reset();
                Ok(Resolution::Reset)
            }
            Prompt::ConfirmImport(preview) => {
                let staged = self.staged.take();
                self.reset();

                let data = match (answer, staged) {
                    (Answer::Confirm, Some(data)) => data,
                    _ => {
                        info!("Import cancelled.");
                        return Ok(Resolution::Reset);
                    }
                };

                if let Err(e) = self.planner.replace_timetable(&data).await {
                    error!("Failed to store scanned timetable: {}", e);
                    return Err(TransferError::Persistence(e).into());
                }
                info!(
                    subjects = preview.subjects,
                    classes = preview.classes,
                    "Scanned timetable imported."
                );
                Ok(Resolution::Imported(preview))
            }
        }
    }

    /// Reads scans and answers line by line from `input` and writes prompts to
    /// `out` until an import succeeds or the input ends.
    ///
    /// Returns the preview of the imported timetable, or `None` if the input
    /// ended first. A failed import is reported on `out` and scanning goes on.
    pub async fn run_console<R, W>(
        &mut self,
        input: R,
        out: &mut W,
    ) -> Result<Option<ImportPreview>, AppError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        writeln!(out, "Waiting for codes...")?;

        while let Some(line) = lines.next_line().await? {
            match ConsoleInput::classify(&line) {
                ConsoleInput::Blank => {}
                ConsoleInput::Scan(text) => match self.on_scan(&text) {
                    ScanOutcome::Prompt(prompt) => {
                        writeln!(out, "{prompt}")?;
                        writeln!(out, "{}", prompt.hint())?;
                    }
                    ScanOutcome::Duplicate => writeln!(out, "Already scanned.")?,
                    ScanOutcome::Ignored => {}
                },
                ConsoleInput::Answer(answer) => {
                    let Some(prompt) = self.pending() else {
                        continue;
                    };
                    if !prompt.accepts(answer) {
                        writeln!(out, "{}", prompt.hint())?;
                        continue;
                    }
                    match self.resolve(answer).await {
                        Ok(Resolution::Imported(preview)) => {
                            writeln!(
                                out,
                                "Timetable restored: {} subjects, {} classes.",
                                preview.subjects, preview.classes
                            )?;
                            return Ok(Some(preview));
                        }
                        Ok(Resolution::Reset) => writeln!(out, "Starting over.")?,
                        Ok(Resolution::Resumed) => {
                            if let Some(status) = self.progress() {
                                writeln!(out, "{status}")?;
                            }
                        }
                        Err(e) => writeln!(out, "Import failed: {e}")?,
                    }
                }
            }
        }

        self.close();
        Ok(None)
    }

    /// The user left the scanner. Whatever was collected is dropped.
    pub fn close(&mut self) {
        if self.session.state() != SessionState::Idle {
            info!(missing = ?self.session.missing_parts(), "Scanner closed mid-transfer.");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.session.reset();
        self.busy = false;
        self.pending = None;
        self.staged = None;
    }

    fn open(&mut self, prompt: Prompt) -> ScanOutcome {
        self.pending = Some(prompt.clone());
        ScanOutcome::Prompt(prompt)
    }
}
