//! services/timetable/src/transfer/sender.rs

use crate::error::AppError;
use std::num::NonZeroUsize;
use timetable_core::domain::TimetableExport;
use timetable_core::ports::PersistenceService;
use timetable_core::transfer::{compact, encode, split, Chunk};
use tracing::info;

/// The frames of one outgoing transfer and which of them is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendController {
    frames: Vec<String>,
    index: usize,
}

impl SendController {
    /// Reads the stored timetable and turns it into frames.
    pub async fn prepare(
        db: &dyn PersistenceService,
        fragment_size: NonZeroUsize,
    ) -> Result<Self, AppError> {
        let timetable = db.export_all().await?;
        Self::from_export(&timetable, fragment_size)
    }

    pub fn from_export(
        timetable: &TimetableExport,
        fragment_size: NonZeroUsize,
    ) -> Result<Self, AppError> {
        let payload = compact(&timetable.subjects, &timetable.classes);
        let encoded = encode(&payload)?;
        let frames: Vec<String> = split(&encoded, fragment_size)
            .iter()
            .map(Chunk::frame)
            .collect();

        info!(
            subjects = timetable.subjects.len(),
            classes = timetable.classes.len(),
            encoded_len = encoded.len(),
            frames = frames.len(),
            "Transfer prepared."
        );
        Ok(Self { frames, index: 0 })
    }

    pub fn current(&self) -> &str {
        &self.frames[self.index]
    }

    /// Moves forward one frame. Stays on the last frame.
    pub fn next_frame(&mut self) -> &str {
        if self.has_next() {
            self.index += 1;
        }
        self.current()
    }

    /// Moves back one frame. Stays on the first frame.
    pub fn previous_frame(&mut self) -> &str {
        if self.has_previous() {
            self.index -= 1;
        }
        self.current()
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.frames.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// One-based position of the current frame and the frame count.
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.frames.len())
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }
}
