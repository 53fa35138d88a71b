//! Receive-side reassembly of one transfer.
//!
//! Scans arrive out of order, the same code is often read many times while it
//! stays in view, and a frame from another device's transfer can show up
//! mid-session. The session keeps one fragment per part and reports which of
//! those situations each frame represents.
//!
//! # States
//!
//! ```text
//! Idle --ingest--> Collecting --last part--> Complete
//!   ^                  |                        |
//!   +------reset-------+-----------reset--------+
//! ```
//!
//! # Thread Safety
//!
//! `ingest` is a plain synchronous state transition. The owner must make sure
//! only one frame is processed at a time.

use crate::transfer::framing::Chunk;
use std::collections::BTreeMap;
use tracing::debug;

/// Outcome of feeding one frame into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    /// New part stored; carries the number of distinct parts held now.
    Accepted(usize),
    /// This part was already held. Nothing changed.
    DuplicateIgnored,
    /// Every part is present; carries the fragments joined in part order.
    Complete(String),
    /// The frame's total differs from this transfer's. Nothing changed.
    SessionMismatch { expected: u32, actual: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting { received: usize, total: u32 },
    Complete { total: u32 },
}

#[derive(Debug, Default)]
pub struct TransferSession {
    /// Fragments by part number; ordered so completion is a straight concatenation
    fragments: BTreeMap<u32, String>,

    /// Unknown until the first frame arrives, fixed afterwards
    expected_total: Option<u32>,
}

impl TransferSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame.
    ///
    /// The first frame fixes the transfer's total. A frame whose total differs
    /// yields `SessionMismatch`; a part already held yields `DuplicateIgnored`.
    /// Neither changes the session.
    pub fn ingest(&mut self, chunk: Chunk) -> IngestResult {
        let total = *self.expected_total.get_or_insert(chunk.total());

        if chunk.total() != total {
            debug!(
                expected = total,
                actual = chunk.total(),
                "Frame belongs to a different transfer."
            );
            return IngestResult::SessionMismatch {
                expected: total,
                actual: chunk.total(),
            };
        }

        let part = chunk.part();
        if self.fragments.contains_key(&part) {
            return IngestResult::DuplicateIgnored;
        }

        self.fragments.insert(part, chunk.into_fragment());
        let received = self.fragments.len();
        debug!(part, received, total, "Stored frame.");

        if received == total as usize {
            IngestResult::Complete(self.fragments.values().map(String::as_str).collect())
        } else {
            IngestResult::Accepted(received)
        }
    }

    /// Forget every fragment and the expected total.
    pub fn reset(&mut self) {
        self.fragments.clear();
        self.expected_total = None;
    }

    pub fn state(&self) -> SessionState {
        match self.expected_total {
            None => SessionState::Idle,
            Some(total) if self.fragments.len() == total as usize => {
                SessionState::Complete { total }
            }
            Some(total) => SessionState::Collecting {
                received: self.fragments.len(),
                total,
            },
        }
    }

    /// Number of distinct parts held.
    pub fn received(&self) -> usize {
        self.fragments.len()
    }

    pub fn expected_total(&self) -> Option<u32> {
        self.expected_total
    }

    /// Parts not yet scanned, ascending. Empty while idle.
    pub fn missing_parts(&self) -> Vec<u32> {
        match self.expected_total {
            Some(total) => (1..=total)
                .filter(|part| !self.fragments.contains_key(part))
                .collect(),
            None => Vec::new(),
        }
    }
}
