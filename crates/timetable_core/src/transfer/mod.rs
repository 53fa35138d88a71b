//! crates/timetable_core/src/transfer/mod.rs
//!
//! Device-to-device timetable transfer over a sequence of scannable codes.
//!
//! # Pipeline
//!
//! ```text
//! send:    TimetableExport -> compact -> encode -> split -> frames ("1/3:...", "2/3:...", ...)
//! receive: frame -> parse -> TransferSession::ingest -> ... -> Complete(text)
//!          text -> decode -> expand -> TimetableImport
//! ```
//!
//! - `compact`: array-indexed representation where classes point at subjects by position
//! - `compressor`: JSON text, zlib, then base64 without `:` or `/`
//! - `framing`: `part/total:fragment` frames
//! - `session`: reassembly of frames that arrive out of order and repeated
//!
//! Every step is a pure synchronous transform; none of them touch storage.

pub mod compact;
pub mod compressor;
pub mod error;
pub mod framing;
pub mod session;

pub use compact::{
    compact, expand, reconcile, CompactPayload, Expanded, SkipReason, SkippedClass, UncheckedClass,
};
pub use compressor::{decode, encode};
pub use error::{TransferError, TransferResult};
pub use framing::{parse, split, Chunk};
pub use session::{IngestResult, SessionState, TransferSession};

/// Fragment size used when paging frames on the sending device.
pub const DEFAULT_FRAGMENT_SIZE: usize = 500;
