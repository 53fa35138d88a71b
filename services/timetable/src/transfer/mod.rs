//! services/timetable/src/transfer/mod.rs
//!
//! Drives the code-by-code transfer on both devices. The sender pages through
//! prepared frames; the receiver feeds scans into a `TransferSession` and asks
//! the user before anything is written.

pub mod receiver;
pub mod sender;

pub use receiver::{
    Answer, ConsoleInput, ImportPreview, Prompt, ReceiveController, Resolution, ScanOutcome,
};
pub use sender::SendController;
