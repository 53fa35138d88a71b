//! services/timetable/src/error.rs
//!
//! Defines the primary error type for the timetable service.

use crate::config::ConfigError;
use timetable_core::ports::PortError;
use timetable_core::transfer::TransferError;

/// The primary error type for the `timetable` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a failure while encoding, framing or restoring a transfer.
    #[error("Transfer Error: {0}")]
    Transfer(#[from] TransferError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., reading a timetable file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Represents a timetable file that is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
