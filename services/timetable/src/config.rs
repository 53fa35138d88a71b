//! services/timetable/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use timetable_core::transfer::DEFAULT_FRAGMENT_SIZE;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub log_level: Level,
    /// Characters of encoded payload per code.
    pub fragment_size: NonZeroUsize,
    /// Local hour on the due date at which task reminders fire.
    pub reminder_hour: u32,
    pub export_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Storage ---
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://timetable.db?mode=rwc".to_string());
        if database_url.trim().is_empty() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Transfer ---
        let fragment_size = match std::env::var("QR_FRAGMENT_SIZE") {
            Ok(raw) => raw
                .parse::<NonZeroUsize>()
                .map_err(|e| ConfigError::InvalidValue("QR_FRAGMENT_SIZE".to_string(), e.to_string()))?,
            Err(_) => NonZeroUsize::new(DEFAULT_FRAGMENT_SIZE)
                .ok_or_else(|| ConfigError::MissingVar("QR_FRAGMENT_SIZE".to_string()))?,
        };

        // --- Reminders ---
        let reminder_hour = match std::env::var("REMINDER_HOUR") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|hour| *hour < 24)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "REMINDER_HOUR".to_string(),
                        format!("'{}' is not an hour between 0 and 23", raw),
                    )
                })?,
            Err(_) => 9,
        };

        let export_path = std::env::var("EXPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./timetable.json"));

        Ok(Self {
            database_url,
            log_level,
            fragment_size,
            reminder_hour,
            export_path,
        })
    }
}
