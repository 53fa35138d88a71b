pub mod adapters;
pub mod config;
pub mod error;
pub mod file_format;
pub mod grid;
pub mod tasks;
pub mod transfer;
