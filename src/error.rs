//! Error types for certgen.
//!
//! Fatal categories (`ConfigError`, `SchemaError`, I/O) abort a run before any
//! record is processed. Per-record categories (`InvalidInputError`,
//! `RenderError`) and per-notification `DeliveryError` are handled inside the
//! pipeline loops and never convert into the top-level [`Error`].

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for a certificate run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Input table and template path errors.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file format for {path}: expected {expected}")]
    UnsupportedFormat { path: PathBuf, expected: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Table {} has no data rows", .0.display())]
    Empty(PathBuf),

    #[error("Column not found: {column} (available: {})", .available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
}

/// A participant row whose name cannot be formatted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInputError {
    #[error("name is missing or not text")]
    NotText,

    #[error("name is empty")]
    EmptyName,
}

/// Certificate rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template {path} is invalid: {reason}")]
    Template { path: PathBuf, reason: String },

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF conversion failed for {name}: {reason}")]
    Conversion { name: String, reason: String },

    #[error("PDF conversion for {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Attachment not found: {}", .0.display())]
    MissingAttachment(PathBuf),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message for {recipient}: {reason}")]
    Message { recipient: String, reason: String },

    #[error("Server rejected message for {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },

    #[error("Transport failure sending to {recipient}: {reason}")]
    Transport { recipient: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for certgen.
pub type Result<T> = std::result::Result<T, Error>;
