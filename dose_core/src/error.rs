//! Error types for the dose_core library.

use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dose_core operations
///
/// None of these are fatal: every variant is a recoverable outcome that the
/// caller turns into a message or a fallback state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Attempted to mark a day that is neither a scheduled dose day nor the start date
    #[error("{0} is not a scheduled dose day")]
    InvalidDoseDay(NaiveDate),

    /// Attempted to mutate a day earlier than the treatment start date
    #[error("{0} is before the treatment start date")]
    DateBeforeStart(NaiveDate),

    /// Persisted regimen document is corrupt or incomplete
    #[error("Malformed persisted state: {0}")]
    MalformedPersistedState(String),

    /// Analytics requested before a "today" value was supplied
    #[error("Today's date has not been resolved yet")]
    UnresolvedToday,

    /// Operation requires a regimen but none is configured
    #[error("No regimen configured")]
    NoRegimen,

    /// Schedule policy failed validation
    #[error("Invalid schedule policy: {0}")]
    InvalidPolicy(String),

    /// Profile metadata failed validation
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
