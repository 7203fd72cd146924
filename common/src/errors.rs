// Error handling framework
// Every failure below ends the run with a non-zero exit status.

use thiserror::Error;

/// Configuration and credential errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required credential: {0}")]
    MissingCredential(String),

    #[error("Invalid setting for {field}: {reason}")]
    InvalidSetting { field: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },
}

/// Twitter/X API errors
#[derive(Error, Debug)]
pub enum TwitterError {
    #[error("Twitter request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twitter API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Twitter rate limit exceeded (resets at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },

    #[error("Failed to decode Twitter response: {0}")]
    Decode(String),
}

/// Telegram notification errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Telegram rejected the message: {0}")]
    Rejected(String),
}

/// Gist state persistence errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Gist request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gist not found: {0}")]
    MissingGist(String),

    #[error("Malformed detector state: {0}")]
    Malformed(String),
}

/// CSV export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Top-level error for a single detection run
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Twitter(#[from] TwitterError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Malformed(err.to_string())
    }
}
