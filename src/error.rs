//! Error taxonomy for a scrape invocation
//!
//! Every failure ends the invocation and is reported to the caller as a
//! JSON failure body with HTTP status 500.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of one scrape invocation
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Upstream API answered with a non-200 status
    #[error("Failed to fetch data: {status}")]
    Fetch { status: u16, body: String },

    /// Upstream API answered 200 but carried no records
    #[error("No data returned from CSE API.")]
    EmptyData,

    /// Required configuration is missing
    #[error("{0}")]
    Config(String),

    /// Records could not be turned into a table
    #[error("Failed to transform trade summary: {0}")]
    Transform(String),

    /// Object store rejected the upload
    #[error("Failed to upload {key}: {source:#}")]
    Upload {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Local filesystem failure
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Anything else (transport errors, malformed JSON, ...)
    #[error("{0:#}")]
    Unknown(#[from] anyhow::Error),
}

impl ScrapeError {
    pub fn missing_bucket() -> Self {
        ScrapeError::Config("BUCKET_NAME environment variable not set.".to_string())
    }

    /// Short machine-readable name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Fetch { .. } => "fetch",
            ScrapeError::EmptyData => "empty_data",
            ScrapeError::Config(_) => "config",
            ScrapeError::Transform(_) => "transform",
            ScrapeError::Upload { .. } => "upload",
            ScrapeError::Io { .. } => "io",
            ScrapeError::Unknown(_) => "unknown",
        }
    }

    /// HTTP status reported to the trigger; all failures are terminal
    pub fn status_code(&self) -> u16 {
        500
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
