//! JSON body returned to whatever triggered the invocation

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::pipeline::ScrapeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

/// `{"status": ..., "message": ..., ...}` with optional detail fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_scraped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ScrapeResponse {
    pub fn success(outcome: &ScrapeOutcome) -> Self {
        Self {
            status: Status::Success,
            message: format!("Uploaded {} to bucket {}.", outcome.key, outcome.bucket),
            records_scraped: Some(outcome.records),
            error: None,
            details: None,
        }
    }

    pub fn failure(err: &ScrapeError) -> Self {
        let mut response = Self {
            status: Status::Fail,
            message: err.to_string(),
            records_scraped: None,
            error: None,
            details: None,
        };

        match err {
            ScrapeError::Fetch { body, .. } => response.details = Some(body.clone()),
            ScrapeError::EmptyData | ScrapeError::Config(_) => {}
            other => {
                response.message = "An error occurred while scraping or uploading.".to_string();
                response.error = Some(other.to_string());
            }
        }

        response
    }

    /// Map an invocation result to its body and HTTP status
    pub fn from_result(result: &crate::error::Result<ScrapeOutcome>) -> (Self, u16) {
        match result {
            Ok(outcome) => (Self::success(outcome), 200),
            Err(err) => (Self::failure(err), err.status_code()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
