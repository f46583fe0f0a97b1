//! Configuration module for the trade summary scraper
//!
//! This module defines the upstream API settings, the object store
//! connection and the local output location. Every field has a default
//! except the bucket name, which must come from the environment or the
//! config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upstream trade summary API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Full endpoint URL (e.g., "https://www.cse.lk/api/tradeSummary")
    pub url: String,
    pub user_agent: String,
    pub accept: String,
    pub referer: String,
    pub origin: String,
    /// Field of the response envelope holding the record array
    pub records_field: String,
    /// Optional proxy URL for HTTP requests (e.g., "http://proxy.example.com:8080")
    pub proxy: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://www.cse.lk/api/tradeSummary".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            accept: "application/json, text/plain, */*".to_string(),
            referer: "https://www.cse.lk/pages/trade-summary/trade-summary.component.html".to_string(),
            origin: "https://www.cse.lk".to_string(),
            records_field: "reqTradeSummery".to_string(),
            proxy: None,
        }
    }
}

/// S3-compatible storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Provider type: "gcs", "aws", "b2" (Backblaze B2), "r2" (Cloudflare R2), or "generic"
    pub provider: String,
    /// Region (optional, will use provider defaults if not specified)
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible services
    /// Examples:
    /// - Google Cloud Storage: "https://storage.googleapis.com"
    /// - Cloudflare R2: "https://<account-id>.r2.cloudflarestorage.com"
    /// - MinIO: "http://localhost:9000"
    pub endpoint: Option<String>,
    /// Force path-style addressing (true for most S3-compatible services)
    pub force_path_style: Option<bool>,
    /// Access key ID (HMAC key for GCS). Falls back to the default credential chain.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Prefix of the destination object key
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: "gcs".to_string(),
            region: None,
            endpoint: None,
            force_path_style: None,
            access_key_id: None,
            secret_access_key: None,
            key_prefix: "cse_trading_data".to_string(),
        }
    }
}

/// Local output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the CSV is written to before upload
    pub temp_dir: PathBuf,
    /// Leave the CSV in place after a successful upload
    pub keep_local_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            keep_local_file: true,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination bucket; absence fails the invocation before upload
    pub bucket_name: Option<String>,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config YAML")?;

        Ok(config)
    }

    /// Bucket name, ignoring blank values
    pub fn bucket(&self) -> Option<&str> {
        self.bucket_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Replace the bucket name when a value is given
    pub fn with_bucket(mut self, bucket: Option<String>) -> Self {
        if bucket.is_some() {
            self.bucket_name = bucket;
        }
        self
    }
}
