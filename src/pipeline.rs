//! One scrape invocation: fetch, enrich, write CSV, upload
//!
//! Steps run strictly in order and the first failure ends the invocation.
//! Nothing is uploaded unless every record made it into the local CSV.

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::http_client::{fetch_trade_summary, HttpTransport};
use crate::response::ScrapeResponse;
use crate::s3_helper::ObjectStore;
use crate::transform::{enrich, CaptureTime};
use crate::writer::{local_csv_path, write_csv};

const CSV_CONTENT_TYPE: &str = "text/csv";

/// What a successful invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub bucket: String,
    pub key: String,
    pub records: usize,
    pub local_path: PathBuf,
    pub etag: String,
}

/// Scrape workflow with its collaborators injected
pub struct Scraper {
    config: Config,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn ObjectStore>,
}

impl Scraper {
    pub fn new(config: Config, transport: Arc<dyn HttpTransport>, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, transport, store }
    }

    /// Run one invocation captured at the current instant
    pub async fn run(&self) -> Result<ScrapeOutcome> {
        self.run_at(CaptureTime::now()).await
    }

    /// Run one invocation and turn the result into the trigger's response
    pub async fn invoke(&self) -> (ScrapeResponse, u16) {
        let result = self.run().await;
        if let Err(err) = &result {
            error!("Scrape failed ({}): {}", err.kind(), err);
        }
        ScrapeResponse::from_result(&result)
    }

    /// Run one invocation for a given capture instant
    ///
    /// Fetches the trade summary, enriches it, writes the CSV into a
    /// directory owned by this invocation alone and uploads the bytes read
    /// back from that file. The store is only called once the whole CSV is
    /// on disk.
    ///
    /// # Arguments
    /// * `captured` - Capture instant; fixes the metadata columns and the object key
    ///
    /// # Returns
    /// Bucket, key, record count, local CSV path and ETag of the upload
    pub async fn run_at(&self, captured: CaptureTime) -> Result<ScrapeOutcome> {
        info!(
            "Starting scrape at {} (exchange date {})",
            captured.utc.to_rfc3339(),
            captured.date_string()
        );

        let records = fetch_trade_summary(self.transport.as_ref(), &self.config.api).await?;
        let dataset = enrich(records, captured)?;

        let bucket = self
            .config
            .bucket()
            .ok_or_else(ScrapeError::missing_bucket)?
            .to_string();
        let key = captured.object_key(&self.config.storage.key_prefix);

        // Removed on drop unless the invocation succeeds with keep_local_file set
        let workdir = self.invocation_dir().await?;
        let local_path = local_csv_path(workdir.path(), &dataset);
        write_csv(&dataset, &local_path).await?;

        let data = tokio::fs::read(&local_path)
            .await
            .map_err(|source| ScrapeError::Io { path: local_path.clone(), source })?;

        let etag = self
            .store
            .put_object(&bucket, &key, Bytes::from(data), CSV_CONTENT_TYPE)
            .await
            .map_err(|source| ScrapeError::Upload { key: key.clone(), source })?;

        if self.config.output.keep_local_file {
            let kept = workdir.keep();
            debug!("Keeping local CSV under {:?}", kept);
        } else if let Err(e) = workdir.close() {
            warn!("Failed to remove local CSV {:?}: {}", local_path, e);
        }

        info!(
            "Uploaded {} records to {}/{} (ETag: {})",
            dataset.len(),
            bucket,
            key,
            etag
        );

        Ok(ScrapeOutcome {
            bucket,
            key,
            records: dataset.len(),
            local_path,
            etag,
        })
    }

    /// Fresh `{temp_dir}/cse-XXXXXX` directory for one invocation
    async fn invocation_dir(&self) -> Result<TempDir> {
        let base = &self.config.output.temp_dir;

        tokio::fs::create_dir_all(base)
            .await
            .map_err(|source| ScrapeError::Io { path: base.clone(), source })?;

        tempfile::Builder::new()
            .prefix("cse-")
            .tempdir_in(base)
            .map_err(|source| ScrapeError::Io { path: base.clone(), source })
    }
}
