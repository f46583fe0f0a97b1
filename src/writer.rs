//! CSV writer for enriched datasets
//!
//! Header row, then one line per record, columns in dataset order and no
//! index column.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ScrapeError;
use crate::transform::EnrichedDataset;

/// Render one cell
fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Serialize the dataset into CSV bytes
pub fn to_csv_bytes(dataset: &EnrichedDataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&dataset.columns)
        .context("Failed to write CSV header")?;

    for (idx, row) in dataset.rows.iter().enumerate() {
        let record = dataset
            .columns
            .iter()
            .map(|column| render_cell(row.get(column)));
        writer
            .write_record(record)
            .context(format!("Failed to write CSV row {}", idx))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))
}

/// Local CSV path for a dataset, `{dir}/{YYYYMMDD}.csv`
pub fn local_csv_path(dir: &Path, dataset: &EnrichedDataset) -> PathBuf {
    dir.join(format!("{}.csv", dataset.captured.date_stem()))
}

/// Write the dataset to `path`, replacing any existing file
///
/// Returns the number of bytes written.
pub async fn write_csv(dataset: &EnrichedDataset, path: &Path) -> crate::error::Result<usize> {
    let bytes = to_csv_bytes(dataset)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ScrapeError::Io { path: parent.to_path_buf(), source })?;
    }

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ScrapeError::Io { path: path.to_path_buf(), source })?;

    info!("Wrote {} rows ({} bytes) to {:?}", dataset.len(), bytes.len(), path);
    Ok(bytes.len())
}
