//! Trade summary extraction and enrichment
//!
//! Pulls the record array out of the API envelope and turns it into a
//! table with the two capture metadata columns appended.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Asia::Colombo;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, ScrapeError};

/// One upstream record, field order preserved
pub type DataRow = Map<String, Value>;

pub const SCRAPE_TIME_COLUMN: &str = "Scrape_time_UTC";
pub const LOCAL_DATE_COLUMN: &str = "Date_Colombo";

/// Extract the record array from the response envelope
///
/// A missing or `null` field yields an empty vec; the caller decides
/// whether that is an error.
pub fn extract_records(body: &str, field: &str) -> Result<Vec<Value>> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!(e).context("Failed to parse trade summary JSON"))?;

    match parsed {
        Value::Object(mut obj) => match obj.remove(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(arr)) => Ok(arr),
            Some(other) => Err(ScrapeError::Transform(format!(
                "field '{}' is not an array (found {})",
                field,
                json_type(&other)
            ))),
        },
        other => Err(ScrapeError::Transform(format!(
            "expected a JSON object envelope, found {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Capture instant plus its date on the exchange calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    pub utc: DateTime<Utc>,
    pub local_date: NaiveDate,
}

impl CaptureTime {
    pub fn new(utc: DateTime<Utc>) -> Self {
        let local_date = utc.with_timezone(&Colombo).date_naive();
        Self { utc, local_date }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// `YYYYMMDD`, used for file names and object keys
    pub fn date_stem(&self) -> String {
        self.local_date.format("%Y%m%d").to_string()
    }

    /// `YYYY-MM-DD`, the `Date_Colombo` cell value
    pub fn date_string(&self) -> String {
        self.local_date.format("%Y-%m-%d").to_string()
    }

    /// UTC timestamp with offset, the `Scrape_time_UTC` cell value
    pub fn timestamp_string(&self) -> String {
        self.utc.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
    }

    /// Destination key, e.g. `cse_trading_data/20240316.csv`
    pub fn object_key(&self, prefix: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            format!("{}.csv", self.date_stem())
        } else {
            format!("{}/{}.csv", prefix, self.date_stem())
        }
    }
}

/// Records with capture metadata attached to every row
#[derive(Debug, Clone)]
pub struct EnrichedDataset {
    pub captured: CaptureTime,
    /// Union of record fields in first-seen order, then the metadata columns
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl EnrichedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the enriched table from raw records
///
/// Every record must be a JSON object. Records with differing field sets
/// produce the union of columns; absent cells stay empty. An upstream field
/// named like a metadata column is replaced by the metadata value.
///
/// # Arguments
/// * `records` - Raw records from the response envelope, in upstream order
/// * `captured` - Capture instant stamped on every row
///
/// # Returns
/// The dataset with `Scrape_time_UTC` and `Date_Colombo` as the last two columns,
/// or `ScrapeError::Transform` for a record that is not an object
pub fn enrich(records: Vec<Value>, captured: CaptureTime) -> Result<EnrichedDataset> {
    let scrape_time = Value::String(captured.timestamp_string());
    let local_date = Value::String(captured.date_string());

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (idx, record) in records.into_iter().enumerate() {
        let mut row = match record {
            Value::Object(obj) => obj,
            other => {
                return Err(ScrapeError::Transform(format!(
                    "record {} is a {}, expected an object",
                    idx,
                    json_type(&other)
                )))
            }
        };

        for key in row.keys() {
            if key != SCRAPE_TIME_COLUMN
                && key != LOCAL_DATE_COLUMN
                && !columns.iter().any(|c| c == key)
            {
                columns.push(key.clone());
            }
        }

        row.shift_remove(SCRAPE_TIME_COLUMN);
        row.shift_remove(LOCAL_DATE_COLUMN);
        row.insert(SCRAPE_TIME_COLUMN.to_string(), scrape_time.clone());
        row.insert(LOCAL_DATE_COLUMN.to_string(), local_date.clone());
        rows.push(row);
    }

    columns.push(SCRAPE_TIME_COLUMN.to_string());
    columns.push(LOCAL_DATE_COLUMN.to_string());

    debug!("Enriched {} rows across {} columns", rows.len(), columns.len());

    Ok(EnrichedDataset { captured, columns, rows })
}
