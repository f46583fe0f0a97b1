//! CSE Trade Summary Scraper Library
//!
//! Fetches the Colombo Stock Exchange trade summary, stamps every record
//! with the capture time and exchange-local date, writes a CSV and uploads
//! it to an S3-compatible bucket under `cse_trading_data/{YYYYMMDD}.csv`.

pub mod config;
pub mod error;
pub mod http_client;
pub mod transform;
pub mod writer;
pub mod s3_helper;
pub mod pipeline;
pub mod response;
pub mod server;

// Re-export commonly used types
pub use config::{Config, ApiConfig, StorageConfig, OutputConfig};
pub use error::ScrapeError;
pub use http_client::{HttpClient, HttpResponse, HttpTransport};
pub use transform::{CaptureTime, DataRow, EnrichedDataset};
pub use s3_helper::{ObjectStore, S3Helper, S3Provider};
pub use pipeline::{ScrapeOutcome, Scraper};
pub use response::{ScrapeResponse, Status};
