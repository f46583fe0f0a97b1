//! S3 Helper Module
//!
//! This module provides the object store used for the final upload.
//! Uploads go through the `ObjectStore` trait; `S3Helper` implements it for
//! any S3-compatible service:
//! - Google Cloud Storage (XML API interoperability, HMAC keys)
//! - AWS S3
//! - Backblaze B2
//! - Cloudflare R2
//! - Any other S3-compatible service

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;

/// Google Cloud Storage XML API endpoint
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Anything able to store an object under a bucket and key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite `bucket/key`, returning the object's ETag
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String>;
}

/// S3 provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Provider {
    /// Google Cloud Storage through its S3-compatible API
    GoogleCloudStorage,
    /// Amazon Web Services S3
    AwsS3,
    /// Backblaze B2
    BackblazeB2,
    /// Cloudflare R2
    CloudflareR2,
    /// Generic S3-compatible service
    Generic,
}

impl S3Provider {
    /// Parse provider from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gcs" | "gcp" | "google" | "google-cloud-storage" => S3Provider::GoogleCloudStorage,
            "aws" | "s3" | "aws-s3" => S3Provider::AwsS3,
            "b2" | "backblaze" | "backblaze-b2" => S3Provider::BackblazeB2,
            "r2" | "cloudflare" | "cloudflare-r2" => S3Provider::CloudflareR2,
            _ => S3Provider::Generic,
        }
    }

    fn default_region(&self) -> &'static str {
        match self {
            S3Provider::GoogleCloudStorage => "auto",
            S3Provider::AwsS3 => "us-east-1",
            S3Provider::BackblazeB2 => "us-west-002",
            S3Provider::CloudflareR2 => "auto",
            S3Provider::Generic => "us-east-1",
        }
    }
}

/// Resolved connection settings for a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub region: String,
    pub url: Option<String>,
    pub force_path_style: bool,
}

/// Work out region, endpoint and addressing style from the config
pub fn resolve_endpoint(config: &StorageConfig) -> Result<Endpoint> {
    let provider = S3Provider::from_str(&config.provider);

    let region = config
        .region
        .clone()
        .unwrap_or_else(|| provider.default_region().to_string());

    if let Some(endpoint) = &config.endpoint {
        return Ok(Endpoint {
            region,
            url: Some(endpoint.clone()),
            force_path_style: config.force_path_style.unwrap_or(true),
        });
    }

    match provider {
        S3Provider::GoogleCloudStorage => Ok(Endpoint {
            region,
            url: Some(GCS_ENDPOINT.to_string()),
            force_path_style: config.force_path_style.unwrap_or(true),
        }),
        // AWS S3 uses virtual-hosted-style by default
        S3Provider::AwsS3 => Ok(Endpoint {
            region,
            url: None,
            force_path_style: config.force_path_style.unwrap_or(false),
        }),
        S3Provider::BackblazeB2 => {
            bail!("Backblaze B2 requires an endpoint URL (e.g., https://s3.us-west-002.backblazeb2.com)")
        }
        S3Provider::CloudflareR2 => {
            bail!("Cloudflare R2 requires an endpoint URL (e.g., https://<account-id>.r2.cloudflarestorage.com)")
        }
        S3Provider::Generic => {
            warn!("Generic S3 provider without endpoint - will use AWS S3");
            Ok(Endpoint {
                region,
                url: None,
                force_path_style: config.force_path_style.unwrap_or(false),
            })
        }
    }
}

/// GCS over the S3 API only accepts HMAC keys; the default credential
/// chain never finds Google application default credentials.
pub fn gcs_without_hmac_keys(config: &StorageConfig) -> bool {
    S3Provider::from_str(&config.provider) == S3Provider::GoogleCloudStorage
        && (config.access_key_id.is_none() || config.secret_access_key.is_none())
}

/// S3-compatible storage client
pub struct S3Helper {
    client: S3Client,
}

impl S3Helper {
    /// Create a new S3Helper instance
    ///
    /// Uses the configured access keys when both are present, otherwise the
    /// default credential chain (environment, profile, instance metadata).
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let client = Self::create_client(config)
            .await
            .context("Failed to create S3 client")?;

        Ok(Self { client })
    }

    async fn create_client(config: &StorageConfig) -> Result<S3Client> {
        let endpoint = resolve_endpoint(config)?;

        let region_provider = RegionProviderChain::first_try(Region::new(endpoint.region.clone()));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let credentials = Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,  // session token
                    None,  // expiration
                    "custom"  // provider name
                );
                loader = loader.credentials_provider(credentials);
            }
            (None, None) => {
                if gcs_without_hmac_keys(config) && std::env::var_os("AWS_ACCESS_KEY_ID").is_none() {
                    warn!(
                        "Provider gcs has no HMAC keys configured; set storage.access_key_id/secret_access_key \
                         or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY, uploads will fail otherwise"
                    );
                }
                debug!("No static keys configured, using default credential chain");
            }
            _ => bail!("access_key_id and secret_access_key must be set together"),
        }

        let aws_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(endpoint.force_path_style);

        if let Some(url) = &endpoint.url {
            s3_config_builder = s3_config_builder.endpoint_url(url);
        }

        info!(
            "S3 client ready (provider: {}, region: {}, endpoint: {})",
            config.provider,
            endpoint.region,
            endpoint.url.as_deref().unwrap_or("default")
        );

        Ok(S3Client::from_conf(s3_config_builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Helper {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String> {
        info!("Uploading {} bytes to s3://{}/{}", data.len(), bucket, key);

        let response = self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .context(format!("Failed to upload object to s3://{}/{}", bucket, key))?;

        let etag = response.e_tag()
            .unwrap_or("unknown")
            .to_string();

        info!("Successfully uploaded {} (ETag: {})", key, etag);
        Ok(etag)
    }
}
