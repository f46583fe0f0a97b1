//! HTTP client module for fetching the trade summary
//!
//! This module issues the single POST to the exchange API. The transport
//! sits behind the `HttpTransport` trait so the fetch logic can run against
//! canned responses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::ScrapeError;
use crate::transform::extract_records;

/// Status and body of an upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Anything able to POST a JSON body and hand back the raw response
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse>;
}

/// reqwest-backed transport
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client, routed through `proxy` when given
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .context(format!("Failed to configure proxy: {}", proxy_url))?;
            builder = builder.proxy(proxy);
            info!("HTTP client configured with proxy: {}", proxy_url);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    fn header_map(headers: &[(&str, &str)]) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_str(name)
                .context(format!("Invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .context(format!("Invalid value for header {}", name))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse> {
        let headers = Self::header_map(headers)?;

        // Body is serialized by hand so the Content-Type header from the caller is kept as-is
        let payload = serde_json::to_vec(body).context("Failed to serialize request body")?;

        let response = self.client
            .post(url)
            .headers(headers)
            .body(payload)
            .send()
            .await
            .context(format!("Failed to send HTTP request to {}", url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context(format!("Failed to read response body from {}", url))?;

        Ok(HttpResponse { status, body })
    }
}

/// Fixed header set sent with every trade summary request
pub fn request_headers(api: &ApiConfig) -> Vec<(&str, &str)> {
    vec![
        ("User-Agent", api.user_agent.as_str()),
        ("Accept", api.accept.as_str()),
        ("Content-Type", "application/json"),
        ("Referer", api.referer.as_str()),
        ("Origin", api.origin.as_str()),
    ]
}

/// Fetch the raw trade summary records
///
/// One attempt, no retries. A non-200 status becomes `ScrapeError::Fetch`,
/// a missing or empty record array becomes `ScrapeError::EmptyData`.
///
/// # Arguments
/// * `transport` - Where the POST goes (reqwest in production)
/// * `api` - Endpoint URL, header values and the envelope field name
///
/// # Returns
/// The non-empty record array, untouched
pub async fn fetch_trade_summary(
    transport: &dyn HttpTransport,
    api: &ApiConfig,
) -> crate::error::Result<Vec<Value>> {
    info!("Requesting trade summary from {}", api.url);

    let headers = request_headers(api);
    let response = transport
        .post_json(&api.url, &headers, &Value::Object(Default::default()))
        .await?;

    debug!("Upstream answered {} ({} bytes)", response.status, response.body.len());

    if response.status != 200 {
        warn!("Trade summary request failed with status {}", response.status);
        return Err(ScrapeError::Fetch {
            status: response.status,
            body: response.body,
        });
    }

    let records = extract_records(&response.body, &api.records_field)?;
    if records.is_empty() {
        warn!("Trade summary response carried no records");
        return Err(ScrapeError::EmptyData);
    }

    info!("Fetched {} trade summary records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns one canned response and remembers what was sent
    struct CannedTransport {
        response: HttpResponse,
        seen: Mutex<Vec<(String, Vec<(String, String)>, Value)>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse { status, body: body.to_string() },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn post_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
            body: &Value,
        ) -> Result<HttpResponse> {
            let headers = headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            self.seen.lock().unwrap().push((url.to_string(), headers, body.clone()));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_records() {
        let transport = CannedTransport::new(
            200,
            r#"{"reqTradeSummery":[{"symbol":"JKH.N0000","price":190.5},{"symbol":"COMB.N0000","price":101.0}]}"#,
        );
        let api = ApiConfig::default();

        let records = fetch_trade_summary(&transport, &api).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["symbol"], "JKH.N0000");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (url, headers, body) = &seen[0];
        assert_eq!(url, "https://www.cse.lk/api/tradeSummary");
        assert_eq!(body, &serde_json::json!({}));
        assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
        assert!(headers.contains(&("Origin".to_string(), "https://www.cse.lk".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_fetch_error() {
        let transport = CannedTransport::new(403, "Forbidden");
        let err = fetch_trade_summary(&transport, &ApiConfig::default()).await.unwrap_err();
        match err {
            ScrapeError::Fetch { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "Forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_or_missing_records() {
        for body in [r#"{"reqTradeSummery":[]}"#, r#"{"somethingElse":1}"#, r#"{"reqTradeSummery":null}"#] {
            let transport = CannedTransport::new(200, body);
            let err = fetch_trade_summary(&transport, &ApiConfig::default()).await.unwrap_err();
            assert!(matches!(err, ScrapeError::EmptyData), "body {body} gave {err:?}");
        }
    }

    #[tokio::test]
    async fn test_fetch_invalid_json_is_unknown() {
        let transport = CannedTransport::new(200, "<html>maintenance</html>");
        let err = fetch_trade_summary(&transport, &ApiConfig::default()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Unknown(_)));
    }

    #[tokio::test]
    async fn test_http_client_sends_fixed_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tradeSummary")
            .match_header("content-type", "application/json")
            .match_header("user-agent", "Mozilla/5.0")
            .match_header("origin", "https://www.cse.lk")
            .match_header(
                "referer",
                "https://www.cse.lk/pages/trade-summary/trade-summary.component.html",
            )
            .match_body("{}")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"reqTradeSummery":[{"id":1}]}"#)
            .create_async()
            .await;

        let api = ApiConfig {
            url: format!("{}/api/tradeSummary", server.url()),
            ..ApiConfig::default()
        };
        let client = HttpClient::new(None).unwrap();

        let records = fetch_trade_summary(&client, &api).await.unwrap();
        assert_eq!(records.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_client_passes_error_status_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/tradeSummary")
            .with_status(500)
            .with_body("upstream down")
            .create_async()
            .await;

        let client = HttpClient::new(None).unwrap();
        let url = format!("{}/api/tradeSummary", server.url());
        let response = client
            .post_json(&url, &[("Content-Type", "application/json")], &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(response, HttpResponse { status: 500, body: "upstream down".to_string() });
    }
}
