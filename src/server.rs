//! HTTP trigger
//!
//! Each request to `/` runs one scrape invocation. The request payload is
//! ignored; the reply is the JSON body with status 200 or 500.

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::pipeline::Scraper;

pub fn router(scraper: Arc<Scraper>) -> Router {
    Router::new()
        .route("/", any(trigger))
        .route("/health", get(health_check))
        .with_state(scraper)
}

/// Bind `port` on all interfaces and serve until the process stops
pub async fn serve(scraper: Arc<Scraper>, port: u16) -> Result<()> {
    let bind_addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Trigger listening on http://{}", bind_addr);

    axum::serve(listener, router(scraper)).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn trigger(State(scraper): State<Arc<Scraper>>) -> Response {
    let (body, status) = scraper.invoke().await;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http_client::{HttpResponse, HttpTransport};
    use crate::s3_helper::ObjectStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use bytes::Bytes;
    use serde_json::Value;
    use tower::ServiceExt;

    struct CannedTransport(u16, &'static str);

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn post_json(
            &self,
            _url: &str,
            _headers: &[(&str, &str)],
            _body: &Value,
        ) -> anyhow::Result<HttpResponse> {
            Ok(HttpResponse { status: self.0, body: self.1.to_string() })
        }
    }

    struct NullStore;

    #[async_trait]
    impl ObjectStore for NullStore {
        async fn put_object(
            &self,
            _bucket: &str,
            _key: &str,
            _data: Bytes,
            _content_type: &str,
        ) -> anyhow::Result<String> {
            Ok("etag".to_string())
        }
    }

    fn app(status: u16, body: &'static str, dir: &std::path::Path) -> Router {
        let mut config = Config::default().with_bucket(Some("cse-archive".to_string()));
        config.output.temp_dir = dir.to_path_buf();
        router(Arc::new(Scraper::new(
            config,
            Arc::new(CannedTransport(status, body)),
            Arc::new(NullStore),
        )))
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from("{\"ignored\": true}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_trigger_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(200, r#"{"reqTradeSummery":[{"a":1},{"a":2}]}"#, dir.path());

        let (status, body) = call(app, "POST", "/").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["records_scraped"], 2);
    }

    #[tokio::test]
    async fn test_trigger_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(200, r#"{"reqTradeSummery":[]}"#, dir.path());

        let (status, body) = call(app, "GET", "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["message"], "No data returned from CSE API.");
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(app(500, "", dir.path()), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }
}
