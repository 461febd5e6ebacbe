//! HTTP client for the ingestion backend.
//!
//! Metrics are posted as a JSON array to the bulk metrics endpoint with the
//! data token in the query string. Schemas are managed through the
//! stream-schema API with the token as a bearer credential.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use tracing::{debug, info};
use url::Url;
use usage_metrics::{MetricSink, OutputMetric, SchemaDefinition, SchemaStore, UsageError};

use crate::error::{IngestError, Result};
use crate::wire::{ensure_accepted, parse_schema_list, truncate};

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const METRICS_PATH: &[&str] = &["api", "v1", "metrics"];
const SCHEMAS_PATH: &[&str] = &["api", "v2", "stream-schemas"];
const PROTOCOL: &str = "anodot30";

/// Client for the metric ingestion and schema APIs.
#[derive(Clone)]
pub struct IngestClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl fmt::Debug for IngestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl IngestClient {
    /// Creates a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot carry paths or the HTTP client
    /// cannot be built.
    pub fn new(base: Url, token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base, token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot carry paths or the HTTP client
    /// cannot be built.
    pub fn with_timeout(base: Url, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(IngestError::InvalidUrl {
                reason: format!("{base} cannot carry API paths"),
            });
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            token: token.into(),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| IngestError::InvalidUrl {
                reason: format!("{} cannot carry API paths", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn metrics_url(&self) -> Result<Url> {
        let mut url = self.endpoint(METRICS_PATH)?;
        url.query_pairs_mut()
            .append_pair("token", &self.token)
            .append_pair("protocol", PROTOCOL);
        Ok(url)
    }

    fn schema_request(&self, method: Method, extra: &[&str]) -> Result<RequestBuilder> {
        let segments: Vec<&str> = SCHEMAS_PATH.iter().chain(extra).copied().collect();
        let url = self.endpoint(&segments)?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn send(request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }
        Ok(body)
    }

    /// Submits one chunk of metrics.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error, or [`IngestError::Rejected`] if
    /// the backend lists errors in a successful response.
    pub async fn submit_metrics(&self, metrics: &[OutputMetric]) -> Result<()> {
        let request = self.http.post(self.metrics_url()?).json(metrics);
        let body = Self::send(request).await?;
        ensure_accepted(&body)?;
        debug!(count = metrics.len(), "metrics accepted");
        Ok(())
    }

    /// Lists the backend's schemas.
    ///
    /// # Errors
    ///
    /// Returns a transport, status, decode or rejection error.
    pub async fn list_schemas(&self) -> Result<Vec<SchemaDefinition>> {
        let request = self.schema_request(Method::GET, &["schemas"])?;
        let body = Self::send(request).await?;
        parse_schema_list(&body)
    }

    /// Creates a schema.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or rejection error.
    pub async fn create_schema(&self, schema: &SchemaDefinition) -> Result<()> {
        let request = self.schema_request(Method::POST, &[])?.json(schema);
        let body = Self::send(request).await?;
        ensure_accepted(&body)?;
        info!(schema = %schema.name, "schema created");
        Ok(())
    }

    /// Deletes a schema by id.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or rejection error.
    pub async fn delete_schema(&self, id: &str) -> Result<()> {
        let request = self.schema_request(Method::DELETE, &[id])?;
        let body = Self::send(request).await?;
        ensure_accepted(&body)?;
        info!(schema_id = %id, "schema deleted");
        Ok(())
    }
}

fn schema_error(err: IngestError) -> UsageError {
    match err {
        IngestError::Rejected { reason } => UsageError::Rejected { reason },
        other => UsageError::Schema {
            reason: other.to_string(),
        },
    }
}

impl MetricSink for IngestClient {
    fn submit<'a>(
        &'a self,
        chunk: &'a [OutputMetric],
    ) -> Pin<Box<dyn Future<Output = usage_metrics::Result<()>> + Send + 'a>> {
        Box::pin(async move { self.submit_metrics(chunk).await.map_err(UsageError::from) })
    }
}

impl SchemaStore for IngestClient {
    fn list<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = usage_metrics::Result<Vec<SchemaDefinition>>> + Send + 'a>>
    {
        Box::pin(async move { self.list_schemas().await.map_err(schema_error) })
    }

    fn create<'a>(
        &'a self,
        schema: &'a SchemaDefinition,
    ) -> Pin<Box<dyn Future<Output = usage_metrics::Result<()>> + Send + 'a>> {
        Box::pin(async move { self.create_schema(schema).await.map_err(schema_error) })
    }

    fn delete<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = usage_metrics::Result<()>> + Send + 'a>> {
        Box::pin(async move { self.delete_schema(id).await.map_err(schema_error) })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Serves one canned response and returns the raw request it received.
    async fn serve_once(status: u16, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        (url, handle)
    }

    fn metric() -> OutputMetric {
        let mut dims = BTreeMap::new();
        dims.insert("instance_id".to_string(), "i-123".to_string());
        OutputMetric::new(
            "CPUUtilization",
            42.5,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            dims,
        )
        .with_schema_id("s-1")
    }

    mod endpoint_tests {
        use super::*;

        #[test]
        fn joins_under_base_path() {
            let client =
                IngestClient::new(Url::parse("https://ingest.example.com/prefix/").unwrap(), "t")
                    .unwrap();
            let url = client.endpoint(SCHEMAS_PATH).unwrap();
            assert_eq!(url.as_str(), "https://ingest.example.com/prefix/api/v2/stream-schemas");
        }

        #[test]
        fn metrics_url_carries_token() {
            let client =
                IngestClient::new(Url::parse("https://ingest.example.com").unwrap(), "abc").unwrap();
            let url = client.metrics_url().unwrap();
            assert_eq!(
                url.as_str(),
                "https://ingest.example.com/api/v1/metrics?token=abc&protocol=anodot30"
            );
        }

        #[test]
        fn rejects_non_base_url() {
            let err = IngestClient::new(Url::parse("mailto:ops@example.com").unwrap(), "t")
                .unwrap_err();
            assert!(matches!(err, IngestError::InvalidUrl { .. }));
        }
    }

    mod request_tests {
        use super::*;

        #[tokio::test]
        async fn submits_json_array() {
            let (url, server) = serve_once(200, r#"{"errors":[]}"#).await;
            let client = IngestClient::new(url, "tok").unwrap();

            client.submit(&[metric()]).await.unwrap();

            let request = server.await.unwrap();
            assert!(request.starts_with("POST /api/v1/metrics?token=tok&protocol=anodot30 "));
            assert!(request.contains(r#""schemaId":"s-1""#));
            assert!(request.contains(r#""measurements":{"CPUUtilization":42.5}"#));
            assert!(request.contains(r#""timestamp":1704067200"#));
        }

        #[tokio::test]
        async fn application_errors_are_rejections() {
            let (url, server) =
                serve_once(200, r#"{"errors":[{"index":0,"description":"unknown schema"}]}"#).await;
            let client = IngestClient::new(url, "tok").unwrap();

            let err = client.submit(&[metric()]).await.unwrap_err();
            server.await.unwrap();

            assert!(matches!(err, UsageError::Rejected { ref reason } if reason == "#0: unknown schema"));
        }

        #[tokio::test]
        async fn server_errors_are_submission_failures() {
            let (url, server) = serve_once(503, "unavailable").await;
            let client = IngestClient::new(url, "tok").unwrap();

            let err = client.submit(&[metric()]).await.unwrap_err();
            server.await.unwrap();

            assert!(matches!(err, UsageError::Submission { .. }));
            assert!(err.to_string().contains("503"));
        }

        #[tokio::test]
        async fn lists_schemas_with_bearer_token() {
            let (url, server) = serve_once(
                200,
                r#"{"schemas":[{"schema":{"id":"s-9","name":"acc_S3_usage_schema","dimensions":["bucket_name"],"measurements":{}}}]}"#,
            )
            .await;
            let client = IngestClient::new(url, "tok").unwrap();

            let schemas = client.list().await.unwrap();

            let request = server.await.unwrap();
            assert!(request.starts_with("GET /api/v2/stream-schemas/schemas "));
            assert!(request.to_ascii_lowercase().contains("authorization: bearer tok"));
            assert_eq!(schemas[0].id.as_deref(), Some("s-9"));
        }

        #[tokio::test]
        async fn deletes_by_id() {
            let (url, server) = serve_once(200, "").await;
            let client = IngestClient::new(url, "tok").unwrap();

            client.delete("s-9").await.unwrap();

            let request = server.await.unwrap();
            assert!(request.starts_with("DELETE /api/v2/stream-schemas/s-9 "));
        }

        #[tokio::test]
        async fn schema_transport_errors_are_schema_errors() {
            let (url, server) = serve_once(500, "boom").await;
            let client = IngestClient::new(url, "tok").unwrap();

            let err = client.delete("s-9").await.unwrap_err();
            server.await.unwrap();

            assert!(matches!(err, UsageError::Schema { .. }));
        }
    }
}
