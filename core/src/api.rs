//! Async client for the grid API.
//!
//! # Design
//! `ApiClient` pairs the sans-IO [`GridClient`] with a [`Transport`]. Each
//! call builds a request, races the round-trip against its timeout and an
//! optional [`CancellationToken`], then hands the response to the matching
//! `parse_*` method. The caller sees exactly one typed value or one
//! [`ApiError`]; nothing is retried.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{instrument, Span};

use crate::client::{GridClient, Resource};
use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::HttpResponse;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Grid, NewGrid};

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Replaces the configured timeout for this call.
    pub timeout: Option<Duration>,
    /// Aborts the call when cancelled. Cancellation wins over a response
    /// that becomes ready at the same time.
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Async client for the grid API.
///
/// Cheap to clone when the transport is; clones share the connection pool.
///
/// ## Examples
///
/// ```rust,ignore
/// use euromillions_core::{ApiClient, ClientConfig};
///
/// let client = ApiClient::new(ClientConfig::new("http://localhost:8080"))?;
/// for grid in client.fetch_grids().await? {
///     println!("{} {:?} {:?}", grid.draw_date, grid.numbers, grid.stars);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient<T = ReqwestTransport> {
    inner: GridClient,
    transport: T,
    timeout: Duration,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client backed by reqwest.
    ///
    /// ## Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            inner: GridClient::new(&config.base_url),
            transport,
            timeout: config.timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Trigger a history refresh and return the backend's status message.
    pub async fn fetch_history(&self) -> Result<String, ApiError> {
        self.fetch_history_with(&CallOptions::default()).await
    }

    pub async fn fetch_history_with(&self, options: &CallOptions) -> Result<String, ApiError> {
        self.call(Resource::History, options, GridClient::parse_fetch_history)
            .await
    }

    /// Ask the backend for freshly generated grids.
    pub async fn generate_grids(&self) -> Result<Vec<NewGrid>, ApiError> {
        self.generate_grids_with(&CallOptions::default()).await
    }

    pub async fn generate_grids_with(
        &self,
        options: &CallOptions,
    ) -> Result<Vec<NewGrid>, ApiError> {
        let grids = self
            .call(Resource::Generate, options, GridClient::parse_generate_grids)
            .await?;
        tracing::debug!(count = grids.len(), "generated grids");
        Ok(grids)
    }

    /// List stored grids, most recent first.
    pub async fn fetch_grids(&self) -> Result<Vec<Grid>, ApiError> {
        self.fetch_grids_with(&CallOptions::default()).await
    }

    pub async fn fetch_grids_with(&self, options: &CallOptions) -> Result<Vec<Grid>, ApiError> {
        let grids = self
            .call(Resource::Grids, options, GridClient::parse_fetch_grids)
            .await?;
        tracing::debug!(count = grids.len(), "fetched grids");
        Ok(grids)
    }

    #[instrument(
        name = "api_request",
        skip_all,
        fields(
            resource = resource.path(),
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    async fn call<R>(
        &self,
        resource: Resource,
        options: &CallOptions,
        parse: impl FnOnce(&GridClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let result = match self.round_trip(resource, options).await {
            Ok(response) => {
                Span::current().record("http.status_code", response.status);
                parse(&self.inner, response)
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            tracing::warn!(error = %err, "grid API call failed");
        }
        result
    }

    async fn round_trip(
        &self,
        resource: Resource,
        options: &CallOptions,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.inner.build(resource)?;
        Span::current().record("http.url", request.url.as_str());

        let timeout = options.timeout.unwrap_or(self.timeout);
        let cancel = options.cancel.clone().unwrap_or_default();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = tokio::time::timeout(timeout, self.transport.execute(request)) => {
                result.unwrap_or_else(|_| Err(TransportError::TimedOut(timeout)))
            }
        };
        Ok(outcome?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tracing_test::traced_test;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpRequest;

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig::new(server.uri())).unwrap()
    }

    /// A transport that never answers.
    #[derive(Debug, Default)]
    struct Stalled {
        calls: AtomicUsize,
    }

    impl Transport for Stalled {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    /// A transport that answers every request with the same canned response.
    #[derive(Debug, Clone)]
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Arc<std::sync::Mutex<Vec<HttpRequest>>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Arc::default(),
            }
        }
    }

    impl Transport for Canned {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse::new(self.status, self.body))
        }
    }

    #[tokio::test]
    async fn fetch_history_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history"))
            .and(header("accept", "text/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Imported 12 new draws"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).await.fetch_history().await.unwrap();
        assert_eq!(text, "Imported 12 new draws");
    }

    #[tokio::test]
    async fn generate_grids_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.generate_grids().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Server { ref message, status: Some(500) } if message == "database unavailable"
        ));
    }

    #[tokio::test]
    async fn generate_grids_decodes_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"draw_date":"2024-01-09","numbers":[4,11,19,27,45],"stars":[3,8]}]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let grids = client_for(&server).await.generate_grids().await.unwrap();
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].draw_date, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(grids[0].numbers, vec![4, 11, 19, 27, 45]);
    }

    #[tokio::test]
    async fn fetch_grids_without_created_at() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/grids"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"id":2,"draw_date":"2024-02-01","numbers":[1,2,3,4,5],"stars":[1,2]}]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let grids = client_for(&server).await.fetch_grids().await.unwrap();
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].id, 2);
        assert!(grids[0].created_at.is_none());
    }

    #[tokio::test]
    async fn fetch_grids_malformed_body_is_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/grids"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1,"#))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_grids().await.unwrap_err();
        assert!(err.is_decoding());
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/grids"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let options = CallOptions::default().timeout(Duration::from_millis(100));
        let err = client.fetch_grids_with(&options).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::TimedOut(d)) if d == Duration::from_millis(100)
        ));
    }

    #[tokio::test]
    async fn configured_timeout_applies_without_options() {
        let config = ClientConfig::new("http://localhost:8080").with_timeout(Duration::from_millis(20));
        let client = ApiClient::with_transport(config, Stalled::default());
        let err = client.fetch_history().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::TimedOut(d)) if d == Duration::from_millis(20)
        ));
    }

    #[tokio::test]
    async fn cancelled_call_reports_cancellation() {
        let client = ApiClient::with_transport(ClientConfig::default(), Stalled::default());
        let token = CancellationToken::new();
        let options = CallOptions::default().cancel_on(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = client.generate_grids_with(&options).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Cancelled)));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn already_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let client = ApiClient::with_transport(ClientConfig::default(), Canned::new(200, "ok"));
        let err = client
            .fetch_history_with(&CallOptions::default().cancel_on(token))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn invalid_base_url_never_reaches_transport() {
        let transport = Arc::new(Stalled::default());
        let client = ApiClient::with_transport(ClientConfig::new("not a url"), Arc::clone(&transport));
        let err = client.fetch_grids().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(ClientConfig::new(format!("http://{addr}"))).unwrap();
        let err = client.fetch_history().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Network(_))));
    }

    #[tokio::test]
    async fn concurrent_calls_are_independent() {
        let transport = Canned::new(
            200,
            r#"[{"id":1,"draw_date":"2024-01-05","numbers":[1],"stars":[1]}]"#,
        );
        let client = ApiClient::with_transport(ClientConfig::default(), transport.clone());

        let (a, b) = tokio::join!(client.fetch_grids(), client.fetch_grids());
        assert_eq!(a.unwrap(), b.unwrap());
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.url == "http://localhost:8080/grids"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failures_are_logged() {
        let client = ApiClient::with_transport(ClientConfig::default(), Canned::new(503, ""));
        let err = client.fetch_grids().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(logs_contain("grid API call failed"));
        assert!(logs_contain("HTTP error! status: 503"));
    }
}
