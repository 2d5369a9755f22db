//! Stateless HTTP request builder and response parser for the grid API.
//!
//! # Design
//! `GridClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the round-trip, which keeps this module free of I/O
//! and lets the async client and the C ABI share one decoding path.

use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Grid, NewGrid};

/// The three resources exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    History,
    Generate,
    Grids,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::History => "history",
            Resource::Generate => "generate",
            Resource::Grids => "grids",
        }
    }

    fn accept(self) -> &'static str {
        match self {
            Resource::History => "text/plain",
            Resource::Generate | Resource::Grids => "application/json",
        }
    }
}

/// Synchronous, stateless client for the grid API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct GridClient {
    base_url: String,
}

impl GridClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_fetch_history(&self) -> Result<HttpRequest, ApiError> {
        self.build(Resource::History)
    }

    pub fn build_generate_grids(&self) -> Result<HttpRequest, ApiError> {
        self.build(Resource::Generate)
    }

    pub fn build_fetch_grids(&self) -> Result<HttpRequest, ApiError> {
        self.build(Resource::Grids)
    }

    /// Build the `GET` request for `resource`.
    ///
    /// Fails with `InvalidRequest` when the base URL and path do not form an
    /// absolute `http` or `https` URL.
    pub fn build(&self, resource: Resource) -> Result<HttpRequest, ApiError> {
        let raw = format!("{}/{}", self.base_url, resource.path());
        let url = Url::parse(&raw)
            .map_err(|e| ApiError::InvalidRequest(format!("{raw:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidRequest(format!(
                "{raw:?}: unsupported scheme {:?}",
                url.scheme()
            )));
        }

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![("accept".to_string(), resource.accept().to_string())],
        })
    }

    /// The body of a successful history refresh, verbatim.
    pub fn parse_fetch_history(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    pub fn parse_generate_grids(&self, response: HttpResponse) -> Result<Vec<NewGrid>, ApiError> {
        decode_json(response)
    }

    /// Grids in server order (most recent first). Never re-sorted.
    pub fn parse_fetch_grids(&self, response: HttpResponse) -> Result<Vec<Grid>, ApiError> {
        decode_json(response)
    }
}

/// Map non-2xx status codes to `ApiError::Server`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let status = (response.status != 0).then_some(response.status);
    Err(ApiError::server(status, &response.body))
}

fn decode_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    Ok(serde_json::from_str(&response.body)?)
}
