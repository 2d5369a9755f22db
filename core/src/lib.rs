//! API client core for the Euromillions grid service.
//!
//! # Overview
//! One client for every front-end. The backend exposes three read-only
//! resources: `/history` (refresh draw history, plain-text status),
//! `/generate` (new grids) and `/grids` (stored grids, most recent first).
//!
//! # Design
//! - [`GridClient`] is sans-IO: `build_*` produces an [`HttpRequest`],
//!   `parse_*` consumes an [`HttpResponse`]. The C ABI crate wraps this
//!   layer so mobile shells keep their own HTTP stacks.
//! - [`ApiClient`] (feature `transport`, on by default) runs the round-trip
//!   over a [`Transport`] with a per-call timeout and cancellation.
//! - Dates follow one policy, in [`dates`]: calendar dates are strict
//!   `YYYY-MM-DD`, timestamps are tolerant but never silently dropped.
//! - Every failure is a single [`ApiError`].

pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod http;
pub mod types;

#[cfg(feature = "transport")]
pub mod api;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{GridClient, Resource};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{Draw, Grid, NewGrid};

#[cfg(feature = "transport")]
pub use api::{ApiClient, CallOptions};
#[cfg(feature = "transport")]
pub use transport::{ReqwestTransport, Transport};
#[cfg(feature = "transport")]
pub use tokio_util::sync::CancellationToken;
