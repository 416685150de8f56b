#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! HTTP transport for the Pathshala client.
//!
//! [`HttpClient`] wraps a pooled hyper client in a tower stack: a bounded
//! request queue, a per-request timeout, a default `User-Agent` and response
//! decompression. TLS is rustls with bundled or system roots, and plain
//! HTTP is refused unless enabled for local backends.
//!
//! The transport does not retry, follow redirects or interpret statuses.
//! Authorization and refresh handling belong to the API layer above it.
//!
//! ```ignore
//! let client = pathshala_http::HttpClient::builder()
//!     .timeout(Duration::from_secs(15))
//!     .build()?;
//! let resp = client
//!     .get("https://vk-services.shop/api/v1/pathshala/verify/vk-learnings")
//!     .header("accept", "application/json")
//!     .send()
//!     .await?;
//! let body = resp.bytes().await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{DEFAULT_BODY_LIMIT, DEFAULT_USER_AGENT, TlsRootConfig, TransportSecurity};
pub use error::{BoxError, HttpError, InvalidUriKind};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
