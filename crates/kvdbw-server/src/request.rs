//! Request parameter resolution.
//!
//! Maps an inbound URL path to the API version and namespace it addresses.
//! Keys are never taken from the path; mutation endpoints read them from the
//! form body.

use std::net::SocketAddr;

use axum::http::Method;
use rand::Rng;

/// API versions the UI serves.
pub const KNOWN_API_VERSIONS: [&str; 1] = ["v1"];

/// Where a request without an API version is redirected.
pub const DEFAULT_API_PATH: &str = "/v1";

/// Upper bound (exclusive) of request correlation ids.
const REQUEST_ID_RANGE: u32 = 9999;

/// Routing information derived from one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingParameters {
    pub method: Method,
    /// First path segment, e.g. `v1`. Empty for `/`.
    pub api_version: String,
    /// Second path segment. Empty selects the namespace listing.
    pub namespace: String,
    /// Random id correlating the log lines of one request. Not a secret.
    pub request_id: u32,
    pub remote_addr: Option<SocketAddr>,
    /// Path as received, still percent-encoded.
    pub path: String,
}

impl RoutingParameters {
    /// Resolve `path` into routing parameters.
    pub fn resolve(method: &Method, path: &str, remote_addr: Option<SocketAddr>) -> Self {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let mut segments = trimmed.split('/');
        let api_version = decode_segment(segments.next().unwrap_or_default());
        let namespace = decode_segment(segments.next().unwrap_or_default());

        Self {
            method: method.clone(),
            api_version,
            namespace,
            request_id: random_id(),
            remote_addr,
            path: path.to_owned(),
        }
    }

    /// Endpoint label for request counters: `/{api_version}` or
    /// `/{api_version}/{namespace}`. Segments past the namespace are dropped.
    pub fn endpoint(&self) -> String {
        if self.namespace.is_empty() {
            format!("/{}", self.api_version)
        } else {
            format!("/{}/{}", self.api_version, self.namespace)
        }
    }

    /// Whether the API version is one this server serves.
    pub fn is_known_version(&self) -> bool {
        KNOWN_API_VERSIONS.contains(&self.api_version.as_str())
    }
}

/// Percent-decode one path segment, keeping it verbatim if it is not UTF-8.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_owned(), |s| s.into_owned())
}

/// Random correlation id in `[0, 9999)`.
pub fn random_id() -> u32 {
    rand::thread_rng().gen_range(0..REQUEST_ID_RANGE)
}
