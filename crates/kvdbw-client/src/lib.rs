//! Backend access layer for KVDB Web.
//!
//! Turns the key/value database REST API (namespaces, keys, health) into a
//! small typed operation set. Every operation is a single HTTP round trip
//! authenticated with HTTP Basic credentials; failures are reported through
//! [`ClientError`], whose only response-level shape is
//! [`BackendOperationError`].
//!
//! TLS trust for the backend comes from a private directory of PEM
//! certificates loaded by [`TrustStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kvdbw_client::{BackendConfig, Credential, KvdbClient};
//!
//! # async fn example() -> Result<(), kvdbw_client::ClientError> {
//! let config = BackendConfig::default();
//! let client = KvdbClient::new(&config, Credential::from_env())?;
//! for ns in client.list_namespaces().await? {
//!     tracing::info!(name = %ns.name, size = ns.size, "namespace");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod trust;
mod types;

pub use client::KvdbClient;
pub use error::{BackendOperationError, ClientError};
pub use trust::TrustStore;
pub use types::{KeyRecord, Namespace};

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the backend password.
pub const PASSWORD_ENV: &str = "KVDBW_BACKEND_PASSWORD";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for the backend service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Backend host name or address.
    pub host: String,
    /// Backend TCP port.
    pub port: u16,
    /// `http` or `https`.
    pub protocol: String,
    /// Username for HTTP Basic authentication.
    pub username: String,
    /// Directory of PEM certificates trusted for the backend's TLS certificate.
    pub cert_dir: PathBuf,
    /// Disable TLS certificate verification entirely.
    ///
    /// Only meant for self-signed development deployments: with this set,
    /// any certificate presented by the backend is accepted.
    pub insecure: bool,
    /// Upper bound for one backend round trip.
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "kvdb".to_owned(),
            port: 443,
            protocol: "https".to_owned(),
            username: "system".to_owned(),
            cert_dir: PathBuf::from("/app/certs"),
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BackendConfig {
    /// Base URL of the backend, e.g. `https://kvdb:443`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Backend password, read once at startup.
#[derive(Clone, Default)]
pub struct Credential(String);

impl Credential {
    /// Wrap a password.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Read the password from `KVDBW_BACKEND_PASSWORD`. Missing means empty.
    pub fn from_env() -> Self {
        Self(std::env::var(PASSWORD_ENV).unwrap_or_default())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([redacted])")
    }
}
