//! Backend client implementation.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{BackendOperationError, ClientError};
use crate::trust::TrustStore;
use crate::types::{HealthBody, KeyRecord, Namespace, NamespaceBody, UpdateBody, UpdateType};
use crate::{BackendConfig, Credential};

/// Custom verb the backend uses for roll and generate.
const UPDATE_METHOD: &[u8] = b"UPDATE";

/// REST client for the key/value database backend.
///
/// Holds only static configuration, the credential and a pooled HTTP client;
/// no state carries over between calls.
#[derive(Debug, Clone)]
pub struct KvdbClient {
    base_url: String,
    username: String,
    password: Credential,
    http: reqwest::Client,
}

/// Status and body of one backend response.
struct Reply {
    status: StatusCode,
    body: String,
}

impl KvdbClient {
    /// Build a client, loading the trust store from `config.cert_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for an unsupported protocol, or a TLS /
    /// build error if the HTTP client cannot be assembled.
    pub fn new(config: &BackendConfig, password: Credential) -> Result<Self, ClientError> {
        let trust = TrustStore::load_dir(&config.cert_dir);
        Self::with_trust_store(config, password, &trust)
    }

    /// Build a client with an already loaded trust store.
    ///
    /// With `config.insecure` set the trust store is ignored and certificate
    /// verification is disabled.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for an unsupported protocol, or a TLS /
    /// build error if the HTTP client cannot be assembled.
    pub fn with_trust_store(
        config: &BackendConfig,
        password: Credential,
        trust: &TrustStore,
    ) -> Result<Self, ClientError> {
        if config.protocol != "http" && config.protocol != "https" {
            return Err(ClientError::Config(format!(
                "unsupported backend protocol '{}', expected 'http' or 'https'",
                config.protocol
            )));
        }
        if config.host.is_empty() {
            return Err(ClientError::Config("backend host must not be empty".to_owned()));
        }

        let builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("kvdbw/", env!("CARGO_PKG_VERSION")));

        let builder = if config.insecure {
            warn!(host = %config.host, "backend TLS certificate verification is disabled");
            builder.danger_accept_invalid_certs(true)
        } else {
            builder.use_preconfigured_tls(trust.client_config()?)
        };

        let http = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            base_url: config.base_url(),
            username: config.username.clone(),
            password,
            http,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check backend health.
    ///
    /// Succeeds on status 200 or 201 with body `{"status":"UP"}`.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Decode` for a non-JSON body, `Backend`
    /// for any other status or a status other than `UP`.
    pub async fn get_health(&self) -> Result<(), ClientError> {
        debug!(operation = "get_health", "backend request");
        let reply = self.execute(Method::GET, "/system/health", None::<&()>).await?;
        if !matches!(reply.status, StatusCode::OK | StatusCode::CREATED) {
            return Err(reply.unexpected().into());
        }

        let health: HealthBody = serde_json::from_str(&reply.body)?;
        if health.status == "UP" {
            Ok(())
        } else {
            Err(BackendOperationError::with_text(
                reply.status,
                format!("status not matching UP: {}", health.status),
            )
            .into())
        }
    }

    /// List all namespaces.
    ///
    /// A body that is not a JSON array of namespaces is logged and treated
    /// as an empty list.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Backend` for any status other than 200.
    pub async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClientError> {
        debug!(operation = "list_namespaces", "backend request");
        let reply = self.execute(Method::GET, "/v1/*", None::<&()>).await?;
        reply.expect_ok()?;
        Ok(reply.decode_list("list_namespaces"))
    }

    /// List every key in `namespace`.
    ///
    /// Decode failures are handled as in [`Self::list_namespaces`].
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Backend` for any status other than 200.
    pub async fn list_keys(&self, namespace: &str) -> Result<Vec<KeyRecord>, ClientError> {
        debug!(operation = "list_keys", namespace, "backend request");
        let path = format!("/v1/{}/*", urlencoding::encode(namespace));
        let reply = self.execute(Method::GET, &path, None::<&()>).await?;
        reply.expect_ok()?;

        let mut records: Vec<KeyRecord> = reply.decode_list("list_keys");
        for record in &mut records {
            namespace.clone_into(&mut record.namespace);
        }
        Ok(records)
    }

    /// Create or overwrite `key` in `namespace`.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Backend` unless the backend answers
    /// `201` with the `201 Created` status line as body.
    pub async fn set_key(&self, namespace: &str, key: &str, value: &str) -> Result<(), ClientError> {
        debug!(operation = "set_key", namespace, key, "backend request");
        let body = UpdateBody {
            kind: UpdateType::String,
            value: Some(value),
        };
        let reply = self
            .execute(Method::POST, &key_path(namespace, key), Some(&body))
            .await?;
        reply.expect_status_line(StatusCode::CREATED)?;
        Ok(())
    }

    /// Create a namespace.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Backend` unless the backend answers
    /// `201` with the `201 Created` status line as body.
    pub async fn create_namespace(&self, name: &str) -> Result<(), ClientError> {
        debug!(operation = "create_namespace", namespace = name, "backend request");
        let body = NamespaceBody { name };
        let reply = self.execute(Method::POST, "/v1", Some(&body)).await?;
        reply.expect_status_line(StatusCode::CREATED)?;
        Ok(())
    }

    /// Delete a namespace and its keys.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Backend` unless the backend answers
    /// `200` with the `200 OK` status line as body.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<(), ClientError> {
        debug!(operation = "delete_namespace", namespace, "backend request");
        let path = format!("/v1/{}", urlencoding::encode(namespace));
        let reply = self.execute(Method::DELETE, &path, None::<&()>).await?;
        reply.expect_status_line(StatusCode::OK)?;
        Ok(())
    }

    /// Delete one key.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Backend` unless the backend answers
    /// `200` with the `200 OK` status line as body. Deleting a key that no
    /// longer exists is a `Backend` error.
    pub async fn delete_key(&self, namespace: &str, key: &str) -> Result<(), ClientError> {
        debug!(operation = "delete_key", namespace, key, "backend request");
        let reply = self
            .execute(Method::DELETE, &key_path(namespace, key), None::<&()>)
            .await?;
        reply.expect_status_line(StatusCode::OK)?;
        Ok(())
    }

    /// Replace the value of `key` with a new random value.
    ///
    /// An empty `key` addresses the namespace as a whole.
    ///
    /// # Errors
    ///
    /// `Transport` if unreachable, `Decode` if the reply is not a key
    /// record, `Backend` unless the status is 201 and the record matches.
    pub async fn roll(&self, namespace: &str, key: &str) -> Result<KeyRecord, ClientError> {
        debug!(operation = "roll", namespace, key, "backend request");
        self.update(namespace, key, UpdateType::Roll).await
    }

    /// Create `key` with a freshly generated value if it is absent.
    ///
    /// # Errors
    ///
    /// Same as [`Self::roll`].
    pub async fn generate(&self, namespace: &str, key: &str) -> Result<KeyRecord, ClientError> {
        debug!(operation = "generate", namespace, key, "backend request");
        self.update(namespace, key, UpdateType::Generate).await
    }

    // --- Private ---

    async fn update(
        &self,
        namespace: &str,
        key: &str,
        kind: UpdateType,
    ) -> Result<KeyRecord, ClientError> {
        let method = Method::from_bytes(UPDATE_METHOD)
            .map_err(|e| ClientError::Config(format!("invalid update method: {e}")))?;
        let body = UpdateBody { kind, value: None };
        let reply = self
            .execute(method, &key_path(namespace, key), Some(&body))
            .await?;
        if reply.status != StatusCode::CREATED {
            return Err(reply.unexpected().into());
        }

        let mut record: KeyRecord = serde_json::from_str(&reply.body)?;
        if !key_matches(key, &record.key) {
            debug!(requested = key, returned = %record.key, "key mismatch in update reply");
            return Err(BackendOperationError::with_text(
                reply.status,
                format!("key mismatch: requested '{key}', got '{}'", record.key),
            )
            .into());
        }
        namespace.clone_into(&mut record.namespace);
        Ok(record)
    }

    /// Send one authenticated request and collect the full response.
    ///
    /// The transport error is checked before anything about the response is
    /// looked at.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Reply, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .basic_auth(&self.username, Some(self.password.expose()));
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| {
            debug!(method = %method, url = %url, error = %e, "backend unreachable");
            ClientError::Transport(e)
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(ClientError::Transport)?;
        debug!(method = %method, url = %url, status = status.as_u16(), "backend reply");
        Ok(Reply { status, body })
    }
}

impl Reply {
    fn unexpected(&self) -> BackendOperationError {
        debug!(status = self.status.as_u16(), body = %self.body, "wrong status on request");
        BackendOperationError::from_status(self.status)
    }

    fn expect_ok(&self) -> Result<(), BackendOperationError> {
        if self.status == StatusCode::OK {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Require `expected` as status and its status line (`201 Created`) as body.
    fn expect_status_line(&self, expected: StatusCode) -> Result<(), BackendOperationError> {
        if self.status == expected && self.body.trim() == status_line(expected) {
            Ok(())
        } else {
            debug!(body = %self.body, "content error");
            Err(BackendOperationError::from_status(self.status))
        }
    }

    fn decode_list<T: serde::de::DeserializeOwned>(&self, operation: &str) -> Vec<T> {
        match serde_json::from_str(&self.body) {
            Ok(list) => list,
            Err(e) => {
                warn!(operation, body = %self.body, error = %e, "json decode error, returning empty list");
                Vec::new()
            }
        }
    }
}

fn key_path(namespace: &str, key: &str) -> String {
    format!(
        "/v1/{}/{}",
        urlencoding::encode(namespace),
        urlencoding::encode(key)
    )
}

/// Canonical status line for a status code, e.g. `201 Created`.
fn status_line(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
    .trim_end()
    .to_owned()
}

/// An empty key on either side matches anything.
fn key_matches(requested: &str, returned: &str) -> bool {
    requested.is_empty() || returned.is_empty() || requested == returned
}
