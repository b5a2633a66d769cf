//! Private trust store for the backend's TLS certificate.
//!
//! Certificates are loaded from a flat directory of PEM files. Loading never
//! aborts startup: a file that cannot be read or holds no usable certificate
//! is skipped with a diagnostic, and an unreadable directory yields an empty
//! pool.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use tracing::{debug, error, info, warn};

use crate::error::ClientError;

/// Root certificates trusted when talking to the backend over HTTPS.
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: RootCertStore,
    loaded_files: usize,
    skipped_files: usize,
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl TrustStore {
    /// A pool with no trusted roots.
    pub fn empty() -> Self {
        Self {
            roots: RootCertStore::empty(),
            loaded_files: 0,
            skipped_files: 0,
        }
    }

    /// Load every PEM file directly inside `dir`.
    ///
    /// Subdirectories are not descended into.
    pub fn load_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut store = Self::empty();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "failed to read certificate directory, using empty trust pool");
                return store;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to read certificate directory entry");
                    None
                }
            })
            .collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                debug!(path = %path.display(), "skipping subdirectory in certificate directory");
                continue;
            }

            let pem = match fs::read(&path) {
                Ok(pem) => pem,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read certificate file");
                    store.skipped_files = store.skipped_files.saturating_add(1);
                    continue;
                }
            };

            match store.add_pem(&pem) {
                0 => {
                    info!(path = %path.display(), "no certificates appended from file");
                    store.skipped_files = store.skipped_files.saturating_add(1);
                }
                added => {
                    debug!(path = %path.display(), added, "certificates appended to trust pool");
                    store.loaded_files = store.loaded_files.saturating_add(1);
                }
            }
        }

        info!(
            dir = %dir.display(),
            roots = store.len(),
            loaded = store.loaded_files,
            skipped = store.skipped_files,
            "trust pool loaded"
        );
        store
    }

    /// Append every certificate in a PEM bundle. Returns how many were added.
    ///
    /// Malformed PEM sections and certificates rejected as trust anchors are
    /// ignored; the remaining certificates of the bundle still load.
    pub fn add_pem(&mut self, pem: &[u8]) -> usize {
        let mut reader = pem;
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
            .filter_map(|item| match item {
                Ok(cert) => Some(cert),
                Err(e) => {
                    debug!(error = %e, "skipping malformed PEM section");
                    None
                }
            })
            .collect();

        let (added, ignored) = self.roots.add_parsable_certificates(certs);
        if ignored > 0 {
            debug!(ignored, "certificates rejected by root store");
        }
        added
    }

    /// Number of trusted root certificates.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the pool holds no roots.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Files that contributed at least one certificate.
    pub fn loaded_files(&self) -> usize {
        self.loaded_files
    }

    /// Files skipped because they were unreadable or held no certificate.
    pub fn skipped_files(&self) -> usize {
        self.skipped_files
    }

    /// Build a rustls client configuration that trusts exactly this pool.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Tls` if the crypto provider rejects the default
    /// protocol versions.
    pub fn client_config(&self) -> Result<rustls::ClientConfig, ClientError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(self.roots.clone())
            .with_no_client_auth();
        Ok(config)
    }
}
