//! Server configuration for KVDB Web.
//!
//! Settings are read once at startup from a YAML file and then overridden by
//! `KVDBW_*` environment variables. The backend password is never part of
//! the file; it comes from `KVDBW_BACKEND_PASSWORD` only (see
//! [`kvdbw_client::Credential::from_env`]).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use kvdbw_client::BackendConfig;

use crate::request::KNOWN_API_VERSIONS;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "KVDBW";

/// Directories searched for the configuration file, in order.
const SEARCH_DIRS: [&str; 2] = ["/app", "."];

/// Path of the health endpoint; the metrics endpoint may not shadow it.
pub const HEALTH_PATH: &str = "/system/health";

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`AppConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    /// The merged configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log request form contents on parse failures.
    pub debug: bool,
    /// Port the HTTP listener binds on (all interfaces).
    pub port: u16,
    pub logging: LoggingConfig,
    pub backend: BackendSection,
    pub prometheus: PrometheusConfig,
    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// `json` or `text`.
    pub format: String,
}

/// Backend connection options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub username: String,
    pub cert_dir: PathBuf,
    pub insecure: bool,
    pub timeout_secs: u64,
}

/// Metrics exposition options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            port: 8080,
            logging: LoggingConfig::default(),
            backend: BackendSection::default(),
            prometheus: PrometheusConfig::default(),
            source: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "text".to_owned(),
        }
    }
}

impl Default for BackendSection {
    fn default() -> Self {
        let defaults = BackendConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            protocol: defaults.protocol,
            username: defaults.username,
            cert_dir: defaults.cert_dir,
            insecure: defaults.insecure,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/system/metrics".to_owned(),
        }
    }
}

impl AppConfig {
    /// Load configuration for the file named `name` plus environment overrides.
    ///
    /// The file is looked up as `name`, `name.yaml` and `name.yml` in `/app`
    /// and then the working directory. A missing file is not an error:
    /// defaults apply and `source` stays `None`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, an
    /// override is malformed, or the result fails validation.
    pub fn load(name: &str) -> Result<Self, ConfigError> {
        let mut config = match find_config_file(name, &SEARCH_DIRS) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse one YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.source = Some(path.to_owned());
        Ok(config)
    }

    /// Parse YAML; absent fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the YAML error unchanged.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply `KVDBW_*` overrides fetched through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable number or flag.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |suffix: &str| {
            let key = format!("{ENV_PREFIX}_{suffix}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("DEBUG") {
            self.debug = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("PORT") {
            self.port = parse_number(&key, &value)?;
        }
        if let Some((_, value)) = var("LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some((_, value)) = var("LOGGING_FORMAT") {
            self.logging.format = value;
        }
        if let Some((_, value)) = var("BACKEND_HOST") {
            self.backend.host = value;
        }
        if let Some((key, value)) = var("BACKEND_PORT") {
            self.backend.port = parse_number(&key, &value)?;
        }
        if let Some((_, value)) = var("BACKEND_PROTOCOL") {
            self.backend.protocol = value.to_lowercase();
        }
        if let Some((_, value)) = var("BACKEND_USERNAME") {
            self.backend.username = value;
        }
        if let Some((_, value)) = var("BACKEND_CERT_DIR") {
            self.backend.cert_dir = PathBuf::from(value);
        }
        if let Some((key, value)) = var("BACKEND_INSECURE") {
            self.backend.insecure = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = var("PROMETHEUS_ENABLED") {
            self.prometheus.enabled = parse_bool(&key, &value)?;
        }
        if let Some((_, value)) = var("PROMETHEUS_ENDPOINT") {
            self.prometheus.endpoint = value;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.protocol != "http" && self.backend.protocol != "https" {
            return Err(ConfigError::Invalid(format!(
                "backend.protocol must be 'http' or 'https', got '{}'",
                self.backend.protocol
            )));
        }
        if self.backend.host.is_empty() {
            return Err(ConfigError::Invalid("backend.host must not be empty".to_owned()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "backend.timeout_secs must be at least 1".to_owned(),
            ));
        }
        if self.prometheus.enabled {
            let endpoint = &self.prometheus.endpoint;
            if !endpoint.starts_with('/') || endpoint.len() < 2 {
                return Err(ConfigError::Invalid(format!(
                    "prometheus.endpoint must be an absolute path, got '{endpoint}'"
                )));
            }
            if endpoint == HEALTH_PATH {
                return Err(ConfigError::Invalid(format!(
                    "prometheus.endpoint must not be {HEALTH_PATH}"
                )));
            }
            if endpoint.contains(['{', '}', '*', ':']) {
                return Err(ConfigError::Invalid(format!(
                    "prometheus.endpoint must be a literal path, got '{endpoint}'"
                )));
            }
            let first_segment = endpoint[1..].split('/').next().unwrap_or_default();
            if first_segment.is_empty() || KNOWN_API_VERSIONS.contains(&first_segment) {
                return Err(ConfigError::Invalid(format!(
                    "prometheus.endpoint must not overlap the UI paths, got '{endpoint}'"
                )));
            }
        }
        Ok(())
    }

    /// Connection parameters handed to the backend client.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            host: self.backend.host.clone(),
            port: self.backend.port,
            protocol: self.backend.protocol.clone(),
            username: self.backend.username.clone(),
            cert_dir: self.backend.cert_dir.clone(),
            insecure: self.backend.insecure,
            timeout: Duration::from_secs(self.backend.timeout_secs),
        }
    }

    /// Listener address: every interface on the configured port.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Find `name`, `name.yaml` or `name.yml` in the first directory holding one.
fn find_config_file(name: &str, dirs: &[&str]) -> Option<PathBuf> {
    let candidates = [
        name.to_owned(),
        format!("{name}.yaml"),
        format!("{name}.yml"),
    ];

    if Path::new(name).is_absolute() {
        return candidates.into_iter().map(PathBuf::from).find(|p| p.is_file());
    }

    dirs.iter()
        .flat_map(|dir| candidates.iter().map(move |c| Path::new(dir).join(c)))
        .find(|p| p.is_file())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
