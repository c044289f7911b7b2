/// Configuration management for the Solr connector

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted timeout for any operation, in seconds
pub const MAX_TIMEOUT_SEC: u64 = 180;

/// Solr version overrides accepted by the connector
pub const SUPPORTED_VERSION_OVERRIDES: &[&str] = &["", "4", "5", "6"];

/// Main connector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Which connector variant to build
    pub connector: ConnectorKind,
    /// Connection parameters of the Solr endpoint
    pub endpoint: EndpointConfig,
    /// Durable metadata store configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Connector variant selected by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    #[default]
    Standard,
    BasicAuth,
}

impl ConnectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::Standard => "standard",
            ConnectorKind::BasicAuth => "basic_auth",
        }
    }
}

impl FromStr for ConnectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ConnectorKind::Standard),
            "basic_auth" => Ok(ConnectorKind::BasicAuth),
            other => Err(format!("Unknown connector '{}': must be 'standard' or 'basic_auth'", other)),
        }
    }
}

/// URI scheme of the Solr server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("Unsupported scheme '{}': must be 'http' or 'https'", other)),
        }
    }
}

/// HTTP method used for select queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET, switching to POST for oversized query strings
    #[default]
    Auto,
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Auto => "AUTO",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(HttpMethod::Auto),
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("Unsupported HTTP method '{}': must be AUTO, GET or POST", other)),
        }
    }
}

/// Connection parameters of a Solr server and core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Server path, empty or starting with "/"
    pub path: String,
    /// Core (collection) name, never starting with "/"
    pub core: String,
    /// Query timeout in seconds
    pub timeout: u64,
    /// Indexing timeout in seconds
    pub index_timeout: u64,
    /// Optimize and administrative timeout in seconds
    pub optimize_timeout: u64,
    pub username: String,
    pub password: String,
    /// Solr version override, empty to auto-detect
    pub solr_version: String,
    pub http_method: HttpMethod,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            host: "localhost".to_string(),
            port: 8983,
            path: "/solr".to_string(),
            core: String::new(),
            timeout: 5,
            index_timeout: 5,
            optimize_timeout: 10,
            username: String::new(),
            password: String::new(),
            solr_version: String::new(),
            http_method: HttpMethod::Auto,
        }
    }
}

impl EndpointConfig {
    /// Build a configuration from the flat option set of an admin form.
    ///
    /// Missing options keep their defaults. All problems are collected and
    /// returned together, each scoped to the option that caused it.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, Vec<FieldError>> {
        let mut config = EndpointConfig::default();
        let mut errors = Vec::new();

        if let Some(scheme) = options.get("scheme") {
            match scheme.parse::<Scheme>() {
                Ok(scheme) => config.scheme = scheme,
                Err(e) => errors.push(FieldError::new("scheme", e)),
            }
        }

        if let Some(host) = options.get("host") {
            config.host = host.trim().to_string();
        }

        if let Some(port) = options.get("port") {
            match port.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => errors.push(FieldError::new("port", "The port has to be an integer between 0 and 65535.")),
            }
        }

        if let Some(path) = options.get("path") {
            config.path = path.trim().to_string();
        }

        if let Some(core) = options.get("core") {
            config.core = core.trim().to_string();
        }

        for (field, slot) in [
            ("timeout", &mut config.timeout),
            ("index_timeout", &mut config.index_timeout),
            ("optimize_timeout", &mut config.optimize_timeout),
        ] {
            if let Some(value) = options.get(field) {
                match value.trim().parse::<u64>() {
                    Ok(seconds) => *slot = seconds,
                    Err(_) => errors.push(FieldError::new(field, "The timeout has to be a number of seconds.")),
                }
            }
        }

        if let Some(username) = options.get("username") {
            config.username = username.clone();
        }

        if let Some(password) = options.get("password") {
            config.password = password.clone();
        }

        if let Some(version) = options.get("solr_version") {
            config.solr_version = version.trim().to_string();
        }

        if let Some(method) = options.get("http_method") {
            match method.trim().parse::<HttpMethod>() {
                Ok(method) => config.http_method = method,
                Err(e) => errors.push(FieldError::new("http_method", e)),
            }
        }

        // Range checks only apply to values that parsed
        let unparsed: Vec<String> = errors.iter().map(|e| e.field.clone()).collect();
        for error in config.field_errors() {
            if !unparsed.contains(&error.field) {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }

    /// Collect every field-scoped validation problem
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push(FieldError::new("host", "The host cannot be empty."));
        }

        if !self.path.is_empty() && !self.path.starts_with('/') {
            errors.push(FieldError::new("path", "If provided the path has to start with \"/\"."));
        }

        if self.core.starts_with('/') {
            errors.push(FieldError::new("core", "The core must not start with \"/\"."));
        }

        for (field, value) in [
            ("timeout", self.timeout),
            ("index_timeout", self.index_timeout),
            ("optimize_timeout", self.optimize_timeout),
        ] {
            if value == 0 || value > MAX_TIMEOUT_SEC {
                errors.push(FieldError::new(
                    field,
                    format!("The timeout has to be between 1 and {} seconds.", MAX_TIMEOUT_SEC),
                ));
            }
        }

        if !SUPPORTED_VERSION_OVERRIDES.contains(&self.solr_version.as_str()) {
            errors.push(FieldError::new(
                "solr_version",
                format!("Unsupported Solr version override '{}'.", self.solr_version),
            ));
        }

        errors
    }

    /// Validate the endpoint configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = self.field_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors))
        }
    }

    /// Server base URI, without the core segment, always ending in "/"
    pub fn server_base_uri(&self) -> String {
        self.server_base_uri_for_host(&self.host)
    }

    /// Core base URI; equals the server URI when no core is configured
    pub fn core_base_uri(&self) -> String {
        self.core_base_uri_for_host(&self.host)
    }

    pub(crate) fn server_base_uri_for_host(&self, host: &str) -> String {
        format!(
            "{}://{}:{}{}/",
            self.scheme.as_str(),
            host,
            self.port,
            self.path.trim_end_matches('/')
        )
    }

    pub(crate) fn core_base_uri_for_host(&self, host: &str) -> String {
        let server = self.server_base_uri_for_host(host);
        let core = self.core.trim_matches('/');
        if core.is_empty() {
            server
        } else {
            format!("{}{}/", server, core)
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout)
    }

    pub fn optimize_timeout(&self) -> Duration {
        Duration::from_secs(self.optimize_timeout)
    }

    /// Credentials, if a username is configured
    pub fn credentials(&self) -> Option<(String, String)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.clone(), self.password.clone()))
        }
    }
}

/// Durable metadata store kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-wide in-memory store
    #[default]
    Memory,
    /// JSON document on disk, shared across processes
    File,
}

/// Durable metadata store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub store: StoreKind,
    /// Location of the store document when `store = "file"`
    pub path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (text, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl ConnectorConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: ConnectorConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.endpoint.field_errors();

        if self.connector == ConnectorKind::BasicAuth && self.endpoint.username.is_empty() {
            errors.push(FieldError::new(
                "username",
                "The basic auth connector requires a username.",
            ));
        }

        if self.cache.store == StoreKind::File
            && self.cache.path.as_deref().map_or(true, |p| p.trim().is_empty())
        {
            errors.push(FieldError::new("cache.path", "A file store requires a path."));
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => errors.push(FieldError::new(
                "logging.level",
                format!("Invalid log level: {}", other),
            )),
        }

        match self.logging.format.as_str() {
            "text" | "compact" => {}
            other => errors.push(FieldError::new(
                "logging.format",
                format!("Invalid log format: {}", other),
            )),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors))
        }
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P, connector: &str) -> Result<(), ConfigError> {
        let kind = connector
            .parse::<ConnectorKind>()
            .map_err(|e| ConfigError::ValidationError(vec![FieldError::new("connector", e)]))?;

        let mut config = ConnectorConfig {
            connector: kind,
            endpoint: EndpointConfig {
                host: "solr.internal".to_string(),
                core: "collection1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        if kind == ConnectorKind::BasicAuth {
            config.endpoint.username = "solr".to_string();
            config.endpoint.password = "change-me".to_string();
        }

        config.save_to_file(path)
    }
}

/// A validation problem scoped to a single configuration option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {}", join_field_errors(.0))]
    ValidationError(Vec<FieldError>),
}

impl ConfigError {
    /// Field-scoped problems carried by a validation error
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ConfigError::ValidationError(errors) => errors,
            _ => &[],
        }
    }
}
