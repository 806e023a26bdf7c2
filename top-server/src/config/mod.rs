mod loader;

use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use top_core::OidcProviderConfig;

/// Environment variable naming an explicit YAML config file.
pub const CONFIG_FILE_ENV: &str = "TOP_CONFIG_YAML";

/// Default config file name, looked up in the working directory and then in
/// the home directory.
pub const CONFIG_FILE_NAME: &str = ".top.yaml";

/// `TOP_CONFIG_YAML` with the prefix stripped; never treated as a field.
const CONFIG_FILE_KEY: &str = "config_yaml";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O or YAML parsing error occurred while loading config sources.
    Load(String),
    /// The merged values do not form a valid configuration.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Output format of the log subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration of the test OP service.
///
/// Resolution order (lowest to highest priority):
/// 1. built-in defaults
/// 2. the YAML file named by `TOP_CONFIG_YAML`, else `./.top.yaml`, else `~/.top.yaml`
/// 3. `.env` file (loaded into the process environment, never overriding it)
/// 4. `TOP_*` environment variables, e.g. `TOP_CLIENT_ID`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub provider: OidcProviderConfig,
    /// Short name of this service.
    pub service_name: String,
    /// External base URL of this service.
    pub service_url: String,
    pub host: String,
    pub port: u16,
    /// Path prefix under which the API is mounted.
    pub api_root_path: String,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            provider: OidcProviderConfig::default(),
            service_name: "top".into(),
            service_url: "http://localhost:8080".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            api_root_path: String::new(),
            cors_allowed_origins: Vec::new(),
            log_level: "info".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServiceConfig {
    /// Load the configuration from the config file and the environment.
    ///
    /// `config_path` replaces the default config file lookup.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let path = config_path.map(Path::to_path_buf).or_else(config_file);
        Self::load_from(path.as_deref(), std::env::vars())
    }

    /// Load the configuration from the given YAML file, overlaid with the
    /// given variables. A missing file is skipped; only `TOP_*` variables
    /// are considered.
    pub fn load_from<I>(path: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut values = default_values()?;
        if let Some(path) = path {
            loader::load_yaml_file(path, &mut values)?;
        }
        loader::overlay_env(&mut values, vars);
        Self::from_values(values)
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut values = default_values()?;
        loader::load_yaml_str(yaml, &mut values)?;
        Self::from_values(values)
    }

    /// Check the provider and service settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("service_name must not be empty".into()));
        }
        url::Url::parse(&self.service_url).map_err(|e| {
            ConfigError::Invalid(format!("service_url {:?}: {e}", self.service_url))
        })?;
        if !self.api_root_path.is_empty() && !self.api_root_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "api_root_path {:?} must start with '/'",
                self.api_root_path
            )));
        }
        for origin in &self.cors_allowed_origins {
            HeaderValue::from_str(origin).map_err(|e| {
                ConfigError::Invalid(format!("CORS origin {origin:?}: {e}"))
            })?;
        }
        Ok(())
    }

    /// The API root path without a trailing slash.
    pub fn root_path(&self) -> &str {
        self.api_root_path.trim_end_matches('/')
    }

    /// The socket address to listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_values(values: Mapping) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_value(Value::Mapping(values))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn default_values() -> Result<Mapping, ConfigError> {
    match serde_yaml::to_value(ServiceConfig::default()) {
        Ok(Value::Mapping(values)) => Ok(values),
        Ok(_) => Err(ConfigError::Load("defaults are not a mapping".into())),
        Err(e) => Err(ConfigError::Load(e.to_string())),
    }
}

fn config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}
