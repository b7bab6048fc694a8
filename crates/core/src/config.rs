use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Catalog search settings. With no `endpoint` the server falls back to the
/// local catalog file at `catalog_path`.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub endpoint: Option<String>,
    pub index_name: String,
    pub api_key: Option<SecretString>,
    pub api_version: String,
    pub timeout_secs: u64,
    pub catalog_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub public_origin: String,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub search_endpoint: Option<String>,
    pub search_api_key: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub public_origin: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://watchfinder.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            search: SearchConfig {
                endpoint: None,
                index_name: "watches".to_string(),
                api_key: None,
                api_version: "2019-05-06".to_string(),
                timeout_secs: 10,
                catalog_path: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3978,
                public_origin: "http://localhost:3978".to_string(),
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("watchfinder.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Origin used to build reservation slip links. Validated at load time.
    pub fn public_origin(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.server.public_origin).map_err(|error| {
            ConfigError::Validation(format!("server.public_origin is not a valid URL: {error}"))
        })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(search) = patch.search {
            if let Some(endpoint) = search.endpoint {
                self.search.endpoint = Some(endpoint);
            }
            if let Some(index_name) = search.index_name {
                self.search.index_name = index_name;
            }
            if let Some(search_api_key_value) = search.api_key {
                self.search.api_key = Some(secret_value(search_api_key_value));
            }
            if let Some(api_version) = search.api_version {
                self.search.api_version = api_version;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
            if let Some(catalog_path) = search.catalog_path {
                self.search.catalog_path = Some(catalog_path);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(public_origin) = server.public_origin {
                self.server.public_origin = public_origin;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("WATCHFINDER_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("WATCHFINDER_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("WATCHFINDER_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("WATCHFINDER_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("WATCHFINDER_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WATCHFINDER_SEARCH_ENDPOINT") {
            self.search.endpoint = Some(value);
        }
        if let Some(value) = read_env("WATCHFINDER_SEARCH_INDEX_NAME") {
            self.search.index_name = value;
        }
        if let Some(value) = read_env("WATCHFINDER_SEARCH_API_KEY") {
            self.search.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("WATCHFINDER_SEARCH_API_VERSION") {
            self.search.api_version = value;
        }
        if let Some(value) = read_env("WATCHFINDER_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("WATCHFINDER_SEARCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("WATCHFINDER_SEARCH_CATALOG_PATH") {
            self.search.catalog_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("WATCHFINDER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("WATCHFINDER_SERVER_PORT") {
            self.server.port = parse_u16("WATCHFINDER_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("WATCHFINDER_SERVER_PUBLIC_ORIGIN") {
            self.server.public_origin = value;
        }
        if let Some(value) = read_env("WATCHFINDER_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("WATCHFINDER_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("WATCHFINDER_LOGGING_LEVEL").or_else(|| read_env("WATCHFINDER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WATCHFINDER_LOGGING_FORMAT").or_else(|| read_env("WATCHFINDER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(search_endpoint) = overrides.search_endpoint {
            self.search.endpoint = Some(search_endpoint);
        }
        if let Some(search_api_key) = overrides.search_api_key {
            self.search.api_key = Some(secret_value(search_api_key));
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.search.catalog_path = Some(catalog_path);
        }
        if let Some(public_origin) = overrides.public_origin {
            self.server.public_origin = public_origin;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_search(&self.search)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("watchfinder.toml"), PathBuf::from("config/watchfinder.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.timeout_secs == 0 || search.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "search.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    let Some(endpoint) = search.endpoint.as_deref() else {
        return Ok(());
    };
    if !is_http_url(endpoint) {
        return Err(ConfigError::Validation(
            "search.endpoint must start with http:// or https:// (e.g. https://<service>.search.windows.net)"
                .to_string(),
        ));
    }
    if search.index_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search.index_name is required when search.endpoint is set".to_string(),
        ));
    }
    let missing_key = search
        .api_key
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_key {
        return Err(ConfigError::Validation(
            "search.api_key is required when search.endpoint is set. Use a query key from the search service's Keys page"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if !is_http_url(&server.public_origin) || Url::parse(&server.public_origin).is_err() {
        return Err(ConfigError::Validation(
            "server.public_origin must be an http:// or https:// URL".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    search: Option<SearchPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    endpoint: Option<String>,
    index_name: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
    catalog_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    public_origin: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
