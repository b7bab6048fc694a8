use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use watchfinder_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let search_api_key = config
        .search
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let catalog_path = config
        .search
        .catalog_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());

    let fields = vec![
        field("database.url", config.database.url.clone(), &["WATCHFINDER_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["WATCHFINDER_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["WATCHFINDER_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "search.endpoint",
            config.search.endpoint.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["WATCHFINDER_SEARCH_ENDPOINT"],
        ),
        field(
            "search.index_name",
            config.search.index_name.clone(),
            &["WATCHFINDER_SEARCH_INDEX_NAME"],
        ),
        field("search.api_key", search_api_key, &["WATCHFINDER_SEARCH_API_KEY"]),
        field(
            "search.api_version",
            config.search.api_version.clone(),
            &["WATCHFINDER_SEARCH_API_VERSION"],
        ),
        field(
            "search.timeout_secs",
            config.search.timeout_secs.to_string(),
            &["WATCHFINDER_SEARCH_TIMEOUT_SECS"],
        ),
        field("search.catalog_path", catalog_path, &["WATCHFINDER_SEARCH_CATALOG_PATH"]),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["WATCHFINDER_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["WATCHFINDER_SERVER_PORT"]),
        field(
            "server.public_origin",
            config.server.public_origin.clone(),
            &["WATCHFINDER_SERVER_PUBLIC_ORIGIN"],
        ),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["WATCHFINDER_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["WATCHFINDER_LOGGING_LEVEL", "WATCHFINDER_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["WATCHFINDER_LOGGING_FORMAT", "WATCHFINDER_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields
            .into_iter()
            .map(|(key, value, env_keys)| render_line(key, &value, source(key, env_keys))),
    );
    lines.join("\n")
}

type Field = (&'static str, String, &'static [&'static str]);

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    ["watchfinder.toml", "config/watchfinder.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters so operators can tell keys apart.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    let hidden = trimmed.chars().count().saturating_sub(4);
    if trimmed.is_empty() {
        "<empty>".to_string()
    } else if hidden == 0 {
        "<redacted>".to_string()
    } else {
        let tail = trimmed.chars().skip(hidden).collect::<String>();
        format!("***{tail}")
    }
}
