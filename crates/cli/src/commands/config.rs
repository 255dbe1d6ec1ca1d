use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cofoundry_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "COFOUNDRY_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "COFOUNDRY_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "COFOUNDRY_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "COFOUNDRY_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "COFOUNDRY_SERVER_PORT"),
    ));
    lines.push(render_line(
        "server.environment",
        &format!("{:?}", config.server.environment),
        source("server.environment", "COFOUNDRY_SERVER_ENVIRONMENT"),
    ));

    lines.push(render_line(
        "auth.dev_bypass",
        &config.auth.dev_bypass.to_string(),
        source("auth.dev_bypass", "COFOUNDRY_AUTH_DEV_BYPASS"),
    ));
    lines.push(render_line(
        "auth.session_ttl_hours",
        &config.auth.session_ttl_hours.to_string(),
        source("auth.session_ttl_hours", "COFOUNDRY_AUTH_SESSION_TTL_HOURS"),
    ));
    lines.push(render_line("auth.state_secret", "<redacted>", source(
        "auth.state_secret",
        "COFOUNDRY_AUTH_STATE_SECRET",
    )));
    lines.push(render_line(
        "auth.google_client_id",
        config.auth.google_client_id.as_deref().unwrap_or("<unset>"),
        source("auth.google_client_id", "COFOUNDRY_AUTH_GOOGLE_CLIENT_ID"),
    ));
    lines.push(render_line(
        "auth.azure_client_id",
        config.auth.azure_client_id.as_deref().unwrap_or("<unset>"),
        source("auth.azure_client_id", "COFOUNDRY_AUTH_AZURE_CLIENT_ID"),
    ));

    lines.push(render_line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", "COFOUNDRY_LLM_PROVIDER"),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        source("llm.model", "COFOUNDRY_LLM_MODEL"),
    ));
    lines.push(render_line(
        "llm.endpoint",
        config.llm.endpoint.as_deref().unwrap_or("<unset>"),
        source("llm.endpoint", "COFOUNDRY_LLM_ENDPOINT"),
    ));
    lines.push(render_line(
        "llm.deployment",
        config.llm.deployment.as_deref().unwrap_or("<unset>"),
        source("llm.deployment", "COFOUNDRY_LLM_DEPLOYMENT"),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        llm_api_key,
        source("llm.api_key", "COFOUNDRY_LLM_API_KEY"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "COFOUNDRY_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "COFOUNDRY_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("cofoundry.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cofoundry.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
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
