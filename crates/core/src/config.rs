use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Injects a fixed mock entrepreneur for sessionless requests.
    /// Validation rejects this outside the development environment.
    pub dev_bypass: bool,
    pub session_ttl_hours: u64,
    pub state_secret: SecretString,
    pub callback_base_url: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<SecretString>,
    pub azure_client_id: Option<String>,
    pub azure_client_secret: Option<SecretString>,
    pub azure_tenant: Option<String>,
    pub chat_rate_limit_per_minute: u32,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    /// Azure resource endpoint, e.g. `https://myresource.openai.azure.com`.
    pub endpoint: Option<String>,
    /// Azure deployment name. Unused for the standard OpenAI endpoint.
    pub deployment: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl LlmConfig {
    /// Whether outbound completions can be attempted at all. Handlers fall
    /// back to canned responses when this is false.
    pub fn is_configured(&self) -> bool {
        let has_key =
            self.api_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false);
        match self.provider {
            LlmProvider::OpenAi => has_key,
            LlmProvider::AzureOpenAi => {
                has_key && self.endpoint.is_some() && self.deployment.is_some()
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    AzureOpenAi,
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
    pub environment: Option<Environment>,
    pub dev_bypass: Option<bool>,
    pub state_secret: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
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

const DEV_STATE_SECRET: &str = "dev-only-state-secret";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://cofoundry.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                environment: Environment::Development,
                graceful_shutdown_secs: 15,
            },
            auth: AuthConfig {
                dev_bypass: false,
                session_ttl_hours: 72,
                state_secret: DEV_STATE_SECRET.to_string().into(),
                callback_base_url: None,
                google_client_id: None,
                google_client_secret: None,
                azure_client_id: None,
                azure_client_secret: None,
                azure_tenant: None,
                chat_rate_limit_per_minute: 20,
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                endpoint: None,
                deployment: None,
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::Validation(format!(
                "unsupported environment `{other}` (expected development|production)"
            ))),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure_openai" | "azure" => Ok(Self::AzureOpenAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|azure_openai)"
            ))),
        }
    }
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cofoundry.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_vendor_env();
        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
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

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(environment) = server.environment {
                self.server.environment = environment;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(dev_bypass) = auth.dev_bypass {
                self.auth.dev_bypass = dev_bypass;
            }
            if let Some(session_ttl_hours) = auth.session_ttl_hours {
                self.auth.session_ttl_hours = session_ttl_hours;
            }
            if let Some(state_secret_value) = auth.state_secret {
                self.auth.state_secret = secret_value(state_secret_value);
            }
            if let Some(callback_base_url) = auth.callback_base_url {
                self.auth.callback_base_url = Some(callback_base_url);
            }
            if let Some(google_client_id) = auth.google_client_id {
                self.auth.google_client_id = Some(google_client_id);
            }
            if let Some(google_client_secret_value) = auth.google_client_secret {
                self.auth.google_client_secret = Some(secret_value(google_client_secret_value));
            }
            if let Some(azure_client_id) = auth.azure_client_id {
                self.auth.azure_client_id = Some(azure_client_id);
            }
            if let Some(azure_client_secret_value) = auth.azure_client_secret {
                self.auth.azure_client_secret = Some(secret_value(azure_client_secret_value));
            }
            if let Some(azure_tenant) = auth.azure_tenant {
                self.auth.azure_tenant = Some(azure_tenant);
            }
            if let Some(chat_rate_limit_per_minute) = auth.chat_rate_limit_per_minute {
                self.auth.chat_rate_limit_per_minute = chat_rate_limit_per_minute;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(endpoint) = llm.endpoint {
                self.llm.endpoint = Some(endpoint);
            }
            if let Some(deployment) = llm.deployment {
                self.llm.deployment = Some(deployment);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
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

    /// Well-known vendor variables, applied between the file layer and the
    /// `COFOUNDRY_*` layer so project-scoped overrides still win.
    fn apply_vendor_env(&mut self) {
        if let Some(value) = read_env("AZURE_OPENAI_API_KEY") {
            self.llm.provider = LlmProvider::AzureOpenAi;
            self.llm.api_key = Some(secret_value(value));
        } else if let Some(value) = read_env("OPENAI_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("AZURE_OPENAI_ENDPOINT") {
            self.llm.endpoint = Some(value);
        }
        if let Some(value) = read_env("AZURE_OPENAI_DEPLOYMENT") {
            self.llm.deployment = Some(value);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COFOUNDRY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COFOUNDRY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("COFOUNDRY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COFOUNDRY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COFOUNDRY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COFOUNDRY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COFOUNDRY_SERVER_PORT") {
            self.server.port = parse_u16("COFOUNDRY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COFOUNDRY_SERVER_ENVIRONMENT") {
            self.server.environment = value.parse()?;
        }
        if let Some(value) = read_env("COFOUNDRY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COFOUNDRY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("COFOUNDRY_AUTH_DEV_BYPASS") {
            self.auth.dev_bypass = parse_bool("COFOUNDRY_AUTH_DEV_BYPASS", &value)?;
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_SESSION_TTL_HOURS") {
            self.auth.session_ttl_hours = parse_u64("COFOUNDRY_AUTH_SESSION_TTL_HOURS", &value)?;
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_STATE_SECRET") {
            self.auth.state_secret = secret_value(value);
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_CALLBACK_BASE_URL") {
            self.auth.callback_base_url = Some(value);
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_GOOGLE_CLIENT_ID") {
            self.auth.google_client_id = Some(value);
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_GOOGLE_CLIENT_SECRET") {
            self.auth.google_client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_AZURE_CLIENT_ID") {
            self.auth.azure_client_id = Some(value);
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_AZURE_CLIENT_SECRET") {
            self.auth.azure_client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_AZURE_TENANT") {
            self.auth.azure_tenant = Some(value);
        }
        if let Some(value) = read_env("COFOUNDRY_AUTH_CHAT_RATE_LIMIT") {
            self.auth.chat_rate_limit_per_minute =
                parse_u32("COFOUNDRY_AUTH_CHAT_RATE_LIMIT", &value)?;
        }

        if let Some(value) = read_env("COFOUNDRY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("COFOUNDRY_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("COFOUNDRY_LLM_ENDPOINT") {
            self.llm.endpoint = Some(value);
        }
        if let Some(value) = read_env("COFOUNDRY_LLM_DEPLOYMENT") {
            self.llm.deployment = Some(value);
        }
        if let Some(value) = read_env("COFOUNDRY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("COFOUNDRY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("COFOUNDRY_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("COFOUNDRY_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("COFOUNDRY_LLM_MAX_RETRIES", &value)?;
        }

        let log_level =
            read_env("COFOUNDRY_LOGGING_LEVEL").or_else(|| read_env("COFOUNDRY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COFOUNDRY_LOGGING_FORMAT").or_else(|| read_env("COFOUNDRY_LOG_FORMAT"));
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
        if let Some(environment) = overrides.environment {
            self.server.environment = environment;
        }
        if let Some(dev_bypass) = overrides.dev_bypass {
            self.auth.dev_bypass = dev_bypass;
        }
        if let Some(state_secret) = overrides.state_secret {
            self.auth.state_secret = secret_value(state_secret);
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_auth(&self.auth, self.server.environment)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cofoundry.toml"), PathBuf::from("config/cofoundry.toml")]
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

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig, environment: Environment) -> Result<(), ConfigError> {
    if auth.dev_bypass && environment != Environment::Development {
        return Err(ConfigError::Validation(
            "auth.dev_bypass is only permitted when server.environment = \"development\""
                .to_string(),
        ));
    }

    if auth.session_ttl_hours == 0 || auth.session_ttl_hours > 720 {
        return Err(ConfigError::Validation(
            "auth.session_ttl_hours must be in range 1..=720".to_string(),
        ));
    }

    if auth.chat_rate_limit_per_minute == 0 {
        return Err(ConfigError::Validation(
            "auth.chat_rate_limit_per_minute must be greater than zero".to_string(),
        ));
    }

    let oauth_configured = auth.google_client_id.is_some() || auth.azure_client_id.is_some();
    if oauth_configured {
        if auth.google_client_id.is_some() && auth.google_client_secret.is_none() {
            return Err(ConfigError::Validation(
                "auth.google_client_secret is required when auth.google_client_id is set"
                    .to_string(),
            ));
        }
        if auth.azure_client_id.is_some() && auth.azure_client_secret.is_none() {
            return Err(ConfigError::Validation(
                "auth.azure_client_secret is required when auth.azure_client_id is set".to_string(),
            ));
        }
        if auth.callback_base_url.is_none() {
            return Err(ConfigError::Validation(
                "auth.callback_base_url is required when an OAuth provider is configured"
                    .to_string(),
            ));
        }
    }

    if environment == Environment::Production {
        let secret = auth.state_secret.expose_secret();
        if secret.trim().is_empty() || secret == DEV_STATE_SECRET {
            return Err(ConfigError::Validation(
                "auth.state_secret must be set to a unique value in production".to_string(),
            ));
        }
    }

    if let Some(base_url) = &auth.callback_base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "auth.callback_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_retries > 10 {
        return Err(ConfigError::Validation("llm.max_retries must be at most 10".to_string()));
    }

    if llm.provider == LlmProvider::AzureOpenAi {
        let has_key =
            llm.api_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false);
        if has_key && (llm.endpoint.is_none() || llm.deployment.is_none()) {
            return Err(ConfigError::Validation(
                "llm.endpoint and llm.deployment are required for the azure_openai provider"
                    .to_string(),
            ));
        }
    }

    if let Some(endpoint) = &llm.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.endpoint must start with http:// or https://".to_string(),
            ));
        }
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    auth: Option<AuthPatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    environment: Option<Environment>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    dev_bypass: Option<bool>,
    session_ttl_hours: Option<u64>,
    state_secret: Option<String>,
    callback_base_url: Option<String>,
    google_client_id: Option<String>,
    google_client_secret: Option<String>,
    azure_client_id: Option<String>,
    azure_client_secret: Option<String>,
    azure_tenant: Option<String>,
    chat_rate_limit_per_minute: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    endpoint: Option<String>,
    deployment: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, Environment, LlmProvider, LoadOptions, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const VENDOR_VARS: &[&str] = &[
        "OPENAI_API_KEY",
        "AZURE_OPENAI_API_KEY",
        "AZURE_OPENAI_ENDPOINT",
        "AZURE_OPENAI_DEPLOYMENT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        env::set_var("TEST_LLM_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cofoundry.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_LLM_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config
                .llm
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string())
                .unwrap_or_default();
            ensure(api_key == "sk-from-env", "api key should be loaded from environment")?;
            Ok(())
        })();

        clear_vars(&["TEST_LLM_API_KEY"]);
        result
    }

    #[test]
    fn vendor_azure_vars_select_the_azure_provider() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        env::set_var("AZURE_OPENAI_API_KEY", "azure-key");
        env::set_var("AZURE_OPENAI_ENDPOINT", "https://myresource.openai.azure.com");
        env::set_var("AZURE_OPENAI_DEPLOYMENT", "chat");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.provider == LlmProvider::AzureOpenAi,
                "azure key should switch the provider",
            )?;
            ensure(config.llm.is_configured(), "azure config should count as configured")?;
            Ok(())
        })();

        clear_vars(VENDOR_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        env::set_var("COFOUNDRY_DATABASE_URL", "sqlite://from-env.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cofoundry.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["COFOUNDRY_DATABASE_URL"]);
        result
    }

    #[test]
    fn dev_bypass_is_rejected_in_production() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                environment: Some(Environment::Production),
                dev_bypass: Some(true),
                state_secret: Some("unique-production-secret".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("dev_bypass")
            ),
            "validation failure should mention dev_bypass",
        )
    }

    #[test]
    fn production_requires_a_real_state_secret() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                environment: Some(Environment::Production),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("state_secret")
            ),
            "validation failure should mention state_secret",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        env::set_var("COFOUNDRY_LOG_LEVEL", "warn");
        env::set_var("COFOUNDRY_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["COFOUNDRY_LOG_LEVEL", "COFOUNDRY_LOG_FORMAT"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        env::set_var("COFOUNDRY_LLM_API_KEY", "sk-super-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("sk-super-secret-value"),
                "debug output should not contain the api key",
            )?;
            Ok(())
        })();

        clear_vars(&["COFOUNDRY_LLM_API_KEY"]);
        result
    }

    #[test]
    fn oauth_provider_requires_secret_and_callback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(VENDOR_VARS);

        env::set_var("COFOUNDRY_AUTH_GOOGLE_CLIENT_ID", "google-client");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message)
                        if message.contains("google_client_secret")
                ),
                "validation failure should mention the missing client secret",
            )
        })();

        clear_vars(&["COFOUNDRY_AUTH_GOOGLE_CLIENT_ID"]);
        result
    }
}
