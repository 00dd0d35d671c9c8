//! Layered configuration: built-in defaults, then a TOML file, then `SMASHBOT_*` environment
//! variables, then [`ConfigOverrides`]. Validation runs once, after every layer is applied, and
//! reports every problem it finds.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const SEARCH_PATHS: [&str; 2] = ["smashbot.toml", "config/smashbot.toml"];

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub catalog: CatalogConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://smashbot.db".to_owned(), max_connections: 5, timeout_secs: 30 }
    }
}

/// Replies go through each interaction's `response_url`, which carries its own authorization,
/// so the Socket Mode tokens are only needed by a live envelope source.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlackConfig {
    #[serde(deserialize_with = "optional_secret")]
    pub app_token: Option<SecretString>,
    #[serde(deserialize_with = "optional_secret")]
    pub bot_token: Option<SecretString>,
    pub invite_url: Option<String>,
}

impl SlackConfig {
    pub fn socket_mode_credentials(&self) -> Credentials {
        match (&self.app_token, &self.bot_token) {
            (Some(_), Some(_)) => Credentials::Complete,
            (None, None) => Credentials::Absent,
            _ => Credentials::Partial,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credentials {
    Complete,
    Partial,
    Absent,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/catalog.json") }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub store_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { idle_timeout_secs: 30, store_timeout_ms: 3_000 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_owned(),
            health_check_port: 8080,
            graceful_shutdown_secs: 15,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported log format `{other}`")),
        }
    }
}

/// Last layer, for callers that already know a value (tests, embedding binaries).
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub slack_invite_url: Option<String>,
    pub session_idle_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    fn apply_to(self, config: &mut AppConfig) {
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(path) = self.catalog_path {
            config.catalog.path = path;
        }
        if let Some(invite_url) = self.slack_invite_url {
            config.slack.invite_url = Some(invite_url);
        }
        if let Some(secs) = self.session_idle_timeout_secs {
            config.session.idle_timeout_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
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
    #[error("invalid value for `{key}`: `{value}`")]
    InvalidEnvOverride { key: &'static str, value: String },
    #[error("configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Self::load_with(options, |key| env::var(key).ok())
    }

    /// Same as [`AppConfig::load`], reading environment variables through `lookup`.
    pub fn load_with<F>(options: LoadOptions, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match locate(options.config_path.as_deref()) {
            Some(path) => Self::from_file(&path)?,
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(SEARCH_PATHS[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => Self::default(),
        };

        config.apply_env(&EnvLayer { lookup })?;
        options.overrides.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        toml::from_str(&raw)
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
    }

    fn apply_env<F>(&mut self, env: &EnvLayer<F>) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env.parse_into("SMASHBOT_DATABASE_URL", &mut self.database.url)?;
        env.parse_into("SMASHBOT_DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections)?;
        env.parse_into("SMASHBOT_DATABASE_TIMEOUT_SECS", &mut self.database.timeout_secs)?;

        if let Some(token) = env.get("SMASHBOT_SLACK_APP_TOKEN") {
            self.slack.app_token = Some(token.into());
        }
        if let Some(token) = env.get("SMASHBOT_SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token.into());
        }
        if let Some(url) = env.get("SMASHBOT_SLACK_INVITE_URL") {
            self.slack.invite_url = Some(url);
        }

        env.parse_into("SMASHBOT_CATALOG_PATH", &mut self.catalog.path)?;

        env.parse_into("SMASHBOT_SESSION_IDLE_TIMEOUT_SECS", &mut self.session.idle_timeout_secs)?;
        env.parse_into("SMASHBOT_SESSION_STORE_TIMEOUT_MS", &mut self.session.store_timeout_ms)?;

        env.parse_into("SMASHBOT_SERVER_BIND_ADDRESS", &mut self.server.bind_address)?;
        env.parse_into("SMASHBOT_SERVER_HEALTH_CHECK_PORT", &mut self.server.health_check_port)?;
        env.parse_into(
            "SMASHBOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
            &mut self.server.graceful_shutdown_secs,
        )?;

        // Short aliases first so the full names win when both are set.
        env.parse_into("SMASHBOT_LOG_LEVEL", &mut self.logging.level)?;
        env.parse_into("SMASHBOT_LOGGING_LEVEL", &mut self.logging.level)?;
        env.parse_into("SMASHBOT_LOG_FORMAT", &mut self.logging.format)?;
        env.parse_into("SMASHBOT_LOGGING_FORMAT", &mut self.logging.format)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check = |ok: bool, message: &str| {
            if !ok {
                problems.push(message.to_owned());
            }
        };

        let url = self.database.url.trim();
        check(
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:",
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        );
        check(self.database.max_connections > 0, "database.max_connections must be at least 1");
        check(
            (1..=300).contains(&self.database.timeout_secs),
            "database.timeout_secs must be in range 1..=300",
        );

        check(
            token_has_prefix(self.slack.app_token.as_ref(), "xapp-"),
            "slack.app_token must be an app-level token starting with `xapp-`",
        );
        check(
            token_has_prefix(self.slack.bot_token.as_ref(), "xoxb-"),
            "slack.bot_token must be a bot token starting with `xoxb-`",
        );
        check(
            self.slack.invite_url.as_deref().map_or(true, |url| url.starts_with("https://")),
            "slack.invite_url must start with https://",
        );

        check(!self.catalog.path.as_os_str().is_empty(), "catalog.path must not be empty");

        check(
            (1..=900).contains(&self.session.idle_timeout_secs),
            "session.idle_timeout_secs must be in range 1..=900",
        );
        check(
            (1..=60_000).contains(&self.session.store_timeout_ms),
            "session.store_timeout_ms must be in range 1..=60000",
        );

        check(self.server.health_check_port > 0, "server.health_check_port must not be 0");
        check(
            self.server.graceful_shutdown_secs > 0,
            "server.graceful_shutdown_secs must be at least 1",
        );

        check(
            matches!(
                self.logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "logging.level must be one of trace|debug|info|warn|error",
        );

        problems
    }
}

fn token_has_prefix(token: Option<&SecretString>, prefix: &str) -> bool {
    token.map_or(true, |token| token.expose_secret().starts_with(prefix))
}

fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => SEARCH_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|token| !token.trim().is_empty()).map(SecretString::from))
}

struct EnvLayer<F> {
    lookup: F,
}

impl<F> EnvLayer<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
    }

    fn parse_into<T: FromStr>(&self, key: &'static str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.get(key) {
            *target = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnvOverride { key, value: value.clone() })?;
        }
        Ok(())
    }
}
