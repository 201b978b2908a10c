//! Application configuration.
//!
//! Defaults are overlaid by an optional TOML file, then by `LARDER_*`
//! environment overrides gathered into [`ConfigOverrides`]. Components receive
//! the resulting struct at construction; nothing in the core reads the
//! process environment directly.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub notify: NotifyConfig,
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// When false, the deterministic keyword interpreter is used instead of
    /// the network-backed one.
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub email_enabled: bool,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<SecretString>,
    pub from_address: String,
    pub email_recipients: Vec<String>,
    pub sms_enabled: bool,
    pub sms_api_url: Option<String>,
    pub sms_api_key: Option<SecretString>,
    pub sms_recipients: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Local hour of day (0-23) at which the daily check fires.
    pub daily_hour: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
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
    pub llm_enabled: Option<bool>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub email_recipients: Option<Vec<String>>,
    pub sms_recipients: Option<Vec<String>>,
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
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://larder.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                enabled: false,
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            notify: NotifyConfig {
                email_enabled: false,
                email_api_url: None,
                email_api_key: None,
                from_address: "larder@localhost".to_string(),
                email_recipients: Vec::new(),
                sms_enabled: false,
                sms_api_url: None,
                sms_api_key: None,
                sms_recipients: Vec::new(),
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            schedule: ScheduleConfig { enabled: true, daily_hour: 8 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

/// Optional-field mirror of [`AppConfig`] for TOML deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    notify: Option<NotifyPatch>,
    server: Option<ServerPatch>,
    schedule: Option<SchedulePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotifyPatch {
    email_enabled: Option<bool>,
    email_api_url: Option<String>,
    email_api_key: Option<String>,
    from_address: Option<String>,
    email_recipients: Option<Vec<String>>,
    sms_enabled: Option<bool>,
    sms_api_url: Option<String>,
    sms_api_key: Option<String>,
    sms_recipients: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchedulePatch {
    enabled: Option<bool>,
    daily_hour: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => {
                let patch = read_patch(&path)?;
                config.apply_patch(patch);
            }
            None if options.require_file => {
                return Err(ConfigError::MissingConfigFile(
                    options.config_path.unwrap_or_else(|| PathBuf::from("larder.toml")),
                ));
            }
            None => {}
        }

        let mut overrides = env_overrides()?;
        merge_overrides(&mut overrides, options.overrides);
        config.apply_overrides(overrides);

        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            apply_field(&mut self.database.url, database.url);
            apply_field(&mut self.database.max_connections, database.max_connections);
            apply_field(&mut self.database.timeout_secs, database.timeout_secs);
        }
        if let Some(llm) = patch.llm {
            apply_field(&mut self.llm.enabled, llm.enabled);
            apply_field(&mut self.llm.provider, llm.provider);
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            apply_field(&mut self.llm.model, llm.model);
            apply_field(&mut self.llm.timeout_secs, llm.timeout_secs);
        }
        if let Some(notify) = patch.notify {
            apply_field(&mut self.notify.email_enabled, notify.email_enabled);
            if let Some(url) = notify.email_api_url {
                self.notify.email_api_url = Some(url);
            }
            if let Some(key) = notify.email_api_key {
                self.notify.email_api_key = Some(key.into());
            }
            apply_field(&mut self.notify.from_address, notify.from_address);
            apply_field(&mut self.notify.email_recipients, notify.email_recipients);
            apply_field(&mut self.notify.sms_enabled, notify.sms_enabled);
            if let Some(url) = notify.sms_api_url {
                self.notify.sms_api_url = Some(url);
            }
            if let Some(key) = notify.sms_api_key {
                self.notify.sms_api_key = Some(key.into());
            }
            apply_field(&mut self.notify.sms_recipients, notify.sms_recipients);
        }
        if let Some(server) = patch.server {
            apply_field(&mut self.server.bind_address, server.bind_address);
            apply_field(&mut self.server.port, server.port);
        }
        if let Some(schedule) = patch.schedule {
            apply_field(&mut self.schedule.enabled, schedule.enabled);
            apply_field(&mut self.schedule.daily_hour, schedule.daily_hour);
        }
        if let Some(logging) = patch.logging {
            apply_field(&mut self.logging.level, logging.level);
            apply_field(&mut self.logging.format, logging.format);
        }
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        apply_field(&mut self.database.url, overrides.database_url);
        apply_field(&mut self.logging.level, overrides.log_level);
        apply_field(&mut self.llm.enabled, overrides.llm_enabled);
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(base_url);
        }
        apply_field(&mut self.llm.model, overrides.llm_model);
        apply_field(&mut self.notify.email_recipients, overrides.email_recipients);
        apply_field(&mut self.notify.sms_recipients, overrides.sms_recipients);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.schedule.daily_hour > 23 {
            return Err(ConfigError::Validation(format!(
                "schedule.daily_hour must be 0-23, got {}",
                self.schedule.daily_hour
            )));
        }
        if self.llm.enabled && self.llm.base_url.is_none() {
            return Err(ConfigError::Validation(
                "llm.base_url is required when llm.enabled is true".to_string(),
            ));
        }
        if self.notify.email_enabled {
            if self.notify.email_api_url.is_none() {
                return Err(ConfigError::Validation(
                    "notify.email_api_url is required when email is enabled".to_string(),
                ));
            }
            if self.notify.email_recipients.is_empty() {
                return Err(ConfigError::Validation(
                    "notify.email_recipients must not be empty when email is enabled".to_string(),
                ));
            }
        }
        if self.notify.sms_enabled {
            if self.notify.sms_api_url.is_none() {
                return Err(ConfigError::Validation(
                    "notify.sms_api_url is required when sms is enabled".to_string(),
                ));
            }
            if self.notify.sms_recipients.is_empty() {
                return Err(ConfigError::Validation(
                    "notify.sms_recipients must not be empty when sms is enabled".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn apply_field<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn merge_overrides(base: &mut ConfigOverrides, extra: ConfigOverrides) {
    // Caller-supplied overrides win over environment ones.
    if extra.database_url.is_some() {
        base.database_url = extra.database_url;
    }
    if extra.log_level.is_some() {
        base.log_level = extra.log_level;
    }
    if extra.llm_enabled.is_some() {
        base.llm_enabled = extra.llm_enabled;
    }
    if extra.llm_api_key.is_some() {
        base.llm_api_key = extra.llm_api_key;
    }
    if extra.llm_base_url.is_some() {
        base.llm_base_url = extra.llm_base_url;
    }
    if extra.llm_model.is_some() {
        base.llm_model = extra.llm_model;
    }
    if extra.email_recipients.is_some() {
        base.email_recipients = extra.email_recipients;
    }
    if extra.sms_recipients.is_some() {
        base.sms_recipients = extra.sms_recipients;
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("larder.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn env_overrides() -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides {
        database_url: env::var("LARDER_DATABASE_URL").ok(),
        log_level: env::var("LARDER_LOG_LEVEL").ok(),
        llm_api_key: env::var("LARDER_LLM_API_KEY").ok(),
        llm_base_url: env::var("LARDER_LLM_BASE_URL").ok(),
        llm_model: env::var("LARDER_LLM_MODEL").ok(),
        ..ConfigOverrides::default()
    };

    if let Ok(raw) = env::var("LARDER_LLM_ENABLED") {
        overrides.llm_enabled = Some(parse_bool("LARDER_LLM_ENABLED", &raw)?);
    }
    if let Ok(raw) = env::var("LARDER_EMAIL_RECIPIENTS") {
        overrides.email_recipients = Some(parse_list(&raw));
    }
    if let Ok(raw) = env::var("LARDER_SMS_RECIPIENTS") {
        overrides.sms_recipients = Some(parse_list(&raw));
    }

    Ok(overrides)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: raw.to_string() }),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::load(LoadOptions::default()).expect("load defaults");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.schedule.daily_hour, 8);
        assert!(!config.llm.enabled);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn file_patch_then_overrides_win_in_order() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://from-file.db\"\n\n[schedule]\ndaily_hour = 20\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.schedule.daily_hour, 20);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/larder.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_daily_hour() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[schedule]\ndaily_hour = 24\n").expect("write config");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(result.is_err());
    }

    #[test]
    fn enabled_email_requires_recipients_and_endpoint() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[notify]\nemail_enabled = true\n").expect("write config");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(result.is_err());
    }
}
