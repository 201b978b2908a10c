use larder_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ConfigView {
    database_url: String,
    llm_enabled: bool,
    llm_model: String,
    llm_base_url: Option<String>,
    llm_api_key: &'static str,
    email_enabled: bool,
    email_recipients: Vec<String>,
    sms_enabled: bool,
    sms_recipients: Vec<String>,
    schedule_enabled: bool,
    schedule_daily_hour: u32,
    log_level: String,
}

/// Renders the effective configuration with secrets redacted.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"),
    };

    let view = ConfigView {
        database_url: config.database.url,
        llm_enabled: config.llm.enabled,
        llm_model: config.llm.model,
        llm_base_url: config.llm.base_url,
        llm_api_key: if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" },
        email_enabled: config.notify.email_enabled,
        email_recipients: config.notify.email_recipients,
        sms_enabled: config.notify.sms_enabled,
        sms_recipients: config.notify.sms_recipients,
        schedule_enabled: config.schedule.enabled,
        schedule_daily_hour: config.schedule.daily_hour,
        log_level: config.logging.level,
    };

    serde_json::to_string_pretty(&view)
        .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"))
}
