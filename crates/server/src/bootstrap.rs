use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use larder_agent::{HttpLlmClient, Interpreter, KeywordInterpreter, LlmInterpreter};
use larder_core::config::{AppConfig, ConfigError, LoadOptions};
use larder_db::{
    connect, migrations, DbPool, ItemRepository, NotificationLogRepository, SqlItemRepository,
    SqlNotificationLogRepository,
};
use larder_notify::{
    EmailChannel, HttpEmailTransport, HttpSmsTransport, ReminderService, SmsChannel,
    TransportError,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

/// Shared request state. The reconcile mutex serializes every
/// read-modify-write of the inventory so concurrent reconciliations cannot
/// lose updates or double-issue ids.
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn ItemRepository>,
    pub log: Arc<dyn NotificationLogRepository>,
    pub interpreter: Arc<dyn Interpreter>,
    pub reminders: Arc<ReminderService>,
    pub reconcile_lock: Arc<Mutex<()>>,
}

const TRANSPORT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(String),
    #[error("notification transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let items: Arc<dyn ItemRepository> = Arc::new(SqlItemRepository::new(db_pool.clone()));
    let log: Arc<dyn NotificationLogRepository> =
        Arc::new(SqlNotificationLogRepository::new(db_pool.clone()));

    let interpreter = build_interpreter(&config)?;
    let reminders = Arc::new(ReminderService::new(
        items.clone(),
        log.clone(),
        build_email_channel(&config)?,
        build_sms_channel(&config)?,
    ));

    let state = AppState {
        items,
        log,
        interpreter,
        reminders,
        reconcile_lock: Arc::new(Mutex::new(())),
    };

    Ok(Application { config, db_pool, state })
}

fn build_interpreter(config: &AppConfig) -> Result<Arc<dyn Interpreter>, BootstrapError> {
    if !config.llm.enabled {
        info!(
            event_name = "system.bootstrap.interpreter_mode",
            mode = "keyword",
            "no llm configured, using keyword fallback interpreter"
        );
        return Ok(Arc::new(KeywordInterpreter::new()));
    }

    let client = HttpLlmClient::new(config.llm.clone())
        .map_err(|error| BootstrapError::Llm(error.to_string()))?;
    info!(
        event_name = "system.bootstrap.interpreter_mode",
        mode = "llm",
        model = %config.llm.model,
        "using llm-backed interpreter"
    );
    Ok(Arc::new(LlmInterpreter::new(Arc::new(client))))
}

// A disabled channel is absent, not a noop: the notification log records only
// messages that actually went out. The noop transports stay available for
// configurations that point a channel at them explicitly.
fn build_email_channel(config: &AppConfig) -> Result<Option<EmailChannel>, BootstrapError> {
    if !config.notify.email_enabled {
        return Ok(None);
    }
    let api_url = config
        .notify
        .email_api_url
        .clone()
        .ok_or_else(|| TransportError::NotConfigured("email api url missing".to_string()))?;
    let transport = HttpEmailTransport::new(
        api_url,
        config.notify.email_api_key.clone(),
        config.notify.from_address.clone(),
        TRANSPORT_TIMEOUT_SECS,
    )?;
    Ok(Some(EmailChannel {
        transport: Arc::new(transport),
        recipients: config.notify.email_recipients.clone(),
    }))
}

fn build_sms_channel(config: &AppConfig) -> Result<Option<SmsChannel>, BootstrapError> {
    if !config.notify.sms_enabled {
        return Ok(None);
    }
    let api_url = config
        .notify
        .sms_api_url
        .clone()
        .ok_or_else(|| TransportError::NotConfigured("sms api url missing".to_string()))?;
    let transport = HttpSmsTransport::new(
        api_url,
        config.notify.sms_api_key.clone(),
        TRANSPORT_TIMEOUT_SECS,
    )?;
    Ok(Some(SmsChannel {
        transport: Arc::new(transport),
        recipients: config.notify.sms_recipients.clone(),
    }))
}
