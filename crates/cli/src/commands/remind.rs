use std::sync::Arc;

use chrono::Local;

use larder_core::config::{AppConfig, LoadOptions};
use larder_core::domain::notification::NotificationKind;
use larder_db::{connect, migrations, SqlItemRepository, SqlNotificationLogRepository};
use larder_notify::{
    EmailChannel, HttpEmailTransport, HttpSmsTransport, ReminderService, SmsChannel,
};

use crate::commands::{current_thread_runtime, CommandResult};

const TRANSPORT_TIMEOUT_SECS: u64 = 30;

/// Runs the manual reminder pipeline from the command line: compute the
/// low-stock set, compose, send on the configured channels, log.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "remind",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime("remind") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let email = build_email_channel(&config)
            .map_err(|message| ("transport_setup", message, 6u8))?;
        let sms =
            build_sms_channel(&config).map_err(|message| ("transport_setup", message, 6u8))?;

        let service = ReminderService::new(
            Arc::new(SqlItemRepository::new(pool.clone())),
            Arc::new(SqlNotificationLogRepository::new(pool.clone())),
            email,
            sms,
        );

        let outcome = service
            .run(NotificationKind::Manual, Local::now().date_naive())
            .await
            .map_err(|error| ("reminder_pipeline", error.to_string(), 7u8))?;
        pool.close().await;

        Ok::<String, (&'static str, String, u8)>(match outcome.skipped {
            Some(reason) => format!("nothing sent: {reason:?}"),
            None => format!(
                "notified about {} low item(s) (email: {}, sms: {})",
                outcome.low_items.len(),
                outcome.email_sent,
                outcome.sms_sent
            ),
        })
    });

    match result {
        Ok(message) => CommandResult::success("remind", message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("remind", error_class, message, exit_code)
        }
    }
}

// Disabled channels are absent so the notification log only ever records
// messages that actually went out.
fn build_email_channel(config: &AppConfig) -> Result<Option<EmailChannel>, String> {
    if !config.notify.email_enabled {
        return Ok(None);
    }
    let api_url =
        config.notify.email_api_url.clone().ok_or_else(|| "email api url missing".to_string())?;
    let transport = HttpEmailTransport::new(
        api_url,
        config.notify.email_api_key.clone(),
        config.notify.from_address.clone(),
        TRANSPORT_TIMEOUT_SECS,
    )
    .map_err(|error| error.to_string())?;
    Ok(Some(EmailChannel {
        transport: Arc::new(transport),
        recipients: config.notify.email_recipients.clone(),
    }))
}

fn build_sms_channel(config: &AppConfig) -> Result<Option<SmsChannel>, String> {
    if !config.notify.sms_enabled {
        return Ok(None);
    }
    let api_url =
        config.notify.sms_api_url.clone().ok_or_else(|| "sms api url missing".to_string())?;
    let transport = HttpSmsTransport::new(
        api_url,
        config.notify.sms_api_key.clone(),
        TRANSPORT_TIMEOUT_SECS,
    )
    .map_err(|error| error.to_string())?;
    Ok(Some(SmsChannel {
        transport: Arc::new(transport),
        recipients: config.notify.sms_recipients.clone(),
    }))
}
