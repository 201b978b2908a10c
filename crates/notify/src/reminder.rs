//! The "compute low stock, compose, send, log" pipeline.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use larder_core::compose::{compose_email, compose_sms};
use larder_core::domain::item::Item;
use larder_core::domain::notification::{
    NotificationChannel, NotificationKind, NotificationLogEntry,
};
use larder_core::errors::ApplicationError;
use larder_core::forecast::running_low;
use larder_db::{ItemRepository, NotificationLogRepository};

use crate::transport::{EmailTransport, SmsTransport};

const EMAIL_SUBJECT: &str = "Larder: items running low";
/// Generous multi-part ceiling; the composer itself does not truncate.
const SMS_MAX_CHARS: usize = 480;

pub struct EmailChannel {
    pub transport: Arc<dyn EmailTransport>,
    pub recipients: Vec<String>,
}

pub struct SmsChannel {
    pub transport: Arc<dyn SmsTransport>,
    pub recipients: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// An automatic reminder already went out today.
    AlreadySentToday,
    NothingRunningLow,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReminderOutcome {
    pub low_items: Vec<Item>,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub skipped: Option<SkipReason>,
}

pub struct ReminderService {
    items: Arc<dyn ItemRepository>,
    log: Arc<dyn NotificationLogRepository>,
    email: Option<EmailChannel>,
    sms: Option<SmsChannel>,
}

impl ReminderService {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        log: Arc<dyn NotificationLogRepository>,
        email: Option<EmailChannel>,
        sms: Option<SmsChannel>,
    ) -> Self {
        Self { items, log, email, sms }
    }

    /// Runs the reminder pipeline for `today`. Automatic runs deduplicate by
    /// calendar day via the notification log, so a scheduler retry or a
    /// concurrent trigger does not double-send. Transport failures are hard
    /// errors for the send in progress; anything already sent stays logged
    /// and item state is never touched.
    pub async fn run(
        &self,
        kind: NotificationKind,
        today: NaiveDate,
    ) -> Result<ReminderOutcome, ApplicationError> {
        if kind == NotificationKind::Automatic {
            let already_sent = self
                .log
                .automatic_sent_on(today)
                .await
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
            if already_sent {
                info!(
                    event_name = "notify.reminder.deduplicated",
                    day = %today,
                    "automatic reminder already sent today, skipping"
                );
                return Ok(ReminderOutcome {
                    skipped: Some(SkipReason::AlreadySentToday),
                    ..ReminderOutcome::default()
                });
            }
        }

        let items = self
            .items
            .list_active()
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        let low_items = running_low(&items, today);

        if low_items.is_empty() {
            info!(event_name = "notify.reminder.nothing_low", day = %today, "no items running low");
            return Ok(ReminderOutcome {
                skipped: Some(SkipReason::NothingRunningLow),
                ..ReminderOutcome::default()
            });
        }

        let mut outcome = ReminderOutcome { low_items, ..ReminderOutcome::default() };

        if let (Some(channel), Some(body)) = (&self.email, compose_email(&outcome.low_items)) {
            channel
                .transport
                .send(&channel.recipients, EMAIL_SUBJECT, &body)
                .await
                .map_err(|error| ApplicationError::Transport(error.to_string()))?;
            self.record(kind, NotificationChannel::Email, &channel.recipients, body).await?;
            outcome.email_sent = true;
        }

        if let (Some(channel), Some(body)) = (&self.sms, compose_sms(&outcome.low_items)) {
            let body = truncate_sms(body);
            channel
                .transport
                .send(&channel.recipients, &body)
                .await
                .map_err(|error| ApplicationError::Transport(error.to_string()))?;
            self.record(kind, NotificationChannel::Sms, &channel.recipients, body).await?;
            outcome.sms_sent = true;
        }

        info!(
            event_name = "notify.reminder.sent",
            kind = kind.as_str(),
            low_items = outcome.low_items.len(),
            email_sent = outcome.email_sent,
            sms_sent = outcome.sms_sent,
            "reminder pipeline finished"
        );
        Ok(outcome)
    }

    async fn record(
        &self,
        kind: NotificationKind,
        channel: NotificationChannel,
        recipients: &[String],
        body: String,
    ) -> Result<(), ApplicationError> {
        let entry = NotificationLogEntry {
            sent_at: Utc::now(),
            kind,
            channel,
            recipients: recipients.to_vec(),
            body,
        };
        self.log.append(&entry).await.map_err(|error| {
            warn!(
                event_name = "notify.reminder.log_failed",
                error = %error,
                "reminder sent but audit log append failed"
            );
            ApplicationError::Persistence(error.to_string())
        })
    }
}

fn truncate_sms(body: String) -> String {
    if body.chars().count() <= SMS_MAX_CHARS {
        return body;
    }
    let mut truncated: String = body.chars().take(SMS_MAX_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    use larder_core::domain::item::Category;
    use larder_core::domain::notification::{NotificationChannel, NotificationKind};
    use larder_core::errors::ApplicationError;
    use larder_db::{
        InMemoryItemRepository, InMemoryNotificationLogRepository, ItemRepository, NewItemRecord,
    };

    use crate::transport::{EmailTransport, SmsTransport, TransportError};

    use super::{EmailChannel, ReminderService, SkipReason, SmsChannel};

    #[derive(Default)]
    struct CountingEmail {
        sends: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl EmailTransport for CountingEmail {
        async fn send(
            &self,
            _recipients: &[String],
            _subject: &str,
            _body: &str,
        ) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Send("smtp relay refused".to_string()));
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingSms {
        sends: AtomicU32,
    }

    #[async_trait]
    impl SmsTransport for CountingSms {
        async fn send(&self, _recipients: &[String], _body: &str) -> Result<(), TransportError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    async fn seeded_items(today: NaiveDate) -> Arc<InMemoryItemRepository> {
        let repo = Arc::new(InMemoryItemRepository::default());
        repo.insert(NewItemRecord {
            name: "Dog food".to_string(),
            category: Category::Pet,
            last_purchased: Some(today - chrono::Days::new(87)),
            duration_days: 90,
        })
        .await
        .expect("seed");
        repo.insert(NewItemRecord {
            name: "Motor oil".to_string(),
            category: Category::Car,
            last_purchased: Some(today),
            duration_days: 365,
        })
        .await
        .expect("seed");
        repo
    }

    fn service(
        items: Arc<InMemoryItemRepository>,
        log: Arc<InMemoryNotificationLogRepository>,
        email: Arc<CountingEmail>,
        sms: Arc<CountingSms>,
    ) -> ReminderService {
        ReminderService::new(
            items,
            log,
            Some(EmailChannel {
                transport: email,
                recipients: vec!["home@example.com".to_string()],
            }),
            Some(SmsChannel { transport: sms, recipients: vec!["+15550100".to_string()] }),
        )
    }

    #[tokio::test]
    async fn sends_both_channels_and_logs_each() {
        let today = date(2025, 9, 10);
        let items = seeded_items(today).await;
        let log = Arc::new(InMemoryNotificationLogRepository::default());
        let email = Arc::new(CountingEmail::default());
        let sms = Arc::new(CountingSms::default());

        let outcome = service(items, log.clone(), email.clone(), sms.clone())
            .run(NotificationKind::Automatic, today)
            .await
            .expect("run");

        assert_eq!(outcome.low_items.len(), 1);
        assert_eq!(outcome.low_items[0].name, "Dog food");
        assert!(outcome.email_sent && outcome.sms_sent);
        assert_eq!(email.sends.load(Ordering::SeqCst), 1);
        assert_eq!(sms.sends.load(Ordering::SeqCst), 1);

        let entries = log.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].channel, NotificationChannel::Email);
        assert_eq!(entries[1].channel, NotificationChannel::Sms);
    }

    #[tokio::test]
    async fn second_automatic_run_same_day_is_deduplicated() {
        let today = date(2025, 9, 10);
        let items = seeded_items(today).await;
        let log = Arc::new(InMemoryNotificationLogRepository::default());
        let email = Arc::new(CountingEmail::default());
        let sms = Arc::new(CountingSms::default());
        let service = service(items, log, email.clone(), sms);

        service.run(NotificationKind::Automatic, today).await.expect("first run");
        let second = service.run(NotificationKind::Automatic, today).await.expect("second run");

        assert_eq!(second.skipped, Some(SkipReason::AlreadySentToday));
        assert_eq!(email.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn manual_runs_are_not_deduplicated() {
        let today = date(2025, 9, 10);
        let items = seeded_items(today).await;
        let log = Arc::new(InMemoryNotificationLogRepository::default());
        let email = Arc::new(CountingEmail::default());
        let sms = Arc::new(CountingSms::default());
        let service = service(items, log, email.clone(), sms);

        service.run(NotificationKind::Manual, today).await.expect("first run");
        let second = service.run(NotificationKind::Manual, today).await.expect("second run");

        assert_eq!(second.skipped, None);
        assert_eq!(email.sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn nothing_low_means_no_send() {
        let today = date(2025, 9, 10);
        let items = Arc::new(InMemoryItemRepository::default());
        items
            .insert(NewItemRecord {
                name: "Motor oil".to_string(),
                category: Category::Car,
                last_purchased: Some(today),
                duration_days: 365,
            })
            .await
            .expect("seed");
        let log = Arc::new(InMemoryNotificationLogRepository::default());
        let email = Arc::new(CountingEmail::default());
        let sms = Arc::new(CountingSms::default());

        let outcome = service(items, log.clone(), email.clone(), sms)
            .run(NotificationKind::Automatic, today)
            .await
            .expect("run");

        assert_eq!(outcome.skipped, Some(SkipReason::NothingRunningLow));
        assert_eq!(email.sends.load(Ordering::SeqCst), 0);
        assert!(log.entries().await.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_and_leaves_items_untouched() {
        let today = date(2025, 9, 10);
        let items = seeded_items(today).await;
        let log = Arc::new(InMemoryNotificationLogRepository::default());
        let email = Arc::new(CountingEmail { fail: true, ..CountingEmail::default() });
        let sms = Arc::new(CountingSms::default());
        let service = service(items.clone(), log.clone(), email, sms.clone());

        let result = service.run(NotificationKind::Manual, today).await;

        assert!(matches!(result, Err(ApplicationError::Transport(_))));
        assert_eq!(sms.sends.load(Ordering::SeqCst), 0);
        assert!(log.entries().await.is_empty());
        assert_eq!(items.list_active().await.expect("list").len(), 2);
    }
}
