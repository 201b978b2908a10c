//! Daily reminder trigger.
//!
//! Fires once per calendar day at the configured local hour. The reminder
//! service itself deduplicates automatic sends by day, so an early wake-up or
//! a restart close to the fire time cannot double-send.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use tracing::{error, info};

use larder_core::config::ScheduleConfig;
use larder_core::domain::notification::NotificationKind;
use larder_notify::ReminderService;

pub fn spawn(config: ScheduleConfig, reminders: Arc<ReminderService>) {
    if !config.enabled {
        info!(event_name = "system.scheduler.disabled", "daily reminder scheduler disabled");
        return;
    }

    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let next = next_fire(now, config.daily_hour);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(
                event_name = "system.scheduler.sleeping",
                next_fire = %next.to_rfc3339(),
                "daily reminder scheduled"
            );
            tokio::time::sleep(wait).await;

            let today = Local::now().date_naive();
            match reminders.run(NotificationKind::Automatic, today).await {
                Ok(outcome) => info!(
                    event_name = "system.scheduler.fired",
                    low_items = outcome.low_items.len(),
                    email_sent = outcome.email_sent,
                    sms_sent = outcome.sms_sent,
                    "daily reminder pipeline ran"
                ),
                Err(failure) => error!(
                    event_name = "system.scheduler.failed",
                    error = %failure,
                    "daily reminder pipeline failed"
                ),
            }
        }
    });
}

/// Next occurrence of `daily_hour` strictly after `now`.
fn next_fire(now: DateTime<Local>, daily_hour: u32) -> DateTime<Local> {
    let fire_time = NaiveTime::from_hms_opt(daily_hour.min(23), 0, 0)
        .unwrap_or(NaiveTime::MIN);
    let mut candidate = now.date_naive().and_time(fire_time);
    if candidate <= now.naive_local() {
        candidate += ChronoDuration::days(1);
    }
    match Local.from_local_datetime(&candidate).earliest() {
        Some(next) => next,
        // DST gap: fall back to an hour later.
        None => Local
            .from_local_datetime(&(candidate + ChronoDuration::hours(1)))
            .earliest()
            .unwrap_or_else(Local::now),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone, Timelike};

    use super::next_fire;

    #[test]
    fn fires_later_today_when_hour_is_ahead() {
        let now = Local.with_ymd_and_hms(2025, 9, 10, 6, 30, 0).unwrap();

        let next = next_fire(now, 8);

        assert_eq!(next.date_naive(), now.date_naive());
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn rolls_to_tomorrow_once_the_hour_has_passed() {
        let now = Local.with_ymd_and_hms(2025, 9, 10, 9, 0, 0).unwrap();

        let next = next_fire(now, 8);

        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn exact_fire_time_schedules_the_next_day() {
        let now = Local.with_ymd_and_hms(2025, 9, 10, 8, 0, 0).unwrap();

        let next = next_fire(now, 8);

        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
    }
}
