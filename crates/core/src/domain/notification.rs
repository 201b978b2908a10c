use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Manual,
    Automatic,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Manual => "manual",
            NotificationKind::Automatic => "automatic",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "manual" => Ok(NotificationKind::Manual),
            "automatic" => Ok(NotificationKind::Automatic),
            other => {
                Err(DomainError::InvalidItem(format!("unknown notification kind `{other}`")))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "email" => Ok(NotificationChannel::Email),
            "sms" => Ok(NotificationChannel::Sms),
            other => {
                Err(DomainError::InvalidItem(format!("unknown notification channel `{other}`")))
            }
        }
    }
}

/// Append-only audit record of a sent reminder. Read back only to deduplicate
/// automatic sends within the same calendar day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub sent_at: DateTime<Utc>,
    pub kind: NotificationKind,
    pub channel: NotificationChannel,
    pub recipients: Vec<String>,
    pub body: String,
}
