use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not configured: {0}")]
    NotConfigured(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Fire-and-forget email delivery. A failure is surfaced to the caller and
/// never rolls back any state already persisted.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), TransportError>;
}

/// Development transport: accepts every send and logs it.
#[derive(Default)]
pub struct NoopEmailTransport;

#[async_trait]
impl EmailTransport for NoopEmailTransport {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        _body: &str,
    ) -> Result<(), TransportError> {
        tracing::info!(
            event_name = "notify.email.noop",
            recipients = recipients.len(),
            subject,
            "email transport is noop, send dropped"
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct NoopSmsTransport;

#[async_trait]
impl SmsTransport for NoopSmsTransport {
    async fn send(&self, recipients: &[String], _body: &str) -> Result<(), TransportError> {
        tracing::info!(
            event_name = "notify.sms.noop",
            recipients = recipients.len(),
            "sms transport is noop, send dropped"
        );
        Ok(())
    }
}

/// Email via a JSON mail API (Resend/Mailgun style: one POST per batch).
pub struct HttpEmailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<SecretString>,
    from_address: String,
}

impl HttpEmailTransport {
    pub fn new(
        api_url: String,
        api_key: Option<SecretString>,
        from_address: String,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| TransportError::NotConfigured(error.to_string()))?;
        Ok(Self { client, api_url, api_key, from_address })
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "from": self.from_address,
            "to": recipients,
            "subject": subject,
            "text": body,
        });

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| TransportError::Send(error.to_string()))?;
        response
            .error_for_status()
            .map_err(|error| TransportError::Send(error.to_string()))?;
        Ok(())
    }
}

/// SMS via a JSON gateway, one POST per recipient number.
pub struct HttpSmsTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<SecretString>,
}

impl HttpSmsTransport {
    pub fn new(
        api_url: String,
        api_key: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| TransportError::NotConfigured(error.to_string()))?;
        Ok(Self { client, api_url, api_key })
    }
}

#[async_trait]
impl SmsTransport for HttpSmsTransport {
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), TransportError> {
        for recipient in recipients {
            let payload = json!({ "to": recipient, "body": body });

            let mut request = self.client.post(&self.api_url).json(&payload);
            if let Some(api_key) = &self.api_key {
                request = request.bearer_auth(api_key.expose_secret());
            }

            let response =
                request.send().await.map_err(|error| TransportError::Send(error.to_string()))?;
            response
                .error_for_status()
                .map_err(|error| TransportError::Send(error.to_string()))?;
        }
        Ok(())
    }
}
