//! Outbound reminder delivery.
//!
//! Transports are fire-and-forget capabilities behind [`EmailTransport`] and
//! [`SmsTransport`]; the HTTP implementations talk to JSON mail/SMS gateways
//! and the noop ones keep development installs quiet. [`ReminderService`]
//! runs the full "compute low stock, compose, send, log" pipeline with
//! same-day deduplication for automatic runs.

pub mod reminder;
pub mod transport;

pub use reminder::{EmailChannel, ReminderOutcome, ReminderService, SkipReason, SmsChannel};
pub use transport::{
    EmailTransport, HttpEmailTransport, HttpSmsTransport, NoopEmailTransport, NoopSmsTransport,
    SmsTransport, TransportError,
};
