pub mod compose;
pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod reconcile;

pub use compose::{compose_email, compose_sms};
pub use domain::changeset::{ChangeSet, ItemRemoval, ItemUpdate, NewItem};
pub use domain::item::{Category, Item, ItemId, ItemStatus};
pub use domain::notification::{NotificationChannel, NotificationKind, NotificationLogEntry};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use forecast::{
    days_until_needed, is_overdue, is_recently_purchased, is_running_low, running_low,
    LOW_STOCK_WINDOW_DAYS,
};
pub use reconcile::{
    apply_change_set, AppliedChange, ChangeAction, IdSource, ReconcileOutcome, SequentialIdSource,
};
