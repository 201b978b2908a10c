//! Replenishment forecasting over calendar days.
//!
//! All arithmetic is whole-calendar-day: predicates compare `NaiveDate`s, so
//! the time of day a check runs at never changes a classification.

use chrono::NaiveDate;

use crate::domain::item::Item;

/// The look-ahead window for the "running low" bucket, inclusive.
pub const LOW_STOCK_WINDOW_DAYS: i64 = 7;

/// Signed days until the item is expected to need resupply. Negative means
/// the predicted date has already passed. `None` when the item has no
/// purchase history or a non-positive duration; such items are indeterminate
/// and excluded from every bucket rather than treated as overdue.
pub fn days_until_needed(item: &Item, reference: NaiveDate) -> Option<i64> {
    if item.duration_days <= 0 {
        return None;
    }
    let last = item.last_purchased?;
    let next_purchase = last.checked_add_days(chrono::Days::new(item.duration_days as u64))?;
    Some(next_purchase.signed_duration_since(reference).num_days())
}

/// Resupply is predicted within the next week and not yet overdue.
pub fn is_running_low(item: &Item, reference: NaiveDate) -> bool {
    matches!(days_until_needed(item, reference), Some(days) if (0..=LOW_STOCK_WINDOW_DAYS).contains(&days))
}

/// Predicted resupply date has already passed.
pub fn is_overdue(item: &Item, reference: NaiveDate) -> bool {
    matches!(days_until_needed(item, reference), Some(days) if days < 0)
}

pub fn is_recently_purchased(item: &Item, reference: NaiveDate) -> bool {
    match item.last_purchased {
        Some(last) => {
            let age = reference.signed_duration_since(last).num_days();
            (0..=LOW_STOCK_WINDOW_DAYS).contains(&age)
        }
        None => false,
    }
}

/// Active items in the low bucket, in input order.
pub fn running_low(items: &[Item], reference: NaiveDate) -> Vec<Item> {
    items
        .iter()
        .filter(|item| item.is_active() && is_running_low(item, reference))
        .cloned()
        .collect()
}
