//! Applies an interpreted change-set to the current inventory.
//!
//! Entries are independent and best-effort: an entry whose target cannot be
//! resolved is skipped and recorded as not applied, never aborting the rest
//! of the batch. Phase order is updates, then insertions, then removals, so
//! that a fuzzy removal can match an item inserted by the same change-set.

use chrono::{Days, NaiveDate};

use crate::domain::changeset::{ChangeSet, ItemRemoval, ItemUpdate, NewItem};
use crate::domain::item::{Category, Item, ItemId, ItemStatus};

pub const DEFAULT_DURATION_DAYS: i64 = 30;

/// Issues identities for items created during reconciliation. Backed by the
/// persistence layer at runtime; tests use [`SequentialIdSource`].
pub trait IdSource {
    fn next_id(&mut self) -> ItemId;
}

/// Hands out ids counting up from a starting point, typically one past the
/// highest id in the current inventory.
#[derive(Clone, Debug)]
pub struct SequentialIdSource {
    next: i64,
    issued: u32,
}

impl SequentialIdSource {
    pub fn starting_at(next: i64) -> Self {
        Self { next, issued: 0 }
    }

    pub fn from_items(items: &[Item]) -> Self {
        let max = items.iter().map(|item| item.id.0).max().unwrap_or(0);
        Self::starting_at(max + 1)
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&mut self) -> ItemId {
        let id = ItemId(self.next);
        self.next += 1;
        self.issued += 1;
        id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    Update,
    Insert,
    Remove,
}

/// One applied-log line. `applied` is false for resolution misses, which are
/// omissions rather than errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedChange {
    pub action: ChangeAction,
    pub item_id: Option<ItemId>,
    pub applied: bool,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub items: Vec<Item>,
    pub applied: Vec<AppliedChange>,
}

impl ReconcileOutcome {
    /// Human-readable log of what actually happened, applied entries only.
    pub fn applied_log(&self) -> Vec<String> {
        self.applied
            .iter()
            .filter(|change| change.applied)
            .map(|change| change.message.clone())
            .collect()
    }

    pub fn inserted_items(&self) -> Vec<&Item> {
        let inserted_ids: Vec<ItemId> = self
            .applied
            .iter()
            .filter(|change| change.applied && change.action == ChangeAction::Insert)
            .filter_map(|change| change.item_id)
            .collect();
        self.items.iter().filter(|item| inserted_ids.contains(&item.id)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchConfidence {
    Exact,
    Fuzzy,
}

/// Two-stage weak-identity lookup: exact id first, then bidirectional
/// case-insensitive substring match on the name token. Only active items are
/// candidates and the first match wins. Kept behind one function so the
/// matching policy can be swapped without touching the engine.
pub fn resolve_item(
    items: &[Item],
    id: Option<i64>,
    name_token: Option<&str>,
) -> Option<(usize, MatchConfidence)> {
    if let Some(id) = id {
        if let Some(position) =
            items.iter().position(|item| item.is_active() && item.id.0 == id)
        {
            return Some((position, MatchConfidence::Exact));
        }
    }

    let token = name_token?.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }
    items
        .iter()
        .position(|item| {
            let candidate = item.name.to_lowercase();
            item.is_active() && (candidate.contains(&token) || token.contains(&candidate))
        })
        .map(|position| (position, MatchConfidence::Fuzzy))
}

/// Applies `change_set` to `items`, returning the resulting inventory and a
/// per-entry applied log. Pure apart from the `ids` collaborator, which is
/// invoked exactly once per inserted item.
pub fn apply_change_set(
    items: &[Item],
    change_set: &ChangeSet,
    today: NaiveDate,
    ids: &mut dyn IdSource,
) -> ReconcileOutcome {
    let mut working = items.to_vec();
    let mut applied = Vec::new();

    for update in &change_set.updates {
        applied.push(apply_update(&mut working, update));
    }
    for entry in &change_set.new_items {
        applied.push(apply_insert(&mut working, entry, today, ids));
    }
    for removal in &change_set.remove_items {
        applied.push(apply_removal(&mut working, removal));
    }

    ReconcileOutcome { items: working, applied }
}

fn apply_update(working: &mut [Item], update: &ItemUpdate) -> AppliedChange {
    let target = resolve_item(working, update.item_id, update.item_name.as_deref());
    let Some((position, _)) = target else {
        return AppliedChange {
            action: ChangeAction::Update,
            item_id: None,
            applied: false,
            message: format!(
                "Skipped update: no match for {}",
                describe_target(update.item_id, update.item_name.as_deref())
            ),
        };
    };

    let item = &mut working[position];
    let mut touched = Vec::new();

    if let Some(last_purchased) = update.last_purchased {
        item.last_purchased = Some(last_purchased);
        touched.push(format!("last purchased {last_purchased}"));
    }
    match update.duration_days {
        Some(duration) if duration > 0 => {
            item.duration_days = duration;
            touched.push(format!("lasts {duration} days"));
        }
        Some(duration) => {
            touched.push(format!("ignored invalid duration {duration}"));
        }
        None => {}
    }

    let detail = if touched.is_empty() { "no fields".to_string() } else { touched.join(", ") };
    AppliedChange {
        action: ChangeAction::Update,
        item_id: Some(item.id),
        applied: true,
        message: format!("Updated: {} ({detail})", item.name),
    }
}

fn apply_insert(
    working: &mut Vec<Item>,
    entry: &NewItem,
    today: NaiveDate,
    ids: &mut dyn IdSource,
) -> AppliedChange {
    if entry.item_name.trim().is_empty() {
        return AppliedChange {
            action: ChangeAction::Insert,
            item_id: None,
            applied: false,
            message: "Skipped new item: missing name".to_string(),
        };
    }

    let duration_days = match entry.duration_days {
        Some(duration) if duration > 0 => duration,
        _ => DEFAULT_DURATION_DAYS,
    };
    // An exhausted item is backdated one day past its full duration so it
    // lands in the overdue bucket on the very next classification.
    let last_purchased = entry.last_purchased.unwrap_or_else(|| {
        if entry.out_of_stock {
            today - Days::new(duration_days as u64 + 1)
        } else {
            today
        }
    });

    let id = ids.next_id();
    let item = Item {
        id,
        name: entry.item_name.trim().to_string(),
        category: entry.category.clone().unwrap_or(Category::House),
        last_purchased: Some(last_purchased),
        duration_days,
        status: ItemStatus::Active,
        created_at: today.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
    };
    let message = format!("Added: {}", item.name);
    working.push(item);

    AppliedChange { action: ChangeAction::Insert, item_id: Some(id), applied: true, message }
}

fn apply_removal(working: &mut [Item], removal: &ItemRemoval) -> AppliedChange {
    let target = resolve_item(working, removal.item_id, removal.item_name.as_deref());
    let Some((position, _)) = target else {
        return AppliedChange {
            action: ChangeAction::Remove,
            item_id: None,
            applied: false,
            message: format!(
                "Skipped removal: no match for {}",
                describe_target(removal.item_id, removal.item_name.as_deref())
            ),
        };
    };

    let item = &mut working[position];
    item.status = ItemStatus::Deleted;
    AppliedChange {
        action: ChangeAction::Remove,
        item_id: Some(item.id),
        applied: true,
        message: format!("Removed: {}", item.name),
    }
}

fn describe_target(id: Option<i64>, name: Option<&str>) -> String {
    match (id, name) {
        (Some(id), _) => format!("id {id}"),
        (None, Some(name)) if !name.trim().is_empty() => format!("`{}`", name.trim()),
        _ => "unnamed target".to_string(),
    }
}
