use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::item::Category;

/// The contract between the interpreter and the reconciliation engine.
/// Field names are camelCase on the wire so LLM-produced JSON maps directly.
/// Every collection defaults to empty and unknown fields are ignored, so a
/// partially conforming reply still yields a usable change-set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeSet {
    pub updates: Vec<ItemUpdate>,
    pub new_items: Vec<NewItem>,
    pub remove_items: Vec<ItemRemoval>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.new_items.is_empty() && self.remove_items.is_empty()
    }
}

/// Partial update against an existing item. Target resolution prefers the id
/// when present and falls back to fuzzy name matching. Absent fields keep
/// their prior values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemUpdate {
    pub item_id: Option<i64>,
    pub item_name: Option<String>,
    pub last_purchased: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewItem {
    pub item_name: String,
    pub category: Option<Category>,
    pub last_purchased: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    /// When set, the item is already exhausted and must classify as needing
    /// resupply immediately.
    pub out_of_stock: bool,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRemoval {
    pub item_id: Option<i64>,
    pub item_name: Option<String>,
    pub reason: String,
}
