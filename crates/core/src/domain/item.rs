use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known categories in their fixed display order. Interpreter output may name
/// a category outside this set; those are carried verbatim as `Other` and
/// rendered after the known ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    House,
    Baby,
    Pet,
    Food,
    Car,
    Health,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 6] = [
        Category::House,
        Category::Baby,
        Category::Pet,
        Category::Food,
        Category::Car,
        Category::Health,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::House => "House",
            Category::Baby => "Baby",
            Category::Pet => "Pet",
            Category::Food => "Food",
            Category::Car => "Car",
            Category::Health => "Health",
            Category::Other(name) => name,
        }
    }

    pub fn parse(value: &str) -> Category {
        let trimmed = value.trim();
        for known in Category::KNOWN {
            if known.as_str().eq_ignore_ascii_case(trimmed) {
                return known;
            }
        }
        Category::Other(trimmed.to_string())
    }

    /// Grouping icon for notification rendering. Closed lookup; categories
    /// outside the known set fall back to the generic box.
    pub fn icon(&self) -> &'static str {
        match self {
            Category::House => "🏠",
            Category::Baby => "🍼",
            Category::Pet => "🐾",
            Category::Food => "🍎",
            Category::Car => "🚗",
            Category::Health => "💊",
            Category::Other(_) => "📦",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::parse(&raw))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    Deleted,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "active" => Ok(ItemStatus::Active),
            "deleted" => Ok(ItemStatus::Deleted),
            other => Err(DomainError::InvalidItem(format!("unknown item status `{other}`"))),
        }
    }
}

/// A tracked consumable. Soft-deleted items stay in storage permanently and
/// are excluded from every active query; there is no resurrection path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: Category,
    pub last_purchased: Option<NaiveDate>,
    pub duration_days: i64,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// Write-boundary validation. Zero or negative durations would classify
    /// an item as overdue forever, so they are rejected rather than clamped.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_fields(&self.name, self.duration_days)
    }
}

pub fn validate_fields(name: &str, duration_days: i64) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidItem("item name must not be empty".to_string()));
    }
    if duration_days <= 0 {
        return Err(DomainError::InvalidItem(format!(
            "duration_days must be positive, got {duration_days}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Category, Item, ItemId, ItemStatus};

    fn item(name: &str, duration_days: i64) -> Item {
        Item {
            id: ItemId(1),
            name: name.to_string(),
            category: Category::House,
            last_purchased: NaiveDate::from_ymd_opt(2025, 6, 1),
            duration_days,
            status: ItemStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn category_parse_is_case_insensitive_for_known_names() {
        assert_eq!(Category::parse("pet"), Category::Pet);
        assert_eq!(Category::parse("FOOD"), Category::Food);
    }

    #[test]
    fn category_parse_keeps_unknown_names_verbatim() {
        assert_eq!(Category::parse("Garden"), Category::Other("Garden".to_string()));
        assert_eq!(Category::parse("Garden").icon(), "📦");
    }

    #[test]
    fn validate_rejects_empty_name() {
        assert!(item("  ", 30).validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_duration() {
        assert!(item("Paper towels", 0).validate().is_err());
        assert!(item("Paper towels", -5).validate().is_err());
        assert!(item("Paper towels", 1).validate().is_ok());
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        assert_eq!(ItemStatus::parse("active").expect("parse"), ItemStatus::Active);
        assert_eq!(ItemStatus::Deleted.as_str(), "deleted");
        assert!(ItemStatus::parse("archived").is_err());
    }
}
