//! Turns a free-text utterance into a [`ChangeSet`].
//!
//! Interpretation is fail-open by contract: any transport failure, timeout,
//! or malformed reply yields an empty change-set. A failed interpretation is
//! visible to callers only as "nothing changed", never as an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use larder_core::domain::changeset::ChangeSet;
use larder_core::domain::item::Item;

use crate::llm::LlmClient;

#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, utterance: &str, items: &[Item], today: NaiveDate) -> ChangeSet;
}

pub struct LlmInterpreter {
    client: Arc<dyn LlmClient>,
}

impl LlmInterpreter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Interpreter for LlmInterpreter {
    async fn interpret(&self, utterance: &str, items: &[Item], today: NaiveDate) -> ChangeSet {
        let prompt = build_prompt(utterance, items, today);

        let raw = match self.client.complete(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    event_name = "agent.interpret.llm_failed",
                    error = %error,
                    "llm call failed, continuing with empty change-set"
                );
                return ChangeSet::default();
            }
        };

        match parse_change_set(&raw) {
            Ok(change_set) => change_set,
            Err(error) => {
                warn!(
                    event_name = "agent.interpret.parse_failed",
                    error = %error,
                    "llm reply was not a valid change-set, continuing with empty change-set"
                );
                ChangeSet::default()
            }
        }
    }
}

pub fn build_prompt(utterance: &str, items: &[Item], today: NaiveDate) -> String {
    let mut inventory = String::new();
    for item in items.iter().filter(|item| item.is_active()) {
        inventory.push_str(&format!(
            "- id {}: {} (category: {})\n",
            item.id, item.name, item.category
        ));
    }
    if inventory.is_empty() {
        inventory.push_str("(no items tracked yet)\n");
    }

    format!(
        "You maintain a household inventory list. Today is {today}.\n\
         Current inventory:\n{inventory}\n\
         The user wrote:\n\"{utterance}\"\n\n\
         Produce the changes this message implies as JSON with exactly this shape:\n\
         {{\"updates\": [{{\"itemId\": 1, \"itemName\": \"...\", \"lastPurchased\": \"YYYY-MM-DD\", \"durationDays\": 30, \"reason\": \"...\"}}],\n\
          \"newItems\": [{{\"itemName\": \"...\", \"category\": \"House|Baby|Pet|Food|Car|Health\", \"lastPurchased\": \"YYYY-MM-DD\", \"durationDays\": 30, \"outOfStock\": false, \"reason\": \"...\"}}],\n\
          \"removeItems\": [{{\"itemId\": 1, \"itemName\": \"...\", \"reason\": \"...\"}}]}}\n\n\
         Rules:\n\
         - Reference an existing item only when the user names it exactly or by a common synonym. \
           Never merge distinct products just because the words look similar, and never match across \
           categories (dog food is not baby food; washer fluid is not dish soap).\n\
         - When unsure whether the user means an existing item, add a new item instead.\n\
         - Date phrases resolve against today: \"today\" = {today}, \"yesterday\" = one day earlier, \
           \"tomorrow\" = one day later. \"N weeks\" means N*7 days and \"N months\" means N*30 days \
           when the user states how long something lasts.\n\
         - Omit every field you are not sure about; empty arrays are fine.\n\
         - Reply with the JSON document only, no commentary."
    )
}

/// Parses an LLM reply that should contain a change-set JSON document,
/// tolerating Markdown code-fence wrapping.
pub fn parse_change_set(raw: &str) -> Result<ChangeSet, serde_json::Error> {
    serde_json::from_str(strip_code_fences(raw))
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    match rest.strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    use larder_core::domain::item::{Category, Item, ItemId, ItemStatus};

    use crate::llm::LlmClient;

    use super::{build_prompt, parse_change_set, strip_code_fences, Interpreter, LlmInterpreter};

    struct CannedClient(Result<&'static str, ()>);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match &self.0 {
                Ok(reply) => Ok((*reply).to_string()),
                Err(()) => Err(anyhow!("connection refused")),
            }
        }
    }

    fn items() -> Vec<Item> {
        vec![Item {
            id: ItemId(1),
            name: "Dog food".to_string(),
            category: Category::Pet,
            last_purchased: NaiveDate::from_ymd_opt(2025, 6, 15),
            duration_days: 90,
            status: ItemStatus::Active,
            created_at: Utc::now(),
        }]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 10).expect("valid date")
    }

    #[test]
    fn prompt_embeds_inventory_and_date_rules() {
        let prompt = build_prompt("ordered dog food today", &items(), today());

        assert!(prompt.contains("id 1: Dog food (category: Pet)"));
        assert!(prompt.contains("Today is 2025-09-10"));
        assert!(prompt.contains("never match across"));
    }

    #[test]
    fn strips_fenced_replies() {
        assert_eq!(strip_code_fences("```json\n{\"updates\": []}\n```"), "{\"updates\": []}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {} "), "{}");
        // Unterminated fence still exposes the body.
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }

    #[test]
    fn parses_fenced_change_set() {
        let parsed = parse_change_set(
            "```json\n{\"updates\": [{\"itemId\": 1, \"lastPurchased\": \"2025-09-10\", \"reason\": \"restocked\"}]}\n```",
        )
        .expect("parse");

        assert_eq!(parsed.updates.len(), 1);
        assert_eq!(parsed.updates[0].item_id, Some(1));
    }

    #[tokio::test]
    async fn transport_failure_fails_open_to_empty_change_set() {
        let interpreter = LlmInterpreter::new(Arc::new(CannedClient(Err(()))));

        let change_set = interpreter.interpret("we are out of bread", &items(), today()).await;

        assert!(change_set.is_empty());
    }

    #[tokio::test]
    async fn malformed_reply_fails_open_to_empty_change_set() {
        let interpreter =
            LlmInterpreter::new(Arc::new(CannedClient(Ok("Sure! I'll update the list."))));

        let change_set = interpreter.interpret("we are out of bread", &items(), today()).await;

        assert!(change_set.is_empty());
    }

    #[tokio::test]
    async fn well_formed_reply_is_passed_through() {
        let interpreter = LlmInterpreter::new(Arc::new(CannedClient(Ok(
            "{\"newItems\": [{\"itemName\": \"Bread\", \"category\": \"Food\", \"durationDays\": 7, \"reason\": \"out of bread\"}]}",
        ))));

        let change_set = interpreter.interpret("we are out of bread", &items(), today()).await;

        assert_eq!(change_set.new_items.len(), 1);
        assert_eq!(change_set.new_items[0].item_name, "Bread");
    }
}
