//! Deterministic interpreter used when no language model is configured.
//!
//! It understands exactly one phrasing: a message containing the word
//! "ordered" with a known item name mentioned before it, e.g.
//! "the dog food you flagged? ordered". Everything else is ignored.

use async_trait::async_trait;
use chrono::NaiveDate;

use larder_core::domain::changeset::{ChangeSet, ItemUpdate};
use larder_core::domain::item::Item;

use crate::interpreter::Interpreter;

#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordInterpreter;

impl KeywordInterpreter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interpreter for KeywordInterpreter {
    async fn interpret(&self, utterance: &str, items: &[Item], today: NaiveDate) -> ChangeSet {
        match match_ordered_item(utterance, items) {
            Some(item) => ChangeSet {
                updates: vec![ItemUpdate {
                    item_id: Some(item.id.0),
                    item_name: Some(item.name.clone()),
                    last_purchased: Some(today),
                    duration_days: None,
                    reason: "reply said the item was ordered".to_string(),
                }],
                ..ChangeSet::default()
            },
            None => ChangeSet::default(),
        }
    }
}

/// Finds the word "ordered" and scans tokens backward from it for the nearest
/// one that matches an active item name by case-insensitive substring.
fn match_ordered_item<'a>(utterance: &str, items: &'a [Item]) -> Option<&'a Item> {
    let tokens: Vec<&str> =
        utterance.split_whitespace().map(|token| token.trim_matches(is_punctuation)).collect();
    let ordered_at = tokens.iter().position(|token| token.eq_ignore_ascii_case("ordered"))?;

    tokens[..ordered_at].iter().rev().find_map(|token| {
        if token.is_empty() {
            return None;
        }
        let token = token.to_lowercase();
        items.iter().find(|item| {
            let name = item.name.to_lowercase();
            item.is_active() && (name.contains(&token) || token.contains(&name))
        })
    })
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
}
