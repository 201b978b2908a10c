//! Renders low-stock item lists into outbound message bodies.

use std::collections::BTreeMap;

use crate::domain::item::{Category, Item};

const EMAIL_HEADER: &str = "These household items are predicted to run out within the next week:";
const EMAIL_FOOTER: &str = "Reply to this message to update the list. \
For example: \"ordered dog food today\" or \"we are out of dish soap\".";
const SMS_PREAMBLE: &str = "Running low: ";
const SMS_POSTAMBLE: &str = ". Reply 'ordered <item>' once restocked.";

/// Long-form body for email. Returns `None` for an empty input; callers must
/// treat that as "do not send". Items are grouped one line per category, in
/// the fixed known-category order with unknown categories after, so the
/// rendering is independent of input ordering.
pub fn compose_email(low_items: &[Item]) -> Option<String> {
    if low_items.is_empty() {
        return None;
    }

    let mut lines = vec![EMAIL_HEADER.to_string(), String::new()];
    for (category, names) in grouped_names(low_items) {
        lines.push(format!("{} {}: {}", category.icon(), category, names.join(", ")));
    }
    lines.push(String::new());
    lines.push(EMAIL_FOOTER.to_string());
    Some(lines.join("\n"))
}

/// Single-line body for SMS. Length is not enforced here; a caller targeting
/// a constrained transport is responsible for truncation.
pub fn compose_sms(low_items: &[Item]) -> Option<String> {
    if low_items.is_empty() {
        return None;
    }

    let names: Vec<&str> = low_items.iter().map(|item| item.name.as_str()).collect();
    Some(format!("{SMS_PREAMBLE}{}{SMS_POSTAMBLE}", names.join(", ")))
}

fn grouped_names(items: &[Item]) -> Vec<(Category, Vec<String>)> {
    let mut known: Vec<(Category, Vec<String>)> =
        Category::KNOWN.into_iter().map(|category| (category, Vec::new())).collect();
    let mut other: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for item in items {
        match &item.category {
            Category::Other(name) => {
                other.entry(name.clone()).or_default().push(item.name.clone());
            }
            category => {
                if let Some((_, names)) =
                    known.iter_mut().find(|(candidate, _)| candidate == category)
                {
                    names.push(item.name.clone());
                }
            }
        }
    }

    known
        .into_iter()
        .filter(|(_, names)| !names.is_empty())
        .chain(other.into_iter().map(|(name, names)| (Category::Other(name), names)))
        .collect()
}
