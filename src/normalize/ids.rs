//! Deterministic identifier generation.
//!
//! Every identifier is a pure function of source content: the same document always yields
//! the same key, so re-runs are idempotent and child tables join back to their parent.

use serde_json::Value as JsonValue;

use crate::raw::Presence;
use crate::types::Value;

/// Canonical form of a source identifier: trimmed, lowercased, spaces replaced by `_`, and
/// `'` `.` `,` removed. Returns `None` when nothing is left.
pub fn normalize_id(text: &str) -> Option<String> {
    let id: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '\'' | '.' | ',' => None,
            other => Some(other),
        })
        .collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Returns `true` when `id` is already canonical and uses only `[a-z0-9_-]`.
pub fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Identifier cell for a source ID slot.
///
/// Strings and numbers are normalized; absent, null and empty IDs become [`Value::Null`].
/// Any other JSON value is passed through as text so it fails the well-formedness rule.
pub fn id_value(slot: &Presence<JsonValue>) -> Value {
    let raw = match slot.value() {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(other) => return Value::Utf8(other.to_string()),
        None => return Value::Null,
    };
    normalize_id(&raw).map(Value::Utf8).unwrap_or(Value::Null)
}

/// Key of the ingredient at 1-based position `ordinal` inside the recipe keyed `recipe_key`.
pub fn ingredient_id(recipe_key: &str, ordinal: usize) -> String {
    format!("{recipe_key}_ing_{ordinal}")
}

/// Prefix of stand-in recipe keys.
///
/// [`normalize_id`] strips `.`, and pass-through IDs (JSON objects, arrays, booleans) never
/// start with `d`, so no key derived from document content can equal a stand-in key.
pub const POSITIONAL_KEY_PREFIX: &str = "doc.";

/// Stand-in recipe key for a document without a usable ID, from its batch position.
pub fn positional_recipe_key(index: usize) -> String {
    format!("{POSITIONAL_KEY_PREFIX}{index}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{id_value, ingredient_id, is_well_formed_id, normalize_id};
    use crate::raw::Presence;
    use crate::types::Value;

    #[test]
    fn normalize_id_canonicalizes() {
        assert_eq!(normalize_id("Idli Sambar"), Some("idli_sambar".to_string()));
        assert_eq!(normalize_id("  Mom's Pie, v.2 "), Some("moms_pie_v2".to_string()));
        assert_eq!(normalize_id("   "), None);
        assert_eq!(normalize_id("..."), None);
    }

    #[test]
    fn normalize_id_is_idempotent() {
        let once = normalize_id("Chana Masala").unwrap();
        assert_eq!(normalize_id(&once), Some(once.clone()));
        assert!(is_well_formed_id(&once));
    }

    #[test]
    fn well_formed_rejects_foreign_characters() {
        assert!(is_well_formed_id("user_01-a"));
        assert!(!is_well_formed_id("user@01"));
        assert!(!is_well_formed_id("User01"));
        assert!(!is_well_formed_id(""));
    }

    #[test]
    fn id_value_handles_each_slot_shape() {
        assert_eq!(id_value(&Presence::Present(json!("R 1"))), Value::Utf8("r_1".to_string()));
        assert_eq!(id_value(&Presence::Present(json!(42))), Value::Utf8("42".to_string()));
        assert_eq!(id_value(&Presence::Present(json!(""))), Value::Null);
        assert_eq!(id_value(&Presence::Null), Value::Null);
        assert_eq!(id_value(&Presence::Absent), Value::Null);
        assert_eq!(id_value(&Presence::Present(json!(true))), Value::Utf8("true".to_string()));
    }

    #[test]
    fn ingredient_ids_follow_recipe_and_position() {
        assert_eq!(ingredient_id("r1", 1), "r1_ing_1");
        assert_eq!(ingredient_id("r1", 12), "r1_ing_12");
    }
}
