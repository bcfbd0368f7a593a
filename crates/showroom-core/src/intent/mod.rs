//! Intent normalization.
//!
//! The backend's structured output is untrusted: it may be well-formed JSON,
//! the wrong shape, or missing entirely. The normalizers here accept any
//! `serde_json::Value` (an empty object when nothing usable came back) and
//! always produce a fully populated intent, filling gaps from the rule-based
//! parsers in [`crate::constraint`] and the tables in [`crate::catalog`].
//!
//! Normalization is a projection: feeding a normalized intent back in (with
//! empty text) yields the same intent.

mod followup;
mod material;
mod product;

pub use followup::{signals_material_change, signals_replacement};
pub use material::{MATERIAL_SCHEMA_HINT, MaterialIntent, normalize_material_intent};
pub use product::{PRODUCT_SCHEMA_HINT, ProductIntent, normalize_product_intent};

use crate::constraint::parse_amount;
use serde_json::{Map, Value};

static EMPTY: once_cell::sync::Lazy<Map<String, Value>> = once_cell::sync::Lazy::new(Map::new);

/// Returns the object view of a backend value; anything else reads as empty.
fn object_of(raw: &Value) -> &Map<String, Value> {
    raw.as_object().unwrap_or(&EMPTY)
}

fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Non-negative finite number, or 0. Numeric strings ("900", "$1.2k") are
/// accepted.
fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s),
        _ => 0.0,
    }
}

/// Accepts a single string (comma or pipe separated) or an array of strings;
/// returns a lowercase, deduplicated, order-preserving list.
fn coerce_tags(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::String(s)) => s.split([',', '|']).map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// First present key among `keys`.
fn first_of<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_bool() {
        assert!(coerce_bool(Some(&json!(true))));
        assert!(coerce_bool(Some(&json!("Yes"))));
        assert!(coerce_bool(Some(&json!(1))));
        assert!(!coerce_bool(Some(&json!("maybe"))));
        assert!(!coerce_bool(Some(&json!(null))));
        assert!(!coerce_bool(None));
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(Some(&json!(900))), 900.0);
        assert_eq!(coerce_number(Some(&json!("1.5k"))), 1500.0);
        assert_eq!(coerce_number(Some(&json!(-20))), 0.0);
        assert_eq!(coerce_number(Some(&json!([1, 2]))), 0.0);
        assert_eq!(coerce_number(None), 0.0);
    }

    #[test]
    fn test_coerce_tags() {
        assert_eq!(coerce_tags(Some(&json!("Modern"))), vec!["modern"]);
        assert_eq!(
            coerce_tags(Some(&json!(["Cozy", "modern", "cozy", "", 3]))),
            vec!["cozy", "modern"]
        );
        assert_eq!(coerce_tags(Some(&json!("boho, rustic"))), vec!["boho", "rustic"]);
        assert!(coerce_tags(Some(&json!({"a": 1}))).is_empty());
    }

    #[test]
    fn test_non_object_reads_as_empty() {
        assert!(object_of(&json!("not json at all")).is_empty());
        assert!(object_of(&json!([1, 2, 3])).is_empty());
        assert_eq!(object_of(&json!({"a": 1})).len(), 1);
    }
}
