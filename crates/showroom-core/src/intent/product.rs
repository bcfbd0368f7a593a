//! Product intent: what the player wants to buy.

use super::{coerce_bool, coerce_number, coerce_string, coerce_tags, first_of, object_of};
use crate::catalog::{CATEGORIES, STYLES};
use crate::constraint::{
    extract_budget_range, has_intent_keyword, has_size_hint, infer_category,
    looks_like_informational_query, normalize_text,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema description appended to the product-extraction prompt.
pub const PRODUCT_SCHEMA_HINT: &str = r#"Respond with a single JSON object and nothing else:
{"suggest": boolean, "category": string, "style_tags": [string], "budget_min": number, "budget_max": number, "max_depth_cm": number, "max_width_cm": number, "max_height_cm": number}"#;

/// Canonical product intent.
///
/// Every numeric field is 0 when unknown and `suggest` defaults to false.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductIntent {
    pub suggest: bool,
    /// Canonical category from [`CATEGORIES`], or empty.
    pub category: String,
    pub style_tags: Vec<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub max_length_cm: f64,
    pub max_width_cm: f64,
    pub max_height_cm: f64,
}

/// Merges the backend's structured output with rule-based guesses from the
/// player's text.
pub fn normalize_product_intent(text: &str, raw: &Value) -> ProductIntent {
    let object = object_of(raw);
    let backend_suggest = coerce_bool(object.get("suggest"));

    let category = CATEGORIES
        .resolve(&coerce_string(object.get("category")))
        .map(str::to_string)
        .unwrap_or_else(|| infer_category(text));

    let text_budget = extract_budget_range(text);
    let legacy_budget = object.get("budget").map(object_of);

    let mut budget_min = coerce_number(object.get("budget_min"));
    if budget_min == 0.0 {
        budget_min = text_budget.map(|range| range.min).unwrap_or(0.0);
    }
    if budget_min == 0.0 {
        budget_min = coerce_number(legacy_budget.and_then(|budget| budget.get("min")));
    }

    let mut budget_max = coerce_number(object.get("budget_max"));
    if budget_max == 0.0 {
        budget_max = text_budget.map(|range| range.max).unwrap_or(0.0);
    }
    if budget_max == 0.0 {
        budget_max = coerce_number(legacy_budget.and_then(|budget| budget.get("max")));
    }

    if budget_min > 0.0 && budget_max > 0.0 && budget_min > budget_max {
        std::mem::swap(&mut budget_min, &mut budget_max);
    }

    let mut style_tags = coerce_tags(first_of(object, &["style_tags", "style"]));
    if style_tags.is_empty() {
        style_tags = STYLES
            .find_all_in(&normalize_text(text))
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    let suggest = suggestion_gate(text, backend_suggest, &category);

    ProductIntent {
        suggest,
        category,
        style_tags,
        budget_min,
        budget_max,
        max_length_cm: coerce_number(first_of(
            object,
            &["max_depth_cm", "max_length_cm", "max_len"],
        )),
        max_width_cm: coerce_number(first_of(object, &["max_width_cm", "max_w"])),
        max_height_cm: coerce_number(first_of(object, &["max_height_cm", "max_h"])),
    }
}

/// Decides whether the player is asking for a product suggestion.
///
/// Informational questions always veto. A bare category mention never
/// suggests on its own; it needs an explicit ask or a budget/size hint in the
/// text. Backend-supplied numbers do not count as hints, so a vetoed intent
/// stays vetoed when fed back in.
fn suggestion_gate(text: &str, backend_suggest: bool, category: &str) -> bool {
    if looks_like_informational_query(text) {
        return false;
    }
    if backend_suggest || has_intent_keyword(text) {
        return true;
    }
    let has_hint = extract_budget_range(text).is_some() || has_size_hint(text);
    has_hint && !category.is_empty()
}
