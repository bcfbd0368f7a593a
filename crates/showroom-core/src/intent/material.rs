//! Material intent: how the player wants the selected item to look.

use super::{coerce_bool, coerce_string, coerce_tags, first_of, object_of};
use crate::catalog::{COLORS, FINISHES, MATERIAL_SLOTS, STYLES, SynonymTable};
use crate::constraint::normalize_text;
use crate::protocol::strip_leading_tag;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema description appended to the material-extraction prompt.
pub const MATERIAL_SCHEMA_HINT: &str = r#"Respond with a single JSON object and nothing else:
{"apply": boolean, "slot": string, "color": string, "finish": string, "style_tags": [string]}"#;

/// Broad "this is about materials" signal.
pub(crate) static MATERIAL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:materials?|finish(?:es|ed)?|fabrics?|colou?rs?|textures?|(?:re)?upholster\w*|wood\w*|paint\w*|stain\w*|varnish\w*|leather|metal\w*|marble|veneer\w*|lacquer\w*|re-?colou?r\w*|shade|tint\w*)\b",
    )
    .unwrap_or_else(|err| panic!("invalid material keyword pattern: {err}"))
});

/// Canonical material intent.
///
/// `apply` is true whenever any of slot, color or finish is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialIntent {
    pub apply: bool,
    pub slot: String,
    pub color: String,
    pub finish: String,
    pub style_tags: Vec<String>,
}

/// Merges the backend's structured output with table lookups over the
/// player's text. Any leading bracketed tag is ignored.
///
/// `apply` is an OR of every available signal: a missed material change is
/// worse than a spurious one.
pub fn normalize_material_intent(text: &str, raw: &Value) -> MaterialIntent {
    let object = object_of(raw);
    let text = normalize_text(strip_leading_tag(text));

    let (slot, slot_hit) = resolve_field(&MATERIAL_SLOTS, object.get("slot"), &text);
    let (color, color_hit) = resolve_field(&COLORS, object.get("color"), &text);
    let (finish, finish_hit) = resolve_field(&FINISHES, object.get("finish"), &text);

    let mut style_tags = coerce_tags(first_of(object, &["style_tags", "style"]));
    if style_tags.is_empty() {
        style_tags = STYLES
            .find_all_in(&text)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    let apply = coerce_bool(object.get("apply"))
        || slot_hit
        || color_hit
        || finish_hit
        || !slot.is_empty()
        || !color.is_empty()
        || !finish.is_empty()
        || MATERIAL_KEYWORDS.is_match(&text);

    MaterialIntent {
        apply,
        slot,
        color,
        finish,
        style_tags,
    }
}

/// Backend value first (canonicalized when the table knows it), otherwise the
/// first table entry found in the text. The flag reports whether the text
/// itself matched the table.
fn resolve_field(table: &SynonymTable, backend: Option<&Value>, text: &str) -> (String, bool) {
    let from_text = table.find_in(text);
    let backend = coerce_string(backend).to_lowercase();

    let value = if backend.is_empty() {
        from_text.map(str::to_string).unwrap_or_default()
    } else {
        table
            .resolve(&backend)
            .map(str::to_string)
            .unwrap_or(backend)
    };
    (value, from_text.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_only_extraction() {
        let intent = normalize_material_intent("make it navy velvet with a matt look", &json!({}));
        assert!(intent.apply);
        assert_eq!(intent.slot, "fabric");
        assert_eq!(intent.color, "blue");
        assert_eq!(intent.finish, "matte");
    }

    #[test]
    fn test_style_words_do_not_leak_into_color() {
        let intent = normalize_material_intent("make it more rustic", &json!({}));
        assert_eq!(intent.color, "");
        assert_eq!(intent.finish, "distressed");
        assert!(intent.apply);

        let intent = normalize_material_intent("like a rosewood cabinet", &json!({}));
        assert_eq!(intent.color, "");
    }

    #[test]
    fn test_leading_tag_is_stripped() {
        let intent = normalize_material_intent("[ITEM_SELECTED] oak please", &json!({}));
        assert_eq!(intent.slot, "wood");
        assert!(intent.apply);

        let tag_only = normalize_material_intent("[MATERIAL_APPLIED]", &json!({}));
        assert!(!tag_only.apply);
        assert_eq!(tag_only, MaterialIntent::default());
    }

    #[test]
    fn test_backend_value_wins_and_is_canonicalized() {
        let raw = json!({"slot": "Walnut", "color": "Chartreuse", "finish": ""});
        let intent = normalize_material_intent("paint it red", &raw);
        assert_eq!(intent.slot, "wood");
        // unknown colors are kept, lowercased
        assert_eq!(intent.color, "chartreuse");
        assert_eq!(intent.finish, "painted");
        assert!(intent.apply);
    }

    #[test]
    fn test_apply_forced_when_field_present() {
        let raw = json!({"apply": false, "color": "black"});
        let intent = normalize_material_intent("hmm", &raw);
        assert!(intent.apply);
        assert_eq!(intent.color, "black");
    }

    #[test]
    fn test_keyword_alone_sets_apply() {
        let intent = normalize_material_intent("can I change the texture?", &json!({}));
        assert!(intent.apply);
        assert_eq!(intent.slot, "");
        assert_eq!(intent.color, "");
        assert_eq!(intent.finish, "");
    }

    #[test]
    fn test_unrelated_text_does_not_apply() {
        let intent = normalize_material_intent("where should this go?", &json!({"apply": "no"}));
        assert!(!intent.apply);
    }

    #[test]
    fn test_normalization_is_a_projection() {
        let first = normalize_material_intent(
            "glossy white lacquer, very minimal",
            &json!({"style_tags": "Minimal"}),
        );
        let again = normalize_material_intent("", &serde_json::to_value(&first).unwrap());
        assert_eq!(first, again);
    }
}
