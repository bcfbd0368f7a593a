//! Keyword heuristics run on a completed turn while an item is focused.

use super::material::MATERIAL_KEYWORDS;
use crate::catalog::{COLORS, FINISHES, MATERIAL_SLOTS};
use crate::constraint::normalize_text;
use crate::protocol::strip_leading_tag;
use once_cell::sync::Lazy;
use regex::Regex;

static REPLACEMENT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:replace\w*|swap\w*|switch\w* (?:it|this|that)|exchange|instead|something else|another one|different one|alternatives?|get rid of|trade (?:it|this|that))\b",
    )
    .unwrap_or_else(|err| panic!("invalid replacement pattern: {err}"))
});

/// Returns true if the text asks to change the focused item's material,
/// finish or color.
pub fn signals_material_change(text: &str) -> bool {
    let text = normalize_text(strip_leading_tag(text));
    if text.is_empty() {
        return false;
    }
    MATERIAL_KEYWORDS.is_match(&text)
        || MATERIAL_SLOTS.find_in(&text).is_some()
        || COLORS.find_in(&text).is_some()
        || FINISHES.find_in(&text).is_some()
}

/// Returns true if the text asks to swap the focused item for another product.
pub fn signals_replacement(text: &str) -> bool {
    let text = normalize_text(strip_leading_tag(text));
    !text.is_empty() && REPLACEMENT_KEYWORDS.is_match(&text)
}
