//! Numeric and constraint parsing over free-form player text.
//!
//! Every function here is pure and infallible. Callers pass raw text; each
//! entry point normalizes it with [`normalize_text`] first.

use crate::catalog::CATEGORIES;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Budget bounds extracted from text. `0.0` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
}

impl BudgetRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Amount token: optional currency symbol, digits with thousands separators,
/// optional decimals, optional `k` suffix, optional currency word.
const AMOUNT: &str = r"[$€£]?\s?\d[\d,]*(?:\.\d+)?(?:\s?k\b)?(?:\s?(?:dollars|dollar|usd|bucks|euros|euro|eur|pounds|gbp))?";

static RANGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"between\s+({AMOUNT})\s+(?:and|to|-)\s+({AMOUNT})"),
        format!(r"from\s+({AMOUNT})\s+(?:to|-)\s+({AMOUNT})"),
        format!(r"({AMOUNT})\s*(?:-|\bto\b)\s*({AMOUNT})"),
    ]
    .iter()
    .map(|pattern| compile(pattern))
    .collect()
});

static MIN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"\b(?:at least|minimum of|minimum|min|more than|over|above|starting at|no less than)\s+({AMOUNT})"),
        format!(r"({AMOUNT})\s*(?:or more|and up|and above|plus|\+)"),
    ]
    .iter()
    .map(|pattern| compile(pattern))
    .collect()
});

static MAX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"\b(?:under|below|less than|up to|upto|at most|no more than|not more than|maximum of|maximum|max|within|cheaper than|not over|not above)\s+({AMOUNT})"),
        format!(r"({AMOUNT})\s*(?:or less|or under|or below|max|tops|at most)"),
    ]
    .iter()
    .map(|pattern| compile(pattern))
    .collect()
});

static BARE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b(?:budget|price|cost|spend|afford|pay|around|about|roughly)\D{{0,20}}?({AMOUNT})"
    ))
});

static UNIT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    compile(r#"^\s*(?:cm|mm|m|meters?|metres?|inch|inches|ft|feet|foot|")(?:\b|$|\s)"#)
});

static SIZE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:width|wide|depth|deep|height|tall|length|dimensions?|size|measures?|footprint)\b")
});

static SIZE_UNITS: Lazy<Regex> = Lazy::new(|| {
    compile(r#"\d+(?:\.\d+)?\s*(?:cm|mm|m|meters?|metres?|inch|inches|ft|feet|")(?:\b|$|\s)"#)
});

static SIZE_GRID: Lazy<Regex> = Lazy::new(|| compile(r"\b\d+(?:\.\d+)?\s*x\s*\d+(?:\.\d+)?"));

/// Nouns that make a number a count rather than a price ("2-3 seater").
static COUNT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    compile(r"^\s*-?\s*(?:seaters?|seats?|people|persons?|guests?|drawers?|doors?|shelves|pieces?|chairs?|kids|children|adults)\b")
});

/// "no"/"not" directly before a match turns "more than 900" into a cap.
static NEGATION_PREFIX: Lazy<Regex> = Lazy::new(|| compile(r"\bno(?:t)?\s*$"));

static CURRENCY_WORDS: Lazy<Regex> =
    Lazy::new(|| compile(r"dollars|dollar|usd|bucks|euros|euro|eur|pounds|gbp"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

const INTENT_KEYWORDS: &[&str] = &[
    "suggest",
    "recommend",
    "show me",
    "find me",
    "looking for",
    "look for",
    "i need",
    "i want",
    "we need",
    "i'd like",
    "i would like",
    "can you find",
    "help me find",
    "any ideas",
    "options for",
    "what would you pick",
    "something like",
    "shopping for",
];

const INFORMATIONAL_PHRASES: &[&str] = &[
    "compare",
    "comparison",
    "difference between",
    "versus",
    " vs ",
    "warranty",
    "guarantee",
    "return policy",
    "returns",
    "refund",
    "shipping",
    "delivery",
    "deliver",
    "assembly",
    "assemble",
    "how long does",
    "how do i clean",
    "care instructions",
    "tell me about",
    "what is the policy",
    "in stock",
    "store hours",
    "opening hours",
];

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // patterns are compile-time constants; a failure here is a programming error
        Err(err) => panic!("invalid built-in pattern {pattern:?}: {err}"),
    }
}

/// Lowercases, maps unicode dashes and multiplication signs to ASCII and
/// collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00d7}' => 'x',
            '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}

/// Parses a currency amount token such as `$1,200`, `1.2k` or `900 dollars`.
///
/// Returns 0 for anything that does not yield a finite non-negative number.
pub fn parse_amount(token: &str) -> f64 {
    let lowered = token.trim().to_lowercase();
    let stripped = CURRENCY_WORDS.replace_all(&lowered, "");
    let compact: String = stripped
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == 'k')
        .collect();

    let (digits, multiplier) = match compact.strip_suffix('k') {
        Some(rest) => (rest, 1000.0),
        None => (compact.as_str(), 1.0),
    };
    if digits.contains('k') {
        return 0.0;
    }

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            let amount = (value * multiplier * 100.0).round() / 100.0;
            if amount.is_finite() { amount } else { 0.0 }
        }
        _ => 0.0,
    }
}

/// Extracts a budget range from text.
///
/// Patterns are tried in strict priority order: explicit range, minimum-only,
/// maximum-only, then a bare amount after a budget keyword (read as a
/// maximum). Range phrasing must win so that looser single-number patterns
/// never grab a range's second number.
pub fn extract_budget_range(text: &str) -> Option<BudgetRange> {
    let text = normalize_text(text);

    for pattern in RANGE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&text) {
            if is_quantity(&text, &caps) {
                continue;
            }
            let a = capture_amount(&caps, 1);
            let b = capture_amount(&caps, 2);
            if a > 0.0 && b > 0.0 {
                return Some(BudgetRange::new(a.min(b), a.max(b)));
            }
        }
    }

    if let Some(min) = first_amount(&MIN_PATTERNS, &text) {
        return Some(BudgetRange::new(min, 0.0));
    }

    if let Some(max) = first_amount(&MAX_PATTERNS, &text) {
        return Some(BudgetRange::new(0.0, max));
    }

    BARE_PATTERN
        .captures_iter(&text)
        .filter(|caps| !is_quantity(&text, caps))
        .map(|caps| capture_amount(&caps, 1))
        .find(|amount| *amount > 0.0)
        .map(|max| BudgetRange::new(0.0, max))
}

fn first_amount(patterns: &[Regex], text: &str) -> Option<f64> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter(|caps| !is_quantity(text, caps) && !is_negated(text, caps))
            .map(|caps| capture_amount(&caps, 1))
            .find(|amount| *amount > 0.0)
    })
}

fn capture_amount(caps: &Captures<'_>, group: usize) -> f64 {
    caps.get(group).map(|m| parse_amount(m.as_str())).unwrap_or(0.0)
}

/// A number directly followed by a length unit or a count noun is a size or
/// a count, not a price.
fn is_quantity(text: &str, caps: &Captures<'_>) -> bool {
    followed_by_unit(text, caps) || COUNT_SUFFIX.is_match(&text[capture_end(caps)..])
}

/// True when the whole match is preceded by "no" or "not".
fn is_negated(text: &str, caps: &Captures<'_>) -> bool {
    caps.get(0)
        .is_some_and(|m| NEGATION_PREFIX.is_match(&text[..m.start()]))
}

fn capture_end(caps: &Captures<'_>) -> usize {
    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.end())
        .max()
        .unwrap_or(0)
}

fn followed_by_unit(text: &str, caps: &Captures<'_>) -> bool {
    UNIT_SUFFIX.is_match(&text[capture_end(caps)..])
}

/// Returns true if the text mentions a dimension keyword, a length unit after
/// a number, or an `NxN` token.
pub fn has_size_hint(text: &str) -> bool {
    let text = normalize_text(text);
    SIZE_KEYWORDS.is_match(&text) || SIZE_UNITS.is_match(&text) || SIZE_GRID.is_match(&text)
}

/// Returns the canonical furniture category mentioned in the text, or an
/// empty string.
pub fn infer_category(text: &str) -> String {
    let text = normalize_text(text);
    CATEGORIES
        .find_in(&text)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Returns true if the text asks for a recommendation.
pub fn has_intent_keyword(text: &str) -> bool {
    let text = normalize_text(text);
    INTENT_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Returns true for comparison, policy and logistics questions. These veto
/// auto-suggestion regardless of any other signal.
pub fn looks_like_informational_query(text: &str) -> bool {
    let padded = format!(" {} ", normalize_text(text));
    INFORMATIONAL_PHRASES
        .iter()
        .any(|phrase| padded.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("900"), 900.0);
        assert_eq!(parse_amount("$1,200"), 1200.0);
        assert_eq!(parse_amount("1.2k"), 1200.0);
        assert_eq!(parse_amount("2 K"), 2000.0);
        assert_eq!(parse_amount("450 dollars"), 450.0);
        assert_eq!(parse_amount("€99.50"), 99.5);
    }

    #[test]
    fn test_parse_amount_never_fails() {
        for junk in ["", "abc", "k", "kk", "1k2k", "..", "-50", "1e400", "NaN", "inf", "1.2.3"] {
            let value = parse_amount(junk);
            assert!(value.is_finite() && value >= 0.0, "{junk:?} -> {value}");
        }
        assert_eq!(parse_amount("not a number"), 0.0);
    }

    #[test]
    fn test_budget_range_phrasings() {
        assert_eq!(
            extract_budget_range("between 500 and 800"),
            Some(BudgetRange::new(500.0, 800.0))
        );
        assert_eq!(extract_budget_range("under 900"), Some(BudgetRange::new(0.0, 900.0)));
        assert_eq!(
            extract_budget_range("at least 1200"),
            Some(BudgetRange::new(1200.0, 0.0))
        );
        assert_eq!(
            extract_budget_range("budget is 1.2k"),
            Some(BudgetRange::new(0.0, 1200.0))
        );
    }

    #[test]
    fn test_range_wins_over_single_number() {
        // "up to 800" alone would be a max-only match
        assert_eq!(
            extract_budget_range("from 300 up to 800, somewhere in $300–$800"),
            Some(BudgetRange::new(300.0, 800.0))
        );
        assert_eq!(
            extract_budget_range("anything 400 to 650 works"),
            Some(BudgetRange::new(400.0, 650.0))
        );
    }

    #[test]
    fn test_min_and_max_suffix_forms() {
        assert_eq!(
            extract_budget_range("I can do 700 or more"),
            Some(BudgetRange::new(700.0, 0.0))
        );
        assert_eq!(
            extract_budget_range("$650 or less please"),
            Some(BudgetRange::new(0.0, 650.0))
        );
    }

    #[test]
    fn test_sizes_are_not_budgets() {
        assert_eq!(extract_budget_range("under 200 cm wide"), None);
        assert_eq!(extract_budget_range("between 180 and 200 cm"), None);
        assert_eq!(
            extract_budget_range("under 200cm and under 900"),
            Some(BudgetRange::new(0.0, 900.0))
        );
    }

    #[test]
    fn test_negated_minimum_reads_as_cap() {
        assert_eq!(
            extract_budget_range("a sofa for no more than 900"),
            Some(BudgetRange::new(0.0, 900.0))
        );
        assert_eq!(
            extract_budget_range("a sofa not over 900"),
            Some(BudgetRange::new(0.0, 900.0))
        );
        assert_eq!(
            extract_budget_range("not more than $450 please"),
            Some(BudgetRange::new(0.0, 450.0))
        );
        assert_eq!(
            extract_budget_range("no less than 300"),
            Some(BudgetRange::new(300.0, 0.0))
        );
    }

    #[test]
    fn test_counts_are_not_budgets() {
        assert_eq!(extract_budget_range("a 2-3 seater sofa"), None);
        assert_eq!(extract_budget_range("a dining table for 3 to 4 people"), None);
        assert_eq!(extract_budget_range("at least 6 seats"), None);
        assert_eq!(
            extract_budget_range("a 3 seater sofa between 500 and 800"),
            Some(BudgetRange::new(500.0, 800.0))
        );
    }

    #[test]
    fn test_no_budget() {
        assert_eq!(extract_budget_range("a green velvet sofa"), None);
        assert_eq!(extract_budget_range(""), None);
    }

    #[test]
    fn test_size_hints() {
        assert!(has_size_hint("something 180cm long"));
        assert!(has_size_hint("must fit 200x90"));
        assert!(has_size_hint("not too wide"));
        assert!(has_size_hint("at most 6 ft"));
        assert!(!has_size_hint("a blue sofa under 900"));
    }

    #[test]
    fn test_infer_category() {
        assert_eq!(infer_category("Any good COUCHES?"), "sofa");
        assert_eq!(infer_category("need a bedside table"), "nightstand");
        assert_eq!(infer_category("my budget is 900"), "");
    }

    #[test]
    fn test_intent_and_informational_phrases() {
        assert!(has_intent_keyword("Can you recommend a rug?"));
        assert!(has_intent_keyword("show me desks"));
        assert!(!has_intent_keyword("this room is cozy"));

        assert!(looks_like_informational_query("What's the warranty on this?"));
        assert!(looks_like_informational_query("compare these two sofas"));
        assert!(looks_like_informational_query("oak vs walnut"));
        assert!(!looks_like_informational_query("recommend a sofa"));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Sofa\u{2013}Bed  \n 200\u{00d7}90 "), "sofa-bed 200x90");
    }
}
