//! Ordered synonym tables.
//!
//! Each table is a list of `(canonical, synonyms)` entries scanned in order.
//! The first entry whose canonical name or one of its synonyms appears in the
//! text wins, so specific entries must come before generic ones
//! ("coffee table" before "table", "lamp" before "table" for "table lamp").

/// An ordered `(canonical, synonyms)` lookup table.
#[derive(Debug, Clone, Copy)]
pub struct SynonymTable {
    entries: &'static [(&'static str, &'static [&'static str])],
    whole_words: bool,
}

impl SynonymTable {
    /// Entries match at a word start, so inflections ("sofas", "wooden")
    /// still hit.
    pub const fn new(entries: &'static [(&'static str, &'static [&'static str])]) -> Self {
        Self {
            entries,
            whole_words: false,
        }
    }

    /// Entries must match a whole word (a plural `s`/`es` is allowed), for
    /// tables with short synonyms that prefix unrelated words ("rust" in
    /// "rustic").
    pub const fn whole_words(entries: &'static [(&'static str, &'static [&'static str])]) -> Self {
        Self {
            entries,
            whole_words: true,
        }
    }

    fn matches(&self, text: &str, needle: &str) -> bool {
        if self.whole_words {
            appears_as_word(text, needle)
        } else {
            appears_in(text, needle)
        }
    }

    fn entry_hit(&self, text: &str, canonical: &str, synonyms: &[&str]) -> bool {
        self.matches(text, &canonical.replace('_', " "))
            || synonyms.iter().any(|synonym| self.matches(text, synonym))
    }

    /// Scans normalized text and returns the canonical value of the first
    /// entry that appears in it.
    pub fn find_in(&self, text: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find_map(|(canonical, synonyms)| {
                self.entry_hit(text, canonical, synonyms).then_some(*canonical)
            })
    }

    /// Returns the canonical value of every entry that appears in the text,
    /// in table order.
    pub fn find_all_in(&self, text: &str) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(canonical, synonyms)| self.entry_hit(text, canonical, synonyms))
            .map(|(canonical, _)| *canonical)
            .collect()
    }

    /// Maps a backend-provided value onto the table.
    ///
    /// Exact canonical or synonym matches are tried first, then the regular
    /// scan over the value.
    pub fn resolve(&self, value: &str) -> Option<&'static str> {
        let value = value.trim().to_lowercase().replace(['_', '-'], " ");
        if value.is_empty() {
            return None;
        }
        let exact = self.entries.iter().find_map(|(canonical, synonyms)| {
            let is_exact = canonical.replace('_', " ") == value
                || synonyms.iter().any(|synonym| synonym.replace('-', " ") == value);
            is_exact.then_some(*canonical)
        });
        exact.or_else(|| self.find_in(&value))
    }

    /// Returns every canonical value in table order.
    pub fn canonicals(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(canonical, _)| *canonical)
    }
}

/// Returns true if `needle` occurs in `haystack` at a word start, i.e. not
/// preceded by an alphanumeric character. Trailing characters are not checked
/// so plurals ("sofas") still match.
pub fn appears_in(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Like [`appears_in`], but the match must also end at a word boundary,
/// optionally after a plural `s` or `es`.
pub fn appears_as_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        let starts_word = haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let rest = &haystack[idx + needle.len()..];
        let rest = rest
            .strip_prefix("es")
            .or_else(|| rest.strip_prefix('s'))
            .filter(|tail| tail.chars().next().is_none_or(|c| !c.is_alphanumeric()))
            .unwrap_or(rest);
        starts_word && rest.chars().next().is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Furniture categories.
pub static CATEGORIES: SynonymTable = SynonymTable::new(&[
    ("sofa", &["couch", "sectional", "loveseat", "love seat", "settee", "chesterfield"]),
    ("armchair", &["arm chair", "accent chair", "lounge chair", "recliner", "wingback"]),
    ("coffee_table", &["coffee table", "side table", "end table", "cocktail table"]),
    ("dining_table", &["dining table", "kitchen table", "dinner table"]),
    ("nightstand", &["night stand", "bedside table", "bedside cabinet"]),
    ("tv_stand", &["tv stand", "tv unit", "media console", "entertainment center", "tv cabinet"]),
    ("lamp", &["floor lamp", "table lamp", "desk lamp", "pendant", "sconce"]),
    ("desk", &["writing desk", "office desk", "workstation", "computer desk"]),
    ("chair", &["dining chair", "office chair", "stool", "bench"]),
    ("table", &[]),
    ("bed", &["bed frame", "headboard", "bunk", "daybed"]),
    ("wardrobe", &["closet", "armoire"]),
    ("bookshelf", &["bookcase", "book shelf", "shelving", "shelf", "shelves"]),
    ("dresser", &["chest of drawers", "drawers", "vanity"]),
    ("cabinet", &["sideboard", "buffet", "cupboard", "credenza", "console"]),
    ("rug", &["carpet", "runner"]),
]);

/// Material slots: which material family a change targets.
pub static MATERIAL_SLOTS: SynonymTable = SynonymTable::new(&[
    ("leather", &["faux leather", "suede", "nubuck"]),
    ("fabric", &["upholstery", "linen", "cotton", "velvet", "wool", "boucle", "cloth", "chenille", "tweed"]),
    ("wood", &["wooden", "timber", "oak", "walnut", "pine", "teak", "maple", "birch", "ash", "cherry", "mahogany", "bamboo"]),
    ("metal", &["steel", "iron", "brass", "aluminum", "aluminium", "chrome", "copper"]),
    ("stone", &["marble", "granite", "travertine", "concrete", "terrazzo", "slate"]),
    ("glass", &["glass top", "tempered glass", "mirror"]),
    ("plastic", &["acrylic", "resin", "polypropylene"]),
    ("rattan", &["wicker", "cane", "seagrass", "jute"]),
]);

/// Colors. "off-white" and similar compound names come before their base.
pub static COLORS: SynonymTable = SynonymTable::whole_words(&[
    ("white", &["off-white", "off white", "ivory", "cream", "snow", "alabaster"]),
    ("black", &["charcoal", "ebony", "jet", "onyx"]),
    ("grey", &["gray", "graphite", "silver", "ash grey", "dove"]),
    ("beige", &["tan", "sand", "taupe", "khaki", "oatmeal", "greige"]),
    ("brown", &["chocolate", "espresso", "mocha", "caramel", "chestnut", "cognac"]),
    ("blue", &["navy", "teal", "azure", "cobalt", "indigo", "denim"]),
    ("green", &["olive", "sage", "emerald", "forest", "mint"]),
    ("red", &["burgundy", "crimson", "maroon", "wine"]),
    ("orange", &["terracotta", "rust", "amber", "peach"]),
    ("yellow", &["mustard", "ochre", "lemon"]),
    ("pink", &["blush", "rose", "dusty pink"]),
    ("purple", &["violet", "lavender", "plum", "lilac"]),
    ("natural", &["natural tone", "light wood", "honey"]),
]);

/// Surface finishes. "semi-gloss" maps to satin, so satin is checked before glossy.
pub static FINISHES: SynonymTable = SynonymTable::whole_words(&[
    ("matte", &["matt", "non-reflective"]),
    ("satin", &["semi-gloss", "semi gloss", "eggshell", "silk"]),
    ("glossy", &["gloss", "high gloss", "shiny", "lacquered", "lacquer", "polished"]),
    ("brushed", &["brushed metal", "satin metal"]),
    ("distressed", &["weathered", "rustic", "reclaimed", "aged", "antique"]),
    ("oiled", &["oil finish", "waxed", "raw", "unfinished"]),
    ("painted", &["paint", "painted finish"]),
    ("textured", &["woven", "ribbed", "grain"]),
]);

/// Style keywords.
pub static STYLES: SynonymTable = SynonymTable::new(&[
    ("mid-century", &["mid century", "midcentury", "retro"]),
    ("scandinavian", &["scandi", "nordic", "hygge"]),
    ("industrial", &["loft", "warehouse"]),
    ("minimalist", &["minimal", "clean lines", "simple"]),
    ("modern", &["contemporary", "sleek"]),
    ("rustic", &["farmhouse", "cottage", "country"]),
    ("bohemian", &["boho", "eclectic"]),
    ("classic", &["traditional", "vintage", "victorian"]),
    ("coastal", &["beach", "nautical"]),
    ("japandi", &["japanese", "zen", "wabi-sabi"]),
]);
