//! Place-name join keys.
//!
//! `normalize` folds free-text county names from the weekly matrix, the
//! summary store and geometry properties onto one key. The join is fuzzy on
//! purpose: many spellings collapse to one key, and two genuinely different
//! places may collide ("St. Louis" city and county both become `saintlouis`).
//! `slugify` and friends do the same for the sub-county (SPA) layer.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Key returned when nothing survives normalization.
pub const UNKNOWN_KEY: &str = "unknown";

/// Slug returned when nothing survives slugification.
pub const SPA_SENTINEL: &str = "spa";

const ADMIN_WORDS: [&str; 8] = [
    "county",
    "parish",
    "borough",
    "city",
    "municipality",
    "canton",
    "district",
    "municipio",
];

const OF_PREFIXES: [(&str, &str); 3] = [("county", "of"), ("parish", "of"), ("municipio", "de")];

static ADMIN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(County|Parish|Borough|Census Area|City|Municipality|Municipio)\b")
        .expect("admin suffix pattern")
});
static OF_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(County|Parish|Municipio)\s+(of|de)\s+").expect("of-prefix pattern")
});
static SAINT_ABBREV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSt\.?\s+").expect("saint pattern"));
static LOS_ANGELES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Los Angeles").expect("los angeles pattern"));
static SPA_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(County|Region|Area)").expect("spa noise pattern"));

/// Canonical join key for a free-text place name. Total and idempotent;
/// never returns an empty string.
pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let tokens: Vec<&str> = folded
        .split_whitespace()
        .map(|t| if t == "st" { "saint" } else { t })
        .collect();

    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let pair = tokens.get(i + 1).map(|next| (tokens[i], *next));
        match pair {
            Some(p) if OF_PREFIXES.contains(&p) || p == ("census", "area") => i += 2,
            _ => {
                if !ADMIN_WORDS.contains(&tokens[i]) {
                    kept.push(tokens[i]);
                }
                i += 1;
            }
        }
    }

    finish_key(kept.concat())
}

// A concatenation can spell a token the pipeline would have rewritten
// ("s t" -> "st", "cit y" -> "city"); settle it so a second pass is a no-op.
fn finish_key(joined: String) -> String {
    if joined.is_empty() || ADMIN_WORDS.contains(&joined.as_str()) {
        UNKNOWN_KEY.to_string()
    } else if joined == "st" {
        "saint".to_string()
    } else {
        joined
    }
}

/// Spellings under which a matrix header should be findable: the raw text,
/// admin-type words removed, "County of" dropped, and "St." spelled out.
pub fn name_variants(raw: &str) -> Vec<String> {
    let base = raw.trim().to_string();
    let no_admin = ADMIN_SUFFIX.replace_all(&base, "").trim().to_string();
    let of_drop = OF_PREFIX.replace_all(&base, "").into_owned();
    let saint_base = SAINT_ABBREV.replace_all(&base, "Saint ").into_owned();
    let saint_no_admin = SAINT_ABBREV.replace_all(&no_admin, "Saint ").into_owned();

    let mut out: Vec<String> = Vec::with_capacity(5);
    for v in [base, no_admin, of_drop, saint_base, saint_no_admin] {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Normalized keys of every variant, deduplicated, sentinel excluded.
pub fn variant_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in name_variants(raw).iter().map(|v| normalize(v)) {
        if key != UNKNOWN_KEY && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Kebab-case slug over ASCII letters and digits.
pub fn slugify(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let slug = lower
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        SPA_SENTINEL.to_string()
    } else {
        slug
    }
}

/// Slug of an SPA name as stored in the summary store, with the truncated
/// spellings the store is known to carry expanded.
pub fn normalize_spa_name(s: &str) -> String {
    const FIXES: [(&str, &str); 2] = [
        ("san-fernando-va", "san-fernando-valley"),
        ("san-gabriel-val", "san-gabriel-valley"),
    ];
    let slug = slugify(s);
    FIXES
        .iter()
        .find(|(from, _)| *from == slug)
        .map(|(_, to)| to.to_string())
        .unwrap_or(slug)
}

/// Join key for an SPA polygon label, matched against `normalize_spa_name`
/// keys of the summary store.
pub fn spa_feature_key(label: &str) -> String {
    const ALIASES: [(&str, &str); 10] = [
        ("san-fernando", "san-fernando-valley"),
        ("san-fernando-val", "san-fernando-valley"),
        ("metro-los-angeles", "metro-l-a"),
        ("metro-los-angeles-region", "metro-l-a"),
        ("metro", "metro-l-a"),
        ("west", "west-la"),
        ("south", "south-la"),
        ("east", "east-la"),
        ("san-gabriel", "san-gabriel-valley"),
        ("san-gabriel-val", "san-gabriel-valley"),
    ];
    let cleaned = LOS_ANGELES.replace_all(label, "L.A.");
    let cleaned = SPA_NOISE.replace_all(&cleaned, "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let key = normalize_spa_name(&cleaned);
    ALIASES
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| to.to_string())
        .unwrap_or(key)
}
