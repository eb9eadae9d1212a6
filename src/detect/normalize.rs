use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

/// Invisible characters stripped before matching: U+200B..=U+200F
/// (zero-width space, joiners, direction marks), word joiner, and BOM.
fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}')
}

/// Canonicalize text for keyword matching.
///
/// Decomposes (NFKD), lowercases, drops combining marks (non-zero canonical
/// combining class) and zero-width characters, then collapses whitespace runs to a single space and trims.
/// Lowercasing runs after decomposition because compatibility mappings can
/// emit uppercase letters (`㎒` -> `MHz`).
pub fn normalize(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let stripped: String = value
        .nfkd()
        .flat_map(char::to_lowercase)
        .filter(|&c| canonical_combining_class(c) == 0 && !is_zero_width(c))
        .collect();

    let mut normalized = String::with_capacity(stripped.len());
    for segment in stripped.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}

/// Same as [`normalize`], with an absent value treated as empty.
pub fn normalize_opt(value: Option<&str>) -> String {
    value.map(normalize).unwrap_or_default()
}
