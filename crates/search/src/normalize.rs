use once_cell::sync::Lazy;
use regex::Regex;

static PUNCT_OR_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{P}\p{S}]").expect("punctuation class is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace class is valid"));

const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Canonical form used for every comparison in the engine.
///
/// Lower-cases, folds the ideographic space, replaces punctuation and symbol
/// characters with a space, collapses whitespace runs and trims.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace(IDEOGRAPHIC_SPACE, " ");
    let stripped = PUNCT_OR_SYMBOL.replace_all(&lowered, " ");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Map full-width ASCII forms (U+FF01..U+FF5E) and the ideographic space to
/// their half-width counterparts.
pub fn fold_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            IDEOGRAPHIC_SPACE => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}
