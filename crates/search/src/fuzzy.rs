use crate::normalize::{normalize, strip_whitespace};
use syllabus_vector_store::Record;

/// Awarded when the term occurs verbatim in the normalized text.
pub const EXACT_HIT: f32 = 0.5;
/// Awarded when the term only occurs once all whitespace is removed.
///
/// Deliberately larger than `EXACT_HIT`: spacing noise in personal names
/// ("ローリー ゲイ" vs "ローリーゲイ") is the main cause of missed matches.
pub const SPACELESS_HIT: f32 = 1.0;
pub const NAME_HIT_BONUS: f32 = 0.10;

/// Whitespace-insensitive substring score of `terms` against `text`.
pub fn fuzzy_space_score(terms: &[String], text: &str) -> f32 {
    let doc = normalize(text);
    let doc_spaceless = strip_whitespace(&doc);

    let mut score = 0.0;
    for term in terms {
        let term_spaceless = strip_whitespace(term);
        if term_spaceless.is_empty() {
            continue;
        }
        if doc.contains(term.as_str()) {
            score += EXACT_HIT;
        } else if doc_spaceless.contains(&term_spaceless) {
            score += SPACELESS_HIT;
        }
    }
    score
}

fn compact(text: &str) -> String {
    strip_whitespace(text).to_lowercase()
}

/// Bonus when the query and the record's name or instructor contain one another.
///
/// The name is checked first and the first hit wins; both never stack.
pub fn name_hit_bonus(record: &Record, query: &str) -> f32 {
    let query = compact(query);
    if query.is_empty() {
        return 0.0;
    }

    for field in [record.course_title(), record.instructor.as_deref()] {
        let value = compact(field.unwrap_or_default());
        if !value.is_empty() && (query.contains(&value) || value.contains(&query)) {
            return NAME_HIT_BONUS;
        }
    }
    0.0
}
