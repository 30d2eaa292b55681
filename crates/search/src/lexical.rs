use std::collections::HashMap;

/// BM25 constants for scoring one document at a time.
///
/// Corpus statistics are not tracked across documents: `nominal_docs` and
/// `avg_doc_len` stand in for the real collection size and mean length, and
/// document frequency is counted within the scored document only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
    pub nominal_docs: f32,
    pub avg_doc_len: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            nominal_docs: 2.0,
            avg_doc_len: 1000.0,
        }
    }
}

impl Bm25Params {
    /// Score `doc_tokens` against `query_terms`. Terms absent from the document add nothing.
    pub fn score(&self, query_terms: &[String], doc_tokens: &[String]) -> f32 {
        if doc_tokens.is_empty() || query_terms.is_empty() {
            return 0.0;
        }

        let mut tf: HashMap<&str, usize> = HashMap::new();
        for token in doc_tokens {
            *tf.entry(token.as_str()).or_insert(0) += 1;
        }

        let dl = doc_tokens.len() as f32;
        let length_norm = self.k1 * (1.0 - self.b + self.b * dl / self.avg_doc_len);
        let mut score = 0.0;

        for term in query_terms {
            let Some(&freq) = tf.get(term.as_str()) else {
                continue;
            };
            let f = freq as f32;
            // Document frequency within a single document is 1 for any present term.
            let df = 1.0;
            let idf = (1.0 + (self.nominal_docs - df + 0.5) / (df + 0.5)).ln();
            score += idf * (f * (self.k1 + 1.0)) / (f + length_norm);
        }

        score
    }
}

pub fn lexical_score(query_terms: &[String], doc_tokens: &[String]) -> f32 {
    Bm25Params::default().score(query_terms, doc_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(lexical_score(&[], &strings(&["a"])), 0.0);
        assert_eq!(lexical_score(&strings(&["a"]), &[]), 0.0);
    }

    #[test]
    fn score_is_zero_without_overlap() {
        assert_eq!(lexical_score(&strings(&["x", "y"]), &strings(&["a", "b"])), 0.0);
        assert!(lexical_score(&strings(&["x", "b"]), &strings(&["a", "b"])) > 0.0);
    }

    #[test]
    fn single_hit_matches_formula() {
        let params = Bm25Params::default();
        let score = params.score(&strings(&["b"]), &strings(&["a", "b"]));
        let idf = (1.0_f32 + 1.5 / 1.5).ln();
        let denom = 1.0 + 1.2 * (1.0 - 0.75 + 0.75 * 2.0 / 1000.0);
        let expected = idf * 2.2 / denom;
        assert!((score - expected).abs() < 1e-6);
    }

    #[test]
    fn repeated_terms_saturate() {
        let once = lexical_score(&strings(&["a"]), &strings(&["a", "z"]));
        let twice = lexical_score(&strings(&["a"]), &strings(&["a", "a"]));
        assert!(twice > once);
        assert!(twice < 2.0 * once);
    }

    #[test]
    fn k1_variant_changes_saturation() {
        let wide = Bm25Params {
            k1: 1.5,
            ..Bm25Params::default()
        };
        let doc = strings(&["a", "a", "a"]);
        assert!(wide.score(&strings(&["a"]), &doc) > lexical_score(&strings(&["a"]), &doc));
    }
}
