use crate::fuzzy::{fuzzy_space_score, name_hit_bonus};
use crate::lexical::Bm25Params;
use crate::normalize::tokenize;
use std::cmp::Ordering;
use syllabus_vector_store::Record;

/// Weight of the lexical + fuzzy evidence relative to the dense similarity.
pub const LEXICAL_WEIGHT: f32 = 0.6;
/// Number of records kept after re-ranking.
pub const FINAL_RESULTS: usize = 5;

/// One coarse candidate with every score that went into its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Position of the record in the merged corpus.
    pub index: usize,
    pub vector: f32,
    pub lexical: f32,
    pub fuzzy: f32,
    pub bonus: f32,
    pub hybrid: f32,
}

/// Two-pass re-ranker: fuse dense and lexical scores, sort, then add the
/// name-hit bonus and sort again.
#[derive(Debug, Clone)]
pub struct HybridFusion {
    lexical_weight: f32,
    limit: usize,
    bm25: Bm25Params,
}

impl Default for HybridFusion {
    fn default() -> Self {
        Self::new(LEXICAL_WEIGHT, FINAL_RESULTS)
    }
}

impl HybridFusion {
    pub fn new(lexical_weight: f32, limit: usize) -> Self {
        Self {
            lexical_weight,
            limit,
            bm25: Bm25Params::default(),
        }
    }

    pub fn with_bm25(mut self, bm25: Bm25Params) -> Self {
        self.bm25 = bm25;
        self
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Score one record against the expanded terms. No bonus yet.
    pub fn score(&self, index: usize, vector: f32, record: &Record, terms: &[String]) -> ScoredCandidate {
        let text = record.searchable_text();
        let lexical = self.bm25.score(terms, &tokenize(&text));
        let fuzzy = fuzzy_space_score(terms, &text);

        ScoredCandidate {
            index,
            vector,
            lexical,
            fuzzy,
            bonus: 0.0,
            hybrid: vector + self.lexical_weight * (lexical + fuzzy),
        }
    }

    /// First pass: hybrid scores for every coarse candidate, best first.
    ///
    /// Candidates whose index has no record are dropped.
    pub fn fuse(
        &self,
        coarse: &[(usize, f32)],
        records: &[Record],
        terms: &[String],
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = coarse
            .iter()
            .filter_map(|&(index, vector)| {
                records
                    .get(index)
                    .map(|record| self.score(index, vector, record, terms))
            })
            .collect();
        sort_by_hybrid(&mut scored);
        scored
    }

    /// Second pass: add the name-hit bonus to each candidate and re-sort.
    pub fn apply_name_bonus(
        &self,
        mut ranked: Vec<ScoredCandidate>,
        records: &[Record],
        query: &str,
    ) -> Vec<ScoredCandidate> {
        for candidate in &mut ranked {
            if let Some(record) = records.get(candidate.index) {
                candidate.bonus = name_hit_bonus(record, query);
                candidate.hybrid += candidate.bonus;
            }
        }
        sort_by_hybrid(&mut ranked);
        ranked
    }

    /// Full pipeline: fuse, sort, bonus, re-sort, truncate.
    pub fn rerank(
        &self,
        coarse: &[(usize, f32)],
        records: &[Record],
        terms: &[String],
        query: &str,
    ) -> Vec<ScoredCandidate> {
        let fused = self.fuse(coarse, records, terms);
        let mut ranked = self.apply_name_bonus(fused, records, query);
        ranked.truncate(self.limit);
        ranked
    }
}

fn sort_by_hybrid(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| b.hybrid.partial_cmp(&a.hybrid).unwrap_or(Ordering::Equal));
}
