//! Hybrid retrieval for course questions: dense similarity from the vector
//! store, re-ranked with BM25, whitespace-insensitive matching and a name-hit
//! bonus, plus a small tabular corpus scored by token overlap.

mod config;
mod context;
mod entities;
mod error;
mod fusion;
mod fuzzy;
mod hybrid;
mod lexical;
mod normalize;
mod query_expansion;
mod tabular;

pub use config::{
    DatasetConfig, EmbeddingConfig, EngineConfig, PatternConfig, DEFAULT_STUB_DIMENSION,
    EMBEDDING_MODE_ENV, EMBED_MODEL_ENV, TABULAR_DIR_ENV,
};
pub use context::{record_passage, render_context, tabular_passage, PASSAGE_SEPARATOR};
pub use entities::guess_entities;
pub use error::{Result, SearchError};
pub use fusion::{HybridFusion, ScoredCandidate, FINAL_RESULTS, LEXICAL_WEIGHT};
pub use fuzzy::{fuzzy_space_score, name_hit_bonus, EXACT_HIT, NAME_HIT_BONUS, SPACELESS_HIT};
pub use hybrid::RetrievalEngine;
pub use lexical::{lexical_score, Bm25Params};
pub use normalize::{fold_width, normalize, strip_whitespace, tokenize};
pub use query_expansion::{
    PatternRule, QueryExpander, BUILTIN_PATTERNS, BUILTIN_SYNONYMS, DEFAULT_TAGS, SPECIFIC_TAGS,
};
pub use tabular::{
    load_tabular_dir, rank_documents, read_tabular_file, score_document, TabularCorpus,
    TabularDocument, TABULAR_RESULTS,
};
