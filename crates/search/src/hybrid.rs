use crate::config::EngineConfig;
use crate::context::{record_passage, render_context, tabular_passage};
use crate::entities::guess_entities;
use crate::error::{Result, SearchError};
use crate::fusion::HybridFusion;
use crate::query_expansion::QueryExpander;
use crate::tabular::{rank_documents, TabularCorpus, TABULAR_RESULTS};
use std::sync::Arc;
use std::time::Instant;
use syllabus_protocol::{HealthReport, SearchResponse, SEARCH_API_SCHEMA_VERSION};
use syllabus_vector_store::{Embedder, VectorStore, VectorStoreError, COARSE_CANDIDATES};

/// Hybrid retrieval over the embedded datasets plus the tabular corpus.
///
/// Both corpora load lazily on first use and are shared read-only afterwards,
/// so one engine can serve concurrent queries.
pub struct RetrievalEngine {
    store: VectorStore,
    tabular: TabularCorpus,
    expander: QueryExpander,
    fusion: HybridFusion,
    embedder: Arc<dyn Embedder>,
}

impl RetrievalEngine {
    pub fn new(
        store: VectorStore,
        tabular: TabularCorpus,
        expander: QueryExpander,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            tabular,
            expander,
            fusion: HybridFusion::default(),
            embedder,
        }
    }

    pub fn from_config(config: &EngineConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Ok(Self::new(
            VectorStore::new(config.dataset_descriptors()),
            TabularCorpus::new(Some(config.resolved_tabular_dir())),
            config.expander()?,
            embedder,
        ))
    }

    #[must_use]
    pub fn with_fusion(mut self, fusion: HybridFusion) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn expander(&self) -> &QueryExpander {
        &self.expander
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Load both corpora now instead of on the first query.
    pub async fn warm(&self) -> Result<()> {
        let corpus = self.store.ensure_loaded().await?;
        let docs = self.tabular.ensure_loaded().await?;
        log::info!(
            "Engine warm: {} records ({} dims), {} tabular documents",
            corpus.len(),
            corpus.dimension(),
            docs.len()
        );
        Ok(())
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let started = Instant::now();

        let corpus = self.store.ensure_loaded().await?;
        let terms = self.expander.expand_with_fallback(query);
        log::debug!("Expanded '{query}' into {} terms: {terms:?}", terms.len());

        let (embedding, docs) =
            tokio::join!(self.embedder.embed(query), self.tabular.ensure_loaded());
        let embedding = embedding
            .map_err(|e| SearchError::EmbeddingFailed(e.to_string()))?
            .ok_or_else(|| SearchError::EmbeddingFailed("no vector returned".to_string()))?;
        let docs = docs?;

        let coarse = corpus
            .index()
            .search(&embedding, COARSE_CANDIDATES)
            .map_err(|e| match e {
                VectorStoreError::InvalidDimension { .. } => {
                    SearchError::EmbeddingFailed(e.to_string())
                }
                other => other.into(),
            })?;
        log::debug!("Dense: {} coarse candidates", coarse.len());

        let ranked = self.fusion.rerank(&coarse, corpus.records(), &terms, query);
        let tabular_hits = rank_documents(query, docs, TABULAR_RESULTS);

        let mut passages = Vec::with_capacity(ranked.len() + tabular_hits.len());
        for (k, candidate) in ranked.iter().enumerate() {
            if let Some(record) = corpus.record(candidate.index) {
                passages.push(record_passage(k + 1, record, candidate));
            }
        }
        for (k, (idx, score)) in tabular_hits.iter().enumerate() {
            passages.push(tabular_passage(k + 1, &docs[*idx], *score));
        }

        log::debug!(
            "Search '{query}': {} records, {} tabular in {:?}",
            ranked.len(),
            tabular_hits.len(),
            started.elapsed()
        );

        Ok(SearchResponse {
            schema_version: SEARCH_API_SCHEMA_VERSION,
            query: query.to_string(),
            expanded_terms: terms,
            hints: guess_entities(query),
            context: render_context(&passages),
            passages,
        })
    }

    /// Snapshot of what is loaded. Never triggers a load.
    pub fn health(&self) -> HealthReport {
        let corpus = self.store.get();
        let docs = self.tabular.get();
        HealthReport {
            status: "ok".to_string(),
            records_loaded: corpus.is_some(),
            records: corpus.map_or(0, |c| c.len()),
            dimension: corpus.map(|c| c.dimension()),
            datasets: corpus.map(|c| c.datasets().to_vec()).unwrap_or_default(),
            tabular_loaded: docs.is_some(),
            tabular_documents: docs.map_or(0, <[_]>::len),
        }
    }
}
