use crate::error::{Result, SearchError};
use crate::query_expansion::{PatternRule, QueryExpander};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syllabus_vector_store::{
    DatasetDescriptor, Embedder, EmbeddingMode, OpenAiEmbedder, StubEmbedder,
};

pub const TABULAR_DIR_ENV: &str = "SYLLABUS_TABULAR_DIR";
pub const EMBEDDING_MODE_ENV: &str = "SYLLABUS_EMBEDDING_MODE";
pub const EMBED_MODEL_ENV: &str = "EMBED_MODEL";
pub const DEFAULT_STUB_DIMENSION: usize = 256;

/// Tabular corpus location relative to the corpus root when none is configured.
const DEFAULT_TABULAR_DIR: &str = "../wasedaai-syllabus-pdf/pdfs/law_fall";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub records: PathBuf,
    pub embeddings: PathBuf,
}

impl DatasetConfig {
    fn under(name: &str, dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            records: dir.join("records.json"),
            embeddings: dir.join("embeddings.npz"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub pattern: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `openai` or `stub`.
    pub mode: String,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub stub_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::OpenAi.as_str().to_string(),
            model: None,
            endpoint: None,
            stub_dimension: DEFAULT_STUB_DIMENSION,
        }
    }
}

/// Engine configuration, read from TOML (or JSON) and then adjusted by the environment.
///
/// Relative paths resolve against `corpus_root`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub corpus_root: PathBuf,
    pub datasets: Vec<DatasetConfig>,
    pub tabular_dir: Option<PathBuf>,
    /// Intent rules evaluated after the built-in ones.
    pub patterns: Vec<PatternConfig>,
    /// Extra synonym groups, symmetrized like the built-in table.
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub embedding: EmbeddingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data = Path::new("data");
        Self {
            corpus_root: PathBuf::from("."),
            datasets: vec![
                DatasetConfig::under("syllabus", data),
                DatasetConfig::under("faculty_rules", &data.join("faculty_rules")),
                DatasetConfig::under("faculty_profiles_csv", &data.join("faculty_profiles_csv")),
            ],
            tabular_dir: None,
            patterns: Vec::new(),
            synonyms: BTreeMap::new(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Accepts TOML, falling back to JSON.
    pub fn parse(text: &str) -> Result<Self> {
        match toml::from_str::<Self>(text) {
            Ok(config) => Ok(config),
            Err(toml_err) => serde_json::from_str(text).map_err(|json_err| {
                SearchError::Config(format!(
                    "Config is not valid TOML ({toml_err}) or JSON ({json_err})"
                ))
            }),
        }
    }

    /// Apply `SYLLABUS_TABULAR_DIR`, `SYLLABUS_EMBEDDING_MODE` and `EMBED_MODEL`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(TABULAR_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.tabular_dir = Some(PathBuf::from(dir));
        }
        if let Some(mode) = lookup(EMBEDDING_MODE_ENV).filter(|v| !v.trim().is_empty()) {
            EmbeddingMode::parse(&mode).map_err(|e| SearchError::Config(e.to_string()))?;
            self.embedding.mode = mode.trim().to_ascii_lowercase();
        }
        if let Some(model) = lookup(EMBED_MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.embedding.model = Some(model.trim().to_string());
        }
        Ok(())
    }

    pub fn embedding_mode(&self) -> Result<EmbeddingMode> {
        EmbeddingMode::parse(&self.embedding.mode).map_err(|e| SearchError::Config(e.to_string()))
    }

    /// Embedding client for the configured mode. `openai` needs `OPENAI_API_KEY`.
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        match self.embedding_mode()? {
            EmbeddingMode::Stub => Ok(Arc::new(StubEmbedder::new(self.embedding.stub_dimension))),
            EmbeddingMode::OpenAi => {
                let client = OpenAiEmbedder::from_env(
                    self.embedding.endpoint.as_deref(),
                    self.embedding.model.as_deref(),
                )
                .map_err(|e| SearchError::Config(e.to_string()))?;
                Ok(Arc::new(client))
            }
        }
    }

    pub fn dataset_descriptors(&self) -> Vec<DatasetDescriptor> {
        self.datasets
            .iter()
            .map(|ds| {
                DatasetDescriptor::new(ds.name.clone(), &ds.records, &ds.embeddings)
                    .rooted_at(&self.corpus_root)
            })
            .collect()
    }

    pub fn resolved_tabular_dir(&self) -> PathBuf {
        match &self.tabular_dir {
            Some(dir) => self.corpus_root.join(dir),
            None => self.corpus_root.join(DEFAULT_TABULAR_DIR),
        }
    }

    /// Built-in expander extended with the configured synonyms and patterns.
    pub fn expander(&self) -> Result<QueryExpander> {
        let mut expander = QueryExpander::new();
        expander.extend_synonyms(
            self.synonyms
                .iter()
                .map(|(key, variants)| (key.clone(), variants.clone())),
        );
        let rules = self
            .patterns
            .iter()
            .map(|p| PatternRule::new(&p.pattern, &p.tags))
            .collect::<Result<Vec<_>>>()?;
        expander.extend_patterns(rules);
        Ok(expander)
    }
}
