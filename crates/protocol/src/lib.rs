use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SEARCH_API_SCHEMA_VERSION: u32 = 1;

/// Body of `POST /search`. `question` is accepted as an alias for `query`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct SearchRequest {
    #[serde(default, alias = "question")]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PassageKind {
    /// Record from the embedded datasets.
    Record,
    /// Document from the tabular (CSV) corpus.
    Tabular,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct ScoreBreakdown {
    pub vector: f32,
    pub lexical: f32,
    pub fuzzy: f32,
    pub bonus: f32,
    pub total: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct Passage {
    /// Citation tag inside the synthesized context, e.g. `R1` or `C2`.
    pub tag: String,
    pub kind: PassageKind,
    pub label: String,
    /// URL or file path the passage was taken from; empty when unknown.
    pub source: String,
    pub text: String,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct QueryHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct SearchResponse {
    pub schema_version: u32,
    pub query: String,
    pub expanded_terms: Vec<String>,
    pub hints: QueryHints,
    pub passages: Vec<Passage>,
    /// Passages rendered as one block for the answer-generating model.
    pub context: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct HealthReport {
    pub status: String,
    pub records_loaded: bool,
    pub records: usize,
    pub dimension: Option<usize>,
    pub datasets: Vec<String>,
    pub tabular_loaded: bool,
    pub tabular_documents: usize,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

/// JSON schema of the `/search` response, for clients that validate payloads.
pub fn search_response_schema() -> Result<serde_json::Value> {
    serde_json::to_value(schemars::schema_for!(SearchResponse)).map_err(Into::into)
}
