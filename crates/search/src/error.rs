use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] syllabus_vector_store::VectorStoreError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Stable machine-readable code for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "invalid_request",
            Self::EmbeddingFailed(_) => "embedding_failed",
            Self::VectorStoreError(syllabus_vector_store::VectorStoreError::NoData) => "no_data",
            Self::VectorStoreError(_) => "load_failed",
            Self::Config(_) => "config_error",
            Self::Other(_) => "internal",
        }
    }

    /// True when the caller sent something unusable; everything else is on our side.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyQuery)
    }
}
