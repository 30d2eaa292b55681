//! # Syllabus Vector Store
//!
//! In-memory store of embedded course records.
//!
//! ## Features
//!
//! - **Container parsing** for `.npz` / `.npy` float32 matrices
//! - **Multi-dataset merge** with a shared vector dimensionality
//! - **Lazy, once-only loading** safe under concurrent first queries
//! - **Dense ranking** by cosine similarity over unit-length rows
//!
//! ## Architecture
//!
//! ```text
//! DatasetDescriptor[]
//!     │
//!     ├──> records.json ──> Record[]        (positional identity)
//!     │
//!     ├──> embeddings.npz ──> f32[N x D]    (L2-normalized rows)
//!     │
//!     └──> LoadedCorpus
//!            └─> DenseIndex::search(query, 20)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use syllabus_vector_store::{DatasetDescriptor, Embedder, StubEmbedder, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> syllabus_vector_store::Result<()> {
//!     let store = VectorStore::new(vec![DatasetDescriptor::new(
//!         "syllabus",
//!         "data/records.json",
//!         "data/embeddings.npz",
//!     )]);
//!     let corpus = store.ensure_loaded().await?;
//!
//!     let query = StubEmbedder::new(corpus.dimension()).embed("民法").await?;
//!     for (idx, score) in corpus.index().search(&query.unwrap_or_default(), 5)? {
//!         if let Some(record) = corpus.record(idx) {
//!             println!("{}: {score:.3}", record.display_name());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod container;
mod embeddings;
mod error;
mod index;
mod store;
mod types;

pub use container::{
    encode_npy, parse_npy, parse_npz, read_embeddings, write_npz, EmbeddingMatrix,
};
pub use embeddings::{
    Embedder, EmbeddingMode, OpenAiEmbedder, StubEmbedder, DEFAULT_EMBEDDING_ENDPOINT,
    DEFAULT_EMBEDDING_MODEL,
};
pub use error::{Result, VectorStoreError};
pub use index::{l2_normalize, DenseIndex, COARSE_CANDIDATES};
pub use store::{load_datasets, LoadedCorpus, VectorStore};
pub use types::{DatasetDescriptor, Record};
