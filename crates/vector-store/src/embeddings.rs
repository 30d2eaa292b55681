use crate::error::{Result, VectorStoreError};
use crate::index::l2_normalize;
use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// Turns query text into a vector in the same space as the stored embeddings.
///
/// `Ok(None)` means the upstream answered without a vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    OpenAi,
    Stub,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" | "remote" => Ok(Self::OpenAi),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported embedding mode '{other}' (expected 'openai' or 'stub')"
            ))),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Stub => "stub",
        }
    }
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl OpenAiEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Reads the API key from `OPENAI_API_KEY`.
    pub fn from_env(endpoint: Option<&str>, model: Option<&str>) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            VectorStoreError::EmbeddingError("OPENAI_API_KEY is not set".to_string())
        })?;
        Self::new(
            endpoint.unwrap_or(DEFAULT_EMBEDDING_ENDPOINT),
            model.unwrap_or(DEFAULT_EMBEDDING_MODEL),
            api_key,
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let body = serde_json::json!({ "model": self.model, "input": [text] });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Embedding endpoint returned {status}");
            return Ok(None);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?;
        Ok(parsed
            .data
            .into_iter()
            .next()
            .and_then(|datum| datum.embedding)
            .filter(|v| !v.is_empty()))
    }
}

/// Deterministic hash embedding for offline runs and tests. Not semantic.
#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>> {
        Ok(Some(stub_embed(text, self.dimension)))
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    l2_normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_is_deterministic_and_unit_length() {
        let embedder = StubEmbedder::new(16);
        let a = embedder.embed("民法").await.unwrap().unwrap();
        let b = embedder.embed("民法").await.unwrap().unwrap();
        let c = embedder.embed("刑法").await.unwrap().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(EmbeddingMode::parse("STUB").unwrap(), EmbeddingMode::Stub);
        assert_eq!(EmbeddingMode::parse("openai").unwrap(), EmbeddingMode::OpenAi);
        assert!(EmbeddingMode::parse("gpu").is_err());
    }

    #[test]
    fn response_without_vector_yields_none() {
        let parsed: EmbeddingResponse = serde_json::from_str(r#"{"error":"quota"}"#).unwrap();
        assert!(parsed.data.into_iter().next().and_then(|d| d.embedding).is_none());
    }
}
