use crate::error::{Result, VectorStoreError};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Number of coarse candidates handed to the lexical re-scoring pass.
pub const COARSE_CANDIDATES: usize = 20;

/// Scale `vector` to unit length in place. A zero vector stays zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    let inv = 1.0 / (norm + 1e-10);
    for value in vector {
        *value *= inv;
    }
}

/// Brute-force dense index over unit-length rows.
///
/// Rows are normalized on insertion, so similarity is a plain dot product
/// against a normalized query.
#[derive(Debug, Clone)]
pub struct DenseIndex {
    vectors: Array2<f32>,
}

impl DenseIndex {
    /// Build from row-major data. Every row is L2-normalized.
    pub fn from_rows(dimension: usize, mut data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }
        if data.len() % dimension != 0 {
            return Err(VectorStoreError::Other(format!(
                "{} values do not form rows of dimension {dimension}",
                data.len()
            )));
        }
        for row in data.chunks_exact_mut(dimension) {
            l2_normalize(row);
        }
        let rows = data.len() / dimension;
        let vectors = Array2::from_shape_vec((rows, dimension), data)
            .map_err(|e| VectorStoreError::Other(e.to_string()))?;
        Ok(Self { vectors })
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    pub fn vector(&self, idx: usize) -> Option<ArrayView1<'_, f32>> {
        (idx < self.len()).then(|| self.vectors.row(idx))
    }

    pub fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    /// Cosine similarity of `query` against every stored row, in row order.
    pub fn similarities(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        let mut query = query.to_vec();
        l2_normalize(&mut query);
        let query = ArrayView1::from(query.as_slice());
        Ok(self.vectors.dot(&query).to_vec())
    }

    /// Top `limit` rows by similarity, as (row, score) sorted descending.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(usize, f32)>> {
        let mut scores: Vec<(usize, f32)> =
            self.similarities(query)?.into_iter().enumerate().collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(limit);

        Ok(scores)
    }
}
