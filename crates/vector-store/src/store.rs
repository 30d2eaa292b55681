use crate::container::read_embeddings;
use crate::error::{Result, VectorStoreError};
use crate::index::DenseIndex;
use crate::types::{DatasetDescriptor, Record};
use tokio::sync::OnceCell;

/// Records and vectors of every dataset that loaded, merged in declaration order.
#[derive(Debug)]
pub struct LoadedCorpus {
    records: Vec<Record>,
    index: DenseIndex,
    datasets: Vec<String>,
}

impl LoadedCorpus {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub const fn index(&self) -> &DenseIndex {
        &self.index
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Names of the datasets that made it into the merged corpus.
    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lazily populated, process-lifetime cache of the embedded datasets.
///
/// The first `ensure_loaded` call reads every dataset; concurrent callers wait
/// on the same initialization. A failed load is not cached, so the next call
/// tries again.
pub struct VectorStore {
    datasets: Vec<DatasetDescriptor>,
    loaded: OnceCell<LoadedCorpus>,
}

impl VectorStore {
    pub fn new(datasets: Vec<DatasetDescriptor>) -> Self {
        Self {
            datasets,
            loaded: OnceCell::new(),
        }
    }

    pub fn datasets(&self) -> &[DatasetDescriptor] {
        &self.datasets
    }

    pub async fn ensure_loaded(&self) -> Result<&LoadedCorpus> {
        self.loaded
            .get_or_try_init(|| async {
                let datasets = self.datasets.clone();
                tokio::task::spawn_blocking(move || load_datasets(&datasets))
                    .await
                    .map_err(|e| VectorStoreError::Other(format!("dataset loader panicked: {e}")))?
            })
            .await
    }

    /// The merged corpus, if a previous `ensure_loaded` succeeded.
    pub fn get(&self) -> Option<&LoadedCorpus> {
        self.loaded.get()
    }
}

/// Read and merge `datasets` synchronously.
///
/// Datasets with a missing file are skipped silently. Datasets whose vector
/// dimension differs from the first loaded one, or whose record count does not
/// match its row count, are skipped with a warning. Malformed files are errors.
pub fn load_datasets(datasets: &[DatasetDescriptor]) -> Result<LoadedCorpus> {
    let mut records: Vec<Record> = Vec::new();
    let mut data: Vec<f32> = Vec::new();
    let mut dimension: Option<usize> = None;
    let mut loaded = Vec::new();

    for dataset in datasets {
        if !dataset.is_available() {
            log::debug!("Dataset '{}' not present, skipping", dataset.name);
            continue;
        }

        let raw = std::fs::read(&dataset.records)?;
        let recs: Vec<Record> = serde_json::from_slice(&raw)?;
        let matrix = read_embeddings(&dataset.embeddings)?;

        if let Some(expected) = dimension {
            if matrix.dimension != expected {
                log::warn!(
                    "Skipping dataset '{}' due to dimension mismatch: got {}, expected {} ({})",
                    dataset.name,
                    matrix.dimension,
                    expected,
                    dataset.embeddings.display()
                );
                continue;
            }
        }
        if recs.len() != matrix.rows {
            log::warn!(
                "Skipping dataset '{}': {} records but {} embedding rows",
                dataset.name,
                recs.len(),
                matrix.rows
            );
            continue;
        }

        dimension.get_or_insert(matrix.dimension);
        log::info!(
            "Loaded dataset '{}': {} records (dim {})",
            dataset.name,
            recs.len(),
            matrix.dimension
        );
        records.extend(recs);
        data.extend(matrix.data);
        loaded.push(dataset.name.clone());
    }

    let Some(dimension) = dimension.filter(|_| !records.is_empty()) else {
        return Err(VectorStoreError::NoData);
    };

    let index = DenseIndex::from_rows(dimension, data)?;
    log::info!(
        "Vector corpus ready: {} records from {} dataset(s)",
        records.len(),
        loaded.len()
    );

    Ok(LoadedCorpus {
        records,
        index,
        datasets: loaded,
    })
}
