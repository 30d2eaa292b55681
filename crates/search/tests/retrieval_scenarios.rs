use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syllabus_protocol::PassageKind;
use syllabus_search::{
    QueryExpander, RetrievalEngine, SearchError, TabularCorpus, FINAL_RESULTS, NAME_HIT_BONUS,
    TABULAR_RESULTS,
};
use syllabus_vector_store::{write_npz, DatasetDescriptor, Embedder, EmbeddingMatrix, VectorStore};
use tempfile::TempDir;

/// Returns the same vector for every query.
struct FixedEmbedder(Option<Vec<f32>>);

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> syllabus_vector_store::Result<Option<Vec<f32>>> {
        Ok(self.0.clone())
    }
}

fn write_dataset(
    dir: &Path,
    records: &[serde_json::Value],
    vectors: &[Vec<f32>],
) -> DatasetDescriptor {
    std::fs::create_dir_all(dir).expect("dataset dir");
    let records_path = dir.join("records.json");
    std::fs::write(&records_path, serde_json::to_vec(records).expect("records json"))
        .expect("write records");

    let dimension = vectors[0].len();
    let matrix = EmbeddingMatrix {
        rows: vectors.len(),
        dimension,
        data: vectors.iter().flatten().copied().collect(),
    };
    let embeddings_path = dir.join("embeddings.npz");
    write_npz(&embeddings_path, &matrix).expect("write npz");

    DatasetDescriptor::new("fixture", records_path, embeddings_path)
}

fn write_tabular(dir: &Path, rows: &[(&str, &str)]) -> PathBuf {
    std::fs::create_dir_all(dir).expect("tabular dir");
    for (i, (title, overview)) in rows.iter().enumerate() {
        std::fs::write(
            dir.join(format!("{i:02}.csv")),
            format!(
                "科目名,授業概要,授業計画,成績評価方法,担当教員,学期曜日時限,出典URL\n\
                 {title},{overview},,,,,https://example.edu/{i}\n"
            ),
        )
        .expect("write csv");
    }
    dir.to_path_buf()
}

fn engine(
    dataset: DatasetDescriptor,
    tabular: Option<PathBuf>,
    query_vector: Option<Vec<f32>>,
) -> RetrievalEngine {
    RetrievalEngine::new(
        VectorStore::new(vec![dataset]),
        TabularCorpus::new(tabular),
        QueryExpander::new(),
        Arc::new(FixedEmbedder(query_vector)),
    )
}

#[tokio::test]
async fn credits_question_surfaces_record_by_vector_alone() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[
            json!({"name": "憲法", "instructor": "佐藤", "description": "統治機構を扱う"}),
            json!({"name": "刑法総論", "instructor": "鈴木", "description": "犯罪論の基礎"}),
        ],
        &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
    );
    let engine = engine(dataset, None, Some(vec![2.0, 0.0, 0.0]));

    let response = engine.search("単位は何ですか").await.expect("search");
    assert!(response.expanded_terms.iter().any(|t| t == "単位"));
    assert!(!response.expanded_terms.iter().any(|t| t == "概要"));

    let top = &response.passages[0];
    assert_eq!(top.tag, "R1");
    assert_eq!(top.label, "憲法 / 佐藤");
    assert_eq!(top.score.lexical, 0.0);
    assert!((top.score.vector - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn vague_question_carries_default_tags() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[json!({"name": "民法", "description": "授業計画 第1回 導入"})],
        &[vec![0.0, 1.0]],
    );
    let engine = engine(dataset, None, Some(vec![0.0, 1.0]));

    let response = engine.search("この授業について教えて").await.expect("search");
    for tag in ["概要", "授業計画", "成績評価方法"] {
        assert!(
            response.expanded_terms.iter().any(|t| t == tag),
            "missing {tag} in {:?}",
            response.expanded_terms
        );
    }
    assert!(response.passages[0].score.lexical > 0.0);
    assert!(response.context.starts_with("[R1] 民法 / \n授業計画 第1回 導入\n出典: "));
}

#[tokio::test]
async fn instructor_spacing_variants_still_match() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[
            json!({"name": "刑法総論", "instructor": "鈴木", "description": "犯罪論"}),
            json!({"name": "English Law", "instructor": "Rory Gay", "description": "common law"}),
        ],
        &[vec![1.0, 0.0], vec![1.0, 0.0]],
    );
    let engine = engine(dataset, None, Some(vec![1.0, 0.0]));

    let response = engine.search("RoryGay").await.expect("search");
    let first = &response.passages[0];
    let second = &response.passages[1];
    assert_eq!(first.label, "English Law / Rory Gay");
    assert!(first.score.fuzzy > 0.0);
    assert_eq!(first.score.bonus, NAME_HIT_BONUS);
    assert_eq!(second.score.fuzzy, 0.0);
    assert!(first.score.total > second.score.total);
}

#[tokio::test]
async fn result_counts_are_capped() {
    let temp = TempDir::new().expect("tempdir");
    let records: Vec<_> = (0..8)
        .map(|i| json!({"name": format!("民法 第{i}部"), "description": "民法の講義"}))
        .collect();
    let vectors: Vec<Vec<f32>> = (0..8).map(|i| vec![1.0, i as f32 * 0.1]).collect();
    let dataset = write_dataset(&temp.path().join("data"), &records, &vectors);
    let tabular = write_tabular(
        &temp.path().join("csv"),
        &[
            ("民法 入門", "民法"),
            ("民法 基礎", "民法"),
            ("民法 演習", "民法"),
            ("民法 総則", "民法"),
            ("民法 物権", "民法"),
            ("刑法", "犯罪論"),
        ],
    );
    let engine = engine(dataset, Some(tabular), Some(vec![1.0, 0.0]));

    let response = engine.search("民法").await.expect("search");
    let records = response
        .passages
        .iter()
        .filter(|p| p.kind == PassageKind::Record)
        .count();
    let tabular: Vec<_> = response
        .passages
        .iter()
        .filter(|p| p.kind == PassageKind::Tabular)
        .collect();

    assert_eq!(records, FINAL_RESULTS);
    assert_eq!(tabular.len(), TABULAR_RESULTS);
    assert_eq!(tabular[0].tag, "C1");
    assert!(tabular.iter().all(|p| !p.label.starts_with("刑法")));
    assert_eq!(
        response.context.matches("\n\n---\n\n").count(),
        FINAL_RESULTS + TABULAR_RESULTS - 1
    );
}

#[tokio::test]
async fn empty_query_is_rejected_before_loading() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[json!({"name": "民法"})],
        &[vec![1.0, 0.0]],
    );
    let engine = engine(dataset, None, Some(vec![1.0, 0.0]));

    let err = engine.search("   ").await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));
    assert!(err.is_client_error());
    assert!(!engine.health().records_loaded);
}

#[tokio::test]
async fn missing_embedding_is_a_server_error() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[json!({"name": "民法"})],
        &[vec![1.0, 0.0]],
    );
    let engine = engine(dataset, None, None);

    let err = engine.search("民法").await.unwrap_err();
    assert_eq!(err.code(), "embedding_failed");
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn wrong_query_dimension_is_an_embedding_failure() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[json!({"name": "民法"})],
        &[vec![1.0, 0.0]],
    );
    let engine = engine(dataset, None, Some(vec![1.0, 0.0, 0.0]));

    let err = engine.search("民法").await.unwrap_err();
    assert_eq!(err.code(), "embedding_failed");
}

#[tokio::test]
async fn no_datasets_means_no_data() {
    let temp = TempDir::new().expect("tempdir");
    let missing = DatasetDescriptor::new(
        "missing",
        temp.path().join("records.json"),
        temp.path().join("embeddings.npz"),
    );
    let engine = engine(missing, None, Some(vec![1.0]));

    let err = engine.search("民法").await.unwrap_err();
    assert_eq!(err.code(), "no_data");
}

#[tokio::test]
async fn health_reflects_loaded_corpora() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[json!({"name": "民法"}), json!({"name": "刑法"})],
        &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
    );
    let tabular = write_tabular(&temp.path().join("csv"), &[("民法", "概要")]);
    let engine = engine(dataset, Some(tabular), Some(vec![1.0, 0.0, 0.0]));

    let before = engine.health();
    assert!(!before.records_loaded);
    assert!(!before.tabular_loaded);

    engine.warm().await.expect("warm");
    let after = engine.health();
    assert!(after.records_loaded);
    assert_eq!(after.records, 2);
    assert_eq!(after.dimension, Some(3));
    assert_eq!(after.datasets, vec!["fixture".to_string()]);
    assert_eq!(after.tabular_documents, 1);
}

#[tokio::test]
async fn concurrent_queries_share_one_load() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = write_dataset(
        &temp.path().join("data"),
        &[json!({"name": "民法", "instructor": "山田"})],
        &[vec![1.0, 0.0]],
    );
    let engine = Arc::new(engine(dataset, None, Some(vec![1.0, 0.0])));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.search("民法").await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.expect("join").expect("search");
        assert_eq!(response.passages.len(), 1);
        assert_eq!(response.hints.course.as_deref(), Some("民法"));
    }
    assert_eq!(engine.health().records, 1);
}
