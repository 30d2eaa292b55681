use crate::error::{Result, SearchError};
use crate::fuzzy::fuzzy_space_score;
use crate::normalize::tokenize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

pub const TABULAR_RESULTS: usize = 3;

const COL_TITLE: &str = "科目名";
const COL_OVERVIEW: &str = "授業概要";
const COL_PLAN: &str = "授業計画";
const COL_GRADING: &str = "成績評価方法";
const COL_INSTRUCTOR: &str = "担当教員";
const COL_SCHEDULE: &str = "学期曜日時限";
const COL_SOURCE_URL: &str = "出典URL";

/// One course from the tabular corpus, built from the first data row of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularDocument {
    pub title: String,
    pub body: String,
    pub instructor: Option<String>,
    pub schedule: Option<String>,
    pub source_url: Option<String>,
    pub file_path: PathBuf,
}

impl TabularDocument {
    pub fn citation(&self) -> String {
        self.source_url
            .clone()
            .unwrap_or_else(|| self.file_path.display().to_string())
    }
}

/// Read the first data row of `path` into a document.
pub fn read_tabular_file(path: &Path) -> std::result::Result<TabularDocument, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut row: HashMap<String, String> = HashMap::new();
    if let Some(first) = reader.records().next() {
        let first = first?;
        for (header, value) in headers.iter().zip(first.iter()) {
            let value = value.trim();
            if !value.is_empty() {
                row.insert(header.clone(), value.to_string());
            }
        }
    }

    let title = row.get(COL_TITLE).cloned().unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let body = [COL_OVERVIEW, COL_PLAN, COL_GRADING, COL_INSTRUCTOR, COL_SCHEDULE]
        .iter()
        .filter_map(|col| row.get(*col).map(String::as_str))
        .collect::<Vec<_>>()
        .join(" / ");

    Ok(TabularDocument {
        title,
        body,
        instructor: row.get(COL_INSTRUCTOR).cloned(),
        schedule: row.get(COL_SCHEDULE).cloned(),
        source_url: row.get(COL_SOURCE_URL).cloned(),
        file_path: path.to_path_buf(),
    })
}

/// Every `.csv` file directly under `dir`, in file-name order.
///
/// A missing directory yields no documents; unreadable files are skipped.
pub fn load_tabular_dir(dir: &Path) -> Vec<TabularDocument> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::debug!("Tabular corpus {} unavailable: {err}", dir.display());
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    let mut docs = Vec::with_capacity(files.len());
    for file in files {
        match read_tabular_file(&file) {
            Ok(doc) => docs.push(doc),
            Err(err) => log::warn!("Skipping tabular file {}: {err}", file.display()),
        }
    }
    log::info!("Tabular corpus ready: {} documents from {}", docs.len(), dir.display());
    docs
}

/// Token-set overlap with the title and body, plus the whitespace-insensitive bonus.
pub fn score_document(query: &str, doc: &TabularDocument) -> f32 {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
    let doc_tokens: HashSet<String> =
        tokenize(&format!("{} {}", doc.title, doc.body)).into_iter().collect();
    let overlap = query_tokens.intersection(&doc_tokens).count();

    let doc_text = format!(
        "{} {} {}",
        doc.title,
        doc.body,
        doc.instructor.as_deref().unwrap_or_default()
    );
    let query_tokens: Vec<String> = query_tokens.into_iter().collect();
    overlap as f32 + fuzzy_space_score(&query_tokens, &doc_text)
}

/// Positive-scoring documents, best first, at most `limit`.
pub fn rank_documents(query: &str, docs: &[TabularDocument], limit: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = docs
        .iter()
        .enumerate()
        .map(|(idx, doc)| (idx, score_document(query, doc)))
        .filter(|(_, score)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Lazily loaded tabular corpus; an unset directory behaves as an empty corpus.
pub struct TabularCorpus {
    dir: Option<PathBuf>,
    docs: OnceCell<Vec<TabularDocument>>,
}

impl TabularCorpus {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            docs: OnceCell::new(),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub async fn ensure_loaded(&self) -> Result<&[TabularDocument]> {
        let docs = self
            .docs
            .get_or_try_init(|| async {
                let Some(dir) = self.dir.clone() else {
                    return Ok(Vec::new());
                };
                tokio::task::spawn_blocking(move || load_tabular_dir(&dir))
                    .await
                    .map_err(|e| SearchError::Other(format!("tabular loader panicked: {e}")))
            })
            .await?;
        Ok(docs.as_slice())
    }

    pub fn get(&self) -> Option<&[TabularDocument]> {
        self.docs.get().map(Vec::as_slice)
    }
}
