use crate::fusion::ScoredCandidate;
use crate::tabular::TabularDocument;
use syllabus_protocol::{Passage, PassageKind, ScoreBreakdown};
use syllabus_vector_store::Record;

pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";
const CITATION_PREFIX: &str = "出典: ";

/// Passage for the `k`-th (1-based) ranked record.
pub fn record_passage(k: usize, record: &Record, candidate: &ScoredCandidate) -> Passage {
    let text = record
        .description
        .as_deref()
        .or(record.content.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| record.summary());

    Passage {
        tag: format!("R{k}"),
        kind: PassageKind::Record,
        label: format!(
            "{} / {}",
            record.display_name(),
            record.instructor.as_deref().unwrap_or_default()
        ),
        source: record.citation().to_string(),
        text,
        score: ScoreBreakdown {
            vector: candidate.vector,
            lexical: candidate.lexical,
            fuzzy: candidate.fuzzy,
            bonus: candidate.bonus,
            total: candidate.hybrid,
        },
    }
}

/// Passage for the `k`-th (1-based) ranked tabular document.
pub fn tabular_passage(k: usize, doc: &TabularDocument, score: f32) -> Passage {
    Passage {
        tag: format!("C{k}"),
        kind: PassageKind::Tabular,
        label: format!("{} / {}", doc.title, doc.instructor.as_deref().unwrap_or_default()),
        source: doc.citation(),
        text: doc.body.clone(),
        score: ScoreBreakdown {
            total: score,
            ..ScoreBreakdown::default()
        },
    }
}

/// Render passages as one context block for the answering model.
pub fn render_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| {
            format!(
                "[{}] {}\n{}\n{CITATION_PREFIX}{}",
                p.tag, p.label, p.text, p.source
            )
        })
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}
