use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One course or document entry from a dataset's `records.json`.
///
/// Every field is optional: datasets are built by different pipelines and
/// only share a loose vocabulary of keys. Synonymous keys (`name` and
/// `course_name`, say) are separate fields, so a record may carry both.
/// Non-string scalars (e.g. a numeric `credits`) are kept as their textual
/// form, string arrays are joined with `,`, empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub semester_time: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub credits: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub day_period: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub grading: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub textbooks: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

impl Record {
    /// Present searchable fields joined by a space, in a fixed order.
    pub fn searchable_text(&self) -> String {
        [
            &self.name,
            &self.course_name,
            &self.code,
            &self.course_code,
            &self.schedule,
            &self.time,
            &self.semester_time,
            &self.instructor,
            &self.faculty,
            &self.semester,
            &self.category,
            &self.language,
            &self.day_period,
            &self.campus,
            &self.description,
            &self.goals,
            &self.keywords,
            &self.grading,
            &self.textbooks,
            &self.notes,
            &self.title,
            &self.section,
            &self.content,
            &self.source_path,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Short `科目: … / 担当教員: …` line built from the catalogue fields.
    pub fn summary(&self) -> String {
        [
            ("科目", self.course_title()),
            ("担当教員", self.instructor.as_deref()),
            ("学期", self.semester.as_deref()),
            ("単位", self.credits.as_deref()),
            ("使用言語", self.language.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
        .collect::<Vec<_>>()
        .join(" / ")
    }

    /// `name`, else `course_name`.
    pub fn course_title(&self) -> Option<&str> {
        self.name.as_deref().or(self.course_name.as_deref())
    }

    pub fn display_name(&self) -> &str {
        self.course_title()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }

    pub fn citation(&self) -> &str {
        self.source_url
            .as_deref()
            .or(self.source_path.as_deref())
            .unwrap_or_default()
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    };
    Ok(text.filter(|s| !s.trim().is_empty()))
}

/// A named pair of files: the records array and its embedding container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub name: String,
    pub records: PathBuf,
    pub embeddings: PathBuf,
}

impl DatasetDescriptor {
    pub fn new(
        name: impl Into<String>,
        records: impl Into<PathBuf>,
        embeddings: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            records: records.into(),
            embeddings: embeddings.into(),
        }
    }

    /// Resolve relative file locations against `root`.
    pub fn rooted_at(&self, root: &Path) -> Self {
        Self {
            name: self.name.clone(),
            records: root.join(&self.records),
            embeddings: root.join(&self.embeddings),
        }
    }

    pub fn is_available(&self) -> bool {
        self.records.is_file() && self.embeddings.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_accepts_synonyms_and_scalars() {
        let raw = r#"{
            "course_name": "民法演習",
            "instructor": "ローリー ゲイ",
            "credits": 2,
            "time": "秋学期 月3",
            "description": "",
            "unknown_key": {"nested": true}
        }"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(record.display_name(), "民法演習");
        assert_eq!(record.credits.as_deref(), Some("2"));
        assert_eq!(record.time.as_deref(), Some("秋学期 月3"));
        assert_eq!(record.description, None);
    }

    #[test]
    fn record_with_key_and_synonym_both_present() {
        let raw = r#"{
            "name": "民法",
            "course_name": "民法演習",
            "code": "LAW101",
            "course_code": "LAW101A",
            "time": "月3",
            "schedule": "秋 月3",
            "instructor": "山田"
        }"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(record.display_name(), "民法");
        assert_eq!(record.course_name.as_deref(), Some("民法演習"));
        assert_eq!(
            record.searchable_text(),
            "民法 民法演習 LAW101 LAW101A 秋 月3 月3 山田"
        );
    }

    #[test]
    fn string_arrays_are_joined() {
        let record: Record =
            serde_json::from_str(r#"{"name": "民法", "keywords": ["契約", "債権"], "notes": []}"#)
                .unwrap();
        assert_eq!(record.keywords.as_deref(), Some("契約,債権"));
        assert_eq!(record.notes, None);
        assert_eq!(record.searchable_text(), "民法 契約,債権");
    }

    #[test]
    fn searchable_text_skips_absent_fields() {
        let record = Record {
            name: Some("憲法".into()),
            instructor: Some("山田".into()),
            source_path: Some("law/kenpo.pdf".into()),
            ..Record::default()
        };
        assert_eq!(record.searchable_text(), "憲法 山田 law/kenpo.pdf");
        assert_eq!(record.citation(), "law/kenpo.pdf");
    }

    #[test]
    fn summary_lists_catalogue_fields() {
        let record = Record {
            name: Some("刑法".into()),
            credits: Some("4".into()),
            ..Record::default()
        };
        assert_eq!(record.summary(), "科目: 刑法 / 単位: 4");
    }
}
