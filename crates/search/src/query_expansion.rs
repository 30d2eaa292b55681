use crate::error::{Result, SearchError};
use crate::normalize::{fold_width, normalize, tokenize};
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};

/// Authored synonym groups. Each key and its variants become mutually linked.
pub const BUILTIN_SYNONYMS: &[(&str, &[&str])] = &[
    // Course content
    ("概要", &["内容", "授業内容", "授業説明", "講義内容", "講義の要点", "シラバス", "イントロ", "要点", "要約", "サマリー", "特徴", "特色", "趣旨"]),
    ("特徴", &["概要", "内容", "特色", "ポイント", "性質", "他科目との差", "強み"]),
    ("目的", &["狙い", "ねらい", "ゴール", "意図", "趣旨", "学習目的", "学習目標"]),
    ("到達目標", &["ゴール", "目標", "学習目標", "学習到達目標", "目的", "アウトカム", "学修成果"]),
    ("授業計画", &["進め方", "スケジュール", "予定", "プログラム", "講義計画", "週間計画", "シラバス週次", "タイムライン"]),
    ("キーワード", &["keywords", "テーマ", "トピック", "扱うテーマ", "主題"]),
    // Format and delivery
    ("授業方法", &["スタイル", "講義形式", "指導方法", "進め方", "授業形態", "実施形態", "対面", "オンライン", "オンデマンド", "同時双方向", "ハイブリッド", "ハイフレックス", "遠隔", "zoom", "teams"]),
    ("授業形態", &["授業方法", "実施形態", "対面", "オンライン", "オンデマンド", "同時双方向", "ハイブリッド", "ハイフレックス"]),
    ("授業外学習", &["予習", "復習", "自習", "学習時間", "独習", "課外学習", "学修時間"]),
    // Grading and assignments
    ("成績評価方法", &["成績評価", "評価方法", "採点基準", "評価基準", "評価比率", "配点", "割合", "グレーディング", "grading"]),
    ("評価比率", &["割合", "配点", "%", "比率", "ウェイト"]),
    ("試験", &["テスト", "筆記", "口頭試験", "期末試験", "中間試験", "小テスト", "クイズ", "持ち込み可", "オープンブック", "追試"]),
    ("レポート", &["最終レポート", "課題", "宿題", "エッセイ", "essay", "提出物", "アサインメント", "assignment"]),
    ("課題", &["宿題", "レポート", "ワーク", "提出物", "アサインメント", "小課題"]),
    ("提出", &["締切", "期限", "提出方法", "提出形態", "提出先", "アップロード", "提出場所"]),
    ("出席", &["出欠", "出席点", "attendance", "欠席", "遅刻", "公欠"]),
    // Materials and LMS
    ("教科書", &["テキスト", "使用書籍", "指定書", "メイン教材"]),
    ("参考文献", &["リーディング", "参考資料", "関連文献", "参考図書", "reading list"]),
    ("配布資料", &["スライド", "PDF", "講義資料", "資料配布", "資料"]),
    ("授業サイト", &["LMS", "学習支援システム", "Moodle", "Waseda Moodle", "Course N@vi", "MyWaseda", "Classroom", "Google Classroom"]),
    // Catalogue fields
    ("科目名", &["授業名", "講義名", "クラス名", "授業タイトル", "科目タイトル", "タイトル"]),
    ("コード", &["科目コード", "授業コード", "科目番号", "講義コード", "コースコード"]),
    ("担当教員", &["教員", "先生", "講師", "インストラクター", "教授", "准教授", "助教"]),
    ("単位", &["単位数", "credit", "credits", "履修単位", "何単位"]),
    ("学期", &["学期曜日時限", "開講学期", "ターム", "春学期", "秋学期", "前期", "後期", "学期スケジュール"]),
    ("曜日", &["曜日時限", "開講曜日", "授業日", "開講日"]),
    ("時限", &["曜日時限", "時限数", "授業時間", "コマ", "時間帯"]),
    ("キャンパス", &["校舎", "場所", "開講場所"]),
    ("配当年次", &["対象学年", "対象年次", "学年", "受講対象"]),
    ("履修条件", &["受講条件", "登録条件", "前提科目", "先修条件", "要件", "prerequisite"]),
    ("定員", &["人数上限", "キャパ", "定員数", "募集人数"]),
    ("抽選", &["レジストレーション抽選", "抽選登録", "抽選制度"]),
    ("レベル", &["難易度", "初級", "中級", "上級"]),
    // Question words
    ("どこ", &["キャンパス", "教室", "場所"]),
    ("いつ", &["学期", "曜日", "時限", "日程"]),
    ("誰", &["担当教員", "先生", "教員"]),
    ("どう評価", &["成績評価方法", "試験", "レポート"]),
    ("課題は", &["課題", "レポート", "提出"]),
    ("試験は", &["試験", "成績評価方法"]),
    ("言語は", &["使用言語", "開講言語"]),
    ("オンラインか", &["授業形態", "授業方法", "オンライン", "オンデマンド", "対面"]),
];

/// Intent patterns matched against the normalized query, in order.
pub const BUILTIN_PATTERNS: &[(&str, &[&str])] = &[
    ("(何単位|単位は|単位数は)", &["単位"]),
    ("(誰(が|の)?|どの先生|担当教員|先生は)", &["担当教員"]),
    ("どこ(で|ですか)?", &["キャンパス", "教室", "場所"]),
    ("(いつ|何曜日|何時限|時間帯|何コマ|日程|スケジュール)", &["学期", "曜日", "時限", "日程"]),
    ("(どう.*評価|評価(は|方法|基準))", &["成績評価方法"]),
    ("(課題|宿題|レポート|提出|エッセイ)", &["課題", "レポート", "提出"]),
    ("(試験|テスト|中間|期末|小テスト|クイズ)", &["試験"]),
    ("(言語|英語|日本語|バイリンガル|bilingual)", &["使用言語"]),
    ("(オンライン|オンデマンド|対面|ハイブリッド|ハイフレックス|zoom|teams)", &["授業形態", "授業方法"]),
    ("(定員|人数上限|キャパ|抽選)", &["定員", "抽選"]),
];

/// Tags that mark a query as asking for one specific syllabus field.
pub const SPECIFIC_TAGS: &[&str] = &[
    "単位", "成績評価方法", "課題", "試験", "教科書", "参考文献", "使用言語", "曜日", "時限",
    "キャンパス", "履修条件", "定員", "抽選", "レベル",
];

/// Appended when a query names no specific field.
pub const DEFAULT_TAGS: &[&str] = &["概要", "授業計画", "成績評価方法"];

/// A compiled intent rule: when `pattern` matches the query, `tags` join the terms.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: Regex,
    tags: Vec<String>,
}

impl PatternRule {
    /// Compile a case-insensitive rule; tags are normalized.
    pub fn new<S: AsRef<str>>(pattern: &str, tags: &[S]) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| SearchError::Config(format!("invalid intent pattern '{pattern}': {e}")))?;
        let tags = tags
            .iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Ok(Self { pattern, tags })
    }

    pub fn matches(&self, normalized_query: &str) -> bool {
        self.pattern.is_match(normalized_query)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Query expander for syllabus questions: symmetric synonyms plus intent patterns.
#[derive(Debug, Clone)]
pub struct QueryExpander {
    /// Materialized symmetric table: term -> every other member of its groups
    synonyms: HashMap<String, Vec<String>>,
    patterns: Vec<PatternRule>,
}

impl QueryExpander {
    /// Create an expander with the built-in synonym groups and intent patterns.
    pub fn new() -> Self {
        let patterns = BUILTIN_PATTERNS
            .iter()
            .filter_map(|(pattern, tags)| match PatternRule::new(pattern, tags) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    log::error!("{err}");
                    None
                }
            })
            .collect();
        Self::with_tables(
            BUILTIN_SYNONYMS
                .iter()
                .map(|(key, variants)| (key.to_string(), variants.iter().map(|v| v.to_string()).collect())),
            patterns,
        )
    }

    pub fn with_tables(
        groups: impl IntoIterator<Item = (String, Vec<String>)>,
        patterns: Vec<PatternRule>,
    ) -> Self {
        Self {
            synonyms: symmetrize(groups),
            patterns,
        }
    }

    /// Add authored synonym groups on top of the current table.
    pub fn extend_synonyms(&mut self, groups: impl IntoIterator<Item = (String, Vec<String>)>) {
        for (term, variants) in symmetrize(groups) {
            let entry = self.synonyms.entry(term).or_default();
            for variant in variants {
                if !entry.contains(&variant) {
                    entry.push(variant);
                }
            }
        }
    }

    /// Append rules evaluated after the existing ones.
    pub fn extend_patterns(&mut self, rules: impl IntoIterator<Item = PatternRule>) {
        self.patterns.extend(rules);
    }

    /// Linked variants of a normalized term (empty when unknown).
    pub fn variants(&self, term: &str) -> &[String] {
        self.synonyms.get(term).map(Vec::as_slice).unwrap_or_default()
    }

    /// Tokens, their one-hop synonyms and the tags of every matching pattern.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let tokens = tokenize(query);
        let mut terms = TermSet::default();

        for token in &tokens {
            terms.insert(token.clone());
        }
        for token in &tokens {
            for variant in self.variants(token) {
                terms.insert(variant.clone());
            }
        }

        let normalized = fold_width(&normalize(query));
        for rule in &self.patterns {
            if rule.matches(&normalized) {
                for tag in rule.tags() {
                    terms.insert(tag.clone());
                }
            }
        }

        terms.into_vec()
    }

    /// `expand`, plus the default overview tags when no specific field is asked for.
    pub fn expand_with_fallback(&self, query: &str) -> Vec<String> {
        let mut terms = TermSet::from(self.expand(query));
        let has_specific = SPECIFIC_TAGS.iter().any(|tag| terms.contains(tag));
        if !has_specific {
            log::debug!("No specific field in '{query}', adding overview tags");
            for tag in DEFAULT_TAGS {
                terms.insert(normalize(tag));
            }
        }
        terms.into_vec()
    }
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new()
    }
}

fn symmetrize(
    groups: impl IntoIterator<Item = (String, Vec<String>)>,
) -> HashMap<String, Vec<String>> {
    let mut table: HashMap<String, Vec<String>> = HashMap::new();
    for (key, variants) in groups {
        let members: Vec<String> = std::iter::once(key)
            .chain(variants)
            .map(|m| normalize(&m))
            .filter(|m| !m.is_empty())
            .collect();
        for a in &members {
            let entry = table.entry(a.clone()).or_default();
            for b in &members {
                if a != b && !entry.contains(b) {
                    entry.push(b.clone());
                }
            }
        }
    }
    table
}

/// Insertion-ordered set of terms.
#[derive(Default)]
struct TermSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl TermSet {
    fn insert(&mut self, term: String) {
        if self.seen.insert(term.clone()) {
            self.order.push(term);
        }
    }

    fn contains(&self, term: &str) -> bool {
        self.seen.contains(term)
    }

    fn into_vec(self) -> Vec<String> {
        self.order
    }
}

impl From<Vec<String>> for TermSet {
    fn from(terms: Vec<String>) -> Self {
        let mut set = Self::default();
        for term in terms {
            set.insert(term);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn has(terms: &[String], term: &str) -> bool {
        terms.iter().any(|t| t == term)
    }

    #[test]
    fn synonym_groups_are_symmetric() {
        let expander = QueryExpander::new();
        for (key, variants) in BUILTIN_SYNONYMS {
            let members: Vec<String> = std::iter::once(*key)
                .chain(variants.iter().copied())
                .map(normalize)
                .filter(|m| !m.is_empty())
                .collect();
            for a in &members {
                let linked = expander.variants(a);
                assert!(!linked.contains(a), "{a} links to itself");
                for b in members.iter().filter(|b| *b != a) {
                    assert!(linked.contains(b), "{a} is missing {b}");
                }
            }
        }
    }

    #[test]
    fn expansion_is_one_hop() {
        let expander = QueryExpander::with_tables(
            vec![
                ("a".to_string(), vec!["b".to_string()]),
                ("b".to_string(), vec!["c".to_string()]),
            ],
            Vec::new(),
        );
        let mut terms = expander.expand("a");
        terms.sort();
        assert_eq!(terms, vec!["a", "b"]);

        let mut terms = expander.expand("b");
        terms.sort();
        assert_eq!(terms, vec!["a", "b", "c"]);
    }

    #[test]
    fn expansion_has_no_duplicates() {
        let expander = QueryExpander::new();
        let terms = expander.expand_with_fallback("課題 レポート 課題は？");
        let unique: HashSet<_> = terms.iter().collect();
        assert_eq!(unique.len(), terms.len());
    }

    #[test]
    fn credits_question_gets_credit_tag_without_fallback() {
        let expander = QueryExpander::new();
        let terms = expander.expand_with_fallback("単位は何ですか");
        assert!(has(&terms, "単位"));
        assert!(!has(&terms, "授業計画"));
    }

    #[test]
    fn vague_question_gets_default_tags() {
        let expander = QueryExpander::new();
        let terms = expander.expand_with_fallback("この授業について教えて");
        for tag in DEFAULT_TAGS {
            assert!(has(&terms, tag), "missing {tag}");
        }
    }

    #[test]
    fn patterns_ignore_case_and_width() {
        let expander = QueryExpander::new();
        assert!(has(&expander.expand("ＺＯＯＭでやる？"), "授業形態"));
        assert!(has(&expander.expand("Is it Bilingual"), "使用言語"));
    }

    #[test]
    fn token_synonyms_are_added() {
        let expander = QueryExpander::new();
        let terms = expander.expand("教科書");
        assert!(has(&terms, "テキスト"));
        assert!(has(&terms, "教科書"));
    }

    #[test]
    fn extended_tables_are_used() {
        let mut expander = QueryExpander::new();
        expander.extend_synonyms(vec![("ゼミ".to_string(), vec!["演習".to_string()])]);
        expander.extend_patterns(vec![PatternRule::new("ゼミ", &["演習"]).unwrap()]);
        assert!(has(&expander.variants("演習").to_vec(), "ゼミ"));
        assert!(has(&expander.expand("ゼミの内容"), "演習"));
        assert!(PatternRule::new("(unclosed", &["x"]).is_err());
    }
}
