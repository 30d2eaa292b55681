use once_cell::sync::Lazy;
use regex::Regex;
use syllabus_protocol::QueryHints;

static COURSE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Han}ぁ-んァ-ヶA-Za-z0-9]+(?:法|演習|講義|入門|基礎|概論)")
        .expect("course pattern is valid")
});

static TEACHER_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\p{Han}{1,4})(?:先生|教授)").expect("teacher pattern is valid")
});

/// Cheap guess at the course and teacher a question is about.
pub fn guess_entities(query: &str) -> QueryHints {
    let course = COURSE_LIKE
        .find(query)
        .map(|m| m.as_str().to_string());

    let instructor = TEACHER_LIKE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .chars()
                .filter(|c| !matches!(c, '先' | '生' | '教' | '授'))
                .collect::<String>()
        })
        .filter(|name| !name.is_empty());

    QueryHints { course, instructor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_course_and_teacher() {
        let hints = guess_entities("民法演習の山田先生の成績評価は？");
        assert_eq!(hints.course.as_deref(), Some("民法演習"));
        assert_eq!(hints.instructor.as_deref(), Some("山田"));
    }

    #[test]
    fn professor_suffix_is_recognised() {
        let hints = guess_entities("佐藤教授の授業");
        assert_eq!(hints.instructor.as_deref(), Some("佐藤"));
        assert_eq!(hints.course, None);
    }

    #[test]
    fn latin_course_names_match() {
        let hints = guess_entities("Python入門 はいつ？");
        assert_eq!(hints.course.as_deref(), Some("Python入門"));
    }

    #[test]
    fn plain_question_has_no_hints() {
        assert_eq!(guess_entities("この授業について教えて"), QueryHints::default());
    }
}
