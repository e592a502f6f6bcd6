//! Fenced structured-output parsing.
//!
//! Every structured completion must contain one fenced block (```yaml,
//! ```json or a bare ```), parsed as YAML. Each operation's payload type
//! validates its own contract. All contract violations are reported as
//! `Error::Validation` so the retry combinator treats them as transient.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use recall_core::{Error, Rating, Result};

static FENCED_BLOCK: Lazy<Result<Regex>> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*(?:yaml|yml|json)?[ \t]*\r?\n(.*?)```")
        .map_err(|e| Error::Internal(format!("invalid fence pattern: {}", e)))
});

/// Return the body of the first fenced block in `response`.
pub fn extract_fenced_block(response: &str) -> Result<&str> {
    let re = FENCED_BLOCK.as_ref().map_err(|e| Error::Internal(e.to_string()))?;
    re.captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::Validation("response contains no fenced block".to_string()))
}

/// Extract the fenced block and deserialize it.
pub fn parse_fenced<T: DeserializeOwned>(response: &str) -> Result<T> {
    let body = extract_fenced_block(response)?;
    serde_yaml::from_str(body)
        .map_err(|e| Error::Validation(format!("fenced block does not match contract: {}", e)))
}

/// Output of concept-name extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptNames {
    pub concepts: Vec<String>,
}

impl ConceptNames {
    /// Trimmed, non-empty names in extraction order. Duplicates are kept.
    pub fn into_names(self) -> Vec<String> {
        self.concepts
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// Output of concept synthesis (add or append).
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    pub content: String,
}

impl ContentBlock {
    pub fn parse(response: &str) -> Result<String> {
        let block: ContentBlock = parse_fenced(response)?;
        let content = block.content.trim();
        if content.is_empty() {
            return Err(Error::Validation("content is empty".to_string()));
        }
        Ok(content.to_string())
    }
}

/// One generated question with its model answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionItem {
    pub question: String,
    pub answer: String,
}

/// Output of question generation.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<QuestionItem>,
}

impl QuestionSet {
    /// Parse and require exactly `expected` items with non-empty fields.
    pub fn parse(response: &str, expected: usize) -> Result<Vec<QuestionItem>> {
        let set: QuestionSet = parse_fenced(response)?;
        if set.questions.len() != expected {
            return Err(Error::Validation(format!(
                "expected {} questions, got {}",
                expected,
                set.questions.len()
            )));
        }
        set.questions
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let question = item.question.trim();
                let answer = item.answer.trim();
                if question.is_empty() || answer.is_empty() {
                    Err(Error::Validation(format!(
                        "question {} has an empty question or answer",
                        i
                    )))
                } else {
                    Ok(QuestionItem {
                        question: question.to_string(),
                        answer: answer.to_string(),
                    })
                }
            })
            .collect()
    }
}

/// Output of response grading.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeBlock {
    pub feedback: String,
    pub grade: i64,
}

impl GradeBlock {
    /// Parse and require a grade in `1..=4`. Out-of-range grades are
    /// rejected, never clamped.
    pub fn parse(response: &str) -> Result<(String, Rating)> {
        let block: GradeBlock = parse_fenced(response)?;
        let rating = Rating::try_from(block.grade).map_err(|_| {
            Error::Validation(format!("grade {} outside 1-4", block.grade))
        })?;
        Ok((block.feedback.trim().to_string(), rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_yaml_block() {
        let response = "Sure!\n```yaml\nconcepts:\n  - A\n```\nDone.";
        assert_eq!(extract_fenced_block(response).unwrap(), "concepts:\n  - A\n");
    }

    #[test]
    fn test_extract_bare_and_json_blocks() {
        assert!(extract_fenced_block("```\ncontent: x\n```").is_ok());
        let json = "```json\n{\"content\": \"x\"}\n```";
        assert_eq!(ContentBlock::parse(json).unwrap(), "x");
    }

    #[test]
    fn test_missing_block_is_validation_error() {
        let err = extract_fenced_block("concepts: [A]").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_unparseable_block_is_validation_error() {
        let err = parse_fenced::<ConceptNames>("```yaml\nconcepts: [unclosed\n```").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_missing_key_is_validation_error() {
        let err = parse_fenced::<ConceptNames>("```yaml\nnames: [A]\n```").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_concept_names_trimmed_and_duplicates_kept() {
        let names: ConceptNames =
            parse_fenced("```yaml\nconcepts:\n  - ' Osmosis '\n  - ''\n  - Osmosis\n```").unwrap();
        assert_eq!(names.into_names(), vec!["Osmosis", "Osmosis"]);
    }

    #[test]
    fn test_empty_content_rejected() {
        let err = ContentBlock::parse("```yaml\ncontent: '   '\n```").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_question_count_enforced() {
        let response = "```yaml\nquestions:\n  - question: Q1\n    answer: A1\n```";
        assert_eq!(QuestionSet::parse(response, 1).unwrap().len(), 1);
        let err = QuestionSet::parse(response, 2).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("expected 2")));
    }

    #[test]
    fn test_question_empty_answer_rejected() {
        let response = "```yaml\nquestions:\n  - question: Q1\n    answer: ''\n```";
        assert!(QuestionSet::parse(response, 1).is_err());
    }

    #[test]
    fn test_question_wrong_type_rejected() {
        let response = "```yaml\nquestions: just one\n```";
        assert!(matches!(
            QuestionSet::parse(response, 1),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_grade_parse() {
        let (feedback, rating) =
            GradeBlock::parse("```yaml\nfeedback: Close enough.\ngrade: 3\n```").unwrap();
        assert_eq!(feedback, "Close enough.");
        assert_eq!(rating, Rating::Good);
    }

    #[test]
    fn test_grade_out_of_range_rejected() {
        for grade in ["0", "5", "-1"] {
            let response = format!("```yaml\nfeedback: x\ngrade: {}\n```", grade);
            let err = GradeBlock::parse(&response).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "grade {}", grade);
        }
    }

    #[test]
    fn test_grade_non_integer_rejected() {
        let err = GradeBlock::parse("```yaml\nfeedback: x\ngrade: good\n```").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
