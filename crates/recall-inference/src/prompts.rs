//! Prompt builders for the study operations.
//!
//! Each structured prompt spells out the exact fenced block the parser in
//! [`crate::structured`] expects back.

/// System prompt sent with every study call.
pub const SYSTEM_PROMPT: &str = "You are a careful, truthful study assistant. Be accurate and \
concise, keep to the material you are given, and always answer in the exact format requested.";

fn known_names_section(known: &[String]) -> String {
    if known.is_empty() {
        "(none yet)".to_string()
    } else {
        known
            .iter()
            .map(|n| format!("- {}", n))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Ask for the names of the learning outcomes covered by a chunk.
pub fn extract_concepts_prompt(chunk: &str, known: &[String]) -> String {
    format!(
        r#"Identify the distinct learning outcomes (concepts) covered by the study notes below.

If a concept matches one already known, reuse its name exactly as listed.

# KNOWN CONCEPTS
{known}

# NOTES
{chunk}

Respond with a single fenced YAML block and nothing else:
```yaml
concepts:
  - <concept name>
```"#,
        known = known_names_section(known),
        chunk = chunk
    )
}

/// Ask for a self-contained write-up of a new concept.
pub fn synthesize_add_prompt(chunk: &str, name: &str) -> String {
    format!(
        r#"Write a self-contained study summary of the concept "{name}" using only the notes below.

# NOTES
{chunk}

Respond with a single fenced YAML block and nothing else:
```yaml
content: |
  <summary>
```"#,
        name = name,
        chunk = chunk
    )
}

/// Ask for only the new information a chunk adds to an existing concept.
pub fn synthesize_append_prompt(chunk: &str, name: &str, current: &str) -> String {
    format!(
        r#"The concept "{name}" is already summarized as:

# CURRENT SUMMARY
{current}

Using the notes below, write ONLY the additional information not already covered. Do not repeat the current summary.

# NOTES
{chunk}

Respond with a single fenced YAML block and nothing else:
```yaml
content: |
  <additional information>
```"#,
        name = name,
        current = current,
        chunk = chunk
    )
}

/// Ask for a short title for a quiz over the given concepts.
pub fn quiz_name_prompt(concept_names: &[String]) -> String {
    format!(
        "Write a short, descriptive title (at most 8 words) for a quiz covering these concepts:\n\n{}\n\nRespond with the title only.",
        known_names_section(concept_names)
    )
}

/// Ask for exactly `count` question/answer pairs about one concept.
pub fn generate_questions_prompt(name: &str, content: &str, count: usize) -> String {
    format!(
        r#"Write exactly {count} distinct quiz question(s) testing recall and understanding of the concept "{name}".

# CONCEPT
{content}

Each question needs a concise model answer drawn from the concept text.

Respond with a single fenced YAML block containing exactly {count} item(s) and nothing else:
```yaml
questions:
  - question: <question>
    answer: <model answer>
```"#,
        count = count,
        name = name,
        content = content
    )
}

/// Ask for feedback and a 1-4 grade on a learner's response.
pub fn grade_response_prompt(question: &str, answer: &str, response: &str) -> String {
    format!(
        r#"Grade a learner's answer to a quiz question against the model answer.

# QUESTION
{question}

# MODEL ANSWER
{answer}

# LEARNER ANSWER
{response}

Grades:
1 = wrong or blank (forgot)
2 = partially correct, with significant gaps
3 = correct with minor omissions
4 = fully correct

Respond with a single fenced YAML block and nothing else:
```yaml
feedback: <one or two sentences for the learner>
grade: <integer 1-4>
```"#,
        question = question,
        answer = answer,
        response = response
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prompt_lists_known_names() {
        let prompt = extract_concepts_prompt("text", &["Mitosis".to_string()]);
        assert!(prompt.contains("- Mitosis"));
        assert!(prompt.contains("concepts:"));

        let empty = extract_concepts_prompt("text", &[]);
        assert!(empty.contains("(none yet)"));
    }

    #[test]
    fn test_question_prompt_states_count() {
        let prompt = generate_questions_prompt("Osmosis", "Water moves...", 3);
        assert!(prompt.contains("exactly 3"));
        assert!(prompt.contains("Osmosis"));
    }

    #[test]
    fn test_grade_prompt_includes_all_parts() {
        let prompt = grade_response_prompt("Q?", "A.", "R.");
        assert!(prompt.contains("Q?"));
        assert!(prompt.contains("A."));
        assert!(prompt.contains("R."));
        assert!(prompt.contains("grade:"));
    }
}
