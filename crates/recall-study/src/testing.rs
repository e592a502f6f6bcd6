//! Deterministic stand-in for the completion model used across tests.
//!
//! Replies are derived from the prompt alone, so they do not depend on the
//! order concurrent calls arrive in:
//! - extraction returns the `;`-separated names in the notes section,
//! - add/append echo the concept name and the chunk,
//! - question generation returns `Q<i> about <name>` / `A<i> about <name>`,
//! - grading returns the learner answer as the grade when it is an integer,
//!   and 1 otherwise.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use recall_core::{
    new_v7, CardLifecycle, Concept, ConceptWithCard, CreateNoteRequest, Note, Result, RetryPolicy,
};
use recall_inference::mock::ScriptedBackend;
use recall_inference::StudyInference;

use crate::memory::MemoryStore;

pub fn inference_with(backend: &ScriptedBackend) -> StudyInference {
    StudyInference::new(Arc::new(backend.clone()), RetryPolicy::immediate(3))
}

fn section<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
    let Some(from) = prompt.find(start) else {
        return "";
    };
    let rest = &prompt[from + start.len()..];
    match rest.find(end) {
        Some(to) => &rest[..to],
        None => rest,
    }
}

fn quoted_name(prompt: &str) -> &str {
    section(prompt, "concept \"", "\"")
}

fn fenced(value: serde_json::Value) -> String {
    format!("```json\n{}\n```", value)
}

pub fn fake_model(prompt: &str) -> Result<String> {
    let notes = section(prompt, "# NOTES\n", "\n\nRespond");

    let reply = if prompt.starts_with("Identify") {
        let names: Vec<&str> = notes.split(';').map(str::trim).collect();
        fenced(json!({ "concepts": names }))
    } else if prompt.starts_with("Write a self-contained") {
        let name = quoted_name(prompt);
        fenced(json!({ "content": format!("{} from [{}]", name, notes) }))
    } else if prompt.starts_with("The concept") {
        let name = quoted_name(prompt);
        fenced(json!({ "content": format!("more {} from [{}]", name, notes) }))
    } else if prompt.starts_with("Write a short") {
        "Study Quiz".to_string()
    } else if prompt.starts_with("Write exactly") {
        let count: usize = section(prompt, "Write exactly ", " ").parse().unwrap_or(0);
        let name = quoted_name(prompt);
        let items: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                json!({
                    "question": format!("Q{} about {}", i, name),
                    "answer": format!("A{} about {}", i, name),
                })
            })
            .collect();
        fenced(json!({ "questions": items }))
    } else {
        let response = section(prompt, "# LEARNER ANSWER\n", "\n\nGrades:").trim();
        let grade = response.parse::<i64>().unwrap_or(1);
        fenced(json!({ "feedback": format!("graded {}", response), "grade": grade }))
    };
    Ok(reply)
}

/// A processed note holding one concept with a new card per name.
pub async fn seed_note(store: &Arc<MemoryStore>, names: &[&str]) -> (Note, Vec<ConceptWithCard>) {
    let repos = store.study_store();
    let note = repos
        .notes
        .insert(CreateNoteRequest {
            name: "Seeded".into(),
            content: names.join("\n\n"),
        })
        .await
        .unwrap();
    repos.notes.claim_for_processing(note.id).await.unwrap();

    let now = Utc::now();
    let lifecycle = CardLifecycle::default();
    let items: Vec<ConceptWithCard> = names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let concept = Concept {
                id: new_v7(),
                note_id: note.id,
                name: name.to_string(),
                content: format!("{} content", name),
                position: position as i32,
                created_at_utc: now,
            };
            let card = lifecycle.create(concept.id, now);
            ConceptWithCard { concept, card }
        })
        .collect();
    repos.notes.complete_processing(note.id, &items).await.unwrap();
    (note, items)
}
