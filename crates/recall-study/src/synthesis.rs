//! Concept synthesis: fold ordered text chunks into a name → content map.
//!
//! Chunks are folded strictly in order because each extraction is told
//! which names earlier chunks produced. Within one chunk, distinct names are
//! synthesized concurrently while repeats of one name run in extraction
//! order, each seeing the previous write.

use std::collections::HashMap;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use recall_core::{Error, Result};
use recall_inference::StudyInference;

/// Insertion-ordered concept map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ConceptMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names in first-extraction order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    pub fn into_entries(self) -> Vec<(String, String)> {
        self.entries
    }

    fn set(&mut self, name: String, content: String) {
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = content,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, content));
            }
        }
    }
}

/// What one extracted name does to the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConceptAction {
    /// Name not yet known: write initial content.
    Add,
    /// Name known: grow the current content by a fragment.
    Append(String),
}

impl ConceptAction {
    pub fn route(current: Option<&String>) -> Self {
        match current {
            Some(content) => ConceptAction::Append(content.clone()),
            None => ConceptAction::Add,
        }
    }
}

/// Grown content: the fragment goes on its own line after the existing text.
pub fn grow_content(current: &str, fragment: &str) -> String {
    format!("{}\n{}", current, fragment)
}

/// An Add or Append unit that exhausted its retries.
#[derive(Debug)]
pub struct UnitFailure {
    pub chunk_index: usize,
    pub name: String,
    pub error: Error,
}

/// Result of one synthesis pass.
#[derive(Debug, Default)]
pub struct SynthesisOutcome {
    pub concepts: ConceptMap,
    pub failures: Vec<UnitFailure>,
    pub chunk_count: usize,
}

struct GroupOutcome {
    name: String,
    content: Option<String>,
    failures: Vec<UnitFailure>,
}

/// Runs extraction and Add/Append over a sequence of chunks.
#[derive(Clone)]
pub struct ConceptSynthesizer {
    inference: StudyInference,
}

impl ConceptSynthesizer {
    pub fn new(inference: StudyInference) -> Self {
        Self { inference }
    }

    /// Fold `chunks` into a concept map.
    ///
    /// A name-extraction failure aborts the pass. A failed Add/Append only
    /// loses that unit; it is recorded in [`SynthesisOutcome::failures`].
    #[instrument(skip_all, fields(subsystem = "study", component = "synthesis", chunk_count = chunks.len()))]
    pub async fn synthesize(&self, chunks: &[String]) -> Result<SynthesisOutcome> {
        let start = Instant::now();
        let mut outcome = SynthesisOutcome {
            chunk_count: chunks.len(),
            ..Default::default()
        };

        for (chunk_index, chunk) in chunks.iter().enumerate() {
            let known = outcome.concepts.names();
            let names = self.inference.extract_concept_names(chunk, &known).await?;
            debug!(chunk_index, extracted = names.len(), "Extracted concept names");

            let groups = group_by_name(names);
            let runs = groups.into_iter().map(|(name, repeats)| {
                let current = outcome.concepts.get(&name).cloned();
                self.run_group(chunk_index, chunk, name, repeats, current)
            });

            for group in join_all(runs).await {
                if let Some(content) = group.content {
                    outcome.concepts.set(group.name, content);
                }
                outcome.failures.extend(group.failures);
            }
        }

        info!(
            concept_count = outcome.concepts.len(),
            failed_units = outcome.failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Synthesis pass finished"
        );
        Ok(outcome)
    }

    /// Apply every occurrence of one name within a chunk, in order.
    async fn run_group(
        &self,
        chunk_index: usize,
        chunk: &str,
        name: String,
        repeats: usize,
        mut content: Option<String>,
    ) -> GroupOutcome {
        let mut failures = Vec::new();

        for _ in 0..repeats {
            let result = match ConceptAction::route(content.as_ref()) {
                ConceptAction::Add => self.inference.synthesize_add(chunk, &name).await,
                ConceptAction::Append(current) => self
                    .inference
                    .synthesize_append(chunk, &name, &current)
                    .await
                    .map(|fragment| grow_content(&current, &fragment)),
            };

            match result {
                Ok(next) => content = Some(next),
                Err(error) => {
                    warn!(
                        chunk_index,
                        concept_name = %name,
                        error = %error,
                        "Concept unit failed, continuing with the rest of the chunk"
                    );
                    failures.push(UnitFailure {
                        chunk_index,
                        name: name.clone(),
                        error,
                    });
                }
            }
        }

        GroupOutcome {
            name,
            content,
            failures,
        }
    }
}

/// Group trimmed, non-empty names by exact match, in first-appearance order,
/// counting repeats.
fn group_by_name(names: Vec<String>) -> Vec<(String, usize)> {
    let mut groups: Vec<(String, usize)> = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => groups.push((name.to_string(), 1)),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_model, inference_with};
    use recall_inference::mock::ScriptedBackend;

    fn chunks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_route_by_presence() {
        assert_eq!(ConceptAction::route(None), ConceptAction::Add);
        let current = "body".to_string();
        assert_eq!(
            ConceptAction::route(Some(&current)),
            ConceptAction::Append("body".to_string())
        );
    }

    #[test]
    fn test_group_by_name_is_exact_after_trim() {
        let groups = group_by_name(vec![
            " Osmosis ".into(),
            "Diffusion".into(),
            "osmosis".into(),
            "Osmosis".into(),
            "  ".into(),
        ]);
        assert_eq!(
            groups,
            vec![
                ("Osmosis".to_string(), 2),
                ("Diffusion".to_string(), 1),
                ("osmosis".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_add_then_append_grows_content() {
        let backend = ScriptedBackend::new().with_responder(fake_model);
        let synth = ConceptSynthesizer::new(inference_with(&backend));

        let out = synth
            .synthesize(&chunks(&["Osmosis", "Osmosis;Diffusion"]))
            .await
            .unwrap();

        assert_eq!(out.chunk_count, 2);
        assert!(out.failures.is_empty());
        assert_eq!(out.concepts.names(), vec!["Osmosis", "Diffusion"]);
        assert_eq!(
            out.concepts.get("Osmosis").unwrap(),
            "Osmosis from [Osmosis]\nmore Osmosis from [Osmosis;Diffusion]"
        );
        assert_eq!(
            out.concepts.get("Diffusion").unwrap(),
            "Diffusion from [Osmosis;Diffusion]"
        );
    }

    #[tokio::test]
    async fn test_later_chunks_see_known_names() {
        let backend = ScriptedBackend::new().with_responder(fake_model);
        let synth = ConceptSynthesizer::new(inference_with(&backend));

        synth.synthesize(&chunks(&["Alpha", "Beta"])).await.unwrap();

        let extract_prompts: Vec<String> = backend
            .calls()
            .into_iter()
            .map(|c| c.prompt)
            .filter(|p| p.starts_with("Identify"))
            .collect();
        assert_eq!(extract_prompts.len(), 2);
        assert!(extract_prompts[0].contains("(none yet)"));
        assert!(extract_prompts[1].contains("- Alpha"));
    }

    #[tokio::test]
    async fn test_duplicate_names_in_one_chunk_serialize() {
        let backend = ScriptedBackend::new().with_responder(fake_model);
        let synth = ConceptSynthesizer::new(inference_with(&backend));

        let out = synth.synthesize(&chunks(&["Alpha;Alpha"])).await.unwrap();

        assert_eq!(out.concepts.len(), 1);
        assert_eq!(
            out.concepts.get("Alpha").unwrap(),
            "Alpha from [Alpha;Alpha]\nmore Alpha from [Alpha;Alpha]"
        );
    }

    #[tokio::test]
    async fn test_synthesis_is_deterministic() {
        let input = chunks(&["Alpha;Beta", "Gamma;Alpha", "Beta;Beta;Delta"]);

        let mut runs = Vec::new();
        for latency in [0, 5] {
            let backend = ScriptedBackend::new()
                .with_responder(fake_model)
                .with_latency_ms(latency);
            let synth = ConceptSynthesizer::new(inference_with(&backend));
            runs.push(synth.synthesize(&input).await.unwrap().concepts);
        }

        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[0].names(), vec!["Alpha", "Beta", "Gamma", "Delta"]);
    }

    #[tokio::test]
    async fn test_unit_failure_keeps_siblings() {
        let backend = ScriptedBackend::new().with_responder(|prompt: &str| {
            if prompt.contains("concept \"Broken\"") {
                Ok("no fence here".to_string())
            } else {
                fake_model(prompt)
            }
        });
        let synth = ConceptSynthesizer::new(inference_with(&backend));

        let out = synth.synthesize(&chunks(&["Broken;Fine"])).await.unwrap();

        assert_eq!(out.concepts.names(), vec!["Fine"]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].name, "Broken");
        assert_eq!(out.failures[0].chunk_index, 0);
        assert!(matches!(out.failures[0].error, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_append_leaves_content_unchanged() {
        let backend = ScriptedBackend::new().with_responder(|prompt: &str| {
            if prompt.starts_with("The concept") {
                Err(Error::Inference("backend down".into()))
            } else {
                fake_model(prompt)
            }
        });
        let synth = ConceptSynthesizer::new(inference_with(&backend));

        let out = synth.synthesize(&chunks(&["Alpha", "Alpha"])).await.unwrap();

        assert_eq!(out.concepts.get("Alpha").unwrap(), "Alpha from [Alpha]");
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].chunk_index, 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_aborts_pass() {
        let backend = ScriptedBackend::new().with_responder(|prompt: &str| {
            if prompt.starts_with("Identify") {
                Ok("```yaml\nnot_concepts: 1\n```".to_string())
            } else {
                fake_model(prompt)
            }
        });
        let synth = ConceptSynthesizer::new(inference_with(&backend));

        let err = synth.synthesize(&chunks(&["Alpha"])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
