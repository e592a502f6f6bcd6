//! Note processing: claim, chunk, synthesize, persist.

use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use recall_core::{
    new_v7, CardLifecycle, Concept, ConceptWithCard, Note, ProcessingReport, Result, TextChunker,
};

use crate::store::StudyStore;
use crate::synthesis::{ConceptSynthesizer, SynthesisOutcome};

/// Turns a pending note into concepts with fresh cards.
///
/// At most one run per note: the claim is a compare-and-set on the note
/// status, and every failure after the claim returns the note to `pending`.
/// Concepts are only written together with the final status transition, so
/// a failed run leaves none behind.
#[derive(Clone)]
pub struct NoteProcessor {
    store: StudyStore,
    synthesizer: ConceptSynthesizer,
    chunker: TextChunker,
    lifecycle: CardLifecycle,
}

impl NoteProcessor {
    pub fn new(
        store: StudyStore,
        synthesizer: ConceptSynthesizer,
        chunker: TextChunker,
        lifecycle: CardLifecycle,
    ) -> Self {
        Self {
            store,
            synthesizer,
            chunker,
            lifecycle,
        }
    }

    #[instrument(skip(self), fields(subsystem = "study", component = "processing", op = "process_note"))]
    pub async fn process_note(&self, note_id: Uuid) -> Result<ProcessingReport> {
        let start = Instant::now();
        let note = self.store.notes.claim_for_processing(note_id).await?;

        match self.run(&note).await {
            Ok(report) => {
                info!(
                    concept_count = report.concept_count,
                    chunk_count = report.chunk_count,
                    failed_units = report.failed_units,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Note processed"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(release) = self.store.notes.release_processing(note_id).await {
                    error!(error = %release, "Failed to return note to pending");
                }
                error!(
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Note processing failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, note: &Note) -> Result<ProcessingReport> {
        let chunks = self.chunker.chunk(&note.content);
        let SynthesisOutcome {
            concepts,
            mut failures,
            chunk_count,
        } = self.synthesizer.synthesize(&chunks).await?;

        if concepts.is_empty() && !failures.is_empty() {
            return Err(failures.swap_remove(0).error);
        }

        let now = Utc::now();
        let items: Vec<ConceptWithCard> = concepts
            .into_entries()
            .into_iter()
            .enumerate()
            .map(|(position, (name, content))| {
                let concept = Concept {
                    id: new_v7(),
                    note_id: note.id,
                    name,
                    content,
                    position: position as i32,
                    created_at_utc: now,
                };
                let card = self.lifecycle.create(concept.id, now);
                ConceptWithCard { concept, card }
            })
            .collect();

        self.store.notes.complete_processing(note.id, &items).await?;

        Ok(ProcessingReport {
            note_id: note.id,
            concept_count: items.len(),
            chunk_count,
            failed_units: failures.len(),
        })
    }
}
