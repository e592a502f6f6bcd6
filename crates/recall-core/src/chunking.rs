//! Token-budget chunking of note text for concept synthesis.
//!
//! Paragraphs (blank-line separated) are packed greedily into chunks up to
//! the token budget. A paragraph that alone exceeds the budget is split on
//! word boundaries. Chunk order follows the text, which synthesis relies on.

use std::sync::Arc;

use crate::defaults;
use crate::tokenizer::Tokenizer;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Splits text into ordered chunks no larger than a token budget.
#[derive(Clone)]
pub struct TextChunker {
    max_tokens: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for TextChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextChunker")
            .field("max_tokens", &self.max_tokens)
            .field("tokenizer", &self.tokenizer.name())
            .finish()
    }
}

impl TextChunker {
    pub fn new(max_tokens: usize, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
            tokenizer,
        }
    }

    pub fn with_default_budget(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self::new(defaults::CHUNK_TOKENS, tokenizer)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split `text` into chunks. Whitespace-only input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;

        for paragraph in split_paragraphs(text) {
            let tokens = self.tokenizer.count_tokens(paragraph);

            if tokens > self.max_tokens {
                flush(&mut chunks, &mut current, &mut current_tokens);
                chunks.extend(self.split_words(paragraph));
                continue;
            }

            let sep_tokens = if current.is_empty() {
                0
            } else {
                self.tokenizer.count_tokens(PARAGRAPH_SEPARATOR)
            };
            if current_tokens + sep_tokens + tokens > self.max_tokens {
                flush(&mut chunks, &mut current, &mut current_tokens);
            }
            if !current.is_empty() {
                current.push_str(PARAGRAPH_SEPARATOR);
                current_tokens += sep_tokens;
            }
            current.push_str(paragraph);
            current_tokens += tokens;
        }
        flush(&mut chunks, &mut current, &mut current_tokens);

        tracing::trace!(
            subsystem = "study",
            component = "chunking",
            chunk_count = chunks.len(),
            max_tokens = self.max_tokens,
            "Split text into chunks"
        );
        chunks
    }

    fn split_words(&self, paragraph: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;

        for word in paragraph.split_whitespace() {
            let tokens = if current.is_empty() {
                self.tokenizer.count_tokens(word)
            } else {
                self.tokenizer.count_tokens(&format!(" {}", word))
            };
            if !current.is_empty() && current_tokens + tokens > self.max_tokens {
                flush(&mut pieces, &mut current, &mut current_tokens);
                current.push_str(word);
                current_tokens = self.tokenizer.count_tokens(word);
                continue;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_tokens += tokens;
        }
        flush(&mut pieces, &mut current, &mut current_tokens);
        pieces
    }
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                paragraphs.push(text[s..end].trim());
            }
        } else {
            start.get_or_insert(line_start);
            end = offset;
        }
    }
    if let Some(s) = start {
        paragraphs.push(text[s..end].trim());
    }
    paragraphs
}

fn flush(out: &mut Vec<String>, current: &mut String, tokens: &mut usize) {
    if !current.is_empty() {
        out.push(std::mem::take(current));
    }
    *tokens = 0;
}
