//! Sentence-boundary document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SentenceChunker`], which
//! greedily packs whole sentences into chunks of a bounded character count.

use std::sync::LazyLock;

use regex::Regex;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// A sentence: a run of non-terminal characters closed by `.`, `!` or `?`.
static SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^.!?]+[.!?]+").expect("unreachable error: invalid sentence pattern")
});

/// A strategy for splitting raw text into ordered segments.
///
/// Implementations never fail: empty input yields an empty `Vec`. The output
/// order matches the input order, which the ingestion pipeline records as
/// `chunk_index` provenance.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Packs sentences into chunks of at most `max_chunk_size` characters.
///
/// The bound is advisory: a single sentence longer than the bound is emitted
/// whole rather than split mid-sentence. Sentences inside a chunk are joined
/// with a single space.
///
/// # Example
///
/// ```rust
/// use leadbot_rag::chunking::{Chunker, SentenceChunker};
///
/// let chunker = SentenceChunker::new(30);
/// let chunks = chunker.chunk("Escaneado 3D de precisión. Modelado BIM avanzado.");
/// assert_eq!(chunks, vec!["Escaneado 3D de precisión.", "Modelado BIM avanzado."]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceChunker {
    max_chunk_size: usize,
}

impl SentenceChunker {
    /// Create a chunker with the given maximum chunk size in characters.
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// Return the configured maximum chunk size.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_chunk_size)
    }
}

/// Split `text` into sentence-aligned chunks of at most `max_chunk_size` characters.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence_len = sentence.chars().count();

        if current.is_empty() {
            current.push_str(sentence);
            current_len = sentence_len;
        } else if current_len + 1 + sentence_len > max_chunk_size {
            chunks.push(std::mem::replace(&mut current, sentence.to_string()));
            current_len = sentence_len;
        } else {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + sentence_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split text into sentence-like units, keeping any unterminated tail.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut end = 0;

    for found in SENTENCE.find_iter(text) {
        sentences.push(found.as_str());
        end = found.end();
    }

    let rest = &text[end..];
    if !rest.trim().is_empty() {
        sentences.push(rest);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_input_yield_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("   \n\t ", 100).is_empty());
    }

    #[test]
    fn text_without_terminal_punctuation_is_one_sentence() {
        assert_eq!(chunk_text("  no punctuation here  ", 100), vec!["no punctuation here"]);
    }

    #[test]
    fn splits_on_sentence_boundaries_when_bound_is_exceeded() {
        let chunks = chunk_text("Escaneado 3D de precisión. Modelado BIM avanzado.", 30);
        assert_eq!(chunks, vec!["Escaneado 3D de precisión.", "Modelado BIM avanzado."]);
    }

    #[test]
    fn packs_short_sentences_together() {
        let chunks = chunk_text("One. Two! Three? Four.", 12);
        assert_eq!(chunks, vec!["One. Two!", "Three? Four."]);
    }

    #[test]
    fn oversized_sentence_is_emitted_whole() {
        let long = "This sentence is clearly much longer than the limit.";
        let chunks = chunk_text(&format!("Hi. {long} Bye."), 10);
        assert_eq!(chunks, vec!["Hi.", long, "Bye."]);
    }

    #[test]
    fn keeps_unterminated_tail() {
        let chunks = chunk_text("First sentence. trailing words", 1000);
        assert_eq!(chunks, vec!["First sentence. trailing words"]);
    }

    #[test]
    fn measures_characters_not_bytes() {
        // 10 two-byte characters plus the period: 11 characters, 21 bytes.
        let sentence = "áááááááááá.";
        assert_eq!(chunk_text(&format!("{sentence} {sentence}"), 23).len(), 1);
        assert_eq!(chunk_text(&format!("{sentence} {sentence}"), 22).len(), 2);
    }

    #[test]
    fn repeated_terminal_punctuation_stays_with_its_sentence() {
        assert_eq!(chunk_text("Really?! Yes...", 8), vec!["Really?!", "Yes..."]);
    }
}
