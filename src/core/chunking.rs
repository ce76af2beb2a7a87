//! Token-bounded splitting of transcripts before the map step.

use crate::error::{Error, Result};
use another_tiktoken_rs::{CoreBPE, cl100k_base};
use std::sync::Arc;

const SEPARATORS: &[&str] = &["\n\n", "\n", " "];
const CONTEXT_STEP: usize = 1024;
const MAX_CONTEXT_STEPS: usize = 99;

pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;

    /// Hard split at token boundaries, for pieces no separator can break up.
    fn split_to_fit(&self, text: &str, max_tokens: usize) -> Result<Vec<String>>;
}

/// cl100k tokenizer, the encoding used by GPT-4.
#[derive(Clone)]
pub struct Tokenizer {
    bpe: Arc<CoreBPE>,
}

impl Tokenizer {
    pub fn cl100k() -> Result<Self> {
        let bpe = cl100k_base()
            .map_err(|e| Error::custom(format!("Failed to load cl100k tokenizer: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenCounter for Tokenizer {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn split_to_fit(&self, text: &str, max_tokens: usize) -> Result<Vec<String>> {
        let tokens = self.bpe.encode_with_special_tokens(text);
        tokens
            .chunks(max_tokens.max(1))
            .map(|window| {
                self.bpe
                    .decode(window.to_vec())
                    .map_err(|e| Error::custom(format!("Failed to decode tokens: {e}")))
            })
            .collect()
    }
}

/// Recursive splitter: tries paragraph, line, then word boundaries, and merges
/// the pieces back into chunks of at most `chunk_size` tokens.
pub struct TextSplitter<C> {
    counter: C,
    chunk_size: usize,
    overlap: usize,
}

impl<C: TokenCounter> TextSplitter<C> {
    pub fn new(counter: C, chunk_size: usize, overlap: usize) -> Self {
        Self {
            counter,
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Result<Vec<String>> {
        let position = separators.iter().position(|sep| text.contains(sep));
        let Some(position) = position else {
            return self.counter.split_to_fit(text, self.chunk_size);
        };
        let separator = separators[position];
        let finer = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut fitting: Vec<(&str, usize)> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            let len = self.counter.count(piece);
            if len < self.chunk_size {
                fitting.push((piece, len));
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.extend(self.counter.split_to_fit(piece, self.chunk_size)?);
            } else {
                chunks.extend(self.split_recursive(piece, finer)?);
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        Ok(chunks
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect())
    }

    fn merge(&self, pieces: &[(&str, usize)]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<(&str, usize)> = Vec::new();
        let mut total = 0;

        for &(piece, len) in pieces {
            if total + len > self.chunk_size && !current.is_empty() {
                chunks.push(join_pieces(&current));

                // Keep a tail of at most `overlap` tokens to seed the next chunk.
                while !current.is_empty()
                    && (total > self.overlap || total + len > self.chunk_size)
                {
                    total -= current.remove(0).1;
                }
            }
            current.push((piece, len));
            total += len;
        }

        if !current.is_empty() {
            chunks.push(join_pieces(&current));
        }

        chunks
    }
}

fn join_pieces(pieces: &[(&str, usize)]) -> String {
    pieces.iter().map(|(piece, _)| *piece).collect::<String>()
}

/// Splits on `separator`, keeping each separator at the start of the piece
/// that follows it so the pieces concatenate back to the input.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Smallest multiple of 1024 strictly greater than `tokens`.
pub fn context_window_for(tokens: usize) -> Result<usize> {
    (1..=MAX_CONTEXT_STEPS)
        .map(|step| step * CONTEXT_STEP)
        .find(|&ctx| ctx > tokens)
        .ok_or_else(|| {
            Error::custom(format!(
                "{tokens} tokens exceed the largest supported context window ({})",
                MAX_CONTEXT_STEPS * CONTEXT_STEP
            ))
        })
}
