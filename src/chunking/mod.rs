//! Token-window chunking for long transcripts.
//!
//! Text is split into fixed-size, overlapping token windows. Boundaries are
//! token-aligned, so a chunk may start or end in the middle of a word.

use crate::error::{Result, TldwError};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A window of a transcript, decoded back to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position of this chunk in the transcript.
    pub order: usize,
    /// Token range covered by this chunk.
    pub start_token: usize,
    pub end_token: usize,
    /// Decoded text of the window.
    pub content: String,
}

impl TextChunk {
    /// Number of tokens in this chunk.
    pub fn token_count(&self) -> usize {
        self.end_token - self.start_token
    }
}

/// Splits text into overlapping token windows.
#[derive(Debug, Clone, Copy)]
pub struct TokenChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TokenChunker {
    /// Create a chunker. The overlap must be smaller than the chunk size,
    /// otherwise the windows could never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate_window(chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Token windows for a sequence of `n` tokens.
    pub fn windows(&self, n: usize) -> Vec<Range<usize>> {
        let mut windows = Vec::new();
        let mut start = 0;

        while start < n {
            let end = (start + self.chunk_size).min(n);
            windows.push(start..end);
            if end == n {
                break;
            }
            start = end.saturating_sub(self.overlap);
        }

        windows
    }

    /// Split text into chunks, preserving source order.
    pub fn chunk(&self, text: &str, tokenizer: &dyn Tokenizer) -> Vec<TextChunk> {
        let tokens = tokenizer.encode(text);

        self.windows(tokens.len())
            .into_iter()
            .enumerate()
            .map(|(order, range)| TextChunk {
                order,
                start_token: range.start,
                end_token: range.end,
                content: tokenizer.decode(&tokens[range]),
            })
            .collect()
    }

    /// Expected number of windows for `n` tokens: `ceil((n - o) / (c - o))`.
    pub fn expected_chunks(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        if n <= self.chunk_size {
            return 1;
        }
        let step = self.chunk_size - self.overlap;
        (n - self.overlap).div_ceil(step)
    }
}

/// Check that a chunk size and overlap can make progress.
pub fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(TldwError::Config(
            "chunk_size_tokens must be greater than 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(TldwError::Config(format!(
            "chunk_overlap_tokens ({}) must be smaller than chunk_size_tokens ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Split text into chunk strings.
pub fn chunk_by_tokens(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<String>> {
    let chunker = TokenChunker::new(chunk_size, overlap)?;
    Ok(chunker
        .chunk(text, tokenizer)
        .into_iter()
        .map(|c| c.content)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::testing::WhitespaceTokenizer;
    use crate::tokenizer::{fallback_tokenizer, ByteTokenizer};

    #[test]
    fn test_chunk_by_tokens_with_overlap() {
        let tokenizer = WhitespaceTokenizer::default();
        let chunks = chunk_by_tokens("a b c d e", 2, 1, &tokenizer).unwrap();
        assert_eq!(chunks, vec!["a b", "b c", "c d", "d e"]);
    }

    #[test]
    fn test_single_chunk_when_text_fits() {
        let tokenizer = WhitespaceTokenizer::default();
        let chunks = chunk_by_tokens("one two", 10, 0, &tokenizer).unwrap();
        assert_eq!(chunks, vec!["one two"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let tokenizer = WhitespaceTokenizer::default();
        assert!(chunk_by_tokens("", 4, 1, &tokenizer).unwrap().is_empty());
        assert!(chunk_by_tokens("   \n ", 4, 1, &tokenizer).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TokenChunker::new(4, 4).is_err());
        assert!(TokenChunker::new(4, 9).is_err());
        assert!(TokenChunker::new(0, 0).is_err());
        assert!(TokenChunker::new(4, 3).is_ok());
    }

    #[test]
    fn test_windows_cover_range_with_exact_overlap() {
        for (c, o) in [(1, 0), (2, 1), (5, 2), (7, 0), (10, 9)] {
            let chunker = TokenChunker::new(c, o).unwrap();
            for n in 0..60 {
                let windows = chunker.windows(n);
                assert_eq!(windows.len(), chunker.expected_chunks(n), "n={n} c={c} o={o}");
                if n == 0 {
                    continue;
                }

                assert_eq!(windows.first().unwrap().start, 0);
                assert_eq!(windows.last().unwrap().end, n);
                for pair in windows.windows(2) {
                    assert!(pair[1].start > pair[0].start);
                    assert_eq!(pair[0].len(), c);
                    assert_eq!(pair[0].end - pair[1].start, o);
                }
            }
        }
    }

    #[test]
    fn test_rechunking_decoded_text_is_stable() {
        let tokenizer = ByteTokenizer;
        let chunker = TokenChunker::new(16, 4).unwrap();
        let text = "Tokens in, tokens out. The boundaries should not move.";
        let round_tripped = tokenizer.decode(&tokenizer.encode(text));

        let first: Vec<_> = chunker.chunk(text, &tokenizer);
        let second: Vec<_> = chunker.chunk(&round_tripped, &tokenizer);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rechunking_with_default_tokenizer_is_stable() {
        let tokenizer = fallback_tokenizer();
        let chunker = TokenChunker::new(8, 3).unwrap();
        let text = "Ownership moves values between bindings. Borrowing lends them out \
                    without moving, and lifetimes describe how long a borrow may live.";
        let round_tripped = tokenizer.decode(&tokenizer.encode(text));
        assert_eq!(round_tripped, text);

        let first = chunker.chunk(text, tokenizer.as_ref());
        let second = chunker.chunk(&round_tripped, tokenizer.as_ref());
        assert!(first.len() > 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunks_with_bpe_tokenizer_keep_order() {
        let tokenizer = fallback_tokenizer();
        let chunker = TokenChunker::new(8, 2).unwrap();
        let text = "Alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima mike.";
        let chunks = chunker.chunk(text, tokenizer.as_ref());

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.order, i);
            assert!(chunk.token_count() <= 8);
        }
        assert!(chunks[0].content.starts_with("Alpha"));
        assert!(chunks.last().unwrap().content.ends_with("mike."));
    }
}
