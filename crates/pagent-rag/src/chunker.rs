//! Character-based text chunking with newline-preferring boundaries

use std::borrow::Cow;

use pagent_core::{Error, Result};

/// A chunk together with its byte span in the normalized, trimmed source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Splits text into bounded, overlapping chunks.
///
/// Sizes are counted in characters. `\r\n` line endings are read as `\n`. A
/// chunk boundary is placed at the last newline that fits in the window, else
/// at the last space, else the window is cut hard, so no chunk is longer than
/// `chunk_size`. Chunks never begin or end with a separator. Consecutive
/// chunks share at least `chunk_overlap` characters, unless only separators lie
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into chunk strings
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text).into_iter().map(|span| span.text).collect()
    }

    /// Split text, keeping each chunk's byte span in the normalized text
    /// (see [`normalize_newlines`]), trimmed
    pub fn split_spans(&self, text: &str) -> Vec<ChunkSpan> {
        let normalized = normalize_newlines(text);
        let text = normalized.trim();
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();

        let mut spans: Vec<ChunkSpan> = Vec::new();
        let mut start = 0;
        // Char index just past the last kept chunk.
        let mut kept_end = 0;

        while start < n {
            let window_end = (start + self.chunk_size).min(n);
            let end = if window_end == n {
                n
            } else {
                let min_end = (start + self.chunk_overlap + 1).max(kept_end + 1);
                find_break(&chars, min_end, window_end)
            };

            let mut content_end = end;
            while content_end > start && is_separator(chars[content_end - 1]) {
                content_end -= 1;
            }

            if !spans.is_empty() && content_end <= kept_end {
                // Nothing but separators follows the previous chunk in this window.
                start = skip_separators(&chars, end);
                continue;
            }

            spans.push(ChunkSpan {
                text: text[offsets[start]..offsets[content_end]].to_string(),
                start: offsets[start],
                end: offsets[content_end],
            });
            kept_end = content_end;

            if end >= n {
                break;
            }
            start = self.next_start(&chars, start, content_end, end);
        }

        spans
    }

    /// Start of the chunk after `[start, content_end)`, whose window ended at `end`
    fn next_start(&self, chars: &[char], start: usize, content_end: usize, end: usize) -> usize {
        if self.chunk_overlap > 0 && content_end > start + self.chunk_overlap {
            let mut next = content_end - self.chunk_overlap;
            // Step back onto content so the shared part only grows.
            while next > start + 1 && is_separator(chars[next]) {
                next -= 1;
            }
            if !is_separator(chars[next]) {
                return next;
            }
        }
        skip_separators(chars, end)
    }
}

/// Rewrite `\r\n` line endings as `\n`
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Pick a chunk end in `min_end..=window_end`: the last newline, else the last
/// space, else `window_end`. A separator at `window_end` itself ends the chunk
/// exactly at the limit.
fn find_break(chars: &[char], min_end: usize, window_end: usize) -> usize {
    for separator in ['\n', ' '] {
        if let Some(pos) = (min_end..=window_end).rev().find(|&i| chars[i] == separator) {
            return pos;
        }
    }
    window_end
}

fn skip_separators(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && is_separator(chars[pos]) {
        pos += 1;
    }
    pos
}

fn is_separator(c: char) -> bool {
    matches!(c, '\n' | ' ' | '\r' | '\t')
}
