//! Manuscript chunking.
//!
//! Splits a draft into bounded, sentence-safe segments so each reviewer
//! call sees a digestible excerpt. Paragraphs are packed greedily up to
//! the limit; a paragraph that is itself too long falls back to sentence
//! packing. A single sentence over the limit is a malformed manuscript,
//! never a truncation.

use thiserror::Error;

/// Errors from chunking a manuscript.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Manuscript text is empty")]
    EmptyInput,

    #[error("A single sentence of {chars} chars exceeds the chunk limit of {limit}")]
    OversizedSentence { chars: usize, limit: usize },
}

/// An ordered segment of the manuscript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the manuscript, starting at 0.
    pub index: usize,
    /// The segment text.
    pub text: String,
}

impl Chunk {
    /// Length of the segment in chars.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Separator inserted between paragraphs packed into one chunk.
const PARAGRAPH_SEP: &str = "\n\n";

/// Separator inserted between sentences packed into one chunk.
const SENTENCE_SEP: &str = " ";

/// Sentence-terminal punctuation. A terminator only ends a sentence when
/// followed by whitespace or end-of-text.
const TERMINALS: [char; 4] = ['.', '?', '!', '…'];

/// Split a manuscript into ordered chunks of at most `max_chars` chars.
///
/// Chunks shorter than `min_chars` are merged into their predecessor
/// when the combined length stays within `max_chars`; the final chunk
/// may remain short. All lengths are in chars, so the bounds hold for
/// Korean text the same as for ASCII.
pub fn chunk(text: &str, max_chars: usize, min_chars: usize) -> Result<Vec<Chunk>, ChunkError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChunkError::EmptyInput);
    }

    let mut packer = Packer::new(max_chars);

    for paragraph in split_paragraphs(trimmed) {
        let para_chars = paragraph.chars().count();

        if para_chars <= max_chars {
            packer.push(&paragraph, para_chars, PARAGRAPH_SEP);
            continue;
        }

        // Paragraph alone exceeds the limit: fall back to sentences.
        packer.flush();
        for sentence in split_sentences(&paragraph) {
            let sent_chars = sentence.chars().count();
            if sent_chars > max_chars {
                return Err(ChunkError::OversizedSentence {
                    chars: sent_chars,
                    limit: max_chars,
                });
            }
            packer.push(sentence, sent_chars, SENTENCE_SEP);
        }
        packer.flush();
    }

    let mut chunks = packer.finish();
    merge_short_chunks(&mut chunks, max_chars, min_chars);

    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.index = index;
    }

    Ok(chunks)
}

/// Greedy accumulation buffer. Separator chars count against the limit.
struct Packer {
    max_chars: usize,
    buffer: String,
    buffer_chars: usize,
    chunks: Vec<Chunk>,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            buffer: String::new(),
            buffer_chars: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str, piece_chars: usize, sep: &str) {
        if self.buffer.is_empty() {
            self.buffer.push_str(piece);
            self.buffer_chars = piece_chars;
            return;
        }

        let sep_chars = sep.chars().count();
        if self.buffer_chars + sep_chars + piece_chars <= self.max_chars {
            self.buffer.push_str(sep);
            self.buffer.push_str(piece);
            self.buffer_chars += sep_chars + piece_chars;
        } else {
            self.flush();
            self.buffer.push_str(piece);
            self.buffer_chars = piece_chars;
        }
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.chunks.push(Chunk {
                index: self.chunks.len(),
                text: std::mem::take(&mut self.buffer),
            });
            self.buffer_chars = 0;
        }
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.chunks
    }
}

/// Split on blank-line boundaries. Interior single newlines stay with
/// their paragraph.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

/// Split a paragraph into sentences. A boundary is a line break, or a
/// terminal mark (`. ? ! …`) immediately followed by whitespace or the
/// end of the paragraph.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        let boundary = if c == '\n' {
            true
        } else if TERMINALS.contains(&c) {
            match chars.peek() {
                Some(&(_, next)) => next.is_whitespace(),
                None => true,
            }
        } else {
            false
        };

        if boundary {
            let end = if c == '\n' { pos } else { pos + c.len_utf8() };
            let sentence = paragraph[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Merge chunks shorter than `min_chars` into their predecessor when the
/// combined length stays within `max_chars`.
fn merge_short_chunks(chunks: &mut Vec<Chunk>, max_chars: usize, min_chars: usize) {
    let sep_chars = PARAGRAPH_SEP.chars().count();
    let mut i = 1;

    while i < chunks.len() {
        let len = chunks[i].char_len();
        let prev_len = chunks[i - 1].char_len();

        if len < min_chars && prev_len + sep_chars + len <= max_chars {
            let short = chunks.remove(i);
            let prev = &mut chunks[i - 1];
            prev.text.push_str(PARAGRAPH_SEP);
            prev.text.push_str(&short.text);
        } else {
            i += 1;
        }
    }
}
