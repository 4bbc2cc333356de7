//! Splitting and re-chunking of UTF-16 text.

use super::chunk_buffer::{ChunkBuffer, CR, LF};

/// Preferred size of one buffer, in UTF-16 code units
pub const AVERAGE_BUFFER_SIZE: usize = 65535;

#[inline]
pub(crate) fn is_high_surrogate(ch: u16) -> bool {
    (0xD800..=0xDBFF).contains(&ch)
}

/// Split `text` into chunks of at most `chunk_size` units.
///
/// A chunk never ends between a CR and its LF or inside a surrogate pair; the
/// boundary moves one unit earlier instead.
pub fn split_text(text: &[u16], chunk_size: usize) -> Vec<&[u16]> {
    let chunk_size = chunk_size.max(2);
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > chunk_size {
        let last = rest[chunk_size - 1];
        let cut = if last == CR || is_high_surrogate(last) {
            chunk_size - 1
        } else {
            chunk_size
        };
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Replace every CRLF, CR and LF in `text` with `eol`
pub fn replace_line_endings(text: &[u16], eol: &[u16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            CR => {
                out.extend_from_slice(eol);
                if text.get(i + 1) == Some(&LF) {
                    i += 1;
                }
            }
            LF => out.extend_from_slice(eol),
            ch => out.push(ch),
        }
        i += 1;
    }
    out
}

/// Streaming re-chunker used by EOL normalization.
///
/// Text is accumulated until a chunk holds more than `min` units and adding the
/// next fragment would reach `max`; then the chunk is flushed with its line
/// endings replaced. A trailing CR or high surrogate is carried over to the next
/// chunk so pairs stay together.
#[derive(Debug)]
pub struct ChunkNormalizer {
    eol: Vec<u16>,
    min: usize,
    max: usize,
    pending: Vec<u16>,
    chunks: Vec<ChunkBuffer>,
}

impl ChunkNormalizer {
    pub fn new(eol: &str, average_size: usize) -> Self {
        let min = average_size - average_size / 3;
        ChunkNormalizer {
            eol: eol.encode_utf16().collect(),
            min,
            max: min * 2,
            pending: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn push(&mut self, fragment: &[u16]) {
        if self.pending.len() <= self.min || self.pending.len() + fragment.len() < self.max {
            self.pending.extend_from_slice(fragment);
            return;
        }
        self.flush_pending();
        self.pending.extend_from_slice(fragment);
    }

    fn flush_pending(&mut self) {
        let mut text = std::mem::take(&mut self.pending);
        let carry = match text.last() {
            Some(&last) if last == CR || is_high_surrogate(last) => text.pop(),
            _ => None,
        };
        if !text.is_empty() {
            self.chunks
                .push(ChunkBuffer::from_utf16(replace_line_endings(&text, &self.eol)));
        }
        if let Some(ch) = carry {
            self.pending.push(ch);
        }
    }

    pub fn finish(mut self) -> Vec<ChunkBuffer> {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.chunks
                .push(ChunkBuffer::from_utf16(replace_line_endings(&text, &self.eol)));
        }
        self.chunks
    }
}

/// Re-chunk `fragments` and replace all line endings with `eol`
pub fn normalize_chunks<'a>(
    fragments: impl IntoIterator<Item = &'a [u16]>,
    eol: &str,
    average_size: usize,
) -> Vec<ChunkBuffer> {
    let mut normalizer = ChunkNormalizer::new(eol, average_size);
    for fragment in fragments {
        normalizer.push(fragment);
    }
    normalizer.finish()
}
