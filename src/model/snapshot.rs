use std::sync::Arc;

use super::chunk_buffer::ChunkBuffer;
use super::chunk_utils::is_high_surrogate;
use super::node::Piece;

/// Frozen view of a document, read one piece at a time.
///
/// Holds the piece list and shared handles to the buffers it references, so
/// later edits to the model do not affect it. The BOM, if any, is prepended to
/// the first chunk; an empty document yields the BOM once.
#[derive(Debug, Clone)]
pub struct PieceTreeSnapshot {
    pieces: Vec<Piece>,
    buffers: Vec<Arc<ChunkBuffer>>,
    bom: String,
    index: usize,
    /// High surrogate held back from the previous chunk
    pending: Option<u16>,
}

impl PieceTreeSnapshot {
    pub(crate) fn new(pieces: Vec<Piece>, buffers: Vec<Arc<ChunkBuffer>>, bom: String) -> Self {
        PieceTreeSnapshot {
            pieces,
            buffers,
            bom,
            index: 0,
            pending: None,
        }
    }

    /// Read the remainder as one string
    pub fn read_all(self) -> String {
        self.collect()
    }
}

impl Iterator for PieceTreeSnapshot {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.pieces.is_empty() {
            if self.index == 0 {
                self.index = 1;
                return Some(self.bom.clone());
            }
            return None;
        }
        if self.index >= self.pieces.len() {
            return self
                .pending
                .take()
                .map(|unit| String::from_utf16_lossy(&[unit]));
        }

        let piece = self.pieces[self.index];
        let content = self.buffers[piece.buffer_index].slice(piece.start, piece.end);
        let mut units: Vec<u16> = self.pending.take().into_iter().collect();
        units.extend_from_slice(content);
        if self.index + 1 < self.pieces.len() && units.last().copied().is_some_and(is_high_surrogate) {
            self.pending = units.pop();
        }

        let mut chunk = String::new();
        if self.index == 0 {
            chunk.push_str(&self.bom);
        }
        chunk.push_str(&String::from_utf16_lossy(&units));
        self.index += 1;
        Some(chunk)
    }
}
