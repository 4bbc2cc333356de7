//! Insert, delete and EOL normalization for [`PieceTreeModel`].
//!
//! When CRLF checking is on (anything but a normalized LF document), no piece
//! may start with `\n` while the piece before it ends with `\r`. Every step that
//! creates a new piece boundary re-validates that boundary and joins a split
//! pair into a fresh `\r\n` piece.

use std::sync::Arc;

use super::chunk_buffer::{to_utf16, BufferCursor, ChunkBuffer, CR, LF};
use super::chunk_utils::{is_high_surrogate, ChunkNormalizer};
use super::node::{NodeIndex, Piece, SENTINEL};
use super::piece_tree::{PieceTreeModel, CHANGE_BUFFER_ID};
use super::tracer::TraceEvent;

impl PieceTreeModel {
    /// Insert `value` at `offset`.
    ///
    /// Panics if `offset` is past the end of the document.
    pub fn insert(&mut self, offset: usize, value: &str) {
        let total = self.total_length();
        assert!(
            offset <= total,
            "insert offset {offset} out of range (document length {total})"
        );
        *self.last_visited_line.get_mut() = None;
        if value.is_empty() {
            return;
        }
        let value = to_utf16(value);
        tracing::debug!(offset, len = value.len(), "insert");
        self.trace(|| TraceEvent::Insert {
            offset,
            length: value.len(),
        });

        self.search_cache
            .get_mut()
            .invalidate_from_offset(&self.arena, offset.saturating_sub(1));
        self.update_eol_normalized(&value);

        if self.arena.root == SENTINEL {
            let pieces = self.create_new_pieces(&value);
            let mut node = self.arena.rb_insert_left(SENTINEL, pieces[0]);
            for piece in &pieces[1..] {
                node = self.arena.rb_insert_right(node, *piece);
            }
            self.compute_buffer_metadata();
            return;
        }

        let (node, remainder, node_start_offset) = match self.node_at(offset) {
            Some(pos) => (pos.node, pos.remainder, pos.node_start_offset),
            None => {
                let last = self.arena.last();
                (last, self.arena.piece(last).length, self.arena.offset_of_node(last))
            }
        };

        if self.try_append_to_change_buffer_node(node, &value, node_start_offset, offset) {
            self.compute_buffer_metadata();
            return;
        }

        let piece = *self.arena.piece(node);
        if node_start_offset == offset {
            let prev = self.arena.prev(node);
            if prev != SENTINEL {
                let prev_start = node_start_offset - self.arena.piece(prev).length;
                if self.try_append_to_change_buffer_node(prev, &value, prev_start, offset) {
                    self.compute_buffer_metadata();
                    return;
                }
            }
            self.insert_content_to_node_left(value, node);
        } else if node_start_offset + piece.length > offset {
            self.insert_into_middle(value, node, remainder);
        } else {
            self.insert_content_to_node_right(value, node);
        }
        self.compute_buffer_metadata();
    }

    /// Inserted text can only keep the document normalized if it uses the document's EOL alone
    fn update_eol_normalized(&mut self, value: &[u16]) {
        if !self.eol_normalized {
            return;
        }
        if self.eol == "\n" {
            if value.contains(&CR) {
                self.eol_normalized = false;
            }
            return;
        }
        let mut i = 0;
        while i < value.len() {
            match value[i] {
                CR if value.get(i + 1) == Some(&LF) => i += 1,
                CR | LF => {
                    self.eol_normalized = false;
                    return;
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// Widen a change-buffer piece in place when it ends at the write cursor and at `offset`
    fn try_append_to_change_buffer_node(
        &mut self,
        node: NodeIndex,
        value: &[u16],
        node_start_offset: usize,
        offset: usize,
    ) -> bool {
        let piece = *self.arena.piece(node);
        if piece.buffer_index != CHANGE_BUFFER_ID
            || piece.end != self.last_change_buffer_pos
            || node_start_offset + piece.length != offset
            || piece.length + value.len() > self.chunk_size
        {
            return false;
        }
        self.trace(|| TraceEvent::AppendFastPath {
            offset,
            length: value.len(),
        });
        self.append_to_node(node, value.to_vec());
        true
    }

    fn append_to_node(&mut self, node: NodeIndex, mut value: Vec<u16>) {
        if self.adjust_carriage_return_from_next(&value, node) {
            value.push(LF);
        }
        let change_buffer = Arc::make_mut(&mut self.buffers[CHANGE_BUFFER_ID]);
        change_buffer.append(&value);
        let new_end = change_buffer.end_cursor();

        let piece = *self.arena.piece(node);
        let line_feed_count = self.get_line_feed_cnt(CHANGE_BUFFER_ID, piece.start, new_end);
        self.last_change_buffer_pos = new_end;
        self.arena.update_node(
            node,
            Piece::new(
                piece.buffer_index,
                piece.start,
                new_end,
                line_feed_count,
                piece.length + value.len(),
            ),
        );
    }

    /// Split `node` at `remainder` and put the new text in between
    fn insert_into_middle(&mut self, mut value: Vec<u16>, node: NodeIndex, remainder: usize) {
        let piece = *self.arena.piece(node);
        let buffer_index = piece.buffer_index;
        let insert_pos = self.position_in_buffer(node, remainder);
        let mut nodes_to_delete = Vec::new();

        let mut right_start = insert_pos;
        if self.should_check_crlf()
            && value.last() == Some(&CR)
            && self.node_char_code_at(node, remainder) == Some(LF)
        {
            // the LF after the split point joins the inserted CR
            right_start = self.buffers[buffer_index].cursor_at(self.offset_in_buffer(buffer_index, insert_pos) + 1);
            value.push(LF);
        }
        let right_length =
            self.offset_in_buffer(buffer_index, piece.end) - self.offset_in_buffer(buffer_index, right_start);
        let new_right_piece = Piece::new(
            buffer_index,
            right_start,
            piece.end,
            self.get_line_feed_cnt(buffer_index, right_start, piece.end),
            right_length,
        );

        if self.should_check_crlf()
            && value.first() == Some(&LF)
            && remainder > 0
            && self.node_char_code_at(node, remainder - 1) == Some(CR)
        {
            // the CR before the split point joins the inserted LF
            let previous_pos = self.position_in_buffer(node, remainder - 1);
            self.delete_node_tail(node, previous_pos);
            value.insert(0, CR);
            if self.arena.piece(node).length == 0 {
                nodes_to_delete.push(node);
            }
        } else {
            self.delete_node_tail(node, insert_pos);
        }

        let new_pieces = self.create_new_pieces(&value);
        if new_right_piece.length > 0 {
            self.arena.rb_insert_right(node, new_right_piece);
        }
        let mut tmp = node;
        for piece in new_pieces {
            tmp = self.arena.rb_insert_right(tmp, piece);
        }
        self.delete_nodes(nodes_to_delete);
    }

    fn insert_content_to_node_left(&mut self, mut value: Vec<u16>, node: NodeIndex) {
        let mut nodes_to_delete = Vec::new();
        if self.should_check_crlf() && value.last() == Some(&CR) && self.start_with_lf(node) {
            // move the node's leading LF into the new text
            let piece = *self.arena.piece(node);
            let buffer = &self.buffers[piece.buffer_index];
            let new_start = buffer.cursor_at(buffer.offset_of(piece.start) + 1);
            let line_feed_count = self.get_line_feed_cnt(piece.buffer_index, new_start, piece.end);
            self.arena.update_node(
                node,
                Piece::new(
                    piece.buffer_index,
                    new_start,
                    piece.end,
                    line_feed_count,
                    piece.length - 1,
                ),
            );
            value.push(LF);
            if piece.length == 1 {
                nodes_to_delete.push(node);
            }
        }

        let new_pieces = self.create_new_pieces(&value);
        let mut new_node = node;
        for piece in new_pieces.into_iter().rev() {
            new_node = self.arena.rb_insert_left(new_node, piece);
        }
        self.validate_crlf_with_prev_node(new_node);
        self.delete_nodes(nodes_to_delete);
    }

    fn insert_content_to_node_right(&mut self, mut value: Vec<u16>, node: NodeIndex) {
        if self.adjust_carriage_return_from_next(&value, node) {
            value.push(LF);
        }
        let new_pieces = self.create_new_pieces(&value);
        let new_node = self.arena.rb_insert_right(node, new_pieces[0]);
        let mut tmp = new_node;
        for piece in &new_pieces[1..] {
            tmp = self.arena.rb_insert_right(tmp, *piece);
        }
        self.validate_crlf_with_prev_node(new_node);
    }

    /// If `value` ends with CR and the next node starts with LF, take that LF away
    /// from the next node. Returns whether the caller must append the LF.
    fn adjust_carriage_return_from_next(&mut self, value: &[u16], node: NodeIndex) -> bool {
        if !(self.should_check_crlf() && value.last() == Some(&CR)) {
            return false;
        }
        let next = self.arena.next(node);
        if !self.start_with_lf(next) {
            return false;
        }
        let piece = *self.arena.piece(next);
        if piece.length == 1 {
            self.search_cache.get_mut().forget(next);
            self.arena.rb_delete(next);
        } else {
            let buffer = &self.buffers[piece.buffer_index];
            let new_start = buffer.cursor_at(buffer.offset_of(piece.start) + 1);
            let line_feed_count = self.get_line_feed_cnt(piece.buffer_index, new_start, piece.end);
            self.arena.update_node(
                next,
                Piece::new(
                    piece.buffer_index,
                    new_start,
                    piece.end,
                    line_feed_count,
                    piece.length - 1,
                ),
            );
        }
        true
    }

    /// Store `text` and return pieces covering it. Small text goes to the change
    /// buffer; oversized text becomes fresh immutable buffers of at most `chunk_size`.
    pub(crate) fn create_new_pieces(&mut self, text: &[u16]) -> Vec<Piece> {
        let chunk_size = self.chunk_size;
        if text.len() > chunk_size {
            let mut pieces = Vec::new();
            let mut rest = text;
            while !rest.is_empty() {
                let cut = if rest.len() > chunk_size {
                    let last = rest[chunk_size - 1];
                    if last == CR || is_high_surrogate(last) {
                        chunk_size - 1
                    } else {
                        chunk_size
                    }
                } else {
                    rest.len()
                };
                let (head, tail) = rest.split_at(cut);
                let buffer = ChunkBuffer::from_utf16(head.to_vec());
                pieces.push(Piece::new(
                    self.buffers.len(),
                    BufferCursor::default(),
                    buffer.end_cursor(),
                    buffer.line_starts().len() - 1,
                    head.len(),
                ));
                self.buffers.push(Arc::new(buffer));
                rest = tail;
            }
            return pieces;
        }

        let change_buffer = Arc::make_mut(&mut self.buffers[CHANGE_BUFFER_ID]);
        if change_buffer.ends_with_cr() && text.first() == Some(&LF) {
            // keep the new LF from fusing with a CR owned by another piece
            change_buffer.append(&[b'_' as u16]);
        }
        let start_offset = change_buffer.len();
        change_buffer.append(text);
        let start = change_buffer.cursor_at(start_offset);
        let end = change_buffer.end_cursor();
        self.last_change_buffer_pos = end;
        let line_feed_count = self.get_line_feed_cnt(CHANGE_BUFFER_ID, start, end);
        vec![Piece::new(
            CHANGE_BUFFER_ID,
            start,
            end,
            line_feed_count,
            text.len(),
        )]
    }

    /// Delete `count` code units starting at `offset`.
    ///
    /// Panics if the range runs past the end of the document.
    pub fn delete(&mut self, offset: usize, count: usize) {
        let total = self.total_length();
        assert!(
            offset.checked_add(count).is_some_and(|end| end <= total),
            "delete range {offset}+{count} out of range (document length {total})"
        );
        *self.last_visited_line.get_mut() = None;
        if count == 0 || self.arena.root == SENTINEL {
            return;
        }
        tracing::debug!(offset, count, "delete");
        self.trace(|| TraceEvent::Delete { offset, count });

        let (Some(start_pos), Some(end_pos)) = (self.node_at(offset), self.node_at(offset + count))
        else {
            return;
        };
        self.search_cache
            .get_mut()
            .invalidate_from_offset(&self.arena, offset.saturating_sub(1));
        let start_node = start_pos.node;
        let end_node = end_pos.node;

        if start_node == end_node {
            let start_split = self.position_in_buffer(start_node, start_pos.remainder);
            let end_split = self.position_in_buffer(start_node, end_pos.remainder);
            let length = self.arena.piece(start_node).length;

            if start_pos.node_start_offset == offset {
                if count == length {
                    let next = self.arena.next(start_node);
                    self.search_cache.get_mut().forget(start_node);
                    self.arena.rb_delete(start_node);
                    self.validate_crlf_with_prev_node(next);
                } else {
                    self.delete_node_head(start_node, end_split);
                    self.validate_crlf_with_prev_node(start_node);
                }
            } else if start_pos.node_start_offset + length == offset + count {
                self.delete_node_tail(start_node, start_split);
                self.validate_crlf_with_next_node(start_node);
            } else {
                self.shrink_node(start_node, start_split, end_split);
            }
            self.compute_buffer_metadata();
            return;
        }

        let mut nodes_to_delete = Vec::new();
        let start_split = self.position_in_buffer(start_node, start_pos.remainder);
        self.delete_node_tail(start_node, start_split);
        if self.arena.piece(start_node).length == 0 {
            nodes_to_delete.push(start_node);
        }

        let end_split = self.position_in_buffer(end_node, end_pos.remainder);
        self.delete_node_head(end_node, end_split);
        if self.arena.piece(end_node).length == 0 {
            nodes_to_delete.push(end_node);
        }

        let mut node = self.arena.next(start_node);
        while node != SENTINEL && node != end_node {
            nodes_to_delete.push(node);
            node = self.arena.next(node);
        }

        let prev = if self.arena.piece(start_node).length == 0 {
            self.arena.prev(start_node)
        } else {
            start_node
        };
        self.delete_nodes(nodes_to_delete);
        self.validate_crlf_with_next_node(prev);
        self.compute_buffer_metadata();
    }

    fn delete_nodes(&mut self, nodes: Vec<NodeIndex>) {
        for node in nodes {
            self.search_cache.get_mut().forget(node);
            self.arena.rb_delete(node);
        }
    }

    /// Keep `[start, pos)` of the node's piece
    fn delete_node_tail(&mut self, node: NodeIndex, pos: BufferCursor) {
        let piece = *self.arena.piece(node);
        let buffer_index = piece.buffer_index;
        let length = self.offset_in_buffer(buffer_index, pos) - self.offset_in_buffer(buffer_index, piece.start);
        let line_feed_count = self.get_line_feed_cnt(buffer_index, piece.start, pos);
        self.arena.update_node(
            node,
            Piece::new(buffer_index, piece.start, pos, line_feed_count, length),
        );
    }

    /// Keep `[pos, end)` of the node's piece
    fn delete_node_head(&mut self, node: NodeIndex, pos: BufferCursor) {
        let piece = *self.arena.piece(node);
        let buffer_index = piece.buffer_index;
        let length = self.offset_in_buffer(buffer_index, piece.end) - self.offset_in_buffer(buffer_index, pos);
        let line_feed_count = self.get_line_feed_cnt(buffer_index, pos, piece.end);
        self.arena.update_node(
            node,
            Piece::new(buffer_index, pos, piece.end, line_feed_count, length),
        );
    }

    /// Cut `[start, end)` out of the middle of a node, leaving two nodes
    fn shrink_node(&mut self, node: NodeIndex, start: BufferCursor, end: BufferCursor) {
        let piece = *self.arena.piece(node);
        let buffer_index = piece.buffer_index;

        let left_length =
            self.offset_in_buffer(buffer_index, start) - self.offset_in_buffer(buffer_index, piece.start);
        let left_line_feeds = self.get_line_feed_cnt(buffer_index, piece.start, start);
        self.arena.update_node(
            node,
            Piece::new(buffer_index, piece.start, start, left_line_feeds, left_length),
        );

        let right_length =
            self.offset_in_buffer(buffer_index, piece.end) - self.offset_in_buffer(buffer_index, end);
        let right_line_feeds = self.get_line_feed_cnt(buffer_index, end, piece.end);
        let new_node = self.arena.rb_insert_right(
            node,
            Piece::new(buffer_index, end, piece.end, right_line_feeds, right_length),
        );
        self.validate_crlf_with_prev_node(new_node);
    }

    pub(crate) fn start_with_lf(&self, node: NodeIndex) -> bool {
        if node == SENTINEL || self.arena.piece(node).line_feed_count == 0 {
            return false;
        }
        self.node_char_code_at(node, 0) == Some(LF)
    }

    pub(crate) fn end_with_cr(&self, node: NodeIndex) -> bool {
        if node == SENTINEL || self.arena.piece(node).line_feed_count == 0 {
            return false;
        }
        let length = self.arena.piece(node).length;
        length > 0 && self.node_char_code_at(node, length - 1) == Some(CR)
    }

    fn validate_crlf_with_prev_node(&mut self, next: NodeIndex) {
        if self.should_check_crlf() && self.start_with_lf(next) {
            let node = self.arena.prev(next);
            if self.end_with_cr(node) {
                self.fix_crlf(node, next);
            }
        }
    }

    fn validate_crlf_with_next_node(&mut self, node: NodeIndex) {
        if self.should_check_crlf() && self.end_with_cr(node) {
            let next = self.arena.next(node);
            if self.start_with_lf(next) {
                self.fix_crlf(node, next);
            }
        }
    }

    /// Trim the CR off `prev` and the LF off `next`, then put a `\r\n` piece between them
    fn fix_crlf(&mut self, prev: NodeIndex, next: NodeIndex) {
        self.trace(|| TraceEvent::CrlfFixup {
            node_start_offset: self.arena.offset_of_node(next),
        });
        let mut nodes_to_delete = Vec::new();

        let piece = *self.arena.piece(prev);
        let buffer = &self.buffers[piece.buffer_index];
        let new_end = buffer.cursor_at(buffer.offset_of(piece.end) - 1);
        let line_feed_count = self.get_line_feed_cnt(piece.buffer_index, piece.start, new_end);
        self.arena.update_node(
            prev,
            Piece::new(
                piece.buffer_index,
                piece.start,
                new_end,
                line_feed_count,
                piece.length - 1,
            ),
        );
        if piece.length == 1 {
            nodes_to_delete.push(prev);
        }

        let piece = *self.arena.piece(next);
        let buffer = &self.buffers[piece.buffer_index];
        let new_start = buffer.cursor_at(buffer.offset_of(piece.start) + 1);
        let line_feed_count = self.get_line_feed_cnt(piece.buffer_index, new_start, piece.end);
        self.arena.update_node(
            next,
            Piece::new(
                piece.buffer_index,
                new_start,
                piece.end,
                line_feed_count,
                piece.length - 1,
            ),
        );
        if piece.length == 1 {
            nodes_to_delete.push(next);
        }

        let pieces = self.create_new_pieces(&[CR, LF]);
        self.arena.rb_insert_right(prev, pieces[0]);
        self.delete_nodes(nodes_to_delete);
    }

    /// Settle cache state after a structural change
    fn compute_buffer_metadata(&mut self) {
        self.search_cache.get_mut().validate(&self.arena);
    }

    /// Rewrite every line ending to `eol` and rebuild the buffers in fresh chunks
    pub fn normalize_eol(&mut self, eol: &str) {
        let mut normalizer = ChunkNormalizer::new(eol, self.chunk_size);
        for piece in self.pieces().collect::<Vec<_>>() {
            normalizer.push(self.piece_content(&piece));
        }
        let chunks = normalizer.finish();
        tracing::debug!(eol = ?eol, chunks = chunks.len(), "normalize eol");
        let chunk_count = chunks.len();
        self.create(chunks, eol, true);
        self.trace(|| TraceEvent::NormalizeEol {
            eol: eol.to_string(),
            chunk_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tracer::tests::RecordingTracer;

    fn empty_model() -> PieceTreeModel {
        PieceTreeModel::new(vec![], "\n", false)
    }

    fn model(text: &str) -> PieceTreeModel {
        PieceTreeModel::new(vec![ChunkBuffer::from_text(text)], "\n", false)
    }

    #[test]
    fn test_insert_into_empty() {
        let mut m = empty_model();
        m.insert(0, "hello");
        assert_eq!(m.get_text(), "hello");
        assert_eq!(m.node_count(), 1);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_insert_middle_splits_piece() {
        let mut m = model("a\nb\n");
        m.insert(1, "X");
        assert_eq!(m.get_text(), "aX\nb\n");
        assert_eq!(m.node_count(), 3);
        assert_eq!(m.get_line_content(1), "aX");
        m.assert_piece_integrity();
    }

    #[test]
    fn test_typing_appends_in_place() {
        let mut m = model("start");
        m.insert(5, " ");
        let nodes_after_first = m.node_count();
        for (i, ch) in "typing".chars().enumerate() {
            m.insert(6 + i, &ch.to_string());
        }
        assert_eq!(m.get_text(), "start typing");
        assert_eq!(m.node_count(), nodes_after_first);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_append_after_previous_node() {
        let mut m = model("ab");
        m.insert(1, "x");
        // cursor sits at the start of the "b" node; the text joins the "x" piece
        let nodes = m.node_count();
        m.insert(2, "y");
        assert_eq!(m.get_text(), "axyb");
        assert_eq!(m.node_count(), nodes);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_insert_cr_before_lf_joins_pair() {
        let mut m = model("a\nb");
        m.insert(1, "\r");
        assert_eq!(m.get_text(), "a\r\nb");
        assert_eq!(m.get_line_count(), 2);
        assert_eq!(m.get_line_content(1), "a");
        m.assert_piece_integrity();
    }

    #[test]
    fn test_insert_lf_after_cr_joins_pair() {
        let mut m = model("a\rb");
        m.insert(2, "\n");
        assert_eq!(m.get_text(), "a\r\nb");
        assert_eq!(m.get_line_count(), 2);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_split_crlf_by_insert() {
        let mut m = model("a\r\nb");
        m.insert(2, "x");
        assert_eq!(m.get_text(), "a\rx\nb");
        assert_eq!(m.get_line_count(), 3);
        m.delete(2, 1);
        assert_eq!(m.get_text(), "a\r\nb");
        assert_eq!(m.get_line_count(), 2);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_delete_cases() {
        let mut m = model("hello world");
        m.delete(0, 6);
        assert_eq!(m.get_text(), "world");
        m.delete(3, 2);
        assert_eq!(m.get_text(), "wor");
        m.delete(1, 1);
        assert_eq!(m.get_text(), "wr");
        m.delete(0, 2);
        assert_eq!(m.get_text(), "");
        assert_eq!(m.node_count(), 0);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_delete_across_nodes() {
        let chunks = vec![
            ChunkBuffer::from_text("abc\r"),
            ChunkBuffer::from_text("def"),
            ChunkBuffer::from_text("\nghi"),
        ];
        let mut m = PieceTreeModel::new(chunks, "\n", false);
        m.delete(4, 3);
        assert_eq!(m.get_text(), "abc\r\nghi");
        assert_eq!(m.get_line_count(), 2);
        assert_eq!(m.get_line_content(2), "ghi");
        m.assert_piece_integrity();
    }

    #[test]
    fn test_large_insert_gets_own_buffers() {
        let mut m = PieceTreeModel::with_options(
            vec![],
            "\n",
            true,
            8,
            std::num::NonZeroUsize::MIN,
        );
        let text = "0123456789abcdefghij";
        m.insert(0, text);
        assert_eq!(m.get_text(), text);
        assert_eq!(m.node_count(), 3);
        assert_eq!(m.buffers().len(), 4);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_eol_normalized_flag_tracks_inserts() {
        let mut m = PieceTreeModel::new(vec![ChunkBuffer::from_text("a\nb")], "\n", true);
        m.insert(1, "\n");
        assert!(m.is_eol_normalized());
        m.insert(0, "\r");
        assert!(!m.is_eol_normalized());

        let mut crlf = PieceTreeModel::new(vec![ChunkBuffer::from_text("a\r\nb")], "\r\n", true);
        crlf.insert(0, "x\r\n");
        assert!(crlf.is_eol_normalized());
        crlf.insert(0, "\n");
        assert!(!crlf.is_eol_normalized());
        crlf.assert_piece_integrity();
    }

    #[test]
    fn test_normalize_eol_is_idempotent() {
        let mut m = model("a\r\nb\rc\nd");
        m.normalize_eol("\r\n");
        let once = m.get_text();
        assert_eq!(once, "a\r\nb\r\nc\r\nd");
        m.normalize_eol("\r\n");
        assert_eq!(m.get_text(), once);
        assert!(m.is_eol_normalized());
        assert_eq!(m.get_line_content(2), "b");
        m.assert_piece_integrity();
    }

    #[test]
    fn test_tracer_sees_edits() {
        let tracer = Arc::new(RecordingTracer::default());
        let mut m = model("abc");
        m.set_tracer(Some(tracer.clone()));
        m.insert(3, "d");
        m.insert(4, "e");
        m.delete(0, 1);
        let events = tracer.events.lock().unwrap();
        assert!(events.contains(&TraceEvent::Insert { offset: 3, length: 1 }));
        assert!(events.contains(&TraceEvent::AppendFastPath { offset: 4, length: 1 }));
        assert!(events.contains(&TraceEvent::Delete { offset: 0, count: 1 }));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_insert_past_end_panics() {
        model("abc").insert(4, "x");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_delete_past_end_panics() {
        model("abc").delete(2, 5);
    }
}
