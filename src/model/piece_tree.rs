//! The piece tree model: buffers, the red-black tree of pieces, and every
//! read-only query over them.
//!
//! Mutation lives in `edit.rs` and search in `line_search.rs`; all three are
//! `impl PieceTreeModel` blocks over the same state.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::chunk_buffer::{BufferCursor, ChunkBuffer, CR, LF};
use super::chunk_utils::{replace_line_endings, AVERAGE_BUFFER_SIZE};
use super::node::{NodeArena, NodeIndex, Piece, SENTINEL};
use super::position::{EndOfLinePreference, Position, Range};
use super::search_cache::{CacheEntry, PieceTreeSearchCache, SearchCacheDiagnostics};
use super::snapshot::PieceTreeSnapshot;
use super::tracer::{PieceTreeTracer, TraceEvent};
use crate::error::PieceTreeError;

/// Index of the change buffer in the buffer list
pub const CHANGE_BUFFER_ID: usize = 0;

/// Result of locating an offset in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePosition {
    pub node: NodeIndex,
    /// Offset inside the node's piece
    pub remainder: usize,
    pub node_start_offset: usize,
}

/// Text document stored as pieces over a list of buffers.
///
/// Buffer 0 is the change buffer that accumulates inserted text; buffers 1..N
/// hold the original content and oversized inserts. Positions are 1-based
/// (line, column) and columns count UTF-16 code units.
#[derive(Debug)]
pub struct PieceTreeModel {
    pub(crate) buffers: Vec<Arc<ChunkBuffer>>,
    pub(crate) arena: NodeArena,
    pub(crate) search_cache: RefCell<PieceTreeSearchCache>,
    /// Most recently fetched line (number, content)
    pub(crate) last_visited_line: RefCell<Option<(usize, String)>>,
    pub(crate) eol: String,
    pub(crate) eol_normalized: bool,
    /// Write cursor of the change buffer
    pub(crate) last_change_buffer_pos: BufferCursor,
    pub(crate) chunk_size: usize,
    pub(crate) tracer: Option<Arc<dyn PieceTreeTracer>>,
}

impl PieceTreeModel {
    /// Build a tree with one piece per non-empty chunk
    pub fn new(chunks: Vec<ChunkBuffer>, eol: &str, eol_normalized: bool) -> Self {
        Self::with_options(
            chunks,
            eol,
            eol_normalized,
            AVERAGE_BUFFER_SIZE,
            NonZeroUsize::MIN,
        )
    }

    pub fn with_options(
        chunks: Vec<ChunkBuffer>,
        eol: &str,
        eol_normalized: bool,
        chunk_size: usize,
        search_cache_capacity: NonZeroUsize,
    ) -> Self {
        let mut model = PieceTreeModel {
            buffers: Vec::new(),
            arena: NodeArena::new(),
            search_cache: RefCell::new(PieceTreeSearchCache::new(search_cache_capacity)),
            last_visited_line: RefCell::new(None),
            eol: eol.to_string(),
            eol_normalized,
            last_change_buffer_pos: BufferCursor::default(),
            chunk_size: chunk_size.max(2),
            tracer: None,
        };
        model.create(chunks, eol, eol_normalized);
        model
    }

    /// Replace all content with `chunks`
    pub(crate) fn create(&mut self, chunks: Vec<ChunkBuffer>, eol: &str, eol_normalized: bool) {
        self.buffers = vec![Arc::new(ChunkBuffer::empty())];
        self.last_change_buffer_pos = BufferCursor::default();
        self.arena.clear();
        self.eol = eol.to_string();
        self.eol_normalized = eol_normalized;

        let mut last_node = SENTINEL;
        for chunk in chunks {
            if chunk.is_empty() {
                continue;
            }
            let end = chunk.end_cursor();
            let piece = Piece::new(
                self.buffers.len(),
                BufferCursor::default(),
                end,
                chunk.line_starts().len() - 1,
                chunk.len(),
            );
            self.buffers.push(Arc::new(chunk));
            last_node = self.arena.rb_insert_right(last_node, piece);
        }

        self.search_cache.get_mut().clear();
        *self.last_visited_line.get_mut() = None;
        tracing::debug!(
            buffers = self.buffers.len(),
            total_length = self.total_length(),
            eol = ?self.eol,
            eol_normalized,
            "piece tree created"
        );
        self.trace(|| TraceEvent::Rebuilt {
            buffer_count: self.buffers.len(),
            total_length: self.total_length(),
        });
    }

    /// Install or remove the mutation hook
    pub fn set_tracer(&mut self, tracer: Option<Arc<dyn PieceTreeTracer>>) {
        self.tracer = tracer;
    }

    pub(crate) fn trace(&self, event: impl FnOnce() -> TraceEvent) {
        if let Some(tracer) = &self.tracer {
            tracer.on_event(&event());
        }
    }

    pub fn get_eol(&self) -> &str {
        &self.eol
    }

    pub fn is_eol_normalized(&self) -> bool {
        self.eol_normalized
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn buffers(&self) -> &[Arc<ChunkBuffer>] {
        &self.buffers
    }

    pub fn total_length(&self) -> usize {
        self.arena.total_length()
    }

    pub fn total_line_feeds(&self) -> usize {
        self.arena.total_line_feeds()
    }

    pub fn get_line_count(&self) -> usize {
        self.total_line_feeds() + 1
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Pieces in document order
    pub fn pieces(&self) -> impl Iterator<Item = Piece> + '_ {
        self.arena.iter().map(|node| *self.arena.piece(node))
    }

    /// CR/LF boundaries need fixing unless the document is known to be pure LF
    pub(crate) fn should_check_crlf(&self) -> bool {
        !(self.eol_normalized && self.eol == "\n")
    }

    pub fn diagnostics(&self) -> SearchCacheDiagnostics {
        self.search_cache.borrow().diagnostics()
    }

    // ---- buffer/piece helpers ----

    pub(crate) fn offset_in_buffer(&self, buffer_index: usize, cursor: BufferCursor) -> usize {
        self.buffers[buffer_index].offset_of(cursor)
    }

    pub(crate) fn position_in_buffer(&self, node: NodeIndex, remainder: usize) -> BufferCursor {
        let piece = self.arena.piece(node);
        let buffer = &self.buffers[piece.buffer_index];
        buffer.cursor_at(buffer.offset_of(piece.start) + remainder)
    }

    pub(crate) fn piece_content(&self, piece: &Piece) -> &[u16] {
        self.buffers[piece.buffer_index].slice(piece.start, piece.end)
    }

    pub(crate) fn node_content(&self, node: NodeIndex) -> &[u16] {
        self.piece_content(self.arena.piece(node))
    }

    /// Code unit at `offset` inside the node's piece
    pub(crate) fn node_char_code_at(&self, node: NodeIndex, offset: usize) -> Option<u16> {
        let piece = self.arena.piece(node);
        if offset >= piece.length {
            return None;
        }
        let start = self.offset_in_buffer(piece.buffer_index, piece.start);
        self.buffers[piece.buffer_index].char_code_at(start + offset)
    }

    /// Line terminators between two cursors of one buffer (CRLF counts once, a
    /// trailing CR whose LF lies outside the span counts).
    pub(crate) fn get_line_feed_cnt(
        &self,
        buffer_index: usize,
        start: BufferCursor,
        end: BufferCursor,
    ) -> usize {
        if self.eol_normalized {
            self.line_feed_cnt_from_table(buffer_index, start, end)
        } else {
            self.line_feed_cnt_by_scan(buffer_index, start, end)
        }
    }

    fn line_feed_cnt_from_table(
        &self,
        buffer_index: usize,
        start: BufferCursor,
        end: BufferCursor,
    ) -> usize {
        let buffer = &self.buffers[buffer_index];
        let line_starts = buffer.line_starts();
        if end.column == 0 || end.line == line_starts.len() - 1 {
            return end.line - start.line;
        }
        let next_line_start = line_starts[end.line + 1];
        let end_offset = line_starts[end.line] + end.column;
        if next_line_start > end_offset + 1 {
            return end.line - start.line;
        }
        // end sits on the last unit of a terminator; it counts when that is the LF of a split CRLF
        if end_offset > 0 && buffer.char_code_at(end_offset - 1) == Some(CR) {
            end.line - start.line + 1
        } else {
            end.line - start.line
        }
    }

    fn line_feed_cnt_by_scan(&self, buffer_index: usize, start: BufferCursor, end: BufferCursor) -> usize {
        let buffer = &self.buffers[buffer_index];
        count_line_breaks(buffer.slice(start, end))
    }

    /// Offset inside the node's piece where its `local_line`-th line starts
    /// (0 is the piece start; past the last terminator yields the piece length).
    pub(crate) fn line_start_in_node(&self, node: NodeIndex, local_line: usize) -> usize {
        if local_line == 0 {
            return 0;
        }
        let piece = self.arena.piece(node);
        if self.eol_normalized {
            let buffer = &self.buffers[piece.buffer_index];
            let start_offset = buffer.offset_of(piece.start);
            let expected = piece.start.line + local_line;
            if expected > piece.end.line {
                piece.length
            } else {
                buffer.line_starts()[expected] - start_offset
            }
        } else {
            line_start_by_scan(self.node_content(node), local_line)
        }
    }

    /// Piece-local (line index, column) of an offset inside the node
    pub(crate) fn get_index_of(&self, node: NodeIndex, accumulated: usize) -> (usize, usize) {
        let piece = *self.arena.piece(node);
        let pos = self.position_in_buffer(node, accumulated);
        let line_count = pos.line - piece.start.line;
        if accumulated == piece.length {
            // the end may fall between a CR and an LF that lies outside the piece
            let real = self.get_line_feed_cnt(piece.buffer_index, piece.start, pos);
            if real != line_count {
                return (real, 0);
            }
        }
        (line_count, pos.column)
    }

    // ---- lookups ----

    /// Node containing `offset`; a boundary offset may resolve to either neighbour
    pub(crate) fn node_at(&self, offset: usize) -> Option<NodePosition> {
        let cached = self
            .search_cache
            .borrow_mut()
            .get_by_offset(&self.arena, offset);
        if let Some(entry) = cached {
            return Some(NodePosition {
                node: entry.node,
                remainder: offset - entry.node_start_offset,
                node_start_offset: entry.node_start_offset,
            });
        }

        let mut x = self.arena.root;
        let mut remaining = offset;
        let mut node_start_offset = 0;
        while x != SENTINEL {
            let node = self.arena.node(x);
            if node.size_left > remaining {
                x = node.left;
            } else if node.size_left + node.piece.length >= remaining {
                node_start_offset += node.size_left;
                self.search_cache.borrow_mut().set(CacheEntry {
                    node: x,
                    node_start_offset,
                    node_start_line_number: None,
                });
                return Some(NodePosition {
                    node: x,
                    remainder: remaining - node.size_left,
                    node_start_offset,
                });
            } else {
                remaining -= node.size_left + node.piece.length;
                node_start_offset += node.size_left + node.piece.length;
                x = node.right;
            }
        }
        None
    }

    /// Document offset of a 1-based (line, column) position
    pub fn get_offset_at(&self, line_number: usize, column: usize) -> usize {
        assert!(
            line_number >= 1 && column >= 1,
            "positions are 1-based, got ({line_number}, {column})"
        );
        let mut x = self.arena.root;
        let mut line = line_number;
        let mut left_len = 0;
        while x != SENTINEL {
            let node = self.arena.node(x);
            if node.left != SENTINEL && node.lf_left + 1 >= line {
                x = node.left;
            } else if node.lf_left + node.piece.line_feed_count + 1 >= line {
                left_len += node.size_left;
                return left_len + self.line_start_in_node(x, line - node.lf_left - 1) + column - 1;
            } else {
                line -= node.lf_left + node.piece.line_feed_count;
                left_len += node.size_left + node.piece.length;
                x = node.right;
            }
        }
        left_len
    }

    /// 1-based position of a document offset
    pub fn get_position_at(&self, offset: usize) -> Position {
        assert!(
            offset <= self.total_length(),
            "offset {} out of range (document length {})",
            offset,
            self.total_length()
        );
        let mut x = self.arena.root;
        let mut remaining = offset;
        let mut lf_count = 0;
        while x != SENTINEL {
            let node = self.arena.node(x);
            if node.size_left != 0 && node.size_left >= remaining {
                x = node.left;
            } else if node.size_left + node.piece.length >= remaining {
                let (index, column) = self.get_index_of(x, remaining - node.size_left);
                lf_count += node.lf_left + index;
                if index == 0 {
                    let line_start = self.get_offset_at(lf_count + 1, 1);
                    return Position::new(lf_count + 1, offset - line_start + 1);
                }
                return Position::new(lf_count + 1, column + 1);
            } else {
                remaining -= node.size_left + node.piece.length;
                lf_count += node.lf_left + node.piece.line_feed_count;
                x = node.right;
            }
        }
        Position::new(1, 1)
    }

    // ---- line content ----

    fn assert_line_number(&self, line_number: usize) {
        let count = self.get_line_count();
        assert!(
            (1..=count).contains(&line_number),
            "line number {line_number} out of range (1..={count})"
        );
    }

    /// Line content including its terminator
    pub fn get_line_raw_content(&self, line_number: usize) -> String {
        self.assert_line_number(line_number);
        String::from_utf16_lossy(&self.line_raw_units(line_number, 0))
    }

    /// Code units of a line, dropping `end_offset` units of its terminator
    pub(crate) fn line_raw_units(&self, line_number: usize, end_offset: usize) -> Vec<u16> {
        let mut ret: Vec<u16> = Vec::new();
        let mut x;

        let cached = self
            .search_cache
            .borrow_mut()
            .get_by_line(&self.arena, line_number);
        match cached {
            Some(CacheEntry {
                node,
                node_start_line_number: Some(start_line),
                ..
            }) => {
                x = node;
                let piece = self.arena.piece(x);
                let content = self.node_content(x);
                let local_line = line_number - start_line;
                let prev = self.line_start_in_node(x, local_line);
                if start_line + piece.line_feed_count == line_number {
                    ret.extend_from_slice(&content[prev..]);
                } else {
                    let end = self.line_start_in_node(x, local_line + 1);
                    return content[prev..end.saturating_sub(end_offset).max(prev)].to_vec();
                }
            }
            _ => {
                x = self.arena.root;
                let mut line = line_number;
                let mut node_start_offset = 0;
                while x != SENTINEL {
                    let node = self.arena.node(x);
                    if node.left != SENTINEL && node.lf_left + 1 >= line {
                        x = node.left;
                    } else if node.lf_left + node.piece.line_feed_count + 1 > line {
                        let local_line = line - node.lf_left - 1;
                        let prev = self.line_start_in_node(x, local_line);
                        let end = self.line_start_in_node(x, local_line + 1);
                        node_start_offset += node.size_left;
                        self.search_cache.borrow_mut().set(CacheEntry {
                            node: x,
                            node_start_offset,
                            node_start_line_number: Some(line_number - local_line),
                        });
                        let content = self.node_content(x);
                        return content[prev..end.saturating_sub(end_offset).max(prev)].to_vec();
                    } else if node.lf_left + node.piece.line_feed_count + 1 == line {
                        let prev = self.line_start_in_node(x, line - node.lf_left - 1);
                        ret.extend_from_slice(&self.node_content(x)[prev..]);
                        break;
                    } else {
                        line -= node.lf_left + node.piece.line_feed_count;
                        node_start_offset += node.size_left + node.piece.length;
                        x = node.right;
                    }
                }
            }
        }

        // the line continues until a node carrying a terminator
        x = self.arena.next(x);
        while x != SENTINEL {
            let content = self.node_content(x);
            if self.arena.piece(x).line_feed_count > 0 {
                let end = self.line_start_in_node(x, 1);
                ret.extend_from_slice(&content[..end.saturating_sub(end_offset)]);
                return ret;
            }
            ret.extend_from_slice(content);
            x = self.arena.next(x);
        }
        ret
    }

    /// Line content without its terminator
    pub fn get_line_content(&self, line_number: usize) -> String {
        if let Some((line, value)) = self.last_visited_line.borrow().as_ref() {
            if *line == line_number {
                return value.clone();
            }
        }
        self.assert_line_number(line_number);

        let value = if line_number == self.get_line_count() {
            String::from_utf16_lossy(&self.line_raw_units(line_number, 0))
        } else if self.eol_normalized {
            String::from_utf16_lossy(&self.line_raw_units(line_number, self.eol.len()))
        } else {
            let mut units = self.line_raw_units(line_number, 0);
            strip_line_ending(&mut units);
            String::from_utf16_lossy(&units)
        };
        *self.last_visited_line.borrow_mut() = Some((line_number, value.clone()));
        value
    }

    /// All lines without terminators
    pub fn get_lines_content(&self) -> Vec<String> {
        let text = self.get_text_units(0, self.total_length());
        let mut lines = Vec::with_capacity(self.get_line_count());
        let mut line_start = 0;
        let mut i = 0;
        while i < text.len() {
            match text[i] {
                CR => {
                    lines.push(String::from_utf16_lossy(&text[line_start..i]));
                    if text.get(i + 1) == Some(&LF) {
                        i += 1;
                    }
                    line_start = i + 1;
                }
                LF => {
                    lines.push(String::from_utf16_lossy(&text[line_start..i]));
                    line_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        lines.push(String::from_utf16_lossy(&text[line_start..]));
        lines
    }

    /// Length of a line excluding its terminator
    pub fn get_line_length(&self, line_number: usize) -> usize {
        self.assert_line_number(line_number);
        let start = self.get_offset_at(line_number, 1);
        if line_number == self.get_line_count() {
            return self.total_length() - start;
        }
        let next = self.get_offset_at(line_number + 1, 1);
        next - start - self.line_break_length_before(next)
    }

    /// Width (1 or 2) of the terminator ending right before `offset`
    fn line_break_length_before(&self, offset: usize) -> usize {
        if offset >= 2
            && self.get_char_code(offset - 1) == Some(LF)
            && self.get_char_code(offset - 2) == Some(CR)
        {
            2
        } else {
            1
        }
    }

    /// UTF-16 code unit at `offset`, `None` at or past the end
    pub fn get_char_code(&self, offset: usize) -> Option<u16> {
        if offset >= self.total_length() {
            return None;
        }
        let pos = self.node_at(offset)?;
        let piece = self.arena.piece(pos.node);
        if pos.remainder == piece.length {
            let next = self.arena.next(pos.node);
            if next == SENTINEL {
                return None;
            }
            return self.node_char_code_at(next, 0);
        }
        self.node_char_code_at(pos.node, pos.remainder)
    }

    /// Code unit at 0-based `index` of a line
    pub fn get_line_char_code(&self, line_number: usize, index: usize) -> Option<u16> {
        self.get_char_code(self.get_offset_at(line_number, index + 1))
    }

    /// Remainder of the piece containing `offset`
    pub fn get_nearest_chunk(&self, offset: usize) -> String {
        let Some(pos) = self.node_at(offset) else {
            return String::new();
        };
        let piece = self.arena.piece(pos.node);
        if pos.remainder == piece.length {
            let next = self.arena.next(pos.node);
            if next == SENTINEL {
                return String::new();
            }
            return String::from_utf16_lossy(self.node_content(next));
        }
        String::from_utf16_lossy(&self.node_content(pos.node)[pos.remainder..])
    }

    // ---- text ----

    /// Code units of `[start, end)`
    pub(crate) fn get_text_units(&self, start: usize, end: usize) -> Vec<u16> {
        assert!(
            start <= end && end <= self.total_length(),
            "text range {}..{} out of range (document length {})",
            start,
            end,
            self.total_length()
        );
        let mut out = Vec::with_capacity(end - start);
        if start == end {
            return out;
        }
        let Some(pos) = self.node_at(start) else {
            return out;
        };
        let mut x = pos.node;
        let mut skip = pos.remainder;
        let mut remaining = end - start;
        while x != SENTINEL && remaining > 0 {
            let content = &self.node_content(x)[skip..];
            let take = content.len().min(remaining);
            out.extend_from_slice(&content[..take]);
            remaining -= take;
            skip = 0;
            x = self.arena.next(x);
        }
        out
    }

    /// Whole document
    pub fn get_text(&self) -> String {
        String::from_utf16_lossy(&self.get_text_units(0, self.total_length()))
    }

    /// `length` code units starting at `offset`
    pub fn get_text_range(&self, offset: usize, length: usize) -> String {
        String::from_utf16_lossy(&self.get_text_units(offset, offset + length))
    }

    pub(crate) fn range_units(&self, range: &Range) -> Vec<u16> {
        if range.is_empty() {
            return Vec::new();
        }
        let start = self.get_offset_at(range.start_line_number, range.start_column);
        let end = self.get_offset_at(range.end_line_number, range.end_column);
        self.get_text_units(start, end)
    }

    /// Text between two positions with line endings rendered per `eol`
    pub fn get_value_in_range(&self, range: &Range, eol: EndOfLinePreference) -> String {
        let units = self.range_units(range);
        let target = match eol {
            EndOfLinePreference::TextDefined => return String::from_utf16_lossy(&units),
            EndOfLinePreference::Lf => "\n",
            EndOfLinePreference::Crlf => "\r\n",
        };
        if self.eol_normalized && self.eol == target {
            return String::from_utf16_lossy(&units);
        }
        let target: Vec<u16> = target.encode_utf16().collect();
        String::from_utf16_lossy(&replace_line_endings(&units, &target))
    }

    /// Snapshot of the current content, read lazily chunk by chunk
    pub fn create_snapshot(&self, bom: &str) -> PieceTreeSnapshot {
        PieceTreeSnapshot::new(
            self.pieces().collect(),
            self.buffers.clone(),
            bom.to_string(),
        )
    }

    // ---- integrity ----

    /// Recompute everything the tree caches and compare with what it stores
    pub fn check_integrity(&self) -> Result<(), PieceTreeError> {
        self.arena
            .check_invariants()
            .map_err(PieceTreeError::integrity)?;

        let mut total_length = 0;
        let mut total_line_feeds = 0;
        let mut prev_ends_with_cr = false;
        for (index, piece) in self.pieces().enumerate() {
            let buffer = self.buffers.get(piece.buffer_index).ok_or_else(|| {
                PieceTreeError::integrity(format!(
                    "piece {index} refers to missing buffer {}",
                    piece.buffer_index
                ))
            })?;
            if piece.length == 0 {
                return Err(PieceTreeError::integrity(format!("piece {index} is empty")));
            }
            let start = buffer.offset_of(piece.start);
            let end = buffer.offset_of(piece.end);
            if end < start || end - start != piece.length {
                return Err(PieceTreeError::integrity(format!(
                    "piece {index} length {} != span {}..{}",
                    piece.length, start, end
                )));
            }
            let content = buffer.slice_offsets(start, end);
            let line_feeds = count_line_breaks(content);
            if line_feeds != piece.line_feed_count {
                return Err(PieceTreeError::integrity(format!(
                    "piece {index} line feed count {} != recomputed {}",
                    piece.line_feed_count, line_feeds
                )));
            }
            if self.should_check_crlf() && prev_ends_with_cr && content.first() == Some(&LF) {
                return Err(PieceTreeError::integrity(format!(
                    "piece {index} starts with LF after a piece ending with CR"
                )));
            }
            prev_ends_with_cr = content.last() == Some(&CR);
            total_length += piece.length;
            total_line_feeds += piece.line_feed_count;
        }

        if total_length != self.total_length() || total_line_feeds != self.total_line_feeds() {
            return Err(PieceTreeError::integrity(format!(
                "totals ({}, {}) != recomputed ({total_length}, {total_line_feeds})",
                self.total_length(),
                self.total_line_feeds()
            )));
        }
        Ok(())
    }

    /// Panicking form of [`check_integrity`](Self::check_integrity) for tests and debug builds
    pub fn assert_piece_integrity(&self) {
        if let Err(err) = self.check_integrity() {
            panic!("{err}");
        }
    }
}

/// Terminators in a span: CRLF once, lone CR and LF once each
pub(crate) fn count_line_breaks(text: &[u16]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            CR => {
                count += 1;
                if text.get(i + 1) == Some(&LF) {
                    i += 1;
                }
            }
            LF => count += 1,
            _ => {}
        }
        i += 1;
    }
    count
}

/// Offset just past the `line`-th terminator of `text`, or its length
fn line_start_by_scan(text: &[u16], line: usize) -> usize {
    let mut seen = 0;
    let mut i = 0;
    while i < text.len() {
        let is_break = match text[i] {
            CR => {
                if text.get(i + 1) == Some(&LF) {
                    i += 1;
                }
                true
            }
            LF => true,
            _ => false,
        };
        i += 1;
        if is_break {
            seen += 1;
            if seen == line {
                return i;
            }
        }
    }
    text.len()
}

/// Drop one trailing `\r\n`, `\r` or `\n`
fn strip_line_ending(units: &mut Vec<u16>) {
    match units.last() {
        Some(&LF) => {
            units.pop();
            if units.last() == Some(&CR) {
                units.pop();
            }
        }
        Some(&CR) => {
            units.pop();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(text: &str) -> PieceTreeModel {
        PieceTreeModel::new(vec![ChunkBuffer::from_text(text)], "\n", false)
    }

    #[test]
    fn test_empty_model() {
        let m = model("");
        assert_eq!(m.total_length(), 0);
        assert_eq!(m.get_line_count(), 1);
        assert_eq!(m.get_line_content(1), "");
        assert_eq!(m.get_line_length(1), 0);
        assert_eq!(m.get_text(), "");
        assert_eq!(m.get_position_at(0), Position::new(1, 1));
        assert_eq!(m.get_offset_at(1, 1), 0);
        assert_eq!(m.get_char_code(0), None);
        m.assert_piece_integrity();
    }

    #[test]
    fn test_line_count_examples() {
        assert_eq!(model("a\nb").get_line_count(), 2);
        let m = model("a\nb\n");
        assert_eq!(m.get_line_count(), 3);
        assert_eq!(m.get_line_content(3), "");
        assert_eq!(model("a\r\nb\rc").get_line_count(), 3);
    }

    #[test]
    fn test_line_content_mixed_eol() {
        let m = model("one\r\ntwo\rthree\nfour");
        assert_eq!(m.get_line_content(1), "one");
        assert_eq!(m.get_line_content(2), "two");
        assert_eq!(m.get_line_content(3), "three");
        assert_eq!(m.get_line_content(4), "four");
        assert_eq!(m.get_line_raw_content(1), "one\r\n");
        assert_eq!(m.get_line_raw_content(2), "two\r");
        assert_eq!(m.get_line_length(1), 3);
        assert_eq!(m.get_line_length(3), 5);
        assert_eq!(m.get_lines_content(), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_lines_across_chunks() {
        let chunks = vec![
            ChunkBuffer::from_text("ab"),
            ChunkBuffer::from_text("c\nd"),
            ChunkBuffer::from_text("ef\n"),
        ];
        let m = PieceTreeModel::new(chunks, "\n", true);
        assert_eq!(m.node_count(), 3);
        assert_eq!(m.get_line_content(1), "abc");
        assert_eq!(m.get_line_content(2), "def");
        assert_eq!(m.get_line_content(3), "");
        assert_eq!(m.get_text(), "abc\ndef\n");
        m.assert_piece_integrity();
    }

    #[test]
    fn test_position_offset_inverse() {
        let m = model("ab\r\ncd\nef\rgh");
        for offset in 0..=m.total_length() {
            let pos = m.get_position_at(offset);
            if offset == 3 {
                // between CR and LF
                assert_eq!(pos, Position::new(1, 4));
            }
            assert_eq!(m.get_offset_at(pos.line_number, pos.column), offset);
        }
        assert_eq!(m.get_position_at(4), Position::new(2, 1));
        assert_eq!(m.get_position_at(m.total_length()), Position::new(4, 3));
    }

    #[test]
    fn test_char_codes() {
        let m = model("ab\ncd");
        assert_eq!(m.get_char_code(0), Some(b'a' as u16));
        assert_eq!(m.get_char_code(2), Some(LF));
        assert_eq!(m.get_char_code(5), None);
        assert_eq!(m.get_line_char_code(2, 1), Some(b'd' as u16));
    }

    #[test]
    fn test_value_in_range_eol_preference() {
        let m = model("a\r\nb\nc");
        let range = Range::new(1, 1, 3, 2);
        assert_eq!(m.get_value_in_range(&range, EndOfLinePreference::TextDefined), "a\r\nb\nc");
        assert_eq!(m.get_value_in_range(&range, EndOfLinePreference::Lf), "a\nb\nc");
        assert_eq!(m.get_value_in_range(&range, EndOfLinePreference::Crlf), "a\r\nb\r\nc");
        assert_eq!(m.get_value_in_range(&Range::new(2, 1, 2, 1), EndOfLinePreference::Lf), "");
    }

    #[test]
    fn test_nearest_chunk() {
        let chunks = vec![ChunkBuffer::from_text("hello "), ChunkBuffer::from_text("world")];
        let m = PieceTreeModel::new(chunks, "\n", true);
        assert_eq!(m.get_nearest_chunk(2), "llo ");
        assert_eq!(m.get_nearest_chunk(6), "world");
        assert_eq!(m.get_nearest_chunk(11), "");
    }

    #[test]
    fn test_text_range() {
        let chunks = vec![ChunkBuffer::from_text("abc"), ChunkBuffer::from_text("def")];
        let m = PieceTreeModel::new(chunks, "\n", true);
        assert_eq!(m.get_text_range(2, 3), "cde");
        assert_eq!(m.get_text_range(6, 0), "");
    }

    #[test]
    fn test_line_cache_is_transparent() {
        let text: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let chunks = vec![ChunkBuffer::from_text(&text[..100]), ChunkBuffer::from_text(&text[100..])];
        let m = PieceTreeModel::new(chunks, "\n", true);
        let cold: Vec<String> = (1..=m.get_line_count()).map(|l| m.get_line_content(l)).collect();
        let warm: Vec<String> = (1..=m.get_line_count()).rev().map(|l| m.get_line_content(l)).collect();
        let warm: Vec<String> = warm.into_iter().rev().collect();
        assert_eq!(cold, warm);
        assert!(m.diagnostics().hit_count > 0 || m.diagnostics().miss_count > 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_line_zero_panics() {
        model("abc").get_line_content(0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_position_past_end_panics() {
        model("abc").get_position_at(4);
    }

    #[test]
    fn test_count_line_breaks() {
        assert_eq!(count_line_breaks(&[CR, LF, CR, b'a' as u16, LF]), 3);
        assert_eq!(count_line_breaks(&[CR]), 1);
        assert_eq!(line_start_by_scan(&[b'a' as u16, CR, LF, b'b' as u16], 1), 3);
        assert_eq!(line_start_by_scan(&[b'a' as u16], 1), 1);
    }
}
