//! Text buffer façade over the piece tree
//! Carries what construction learned about the document (BOM, content flags)
//! alongside the model, and keeps that metadata current across edits

use crate::config::BufferConfig;
use crate::error::PieceTreeError;
use crate::model::builder::{PieceTreeBuildResult, PieceTreeBuilder, PieceTreeBuilderOptions};
use crate::model::chunk_buffer::to_utf16;
use crate::model::piece_tree::PieceTreeModel;
use crate::model::position::{DefaultEndOfLine, EndOfLinePreference, Position, Range};
use crate::model::snapshot::PieceTreeSnapshot;
use crate::model::text_metadata::TextFlags;
use crate::search::{self, FindMatch, SearchParams, DEFAULT_LIMIT};
use std::cmp::Ordering;

/// A document: piece tree plus BOM and content flags
#[derive(Debug)]
pub struct PieceTreeBuffer {
    model: PieceTreeModel,
    bom: String,
    flags: TextFlags,
    search_limit: usize,
}

impl PieceTreeBuffer {
    /// Create a buffer from a single string, normalizing line endings
    pub fn new(text: &str) -> Self {
        Self::from_chunks([text], true)
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(text)
    }

    /// Create an empty buffer
    pub fn empty() -> Self {
        Self::from_chunks(std::iter::empty::<&str>(), true)
    }

    pub fn from_chunks<I, S>(chunks: I, normalize_eol: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_build_result(PieceTreeBuilder::build_from_chunks(
            chunks,
            normalize_eol,
            DefaultEndOfLine::Lf,
        ))
    }

    /// Create a buffer with the construction and search settings of `config`
    pub fn with_config<I, S>(chunks: I, config: &BufferConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = PieceTreeBuilderOptions {
            normalize_eol: config.normalize_eol,
            default_eol: config.default_eol,
            chunk_size: config.chunk_size.max(2),
            search_cache_capacity: config.cache_capacity(),
        };
        let mut buffer =
            Self::from_build_result(PieceTreeBuilder::build_with_options(chunks, options));
        buffer.search_limit = config.search_limit;
        buffer
    }

    pub fn from_build_result(result: PieceTreeBuildResult) -> Self {
        let flags = result.flags();
        PieceTreeBuffer {
            model: result.model,
            bom: result.bom,
            flags,
            search_limit: DEFAULT_LIMIT,
        }
    }

    pub fn model(&self) -> &PieceTreeModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut PieceTreeModel {
        &mut self.model
    }

    // ---- metadata ----

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.model.total_length()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_length(&self) -> usize {
        self.len()
    }

    pub fn get_eol(&self) -> &str {
        self.model.get_eol()
    }

    pub fn get_bom(&self) -> &str {
        &self.bom
    }

    pub fn might_contain_rtl(&self) -> bool {
        self.flags.might_contain_rtl
    }

    pub fn might_contain_unusual_line_terminators(&self) -> bool {
        self.flags.might_contain_unusual_line_terminators
    }

    pub fn reset_might_contain_unusual_line_terminators(&mut self) {
        self.flags.might_contain_unusual_line_terminators = false;
    }

    pub fn might_contain_non_basic_ascii(&self) -> bool {
        self.flags.might_contain_non_basic_ascii
    }

    // ---- edits ----

    /// Switch the document line ending, rewriting every terminator
    pub fn set_eol(&mut self, eol: &str) -> Result<(), PieceTreeError> {
        if eol != "\n" && eol != "\r\n" {
            return Err(PieceTreeError::InvalidEol(eol.to_string()));
        }
        self.model.normalize_eol(eol);
        Ok(())
    }

    /// Replace `delete_len` code units at `offset` with `text`
    pub fn apply_edit(&mut self, offset: usize, delete_len: usize, text: &str) {
        let total = self.model.total_length();
        assert!(
            offset <= total && delete_len <= total - offset,
            "edit {}..{} out of range (document length {})",
            offset,
            offset + delete_len,
            total
        );
        tracing::trace!(offset, delete_len, insert_len = text.len(), "apply edit");
        if delete_len > 0 {
            self.model.delete(offset, delete_len);
        }
        if !text.is_empty() {
            self.flags.merge(TextFlags::scan(&to_utf16(text)));
            self.model.insert(offset, text);
        }
    }

    pub fn insert(&mut self, offset: usize, text: &str) {
        self.apply_edit(offset, 0, text);
    }

    pub fn delete(&mut self, offset: usize, count: usize) {
        self.apply_edit(offset, count, "");
    }

    // ---- reads ----

    pub fn create_snapshot(&self, preserve_bom: bool) -> PieceTreeSnapshot {
        let bom = if preserve_bom { self.bom.as_str() } else { "" };
        self.model.create_snapshot(bom)
    }

    pub fn get_text(&self) -> String {
        self.model.get_text()
    }

    /// Text of `[offset, offset + length)`, clamped to the document
    pub fn get_text_range(&self, offset: usize, length: usize) -> String {
        let total = self.model.total_length();
        let start = offset.min(total);
        let length = length.min(total - start);
        self.model.get_text_range(start, length)
    }

    pub fn get_line_count(&self) -> usize {
        self.model.get_line_count()
    }

    pub fn get_line_content(&self, line_number: usize) -> String {
        self.model.get_line_content(line_number)
    }

    pub fn get_lines_content(&self) -> Vec<String> {
        self.model.get_lines_content()
    }

    pub fn get_line_length(&self, line_number: usize) -> usize {
        self.model.get_line_length(line_number)
    }

    pub fn get_line_max_column(&self, line_number: usize) -> usize {
        self.model.get_line_max_column(line_number)
    }

    pub fn get_offset_at(&self, line_number: usize, column: usize) -> usize {
        self.model.get_offset_at(line_number, column)
    }

    pub fn get_position_at(&self, offset: usize) -> Position {
        self.model.get_position_at(offset)
    }

    pub fn get_char_code(&self, offset: usize) -> Option<u16> {
        self.model.get_char_code(offset)
    }

    pub fn get_line_char_code(&self, line_number: usize, index: usize) -> Option<u16> {
        self.model.get_line_char_code(line_number, index)
    }

    pub fn get_nearest_chunk(&self, offset: usize) -> String {
        self.model.get_nearest_chunk(offset)
    }

    pub fn get_value_in_range(&self, range: &Range, eol: EndOfLinePreference) -> String {
        self.model.get_value_in_range(range, eol)
    }

    /// Length of [`get_value_in_range`](Self::get_value_in_range) without building the text
    pub fn get_value_length_in_range(&self, range: &Range, eol: EndOfLinePreference) -> usize {
        if range.is_empty() {
            return 0;
        }
        if range.start_line_number == range.end_line_number {
            return range.end_column - range.start_column;
        }
        let start = self
            .model
            .get_offset_at(range.start_line_number, range.start_column);
        let end = self
            .model
            .get_offset_at(range.end_line_number, range.end_column);
        let length = end - start;
        let line_breaks = range.end_line_number - range.start_line_number;

        let desired = match eol {
            EndOfLinePreference::TextDefined => return length,
            EndOfLinePreference::Lf => 1,
            EndOfLinePreference::Crlf => 2,
        };
        let actual = self.get_eol().len();
        match desired.cmp(&actual) {
            Ordering::Equal => length,
            Ordering::Greater => length + line_breaks,
            Ordering::Less => length - line_breaks,
        }
    }

    /// Same BOM, EOL and content
    pub fn equal(&self, other: &PieceTreeBuffer) -> bool {
        if self.bom != other.bom
            || self.get_eol() != other.get_eol()
            || self.len() != other.len()
            || self.get_line_count() != other.get_line_count()
        {
            return false;
        }
        let (a, b) = (&self.model, &other.model);
        a.pieces()
            .flat_map(|piece| a.piece_content(&piece).iter().copied())
            .eq(b.pieces().flat_map(|piece| b.piece_content(&piece).iter().copied()))
    }

    pub fn check_integrity(&self) -> Result<(), PieceTreeError> {
        self.model.check_integrity()
    }

    // ---- search ----

    /// All matches of `params` in `range` (the whole document when `None`)
    pub fn find_matches(
        &self,
        params: &SearchParams,
        range: Option<Range>,
        capture_matches: bool,
    ) -> Result<Vec<FindMatch>, PieceTreeError> {
        let Some(data) = params.try_parse_search_request()? else {
            return Ok(Vec::new());
        };
        let range = range.unwrap_or_else(|| self.full_range());
        Ok(search::find_matches(
            &self.model,
            &data,
            &range,
            capture_matches,
            self.search_limit,
        ))
    }

    /// First match at or after `start`, wrapping around the end of the document
    pub fn find_next_match(
        &self,
        params: &SearchParams,
        start: Position,
        capture_matches: bool,
    ) -> Result<Option<FindMatch>, PieceTreeError> {
        let Some(data) = params.try_parse_search_request()? else {
            return Ok(None);
        };
        Ok(search::find_next_match(
            &self.model,
            &data,
            start,
            capture_matches,
        ))
    }

    /// Last match before `start`, wrapping around the start of the document
    pub fn find_previous_match(
        &self,
        params: &SearchParams,
        start: Position,
        capture_matches: bool,
    ) -> Result<Option<FindMatch>, PieceTreeError> {
        let Some(data) = params.try_parse_search_request()? else {
            return Ok(None);
        };
        Ok(search::find_previous_match(
            &self.model,
            &data,
            start,
            capture_matches,
        ))
    }

    fn full_range(&self) -> Range {
        let line_count = self.get_line_count();
        Range::new(1, 1, line_count, self.get_line_max_column(line_count))
    }
}

impl Default for PieceTreeBuffer {
    fn default() -> Self {
        Self::empty()
    }
}
