//! Streaming construction of a piece tree from text chunks.
//!
//! [`PieceTreeBuilder`] accepts text in arbitrary pieces, keeps CRLF pairs and
//! surrogate pairs together across chunk boundaries, strips a leading BOM and
//! sniffs the content flags. [`PieceTreeTextBufferFactory`] then picks the
//! document EOL and seeds a [`PieceTreeModel`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use super::chunk_buffer::{to_utf16, ChunkBuffer, CR, LF};
use super::chunk_utils::{is_high_surrogate, replace_line_endings, split_text, AVERAGE_BUFFER_SIZE};
use super::piece_tree::PieceTreeModel;
use super::position::DefaultEndOfLine;
use super::text_metadata::TextFlags;

const UTF8_BOM: u16 = 0xFEFF;

/// Options shared by the builder and the factory it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceTreeBuilderOptions {
    /// Rewrite all line terminators to the detected EOL
    pub normalize_eol: bool,
    pub default_eol: DefaultEndOfLine,
    /// Largest chunk created from accepted text
    pub chunk_size: usize,
    pub search_cache_capacity: NonZeroUsize,
}

impl Default for PieceTreeBuilderOptions {
    fn default() -> Self {
        Self {
            normalize_eol: true,
            default_eol: DefaultEndOfLine::Lf,
            chunk_size: AVERAGE_BUFFER_SIZE,
            search_cache_capacity: NonZeroUsize::MIN,
        }
    }
}

/// Everything construction learned about a document
#[derive(Debug)]
pub struct PieceTreeBuildResult {
    pub model: PieceTreeModel,
    /// Buffers of the fresh model, change buffer first
    pub buffers: Vec<Arc<ChunkBuffer>>,
    pub bom: String,
    pub might_contain_rtl: bool,
    pub might_contain_unusual_line_terminators: bool,
    pub might_contain_non_basic_ascii: bool,
    pub options: PieceTreeBuilderOptions,
}

impl PieceTreeBuildResult {
    pub fn flags(&self) -> TextFlags {
        TextFlags {
            might_contain_rtl: self.might_contain_rtl,
            might_contain_unusual_line_terminators: self.might_contain_unusual_line_terminators,
            might_contain_non_basic_ascii: self.might_contain_non_basic_ascii,
        }
    }
}

/// Accumulates text chunks
#[derive(Debug, Default)]
pub struct PieceTreeBuilder {
    options: PieceTreeBuilderOptions,
    chunks: Vec<ChunkBuffer>,
    bom: String,
    /// Trailing CR or high surrogate withheld from the last accepted chunk
    held: Option<u16>,
    flags: TextFlags,
}

impl PieceTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PieceTreeBuilderOptions) -> Self {
        PieceTreeBuilder {
            options,
            ..Default::default()
        }
    }

    /// Build a model in one go
    pub fn build_from_chunks<I, S>(
        chunks: I,
        normalize_eol: bool,
        default_eol: DefaultEndOfLine,
    ) -> PieceTreeBuildResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build_with_options(
            chunks,
            PieceTreeBuilderOptions {
                normalize_eol,
                default_eol,
                ..Default::default()
            },
        )
    }

    pub fn build_with_options<I, S>(chunks: I, options: PieceTreeBuilderOptions) -> PieceTreeBuildResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Self::with_options(options);
        for chunk in chunks {
            builder.accept_chunk(chunk.as_ref());
        }
        builder.finish().create(options.default_eol)
    }

    /// Feed the next piece of text
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let mut units = to_utf16(chunk);
        if self.chunks.is_empty() && self.held.is_none() && self.bom.is_empty() && units[0] == UTF8_BOM {
            self.bom = String::from('\u{FEFF}');
            units.remove(0);
        }

        let mut text: Vec<u16> = self.held.take().into_iter().collect();
        text.extend_from_slice(&units);
        if let Some(&last) = text.last() {
            if last == CR || is_high_surrogate(last) {
                self.held = text.pop();
            }
        }
        if !text.is_empty() {
            self.add_chunk(&text);
        }
    }

    fn add_chunk(&mut self, text: &[u16]) {
        for part in split_text(text, self.options.chunk_size) {
            self.flags.merge(TextFlags::scan(part));
            self.chunks.push(ChunkBuffer::from_utf16(part.to_vec()));
        }
    }

    /// Stop accepting text. A withheld unit is appended to the last chunk while it has room.
    pub fn finish(mut self) -> PieceTreeTextBufferFactory {
        if let Some(held) = self.held.take() {
            self.flags.merge(TextFlags::scan(&[held]));
            match self.chunks.pop() {
                Some(last) if last.len() < self.options.chunk_size => {
                    let mut text = last.text().to_vec();
                    text.push(held);
                    self.chunks.push(ChunkBuffer::from_utf16(text));
                }
                last => {
                    self.chunks.extend(last);
                    self.chunks.push(ChunkBuffer::from_utf16(vec![held]));
                }
            }
        }

        let (mut cr, mut lf, mut crlf) = (0, 0, 0);
        for chunk in &self.chunks {
            cr += chunk.cr_count();
            lf += chunk.lf_count();
            crlf += chunk.crlf_count();
        }
        tracing::debug!(
            chunks = self.chunks.len(),
            cr,
            lf,
            crlf,
            has_bom = !self.bom.is_empty(),
            "builder finished"
        );

        PieceTreeTextBufferFactory {
            chunks: self.chunks,
            bom: self.bom,
            cr,
            lf,
            crlf,
            flags: self.flags,
            options: self.options,
        }
    }
}

/// Sealed builder output; picks the EOL and creates the model
#[derive(Debug, Clone)]
pub struct PieceTreeTextBufferFactory {
    chunks: Vec<ChunkBuffer>,
    bom: String,
    cr: usize,
    lf: usize,
    crlf: usize,
    flags: TextFlags,
    options: PieceTreeBuilderOptions,
}

impl PieceTreeTextBufferFactory {
    /// EOL of the document: the default when it has no terminators, CRLF when
    /// CR-based terminators are the majority, LF otherwise
    pub fn eol(&self, default_eol: DefaultEndOfLine) -> &'static str {
        let total = self.cr + self.lf + self.crlf;
        if total == 0 {
            return default_eol.as_str();
        }
        if 2 * (self.cr + self.crlf) > total {
            "\r\n"
        } else {
            "\n"
        }
    }

    fn needs_normalization(&self, eol: &str) -> bool {
        if eol == "\r\n" {
            self.cr > 0 || self.lf > 0
        } else {
            self.cr > 0 || self.crlf > 0
        }
    }

    pub fn create(self, default_eol: DefaultEndOfLine) -> PieceTreeBuildResult {
        let eol = self.eol(default_eol);
        let normalize_eol = self.options.normalize_eol;
        let chunks = if normalize_eol && self.needs_normalization(eol) {
            let eol_units = to_utf16(eol);
            self.chunks
                .iter()
                .map(|chunk| ChunkBuffer::from_utf16(replace_line_endings(chunk.text(), &eol_units)))
                .collect()
        } else {
            self.chunks
        };

        let model = PieceTreeModel::with_options(
            chunks,
            eol,
            normalize_eol,
            self.options.chunk_size,
            self.options.search_cache_capacity,
        );
        let buffers = model.buffers().to_vec();
        PieceTreeBuildResult {
            model,
            buffers,
            bom: self.bom,
            might_contain_rtl: self.flags.might_contain_rtl,
            might_contain_unusual_line_terminators: self.flags.might_contain_unusual_line_terminators,
            might_contain_non_basic_ascii: self.flags.might_contain_non_basic_ascii,
            options: PieceTreeBuilderOptions {
                default_eol,
                ..self.options
            },
        }
    }

    /// Up to `limit` units of the first line
    pub fn get_first_line_text(&self, limit: usize) -> String {
        let mut units = Vec::with_capacity(limit.min(1024));
        for chunk in &self.chunks {
            if units.len() >= limit {
                break;
            }
            let take = (limit - units.len()).min(chunk.len());
            units.extend_from_slice(&chunk.text()[..take]);
        }
        let end = units
            .iter()
            .position(|&ch| ch == CR || ch == LF)
            .unwrap_or(units.len());
        String::from_utf16_lossy(&units[..end])
    }

    /// Text after the last line terminator within the final `limit` units
    pub fn get_last_line_text(&self, limit: usize) -> String {
        let mut tail: Vec<u16> = Vec::with_capacity(limit.min(1024));
        for chunk in self.chunks.iter().rev() {
            if tail.len() >= limit {
                break;
            }
            let take = (limit - tail.len()).min(chunk.len());
            let text = chunk.text();
            let mut part = text[text.len() - take..].to_vec();
            part.extend_from_slice(&tail);
            tail = part;
        }
        let start = tail
            .iter()
            .rposition(|&ch| ch == CR || ch == LF)
            .map_or(0, |i| i + 1);
        String::from_utf16_lossy(&tail[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(chunks: &[&str]) -> PieceTreeBuildResult {
        PieceTreeBuilder::build_from_chunks(chunks.iter().copied(), true, DefaultEndOfLine::Lf)
    }

    #[test]
    fn test_build_joins_chunks() {
        let result = build(&["hello ", "world\n", "again"]);
        assert_eq!(result.model.get_text(), "hello world\nagain");
        assert_eq!(result.model.get_line_count(), 2);
        assert_eq!(result.bom, "");
        assert!(!result.might_contain_non_basic_ascii);
        result.model.assert_piece_integrity();
    }

    #[test]
    fn test_bom_is_stripped() {
        let result = build(&["\u{FEFF}abc", "\u{FEFF}"]);
        assert_eq!(result.bom, "\u{FEFF}");
        assert_eq!(result.model.get_text(), "abc\u{FEFF}");
    }

    #[test]
    fn test_crlf_split_across_chunks_is_kept_together() {
        let mut builder = PieceTreeBuilder::with_options(PieceTreeBuilderOptions {
            normalize_eol: false,
            ..Default::default()
        });
        builder.accept_chunk("a\r");
        builder.accept_chunk("\nb\r");
        builder.accept_chunk("\r");
        let result = builder.finish().create(DefaultEndOfLine::Lf);
        assert_eq!(result.model.get_text(), "a\r\nb\r\r");
        assert_eq!(result.model.get_line_count(), 4);
        let contents: Vec<&[u16]> = result
            .model
            .pieces()
            .map(|piece| result.model.piece_content(&piece))
            .collect();
        for pair in contents.windows(2) {
            assert!(!(pair[0].last() == Some(&CR) && pair[1].first() == Some(&LF)));
        }
        result.model.assert_piece_integrity();
    }

    #[test]
    fn test_trailing_cr_is_restored_on_finish() {
        let mut builder = PieceTreeBuilder::with_options(PieceTreeBuilderOptions {
            normalize_eol: false,
            ..Default::default()
        });
        builder.accept_chunk("x\u{1F600}\r");
        let result = builder.finish().create(DefaultEndOfLine::Lf);
        assert_eq!(result.model.get_text(), "x\u{1F600}\r");
        assert_eq!(result.model.get_line_count(), 2);
        assert!(result.might_contain_non_basic_ascii);
    }

    #[test]
    fn test_held_unit_respects_chunk_size_and_flags() {
        let mut builder = PieceTreeBuilder::with_options(PieceTreeBuilderOptions {
            normalize_eol: false,
            chunk_size: 2,
            ..Default::default()
        });
        builder.accept_chunk("éb\r");
        let factory = builder.finish();
        assert_eq!(factory.flags, TextFlags::scan(&to_utf16("éb\r")));
        let result = factory.create(DefaultEndOfLine::Lf);
        assert_eq!(result.model.get_text(), "éb\r");
        // change buffer, "éb", then the held CR on its own
        assert_eq!(result.buffers.len(), 3);
        assert!(result.buffers.iter().all(|b| b.len() <= 2));
        assert!(result.model.check_integrity().is_ok());
    }

    #[test]
    fn test_eol_detection() {
        let result = PieceTreeBuilder::build_from_chunks(["a\r\nb\r\nc\n"], false, DefaultEndOfLine::Lf);
        assert_eq!(result.model.get_eol(), "\r\n");
        assert_eq!(result.model.get_text(), "a\r\nb\r\nc\n");
        assert!(!result.model.is_eol_normalized());

        let result = PieceTreeBuilder::build_from_chunks(["a\r\nb\nc\n"], false, DefaultEndOfLine::Lf);
        assert_eq!(result.model.get_eol(), "\n");

        let result = PieceTreeBuilder::build_from_chunks(["abc"], true, DefaultEndOfLine::Crlf);
        assert_eq!(result.model.get_eol(), "\r\n");
        assert_eq!(result.options.default_eol, DefaultEndOfLine::Crlf);
    }

    #[test]
    fn test_normalization_rewrites_minority_terminators() {
        let result = build(&["a\r\nb\r\nc\nd\re"]);
        assert_eq!(result.model.get_eol(), "\r\n");
        assert_eq!(result.model.get_text(), "a\r\nb\r\nc\r\nd\r\ne");
        assert!(result.model.is_eol_normalized());

        let result = build(&["a\nb\r\nc\n"]);
        assert_eq!(result.model.get_text(), "a\nb\nc\n");
    }

    #[test]
    fn test_content_flags() {
        let result = build(&["abc\u{05D0}"]);
        assert!(result.might_contain_rtl);
        assert!(result.might_contain_non_basic_ascii);
        assert!(!result.might_contain_unusual_line_terminators);

        let result = build(&["a\u{2028}b"]);
        assert!(result.might_contain_unusual_line_terminators);
        assert!(!result.flags().might_contain_rtl);
    }

    #[test]
    fn test_empty_input() {
        let result = build(&[]);
        assert_eq!(result.model.get_text(), "");
        assert_eq!(result.model.get_line_count(), 1);
        assert_eq!(result.buffers.len(), 1);

        let result = build(&["\r"]);
        assert_eq!(result.model.get_eol(), "\r\n");
        assert_eq!(result.model.get_text(), "\r\n");
    }

    #[test]
    fn test_large_chunk_is_split() {
        let options = PieceTreeBuilderOptions {
            chunk_size: 4,
            ..Default::default()
        };
        let result = PieceTreeBuilder::build_with_options(["abcdefghij"], options);
        assert_eq!(result.model.get_text(), "abcdefghij");
        assert_eq!(result.buffers.len(), 4);
    }

    #[test]
    fn test_first_and_last_line_previews() {
        let mut builder = PieceTreeBuilder::new();
        builder.accept_chunk("first line\nmid");
        builder.accept_chunk("dle\r\nlast line");
        let factory = builder.finish();
        assert_eq!(factory.get_first_line_text(100), "first line");
        assert_eq!(factory.get_first_line_text(5), "first");
        assert_eq!(factory.get_last_line_text(100), "last line");
        assert_eq!(factory.get_last_line_text(4), "line");
    }
}
