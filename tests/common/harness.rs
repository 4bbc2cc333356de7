//! A piece tree buffer checked against a plain UTF-16 shadow after every edit

use piece_tree::model::{DefaultEndOfLine, PieceTreeBuilder, PieceTreeBuilderOptions};
use piece_tree::PieceTreeBuffer;

use super::split_lines;

pub struct ShadowHarness {
    pub buffer: PieceTreeBuffer,
    pub shadow: Vec<u16>,
}

impl ShadowHarness {
    /// Load `chunks` without EOL normalization
    pub fn new(chunks: &[&str]) -> Self {
        Self::with_chunk_size(chunks, 65535)
    }

    /// Small chunk sizes force many buffers and pieces
    pub fn with_chunk_size(chunks: &[&str], chunk_size: usize) -> Self {
        let options = PieceTreeBuilderOptions {
            normalize_eol: false,
            default_eol: DefaultEndOfLine::Lf,
            chunk_size,
            ..Default::default()
        };
        let result = PieceTreeBuilder::build_with_options(chunks.iter().copied(), options);
        let buffer = PieceTreeBuffer::from_build_result(result);
        let shadow = chunks.concat().encode_utf16().collect();
        ShadowHarness { buffer, shadow }
    }

    /// Load `text` with EOL normalization so the model settles on `eol`
    ///
    /// `text` should already use `eol` alone; edits must keep it that way
    /// (see [`ShadowHarness::splits_crlf`]).
    pub fn normalized(text: &str, eol: &str) -> Self {
        let default_eol = if eol == "\r\n" {
            DefaultEndOfLine::Crlf
        } else {
            DefaultEndOfLine::Lf
        };
        let options = PieceTreeBuilderOptions {
            normalize_eol: true,
            default_eol,
            ..Default::default()
        };
        let result = PieceTreeBuilder::build_with_options([text], options);
        let buffer = PieceTreeBuffer::from_build_result(result);
        let shadow = text.encode_utf16().collect();
        ShadowHarness { buffer, shadow }
    }

    /// Whether `offset` falls between the CR and LF of a pair
    pub fn splits_crlf(&self, offset: usize) -> bool {
        offset > 0
            && offset < self.shadow.len()
            && self.shadow[offset - 1] == b'\r' as u16
            && self.shadow[offset] == b'\n' as u16
    }

    pub fn len(&self) -> usize {
        self.shadow.len()
    }

    pub fn insert(&mut self, offset: usize, text: &str) {
        self.buffer.insert(offset, text);
        let units: Vec<u16> = text.encode_utf16().collect();
        self.shadow.splice(offset..offset, units);
    }

    pub fn delete(&mut self, offset: usize, count: usize) {
        self.buffer.delete(offset, count);
        self.shadow.drain(offset..offset + count);
    }

    pub fn shadow_text(&self) -> String {
        String::from_utf16_lossy(&self.shadow)
    }

    /// Compare content, line contents and lengths, and tree integrity with the shadow
    pub fn check(&self) -> Result<(), String> {
        let text = self.buffer.get_text();
        if text != self.shadow_text() {
            return Err(format!(
                "text diverged: tree {:?} shadow {:?}",
                text,
                self.shadow_text()
            ));
        }
        if self.buffer.len() != self.shadow.len() {
            return Err(format!(
                "length {} != shadow length {}",
                self.buffer.len(),
                self.shadow.len()
            ));
        }
        let lines = split_lines(&self.shadow);
        if self.buffer.get_line_count() != lines.len() {
            return Err(format!(
                "line count {} != shadow line count {}",
                self.buffer.get_line_count(),
                lines.len()
            ));
        }
        for (i, line) in lines.iter().enumerate() {
            let content = self.buffer.get_line_content(i + 1);
            if &content != line {
                return Err(format!("line {} is {:?}, expected {:?}", i + 1, content, line));
            }
            let length = self.buffer.get_line_length(i + 1);
            if length != line.encode_utf16().count() {
                return Err(format!("line {} has length {}, expected {:?}", i + 1, length, line));
            }
        }
        self.buffer.check_integrity().map_err(|e| e.to_string())
    }
}
