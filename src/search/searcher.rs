//! Regex stepping over a single text, and the per-line match collector.

use std::sync::Arc;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::params::SearchData;
use super::word_classifier::WordCharacterClassifier;
use crate::model::position::Range;

/// One search hit, with capture groups when they were requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindMatch {
    pub range: Range,
    pub matches: Option<Vec<String>>,
}

impl FindMatch {
    pub fn new(range: Range, matches: Option<Vec<String>>) -> Self {
        FindMatch { range, matches }
    }
}

/// A hit reported by [`PieceTreeSearcher::next`], in byte offsets of the searched text
#[derive(Debug)]
pub struct SearcherMatch<'t> {
    pub start: usize,
    pub end: usize,
    pub captures: Captures<'t>,
}

impl SearcherMatch<'_> {
    /// All groups, non-participating ones as empty strings
    pub fn groups(&self) -> Vec<String> {
        self.captures
            .iter()
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect()
    }
}

/// Steps a regex through a text, skipping zero-length repeats and matches that
/// fail the word-boundary check
#[derive(Debug, Clone)]
pub struct PieceTreeSearcher {
    regex: Regex,
    word_separators: Option<Arc<WordCharacterClassifier>>,
    last_index: usize,
    prev_match: Option<(usize, usize)>,
}

impl PieceTreeSearcher {
    pub fn new(word_separators: Option<Arc<WordCharacterClassifier>>, regex: Regex) -> Self {
        PieceTreeSearcher {
            regex,
            word_separators,
            last_index: 0,
            prev_match: None,
        }
    }

    pub fn from_search_data(data: &SearchData) -> Self {
        Self::new(data.word_separators.clone(), data.regex.clone())
    }

    /// Restart at byte offset `last_index`
    pub fn reset(&mut self, last_index: usize) {
        self.last_index = last_index;
        self.prev_match = None;
    }

    pub fn next<'t>(&mut self, text: &'t str) -> Option<SearcherMatch<'t>> {
        loop {
            if self.last_index > text.len() {
                return None;
            }
            // the previous hit reached the end of the text
            if self.prev_match.is_some_and(|(_, end)| end == text.len()) {
                return None;
            }
            let search_from = floor_char_boundary(text, self.last_index);
            let captures = self.regex.captures_at(text, search_from)?;
            let whole = captures.get(0)?;
            let (start, end) = (whole.start(), whole.end());

            if self.prev_match == Some((start, end)) {
                if start == end {
                    self.last_index = next_char_boundary(text, start);
                    continue;
                }
                return None;
            }
            self.prev_match = Some((start, end));
            self.last_index = if start == end {
                next_char_boundary(text, start)
            } else {
                end
            };

            let valid = self
                .word_separators
                .as_ref()
                .map_or(true, |classifier| classifier.is_valid_match(text, start, end));
            if valid {
                return Some(SearcherMatch {
                    start,
                    end,
                    captures,
                });
            }
        }
    }
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    match text[index..].chars().next() {
        Some(ch) => index + ch.len_utf8(),
        None => index + 1,
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// UTF-16 length of a string slice
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Byte offset of UTF-16 offset `units` in `text` (clamped to its length)
pub fn utf16_to_byte(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (byte, ch) in text.char_indices() {
        if seen >= units {
            return byte;
        }
        seen += ch.len_utf16();
    }
    text.len()
}

/// Maps increasing byte offsets of one text to UTF-16 offsets without
/// rescanning from the start each time
#[derive(Debug)]
pub struct Utf16Index<'t> {
    text: &'t str,
    byte: usize,
    units: usize,
}

impl<'t> Utf16Index<'t> {
    pub fn new(text: &'t str) -> Self {
        Utf16Index {
            text,
            byte: 0,
            units: 0,
        }
    }

    pub fn to_utf16(&mut self, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.units = 0;
        }
        self.units += utf16_len(&self.text[self.byte..byte]);
        self.byte = byte;
        self.units
    }
}

/// Offsets, in LF-normalized search text, of line feeds that stand for a CRLF
/// in the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFeedCounter {
    crlf_offsets: Vec<usize>,
}

impl LineFeedCounter {
    pub fn new(crlf_offsets: Vec<usize>) -> Self {
        LineFeedCounter { crlf_offsets }
    }

    /// Number of recorded line feeds strictly before `offset`
    pub fn count_before(&self, offset: usize) -> usize {
        self.crlf_offsets.partition_point(|&lf| lf < offset)
    }

    pub fn is_empty(&self) -> bool {
        self.crlf_offsets.is_empty()
    }
}

/// Collect the matches of `text` (the part of line `line_number` starting at
/// UTF-16 column offset `delta_offset`) into `result`
#[allow(clippy::too_many_arguments)]
pub fn find_matches_in_line(
    data: &SearchData,
    searcher: &mut PieceTreeSearcher,
    text: &str,
    line_number: usize,
    delta_offset: usize,
    capture_matches: bool,
    limit: usize,
    result: &mut Vec<FindMatch>,
) {
    let mut index = Utf16Index::new(text);

    if let (false, Some(needle)) = (capture_matches, data.simple_search.as_deref()) {
        let needle_units = utf16_len(needle);
        for (start, _) in text.match_indices(needle) {
            if result.len() >= limit {
                return;
            }
            let end = start + needle.len();
            if let Some(classifier) = &data.word_separators {
                if !classifier.is_valid_match(text, start, end) {
                    continue;
                }
            }
            let column = index.to_utf16(start) + delta_offset + 1;
            result.push(FindMatch::new(
                Range::new(line_number, column, line_number, column + needle_units),
                None,
            ));
        }
        return;
    }

    searcher.reset(0);
    while result.len() < limit {
        let Some(hit) = searcher.next(text) else {
            return;
        };
        let start_units = index.to_utf16(hit.start);
        let end_units = start_units + utf16_len(&text[hit.start..hit.end]);
        let range = Range::new(
            line_number,
            start_units + delta_offset + 1,
            line_number,
            end_units + delta_offset + 1,
        );
        let matches = capture_matches.then(|| hit.groups());
        result.push(FindMatch::new(range, matches));
    }
}
