//! Find, find-next and find-previous over a model, including find-in-selection.

use crate::model::piece_tree::PieceTreeModel;
use crate::model::position::{Position, Range};

use super::params::SearchData;
use super::searcher::{
    find_matches_in_line, utf16_len, utf16_to_byte, FindMatch, LineFeedCounter,
    PieceTreeSearcher, SearcherMatch, Utf16Index,
};

/// Result cap used by callers that do not pass their own
pub const DEFAULT_LIMIT: usize = 999;

/// Clamp a position to an existing line and column
pub fn clamp_position(model: &PieceTreeModel, position: Position) -> Position {
    let line_count = model.get_line_count();
    let line_number = position.line_number.clamp(1, line_count);
    let max_column = model.get_line_max_column(line_number);
    Position::new(line_number, position.column.clamp(1, max_column))
}

/// Clamp both ends of a range
pub fn normalize_range(model: &PieceTreeModel, range: &Range) -> Range {
    Range::from_positions(
        clamp_position(model, range.start()),
        clamp_position(model, range.end()),
    )
}

fn document_end(model: &PieceTreeModel) -> Position {
    let line_count = model.get_line_count();
    Position::new(line_count, model.get_line_max_column(line_count))
}

/// Sorted, non-overlapping ranges to search in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRangeSet {
    ranges: Vec<Range>,
    is_whole_document: bool,
}

impl SearchRangeSet {
    pub fn entire_document(model: &PieceTreeModel) -> Self {
        SearchRangeSet {
            ranges: vec![Range::from_positions(Position::new(1, 1), document_end(model))],
            is_whole_document: true,
        }
    }

    pub fn from_range(model: &PieceTreeModel, range: &Range) -> Self {
        SearchRangeSet {
            ranges: vec![normalize_range(model, range)],
            is_whole_document: false,
        }
    }

    /// Selection ranges clamped, sorted and merged; the whole document unless
    /// `find_in_selection` is set and at least one range is given
    pub fn from_ranges(model: &PieceTreeModel, ranges: &[Range], find_in_selection: bool) -> Self {
        if !find_in_selection || ranges.is_empty() {
            return Self::entire_document(model);
        }
        let mut normalized: Vec<Range> = ranges.iter().map(|r| normalize_range(model, r)).collect();
        normalized.sort_by_key(|r| r.start());

        let mut merged: Vec<Range> = Vec::with_capacity(normalized.len());
        for range in normalized {
            match merged.last_mut() {
                Some(last) if range.start() <= last.end() => {
                    *last = Range::from_positions(last.start(), range.end().max(last.end()));
                }
                _ => merged.push(range),
            }
        }
        SearchRangeSet {
            ranges: merged,
            is_whole_document: false,
        }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn is_whole_document(&self) -> bool {
        self.is_whole_document
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn find_containing(&self, position: Position) -> Option<usize> {
        self.ranges
            .iter()
            .position(|r| r.start() <= position && position < r.end())
    }

    fn first_starting_after(&self, position: Position) -> usize {
        self.ranges
            .iter()
            .position(|r| r.start() >= position)
            .unwrap_or(0)
    }

    fn last_ending_before(&self, position: Position) -> usize {
        self.ranges
            .iter()
            .rposition(|r| r.end() <= position)
            .unwrap_or(self.ranges.len().saturating_sub(1))
    }
}

/// All matches inside `range`, at most `limit`
pub fn find_matches(
    model: &PieceTreeModel,
    data: &SearchData,
    range: &Range,
    capture_matches: bool,
    limit: usize,
) -> Vec<FindMatch> {
    if limit == 0 {
        return Vec::new();
    }
    let range = normalize_range(model, range);
    if data.is_multiline {
        let mut searcher = PieceTreeSearcher::from_search_data(data);
        return find_matches_multiline(model, &range, &mut searcher, capture_matches, limit);
    }
    model.find_matches_line_by_line(&range, data, capture_matches, limit)
}

/// All matches inside every range of `ranges`, at most `limit` in total
pub fn find_matches_in_ranges(
    model: &PieceTreeModel,
    data: &SearchData,
    ranges: &SearchRangeSet,
    capture_matches: bool,
    limit: usize,
) -> Vec<FindMatch> {
    let mut result = Vec::new();
    for range in ranges.ranges() {
        if result.len() >= limit {
            break;
        }
        result.extend(find_matches(model, data, range, capture_matches, limit - result.len()));
    }
    result
}

/// First match at or after `start`, wrapping around to the top of the document
pub fn find_next_match(
    model: &PieceTreeModel,
    data: &SearchData,
    start: Position,
    capture_matches: bool,
) -> Option<FindMatch> {
    let start = clamp_position(model, start);
    let mut searcher = PieceTreeSearcher::from_search_data(data);
    if data.is_multiline {
        return find_next_match_multiline(model, start, &mut searcher, capture_matches);
    }
    find_next_match_line_by_line(model, start, &mut searcher, capture_matches)
}

/// Last match ending at or before `start`, wrapping around to the bottom
pub fn find_previous_match(
    model: &PieceTreeModel,
    data: &SearchData,
    start: Position,
    capture_matches: bool,
) -> Option<FindMatch> {
    let start = clamp_position(model, start);
    let mut searcher = PieceTreeSearcher::from_search_data(data);
    if data.is_multiline {
        return find_previous_match_multiline(model, start, &mut searcher, capture_matches);
    }
    find_previous_match_line_by_line(model, start, &mut searcher, capture_matches)
}

/// [`find_next_match`] restricted to a range set, cycling through its ranges
pub fn find_next_match_in_ranges(
    model: &PieceTreeModel,
    data: &SearchData,
    start: Position,
    capture_matches: bool,
    ranges: &SearchRangeSet,
) -> Option<FindMatch> {
    if ranges.is_whole_document() {
        return find_next_match(model, data, start, capture_matches);
    }
    if ranges.is_empty() {
        return None;
    }
    let start = clamp_position(model, start);
    let count = ranges.len();
    let mut visited = 0;
    let mut index = match ranges.find_containing(start) {
        Some(index) => {
            let range = ranges.ranges()[index];
            if start < range.end() {
                let partial = Range::from_positions(start, range.end());
                if let Some(found) = find_matches(model, data, &partial, capture_matches, 1).pop() {
                    return Some(found);
                }
            }
            // the containing range is searched again in full after the others
            (index + 1) % count
        }
        None => ranges.first_starting_after(start),
    };
    while visited < count {
        let range = ranges.ranges()[index];
        if let Some(found) = find_matches(model, data, &range, capture_matches, 1).pop() {
            return Some(found);
        }
        visited += 1;
        index = (index + 1) % count;
    }
    None
}

/// [`find_previous_match`] restricted to a range set, cycling backwards
pub fn find_previous_match_in_ranges(
    model: &PieceTreeModel,
    data: &SearchData,
    start: Position,
    capture_matches: bool,
    ranges: &SearchRangeSet,
) -> Option<FindMatch> {
    if ranges.is_whole_document() {
        return find_previous_match(model, data, start, capture_matches);
    }
    if ranges.is_empty() {
        return None;
    }
    let start = clamp_position(model, start);
    let count = ranges.len();
    let mut visited = 0;
    let mut index = match ranges.find_containing(start) {
        Some(index) => {
            let range = ranges.ranges()[index];
            if start > range.start() {
                let partial = Range::from_positions(range.start(), start);
                if let Some(found) = find_matches(model, data, &partial, capture_matches, usize::MAX).pop() {
                    return Some(found);
                }
            }
            (index + count - 1) % count
        }
        None => ranges.last_ending_before(start),
    };
    while visited < count {
        let range = ranges.ranges()[index];
        if let Some(found) = find_matches(model, data, &range, capture_matches, usize::MAX).pop() {
            return Some(found);
        }
        visited += 1;
        index = (index + count - 1) % count;
    }
    None
}

/// Document range of a match found in LF-normalized search text.
///
/// `delta_offset` is the document offset where the search text starts; the
/// match indices are UTF-16 offsets into that text.
pub fn get_multiline_match_range(
    model: &PieceTreeModel,
    delta_offset: usize,
    line_feed_counter: Option<&LineFeedCounter>,
    match_index: usize,
    match_length: usize,
) -> Range {
    let (start_offset, end_offset) = match line_feed_counter {
        Some(counter) => {
            let before_start = counter.count_before(match_index);
            let before_end = counter.count_before(match_index + match_length);
            (
                delta_offset + match_index + before_start,
                delta_offset + match_index + match_length + before_end,
            )
        }
        None => (
            delta_offset + match_index,
            delta_offset + match_index + match_length,
        ),
    };
    Range::from_positions(
        model.get_position_at(start_offset),
        model.get_position_at(end_offset),
    )
}

fn multiline_match(
    model: &PieceTreeModel,
    text: &str,
    index: &mut Utf16Index<'_>,
    delta_offset: usize,
    counter: Option<&LineFeedCounter>,
    hit: &SearcherMatch<'_>,
    capture_matches: bool,
) -> FindMatch {
    let match_index = index.to_utf16(hit.start);
    let match_length = utf16_len(&text[hit.start..hit.end]);
    let range = get_multiline_match_range(model, delta_offset, counter, match_index, match_length);
    FindMatch::new(range, capture_matches.then(|| hit.groups()))
}

fn find_matches_multiline(
    model: &PieceTreeModel,
    range: &Range,
    searcher: &mut PieceTreeSearcher,
    capture_matches: bool,
    limit: usize,
) -> Vec<FindMatch> {
    let delta_offset = model.get_offset_at(range.start_line_number, range.start_column);
    let (text, counter) = model.value_in_range_for_search(range);
    let mut index = Utf16Index::new(&text);
    let mut result = Vec::new();

    searcher.reset(0);
    while result.len() < limit {
        let Some(hit) = searcher.next(&text) else {
            break;
        };
        result.push(multiline_match(
            model,
            &text,
            &mut index,
            delta_offset,
            counter.as_ref(),
            &hit,
            capture_matches,
        ));
    }
    result
}

fn find_next_match_multiline(
    model: &PieceTreeModel,
    start: Position,
    searcher: &mut PieceTreeSearcher,
    capture_matches: bool,
) -> Option<FindMatch> {
    let text_start = Position::new(start.line_number, 1);
    let range = Range::from_positions(text_start, document_end(model));
    let delta_offset = model.get_offset_at(text_start.line_number, 1);
    let (text, counter) = model.value_in_range_for_search(&range);

    searcher.reset(utf16_to_byte(&text, start.column - 1));
    if let Some(hit) = searcher.next(&text) {
        let mut index = Utf16Index::new(&text);
        return Some(multiline_match(
            model,
            &text,
            &mut index,
            delta_offset,
            counter.as_ref(),
            &hit,
            capture_matches,
        ));
    }

    if start != Position::new(1, 1) {
        return find_next_match_multiline(model, Position::new(1, 1), searcher, capture_matches);
    }
    None
}

fn find_previous_match_multiline(
    model: &PieceTreeModel,
    start: Position,
    searcher: &mut PieceTreeSearcher,
    capture_matches: bool,
) -> Option<FindMatch> {
    let range = normalize_range(model, &Range::from_positions(Position::new(1, 1), start));
    let mut matches = find_matches_multiline(model, &range, searcher, capture_matches, DEFAULT_LIMIT * 10);
    if let Some(last) = matches.pop() {
        return Some(last);
    }

    let end = document_end(model);
    if start != end {
        return find_previous_match_multiline(model, end, searcher, capture_matches);
    }
    None
}

fn find_next_match_line_by_line(
    model: &PieceTreeModel,
    start: Position,
    searcher: &mut PieceTreeSearcher,
    capture_matches: bool,
) -> Option<FindMatch> {
    let line_count = model.get_line_count();
    let first = model.get_line_content(start.line_number);
    if let Some(found) = first_match_in_line(searcher, &first, start.line_number, start.column, capture_matches) {
        return Some(found);
    }

    // the start line comes around again last, searched from its beginning
    for i in 1..=line_count {
        let line_number = (start.line_number + i - 1) % line_count + 1;
        let text = model.get_line_content(line_number);
        if let Some(found) = first_match_in_line(searcher, &text, line_number, 1, capture_matches) {
            return Some(found);
        }
    }
    None
}

fn find_previous_match_line_by_line(
    model: &PieceTreeModel,
    start: Position,
    searcher: &mut PieceTreeSearcher,
    capture_matches: bool,
) -> Option<FindMatch> {
    let line_count = model.get_line_count();
    let first = model.get_line_content(start.line_number);
    let head_end = utf16_to_byte(&first, start.column - 1);
    if let Some(found) = last_match_in_line(searcher, &first[..head_end], start.line_number, capture_matches) {
        return Some(found);
    }

    for i in 1..=line_count {
        let line_number = (line_count + start.line_number - i - 1) % line_count + 1;
        let text = model.get_line_content(line_number);
        if let Some(found) = last_match_in_line(searcher, &text, line_number, capture_matches) {
            return Some(found);
        }
    }
    None
}

fn line_match(text: &str, line_number: usize, hit: &SearcherMatch<'_>, capture_matches: bool) -> FindMatch {
    let start = utf16_len(&text[..hit.start]) + 1;
    let end = start + utf16_len(&text[hit.start..hit.end]);
    FindMatch::new(
        Range::new(line_number, start, line_number, end),
        capture_matches.then(|| hit.groups()),
    )
}

fn first_match_in_line(
    searcher: &mut PieceTreeSearcher,
    text: &str,
    line_number: usize,
    from_column: usize,
    capture_matches: bool,
) -> Option<FindMatch> {
    searcher.reset(utf16_to_byte(text, from_column.saturating_sub(1)));
    let hit = searcher.next(text)?;
    Some(line_match(text, line_number, &hit, capture_matches))
}

fn last_match_in_line(
    searcher: &mut PieceTreeSearcher,
    text: &str,
    line_number: usize,
    capture_matches: bool,
) -> Option<FindMatch> {
    searcher.reset(0);
    let mut best = None;
    while let Some(hit) = searcher.next(text) {
        best = Some(line_match(text, line_number, &hit, capture_matches));
    }
    best
}

/// Single-line matches of `text` treated as line `line_number` from its first column
pub fn find_matches_in_text_line(
    data: &SearchData,
    text: &str,
    line_number: usize,
    capture_matches: bool,
    limit: usize,
) -> Vec<FindMatch> {
    let mut searcher = PieceTreeSearcher::from_search_data(data);
    let mut result = Vec::new();
    find_matches_in_line(data, &mut searcher, text, line_number, 0, capture_matches, limit, &mut result);
    result
}
