//! Search entry points on the model.

use super::chunk_buffer::{to_utf16, CR, LF};
use super::piece_tree::PieceTreeModel;
use super::position::Range;
use crate::search::params::SearchData;
use crate::search::searcher::{find_matches_in_line, FindMatch, LineFeedCounter, PieceTreeSearcher};

impl PieceTreeModel {
    /// Largest valid column of a line (its length plus one)
    pub fn get_line_max_column(&self, line_number: usize) -> usize {
        self.get_line_length(line_number) + 1
    }

    /// Matches of a single-line pattern inside `range`, in document order,
    /// at most `limit` of them
    pub fn find_matches_line_by_line(
        &self,
        range: &Range,
        data: &SearchData,
        capture_matches: bool,
        limit: usize,
    ) -> Vec<FindMatch> {
        let mut result = Vec::new();
        if limit == 0 {
            return result;
        }
        let mut searcher = PieceTreeSearcher::from_search_data(data);
        let start_line = range.start_line_number;
        let end_line = range.end_line_number;
        let start_delta = range.start_column - 1;

        if start_line == end_line {
            let text = self.line_slice(start_line, start_delta, range.end_column - 1);
            find_matches_in_line(
                data,
                &mut searcher,
                &text,
                start_line,
                start_delta,
                capture_matches,
                limit,
                &mut result,
            );
            return result;
        }

        let text = self.line_slice(start_line, start_delta, usize::MAX);
        find_matches_in_line(
            data,
            &mut searcher,
            &text,
            start_line,
            start_delta,
            capture_matches,
            limit,
            &mut result,
        );

        for line_number in start_line + 1..end_line {
            if result.len() >= limit {
                return result;
            }
            let text = self.get_line_content(line_number);
            find_matches_in_line(
                data,
                &mut searcher,
                &text,
                line_number,
                0,
                capture_matches,
                limit,
                &mut result,
            );
        }

        if result.len() < limit {
            let text = self.line_slice(end_line, 0, range.end_column - 1);
            find_matches_in_line(
                data,
                &mut searcher,
                &text,
                end_line,
                0,
                capture_matches,
                limit,
                &mut result,
            );
        }
        tracing::trace!(
            start_line,
            end_line,
            matches = result.len(),
            "line search finished"
        );
        result
    }

    /// UTF-16 columns `[start, end)` of a line, clamped to its length
    fn line_slice(&self, line_number: usize, start: usize, end: usize) -> String {
        let units = to_utf16(&self.get_line_content(line_number));
        let end = end.min(units.len());
        let start = start.min(end);
        String::from_utf16_lossy(&units[start..end])
    }

    /// Text of `range` with every line terminator rendered as LF.
    ///
    /// The counter records which of those LFs were CRLF in the document, so a
    /// match index in the returned text maps back to a document offset.
    pub fn value_in_range_for_search(&self, range: &Range) -> (String, Option<LineFeedCounter>) {
        let units = self.range_units(range);
        let mut out = Vec::with_capacity(units.len());
        let mut crlf_offsets = Vec::new();
        let mut i = 0;
        while i < units.len() {
            match units[i] {
                CR => {
                    if units.get(i + 1) == Some(&LF) {
                        crlf_offsets.push(out.len());
                        i += 1;
                    }
                    out.push(LF);
                }
                ch => out.push(ch),
            }
            i += 1;
        }
        let counter = (!crlf_offsets.is_empty()).then(|| LineFeedCounter::new(crlf_offsets));
        (String::from_utf16_lossy(&out), counter)
    }
}
