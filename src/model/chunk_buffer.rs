//! Backing text storage for the piece tree.
//!
//! A [`ChunkBuffer`] is a blob of UTF-16 code units plus the offsets where each
//! of its lines starts. Pieces address text inside a buffer with a local
//! [`BufferCursor`] (line, column) rather than with document-global offsets.

pub(crate) const CR: u16 = b'\r' as u16;
pub(crate) const LF: u16 = b'\n' as u16;

/// Encode a `&str` as UTF-16 code units
pub fn to_utf16(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// A line/column position local to one buffer (both 0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        BufferCursor { line, column }
    }
}

/// Line-start offsets of a text plus per-terminator counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStartTable {
    pub line_starts: Vec<usize>,
    /// Lone `\r` terminators
    pub cr_count: usize,
    /// Lone `\n` terminators
    pub lf_count: usize,
    /// `\r\n` pairs
    pub crlf_count: usize,
    /// Only tab and printable ASCII (line terminators ignored)
    pub is_basic_ascii: bool,
}

impl LineStartTable {
    /// Scan `text` once. A CRLF pair yields a single line start pointing past both units.
    pub fn build(text: &[u16]) -> Self {
        let mut line_starts = vec![0];
        let mut cr_count = 0;
        let mut lf_count = 0;
        let mut crlf_count = 0;
        let mut is_basic_ascii = true;

        let len = text.len();
        let mut i = 0;
        while i < len {
            let ch = text[i];
            if ch == CR {
                if i + 1 < len && text[i + 1] == LF {
                    crlf_count += 1;
                    line_starts.push(i + 2);
                    i += 1;
                } else {
                    cr_count += 1;
                    line_starts.push(i + 1);
                }
            } else if ch == LF {
                lf_count += 1;
                line_starts.push(i + 1);
            } else if is_basic_ascii && ch != b'\t' as u16 && !(32..=126).contains(&ch) {
                is_basic_ascii = false;
            }
            i += 1;
        }

        LineStartTable {
            line_starts,
            cr_count,
            lf_count,
            crlf_count,
            is_basic_ascii,
        }
    }

    /// Number of line terminators (CRLF counted once)
    pub fn line_break_count(&self) -> usize {
        self.line_starts.len() - 1
    }
}

/// An immutable chunk of text with its line-start table.
///
/// Buffer 0 of a piece tree is the change buffer and grows through
/// [`ChunkBuffer::append`]; every other buffer is never modified after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBuffer {
    text: Vec<u16>,
    line_starts: Vec<usize>,
    cr_count: usize,
    lf_count: usize,
    crlf_count: usize,
    is_basic_ascii: bool,
}

impl ChunkBuffer {
    /// Create an empty buffer (a single line starting at 0)
    pub fn empty() -> Self {
        ChunkBuffer {
            text: Vec::new(),
            line_starts: vec![0],
            cr_count: 0,
            lf_count: 0,
            crlf_count: 0,
            is_basic_ascii: true,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_utf16(to_utf16(text))
    }

    /// Build a buffer from UTF-16 code units, computing the line-start table
    pub fn from_utf16(text: Vec<u16>) -> Self {
        let table = LineStartTable::build(&text);
        Self::with_table(text, table)
    }

    pub fn with_table(text: Vec<u16>, table: LineStartTable) -> Self {
        ChunkBuffer {
            text,
            line_starts: table.line_starts,
            cr_count: table.cr_count,
            lf_count: table.lf_count,
            crlf_count: table.crlf_count,
            is_basic_ascii: table.is_basic_ascii,
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &[u16] {
        &self.text
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn cr_count(&self) -> usize {
        self.cr_count
    }

    pub fn lf_count(&self) -> usize {
        self.lf_count
    }

    pub fn crlf_count(&self) -> usize {
        self.crlf_count
    }

    pub fn is_basic_ascii(&self) -> bool {
        self.is_basic_ascii
    }

    /// Absolute offset of a local cursor.
    ///
    /// Panics when the cursor's line does not exist or its column runs past the end of the buffer.
    pub fn offset_of(&self, cursor: BufferCursor) -> usize {
        let line_start = match self.line_starts.get(cursor.line) {
            Some(start) => *start,
            None => panic!(
                "buffer cursor line {} out of range (buffer has {} lines)",
                cursor.line,
                self.line_starts.len()
            ),
        };
        let offset = line_start + cursor.column;
        assert!(
            offset <= self.text.len(),
            "buffer cursor {:?} points past the end of the buffer (len {})",
            cursor,
            self.text.len()
        );
        offset
    }

    /// Canonical cursor for an absolute offset (the line whose start is the last one <= offset)
    pub fn cursor_at(&self, offset: usize) -> BufferCursor {
        assert!(
            offset <= self.text.len(),
            "buffer offset {} out of range (len {})",
            offset,
            self.text.len()
        );
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert_at) => insert_at - 1,
        };
        BufferCursor {
            line,
            column: offset - self.line_starts[line],
        }
    }

    /// Cursor just past the last code unit
    pub fn end_cursor(&self) -> BufferCursor {
        let line = self.line_starts.len() - 1;
        BufferCursor {
            line,
            column: self.text.len() - self.line_starts[line],
        }
    }

    /// Text between two local cursors
    pub fn slice(&self, start: BufferCursor, end: BufferCursor) -> &[u16] {
        let start = self.offset_of(start);
        let end = self.offset_of(end);
        assert!(start <= end, "inverted buffer slice {}..{}", start, end);
        &self.text[start..end]
    }

    pub fn slice_offsets(&self, start: usize, end: usize) -> &[u16] {
        &self.text[start..end]
    }

    pub fn char_code_at(&self, offset: usize) -> Option<u16> {
        self.text.get(offset).copied()
    }

    pub fn ends_with_cr(&self) -> bool {
        self.text.last() == Some(&CR)
    }

    /// Append text, merging the new line starts into the table.
    ///
    /// A `\n` landing right after a trailing `\r` joins it into one CRLF terminator.
    pub fn append(&mut self, value: &[u16]) {
        if value.is_empty() {
            return;
        }
        let old_len = self.text.len();
        let joins_crlf = self.ends_with_cr() && value[0] == LF;

        self.text.extend_from_slice(value);
        let table = LineStartTable::build(value);

        if joins_crlf {
            // the start recorded for the lone CR moves past the LF
            self.line_starts.pop();
            self.cr_count -= 1;
            self.lf_count += table.lf_count - 1;
            self.crlf_count += table.crlf_count + 1;
        } else {
            self.lf_count += table.lf_count;
            self.crlf_count += table.crlf_count;
        }
        self.cr_count += table.cr_count;
        self.is_basic_ascii &= table.is_basic_ascii;
        self.line_starts
            .extend(table.line_starts.iter().skip(1).map(|start| start + old_len));
    }

    /// Decode the whole buffer (lossy for unpaired surrogates)
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts_mixed_terminators() {
        let table = LineStartTable::build(&to_utf16("a\r\nb\rc\nd"));
        assert_eq!(table.line_starts, vec![0, 3, 5, 7]);
        assert_eq!(table.crlf_count, 1);
        assert_eq!(table.cr_count, 1);
        assert_eq!(table.lf_count, 1);
        assert!(table.is_basic_ascii);
        assert_eq!(table.line_break_count(), 3);
    }

    #[test]
    fn test_basic_ascii_detection() {
        assert!(LineStartTable::build(&to_utf16("tab\there\n")).is_basic_ascii);
        assert!(!LineStartTable::build(&to_utf16("caf\u{e9}")).is_basic_ascii);
        assert!(!LineStartTable::build(&to_utf16("bell\u{7}")).is_basic_ascii);
    }

    #[test]
    fn test_cursor_offset_conversion() {
        let buf = ChunkBuffer::from_text("ab\ncd\r\nef");
        assert_eq!(buf.cursor_at(0), BufferCursor::new(0, 0));
        assert_eq!(buf.cursor_at(3), BufferCursor::new(1, 0));
        // between CR and LF stays on the CR's line
        assert_eq!(buf.cursor_at(6), BufferCursor::new(1, 3));
        assert_eq!(buf.cursor_at(7), BufferCursor::new(2, 0));
        assert_eq!(buf.end_cursor(), BufferCursor::new(2, 2));
        for offset in 0..=buf.len() {
            assert_eq!(buf.offset_of(buf.cursor_at(offset)), offset);
        }
    }

    #[test]
    fn test_slice() {
        let buf = ChunkBuffer::from_text("hello\nworld");
        let text = buf.slice(BufferCursor::new(0, 3), BufferCursor::new(1, 2));
        assert_eq!(String::from_utf16_lossy(text), "lo\nwo");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_offset_of_bad_line_panics() {
        let buf = ChunkBuffer::from_text("one line");
        buf.offset_of(BufferCursor::new(3, 0));
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn test_offset_of_bad_column_panics() {
        let buf = ChunkBuffer::from_text("abc");
        buf.offset_of(BufferCursor::new(0, 10));
    }

    #[test]
    fn test_append_merges_line_starts() {
        let mut buf = ChunkBuffer::from_text("ab\n");
        buf.append(&to_utf16("cd\nef"));
        assert_eq!(buf.to_string_lossy(), "ab\ncd\nef");
        assert_eq!(buf.line_starts(), &[0, 3, 6]);
        assert_eq!(buf.lf_count(), 2);
        assert_eq!(buf.line_starts(), LineStartTable::build(buf.text()).line_starts);
    }

    #[test]
    fn test_append_joins_split_crlf() {
        let mut buf = ChunkBuffer::from_text("ab\r");
        assert_eq!(buf.line_starts(), &[0, 3]);
        buf.append(&to_utf16("\ncd"));
        assert_eq!(buf.line_starts(), &[0, 4]);
        assert_eq!(buf.cr_count(), 0);
        assert_eq!(buf.lf_count(), 0);
        assert_eq!(buf.crlf_count(), 1);
        let fresh = LineStartTable::build(buf.text());
        assert_eq!(buf.line_starts(), fresh.line_starts);
        assert_eq!(buf.crlf_count(), fresh.crlf_count);
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut buf = ChunkBuffer::from_text("x");
        buf.append(&[]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.line_starts(), &[0]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn eol_heavy_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![Just("\r"), Just("\n"), Just("\r\n"), Just("a"), Just("é")],
            0..40,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn prop_append_matches_fresh_build(a in eol_heavy_text(), b in eol_heavy_text()) {
            let mut buf = ChunkBuffer::from_text(&a);
            buf.append(&to_utf16(&b));
            let whole = ChunkBuffer::from_text(&format!("{a}{b}"));
            prop_assert_eq!(buf, whole);
        }

        #[test]
        fn prop_cursor_roundtrip(text in eol_heavy_text()) {
            let buf = ChunkBuffer::from_text(&text);
            for offset in 0..=buf.len() {
                prop_assert_eq!(buf.offset_of(buf.cursor_at(offset)), offset);
            }
        }
    }
}
