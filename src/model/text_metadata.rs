//! Cheap content sniffing done while text is ingested.

/// U+2028 LINE SEPARATOR, U+2029 PARAGRAPH SEPARATOR, U+0085 NEXT LINE
const UNUSUAL_LINE_TERMINATORS: [u16; 3] = [0x2028, 0x2029, 0x0085];

fn is_rtl_code_unit(ch: u16) -> bool {
    matches!(ch, 0x0590..=0x08FF | 0x200F..=0x202E | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFC)
}

/// Whether the text may contain right-to-left characters (Hebrew, Arabic, bidi marks, ...)
pub fn contains_rtl(text: &[u16]) -> bool {
    text.iter().any(|&ch| is_rtl_code_unit(ch))
}

/// Whether the text contains line terminators other than CR and LF
pub fn contains_unusual_line_terminators(text: &[u16]) -> bool {
    text.iter().any(|ch| UNUSUAL_LINE_TERMINATORS.contains(ch))
}

/// Only tab, CR, LF and printable ASCII
pub fn is_basic_ascii(text: &[u16]) -> bool {
    text.iter()
        .all(|&ch| ch == b'\t' as u16 || ch == b'\r' as u16 || ch == b'\n' as u16 || (32..=126).contains(&ch))
}

/// Content flags of one piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFlags {
    pub might_contain_rtl: bool,
    pub might_contain_unusual_line_terminators: bool,
    pub might_contain_non_basic_ascii: bool,
}

impl TextFlags {
    /// Scan text; the RTL and terminator scans only run on non-ASCII input
    pub fn scan(text: &[u16]) -> Self {
        if is_basic_ascii(text) {
            return TextFlags::default();
        }
        TextFlags {
            might_contain_rtl: contains_rtl(text),
            might_contain_unusual_line_terminators: contains_unusual_line_terminators(text),
            might_contain_non_basic_ascii: true,
        }
    }

    /// Widen these flags with another scan
    pub fn merge(&mut self, other: TextFlags) {
        self.might_contain_rtl |= other.might_contain_rtl;
        self.might_contain_unusual_line_terminators |= other.might_contain_unusual_line_terminators;
        self.might_contain_non_basic_ascii |= other.might_contain_non_basic_ascii;
    }
}
