use serde::{Deserialize, Serialize};

/// A position in the document (1-based line and column)
///
/// Columns count UTF-16 code units, so an astral character occupies two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line_number: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line_number: usize, column: usize) -> Self {
        Position {
            line_number,
            column,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.line_number, self.column)
    }
}

/// A range between two positions, start inclusive and end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start_line_number: usize,
    pub start_column: usize,
    pub end_line_number: usize,
    pub end_column: usize,
}

impl Range {
    /// Build a range, swapping the endpoints when given in reverse order
    pub fn new(
        start_line_number: usize,
        start_column: usize,
        end_line_number: usize,
        end_column: usize,
    ) -> Self {
        let start = Position::new(start_line_number, start_column);
        let end = Position::new(end_line_number, end_column);
        Self::from_positions(start, end)
    }

    pub fn from_positions(a: Position, b: Position) -> Self {
        let (start, end) = if b < a { (b, a) } else { (a, b) };
        Range {
            start_line_number: start.line_number,
            start_column: start.column,
            end_line_number: end.line_number,
            end_column: end.column,
        }
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line_number, self.start_column)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line_number, self.end_column)
    }

    pub fn is_empty(&self) -> bool {
        self.start_line_number == self.end_line_number && self.start_column == self.end_column
    }

    pub fn contains_position(&self, position: Position) -> bool {
        self.start() <= position && position <= self.end()
    }

    /// Ranges overlap or touch
    pub fn intersects_or_touches(&self, other: &Range) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }

    /// Smallest range covering both
    pub fn plus(&self, other: &Range) -> Range {
        let start = self.start().min(other.start());
        let end = self.end().max(other.end());
        Range::from_positions(start, end)
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{},{} -> {},{}]",
            self.start_line_number, self.start_column, self.end_line_number, self.end_column
        )
    }
}

/// How line terminators are rendered when extracting text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndOfLinePreference {
    /// Keep whatever terminators the document contains
    #[default]
    TextDefined,
    Lf,
    Crlf,
}

/// Line terminator used for documents that contain none yet
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum DefaultEndOfLine {
    #[default]
    Lf,
    Crlf,
}

impl DefaultEndOfLine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultEndOfLine::Lf => "\n",
            DefaultEndOfLine::Crlf => "\r\n",
        }
    }

    /// Display name for the line ending
    pub fn display_name(&self) -> &'static str {
        match self {
            DefaultEndOfLine::Lf => "LF",
            DefaultEndOfLine::Crlf => "CRLF",
        }
    }
}
