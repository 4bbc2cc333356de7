//! Piece-tree text storage for editors
//!
//! A document is a sequence of pieces pointing into immutable chunk buffers and
//! one append-only change buffer, indexed by a red-black tree that tracks
//! lengths and line breaks. Offsets, lengths and columns count UTF-16 code units.

pub mod config;
pub mod error;
pub mod model;
pub mod search;

pub use config::BufferConfig;
pub use error::{ConfigError, PieceTreeError};
pub use model::{
    DefaultEndOfLine, EndOfLinePreference, PieceTreeBuffer, PieceTreeBuilder, PieceTreeModel,
    Position, Range,
};
pub use search::{FindMatch, SearchData, SearchParams};
