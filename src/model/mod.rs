//! Document storage
//!
//! This module contains the chunk buffers, the red-black piece tree over them,
//! its edit algorithms and the builder that creates a tree from loaded text.

pub mod buffer;
pub mod builder;
pub mod chunk_buffer;
pub mod chunk_utils;
pub mod edit;
pub mod line_search;
pub mod node;
pub mod piece_tree;
pub mod position;
pub mod search_cache;
pub mod snapshot;
pub mod text_metadata;
pub mod tracer;

pub use buffer::PieceTreeBuffer;
pub use builder::{
    PieceTreeBuildResult, PieceTreeBuilder, PieceTreeBuilderOptions, PieceTreeTextBufferFactory,
};
pub use chunk_buffer::{BufferCursor, ChunkBuffer, LineStartTable};
pub use node::Piece;
pub use piece_tree::PieceTreeModel;
pub use position::{DefaultEndOfLine, EndOfLinePreference, Position, Range};
pub use search_cache::SearchCacheDiagnostics;
pub use snapshot::PieceTreeSnapshot;
pub use text_metadata::TextFlags;
pub use tracer::{PieceTreeTracer, TraceEvent, TracingTracer};
