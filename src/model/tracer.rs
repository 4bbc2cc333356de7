//! Opt-in hook for observing tree mutations.
//!
//! A model carries no tracer by default, so edits pay nothing for it. Install
//! [`TracingTracer`] (or any [`PieceTreeTracer`]) with
//! `PieceTreeModel::set_tracer` to follow edits while debugging.

use std::fmt::Debug;

/// A notable step inside the piece tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Insert {
        offset: usize,
        length: usize,
    },
    Delete {
        offset: usize,
        count: usize,
    },
    /// Text was appended to the change buffer and the tail piece widened in place
    AppendFastPath {
        offset: usize,
        length: usize,
    },
    /// A CR/LF pair split across two pieces was joined into a fresh piece
    CrlfFixup {
        node_start_offset: usize,
    },
    NormalizeEol {
        eol: String,
        chunk_count: usize,
    },
    /// Buffers and tree were replaced wholesale
    Rebuilt {
        buffer_count: usize,
        total_length: usize,
    },
}

pub trait PieceTreeTracer: Send + Sync + Debug {
    fn on_event(&self, event: &TraceEvent);
}

/// Forwards every event to `tracing` at TRACE level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracer;

impl PieceTreeTracer for TracingTracer {
    fn on_event(&self, event: &TraceEvent) {
        match event {
            TraceEvent::Insert { offset, length } => {
                tracing::trace!(offset, length, "piece tree insert")
            }
            TraceEvent::Delete { offset, count } => {
                tracing::trace!(offset, count, "piece tree delete")
            }
            TraceEvent::AppendFastPath { offset, length } => {
                tracing::trace!(offset, length, "appended to change buffer in place")
            }
            TraceEvent::CrlfFixup { node_start_offset } => {
                tracing::trace!(node_start_offset, "joined CRLF split across pieces")
            }
            TraceEvent::NormalizeEol { eol, chunk_count } => {
                tracing::trace!(eol = ?eol, chunk_count, "normalized line endings")
            }
            TraceEvent::Rebuilt {
                buffer_count,
                total_length,
            } => tracing::trace!(buffer_count, total_length, "piece tree rebuilt"),
        }
    }
}
