//! Small LRU remembering recently resolved nodes.
//!
//! An entry records where a node started (offset, and line when known) at the
//! time it was resolved. Any structural edit either removes entries or runs
//! [`PieceTreeSearchCache::validate`], which drops entries whose recorded
//! position no longer matches the tree.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::node::{NodeArena, NodeIndex};

/// A resolved node and where it starts in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub node: NodeIndex,
    pub node_start_offset: usize,
    /// 1-based line number the node starts on, when the lookup was line-based
    pub node_start_line_number: Option<usize>,
}

/// Counters exposed for tests and telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchCacheDiagnostics {
    pub hit_count: u64,
    pub miss_count: u64,
    pub clear_count: u64,
    pub entry_count: usize,
}

#[derive(Debug)]
pub struct PieceTreeSearchCache {
    entries: LruCache<NodeIndex, CacheEntry>,
    hit_count: u64,
    miss_count: u64,
    clear_count: u64,
}

impl PieceTreeSearchCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        PieceTreeSearchCache {
            entries: LruCache::new(capacity),
            hit_count: 0,
            miss_count: 0,
            clear_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Entry whose node spans `offset` (inclusive of its end)
    pub fn get_by_offset(&mut self, arena: &NodeArena, offset: usize) -> Option<CacheEntry> {
        let found = self
            .entries
            .iter()
            .find(|(_, entry)| {
                let length = arena.piece(entry.node).length;
                entry.node_start_offset <= offset && offset <= entry.node_start_offset + length
            })
            .map(|(_, entry)| *entry);
        self.record(found)
    }

    /// Entry whose node contains the start of line `line_number` strictly after its first line
    pub fn get_by_line(&mut self, arena: &NodeArena, line_number: usize) -> Option<CacheEntry> {
        let found = self
            .entries
            .iter()
            .find(|(_, entry)| match entry.node_start_line_number {
                Some(start_line) => {
                    let line_feeds = arena.piece(entry.node).line_feed_count;
                    start_line < line_number && line_number <= start_line + line_feeds
                }
                None => false,
            })
            .map(|(_, entry)| *entry);
        self.record(found)
    }

    fn record(&mut self, found: Option<CacheEntry>) -> Option<CacheEntry> {
        match found {
            Some(entry) => {
                self.hit_count += 1;
                self.entries.promote(&entry.node);
            }
            None => self.miss_count += 1,
        }
        found
    }

    pub fn set(&mut self, entry: CacheEntry) {
        self.entries.put(entry.node, entry);
    }

    /// Remove the entry for one node (the node is being deleted)
    pub fn forget(&mut self, node: NodeIndex) {
        self.entries.pop(&node);
    }

    /// Drop entries whose node starts inside `[start, end)` or spans into it
    pub fn invalidate_range(&mut self, arena: &NodeArena, start: usize, end: usize) {
        let stale: Vec<NodeIndex> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                if !arena.is_live(entry.node) {
                    return true;
                }
                let node_end = entry.node_start_offset + arena.piece(entry.node).length;
                entry.node_start_offset < end && node_end >= start
            })
            .map(|(node, _)| *node)
            .collect();
        self.remove_all(stale);
    }

    /// Drop entries that touch `offset` or anything after it
    pub fn invalidate_from_offset(&mut self, arena: &NodeArena, offset: usize) {
        self.invalidate_range(arena, offset, usize::MAX);
    }

    /// Drop entries that no longer describe the tree: freed nodes, moved starts,
    /// starts at or past the end of the document.
    pub fn validate(&mut self, arena: &NodeArena) {
        let total = arena.total_length();
        let stale: Vec<NodeIndex> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                if !arena.is_live(entry.node) {
                    return true;
                }
                if entry.node_start_offset >= total && total > 0 {
                    return true;
                }
                if arena.offset_of_node(entry.node) != entry.node_start_offset {
                    return true;
                }
                match entry.node_start_line_number {
                    Some(line) => arena.line_feeds_before_node(entry.node) + 1 != line,
                    None => false,
                }
            })
            .map(|(node, _)| *node)
            .collect();
        self.remove_all(stale);
    }

    fn remove_all(&mut self, nodes: Vec<NodeIndex>) {
        for node in nodes {
            self.entries.pop(&node);
        }
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
        }
        self.clear_count += 1;
    }

    pub fn diagnostics(&self) -> SearchCacheDiagnostics {
        SearchCacheDiagnostics {
            hit_count: self.hit_count,
            miss_count: self.miss_count,
            clear_count: self.clear_count,
            entry_count: self.entries.len(),
        }
    }
}
