//! Red-black tree of pieces, stored in an index arena.
//!
//! Node 0 is the shared sentinel: black, self-parented, all aggregates zero.
//! It stands in for every external leaf and is the parent of the root.
//! Every piece mutation goes through [`NodeArena::update_node`], which repairs
//! the size/line-feed aggregates from the node up to the root.

use super::chunk_buffer::BufferCursor;

pub type NodeIndex = usize;

/// Index of the sentinel node
pub const SENTINEL: NodeIndex = 0;

/// A half-open span `[start, end)` inside one buffer, in that buffer's local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Piece {
    pub buffer_index: usize,
    pub start: BufferCursor,
    pub end: BufferCursor,
    /// Line terminators inside the span (CRLF counts once)
    pub line_feed_count: usize,
    /// Length in UTF-16 code units
    pub length: usize,
}

impl Piece {
    pub fn new(
        buffer_index: usize,
        start: BufferCursor,
        end: BufferCursor,
        line_feed_count: usize,
        length: usize,
    ) -> Self {
        Piece {
            buffer_index,
            start,
            end,
            line_feed_count,
            length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Red,
    Black,
}

/// One tree node: a piece plus links and subtree aggregates
#[derive(Debug, Clone)]
pub struct PieceTreeNode {
    pub piece: Piece,
    pub color: NodeColor,
    pub parent: NodeIndex,
    pub left: NodeIndex,
    pub right: NodeIndex,
    /// Total length of the left subtree
    pub size_left: usize,
    /// Total line feeds of the left subtree
    pub lf_left: usize,
    /// Length of the whole subtree rooted here
    pub agg_length: usize,
    /// Line feeds of the whole subtree rooted here
    pub agg_line_feeds: usize,
    live: bool,
}

impl PieceTreeNode {
    fn sentinel() -> Self {
        PieceTreeNode {
            piece: Piece::default(),
            color: NodeColor::Black,
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            size_left: 0,
            lf_left: 0,
            agg_length: 0,
            agg_line_feeds: 0,
            live: false,
        }
    }

    fn new(piece: Piece) -> Self {
        PieceTreeNode {
            agg_length: piece.length,
            agg_line_feeds: piece.line_feed_count,
            piece,
            color: NodeColor::Red,
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            size_left: 0,
            lf_left: 0,
            live: true,
        }
    }
}

/// Arena owning every node of one tree
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<PieceTreeNode>,
    free: Vec<NodeIndex>,
    pub root: NodeIndex,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena {
            nodes: vec![PieceTreeNode::sentinel()],
            free: Vec::new(),
            root: SENTINEL,
        }
    }

    /// Drop every node, leaving an empty tree
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[SENTINEL] = PieceTreeNode::sentinel();
        self.free.clear();
        self.root = SENTINEL;
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> &PieceTreeNode {
        &self.nodes[index]
    }

    #[inline]
    pub fn piece(&self, index: NodeIndex) -> &Piece {
        &self.nodes[index].piece
    }

    #[inline]
    pub fn left(&self, index: NodeIndex) -> NodeIndex {
        self.nodes[index].left
    }

    #[inline]
    pub fn right(&self, index: NodeIndex) -> NodeIndex {
        self.nodes[index].right
    }

    #[inline]
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        self.nodes[index].parent
    }

    #[inline]
    pub fn color(&self, index: NodeIndex) -> NodeColor {
        self.nodes[index].color
    }

    /// Whether `index` refers to a node currently linked into the tree
    pub fn is_live(&self, index: NodeIndex) -> bool {
        index != SENTINEL && self.nodes.get(index).is_some_and(|node| node.live)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root == SENTINEL
    }

    pub fn total_length(&self) -> usize {
        self.nodes[self.root].agg_length
    }

    pub fn total_line_feeds(&self) -> usize {
        self.nodes[self.root].agg_line_feeds
    }

    fn alloc(&mut self, piece: Piece) -> NodeIndex {
        let node = PieceTreeNode::new(piece);
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: NodeIndex) {
        let node = &mut self.nodes[index];
        node.live = false;
        node.parent = SENTINEL;
        node.left = SENTINEL;
        node.right = SENTINEL;
        self.free.push(index);
    }

    fn set_color(&mut self, index: NodeIndex, color: NodeColor) {
        self.nodes[index].color = color;
    }

    /// Restore the sentinel after a delete may have borrowed its parent link
    fn reset_sentinel(&mut self) {
        let sentinel = &mut self.nodes[SENTINEL];
        sentinel.parent = SENTINEL;
        sentinel.left = SENTINEL;
        sentinel.right = SENTINEL;
        sentinel.color = NodeColor::Black;
        sentinel.size_left = 0;
        sentinel.lf_left = 0;
        sentinel.agg_length = 0;
        sentinel.agg_line_feeds = 0;
    }

    /// Recompute one node's aggregates from its children
    fn recompute(&mut self, index: NodeIndex) {
        if index == SENTINEL {
            return;
        }
        let (left, right) = (self.nodes[index].left, self.nodes[index].right);
        let (size_left, lf_left) = (self.nodes[left].agg_length, self.nodes[left].agg_line_feeds);
        let (size_right, lf_right) = (self.nodes[right].agg_length, self.nodes[right].agg_line_feeds);
        let node = &mut self.nodes[index];
        node.size_left = size_left;
        node.lf_left = lf_left;
        node.agg_length = size_left + node.piece.length + size_right;
        node.agg_line_feeds = lf_left + node.piece.line_feed_count + lf_right;
    }

    /// Recompute aggregates from `index` up to the root
    pub fn repair_upwards(&mut self, mut index: NodeIndex) {
        while index != SENTINEL {
            self.recompute(index);
            index = self.nodes[index].parent;
        }
    }

    /// Store a new piece and repair aggregates on the path to the root
    pub fn update_node(&mut self, index: NodeIndex, piece: Piece) {
        assert!(index != SENTINEL, "attempted to mutate the sentinel node");
        assert!(self.nodes[index].live, "attempted to update a detached node");
        self.nodes[index].piece = piece;
        self.repair_upwards(index);
    }

    pub fn leftmost(&self, mut index: NodeIndex) -> NodeIndex {
        while self.nodes[index].left != SENTINEL {
            index = self.nodes[index].left;
        }
        index
    }

    pub fn rightmost(&self, mut index: NodeIndex) -> NodeIndex {
        while self.nodes[index].right != SENTINEL {
            index = self.nodes[index].right;
        }
        index
    }

    /// First node in document order
    pub fn first(&self) -> NodeIndex {
        if self.root == SENTINEL {
            SENTINEL
        } else {
            self.leftmost(self.root)
        }
    }

    /// Last node in document order
    pub fn last(&self) -> NodeIndex {
        if self.root == SENTINEL {
            SENTINEL
        } else {
            self.rightmost(self.root)
        }
    }

    /// In-order successor, or the sentinel
    pub fn next(&self, index: NodeIndex) -> NodeIndex {
        if index == SENTINEL {
            return SENTINEL;
        }
        if self.nodes[index].right != SENTINEL {
            return self.leftmost(self.nodes[index].right);
        }
        let mut node = index;
        while self.nodes[node].parent != SENTINEL {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].left == node {
                return parent;
            }
            node = parent;
        }
        SENTINEL
    }

    /// In-order predecessor, or the sentinel
    pub fn prev(&self, index: NodeIndex) -> NodeIndex {
        if index == SENTINEL {
            return SENTINEL;
        }
        if self.nodes[index].left != SENTINEL {
            return self.rightmost(self.nodes[index].left);
        }
        let mut node = index;
        while self.nodes[node].parent != SENTINEL {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].right == node {
                return parent;
            }
            node = parent;
        }
        SENTINEL
    }

    /// Document offset where `index` starts
    pub fn offset_of_node(&self, index: NodeIndex) -> usize {
        if index == SENTINEL {
            return 0;
        }
        let mut pos = self.nodes[index].size_left;
        let mut node = index;
        while node != self.root {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].right == node {
                pos += self.nodes[parent].size_left + self.nodes[parent].piece.length;
            }
            node = parent;
        }
        pos
    }

    /// Line feeds in the document before `index` starts
    pub fn line_feeds_before_node(&self, index: NodeIndex) -> usize {
        if index == SENTINEL {
            return 0;
        }
        let mut count = self.nodes[index].lf_left;
        let mut node = index;
        while node != self.root {
            let parent = self.nodes[node].parent;
            if self.nodes[parent].right == node {
                count += self.nodes[parent].lf_left + self.nodes[parent].piece.line_feed_count;
            }
            node = parent;
        }
        count
    }

    /// Iterate live nodes in document order
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter {
            arena: self,
            current: self.first(),
        }
    }

    fn left_rotate(&mut self, x: NodeIndex) {
        let y = self.nodes[x].right;
        let y_left = self.nodes[y].left;

        self.nodes[x].right = y_left;
        if y_left != SENTINEL {
            self.nodes[y_left].parent = x;
        }
        let x_parent = self.nodes[x].parent;
        self.nodes[y].parent = x_parent;
        if x_parent == SENTINEL {
            self.root = y;
        } else if self.nodes[x_parent].left == x {
            self.nodes[x_parent].left = y;
        } else {
            self.nodes[x_parent].right = y;
        }
        self.nodes[y].left = x;
        self.nodes[x].parent = y;

        self.recompute(x);
        self.recompute(y);
    }

    fn right_rotate(&mut self, y: NodeIndex) {
        let x = self.nodes[y].left;
        let x_right = self.nodes[x].right;

        self.nodes[y].left = x_right;
        if x_right != SENTINEL {
            self.nodes[x_right].parent = y;
        }
        let y_parent = self.nodes[y].parent;
        self.nodes[x].parent = y_parent;
        if y_parent == SENTINEL {
            self.root = x;
        } else if self.nodes[y_parent].right == y {
            self.nodes[y_parent].right = x;
        } else {
            self.nodes[y_parent].left = x;
        }
        self.nodes[x].right = y;
        self.nodes[y].parent = x;

        self.recompute(y);
        self.recompute(x);
    }

    /// Insert `piece` immediately after `node` in document order.
    /// With an empty tree `node` is ignored and the piece becomes the root.
    pub fn rb_insert_right(&mut self, node: NodeIndex, piece: Piece) -> NodeIndex {
        let z = self.alloc(piece);
        if self.root == SENTINEL {
            self.root = z;
            self.set_color(z, NodeColor::Black);
            return z;
        }
        if self.nodes[node].right == SENTINEL {
            self.nodes[node].right = z;
            self.nodes[z].parent = node;
        } else {
            let next = self.leftmost(self.nodes[node].right);
            self.nodes[next].left = z;
            self.nodes[z].parent = next;
        }
        self.repair_upwards(z);
        self.insert_fixup(z);
        z
    }

    /// Insert `piece` immediately before `node` in document order.
    /// With an empty tree `node` is ignored and the piece becomes the root.
    pub fn rb_insert_left(&mut self, node: NodeIndex, piece: Piece) -> NodeIndex {
        let z = self.alloc(piece);
        if self.root == SENTINEL {
            self.root = z;
            self.set_color(z, NodeColor::Black);
            return z;
        }
        if self.nodes[node].left == SENTINEL {
            self.nodes[node].left = z;
            self.nodes[z].parent = node;
        } else {
            let prev = self.rightmost(self.nodes[node].left);
            self.nodes[prev].right = z;
            self.nodes[z].parent = prev;
        }
        self.repair_upwards(z);
        self.insert_fixup(z);
        z
    }

    fn insert_fixup(&mut self, mut x: NodeIndex) {
        while x != self.root && self.color(self.parent(x)) == NodeColor::Red {
            let parent = self.parent(x);
            let grand = self.parent(parent);
            if parent == self.left(grand) {
                let uncle = self.right(grand);
                if self.color(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    x = grand;
                } else {
                    if x == self.right(parent) {
                        x = parent;
                        self.left_rotate(x);
                    }
                    let parent = self.parent(x);
                    let grand = self.parent(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    self.right_rotate(grand);
                }
            } else {
                let uncle = self.left(grand);
                if self.color(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    x = grand;
                } else {
                    if x == self.left(parent) {
                        x = parent;
                        self.right_rotate(x);
                    }
                    let parent = self.parent(x);
                    let grand = self.parent(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    self.left_rotate(grand);
                }
            }
        }
        let root = self.root;
        self.set_color(root, NodeColor::Black);
    }

    /// Unlink `z` from the tree, rebalance, and free its slot
    pub fn rb_delete(&mut self, z: NodeIndex) {
        assert!(z != SENTINEL, "attempted to delete the sentinel node");
        assert!(self.nodes[z].live, "attempted to delete a detached node");

        let (x, y) = if self.left(z) == SENTINEL {
            (self.right(z), z)
        } else if self.right(z) == SENTINEL {
            (self.left(z), z)
        } else {
            let y = self.leftmost(self.right(z));
            (self.right(y), y)
        };

        if y == self.root {
            self.root = x;
            self.set_color(x, NodeColor::Black);
            self.nodes[x].parent = SENTINEL;
            self.release(z);
            self.reset_sentinel();
            return;
        }

        let y_was_red = self.color(y) == NodeColor::Red;

        let y_parent = self.parent(y);
        if y == self.left(y_parent) {
            self.nodes[y_parent].left = x;
        } else {
            self.nodes[y_parent].right = x;
        }

        if y == z {
            self.nodes[x].parent = y_parent;
        } else {
            // x may be the sentinel; its parent link is borrowed until the fixup ends
            self.nodes[x].parent = if y_parent == z { y } else { y_parent };

            let (z_left, z_right, z_parent, z_color) =
                (self.left(z), self.right(z), self.parent(z), self.color(z));
            self.nodes[y].left = z_left;
            self.nodes[y].right = z_right;
            self.nodes[y].parent = z_parent;
            self.nodes[y].color = z_color;

            if z == self.root {
                self.root = y;
            } else if z == self.left(z_parent) {
                self.nodes[z_parent].left = y;
            } else {
                self.nodes[z_parent].right = y;
            }
            if z_left != SENTINEL {
                self.nodes[z_left].parent = y;
            }
            if z_right != SENTINEL {
                self.nodes[z_right].parent = y;
            }
        }

        // the path from x's parent passes through y (when it replaced z) up to the root
        let repair_from = self.parent(x);
        self.repair_upwards(repair_from);
        self.release(z);

        if !y_was_red {
            self.delete_fixup(x);
        }
        self.reset_sentinel();
    }

    fn delete_fixup(&mut self, mut x: NodeIndex) {
        while x != self.root && self.color(x) == NodeColor::Black {
            let parent = self.parent(x);
            if x == self.left(parent) {
                let mut w = self.right(parent);
                if self.color(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.left_rotate(parent);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == NodeColor::Black
                    && self.color(self.right(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == NodeColor::Black {
                        let w_left = self.left(w);
                        self.set_color(w_left, NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.right_rotate(w);
                        w = self.right(self.parent(x));
                    }
                    let parent = self.parent(x);
                    self.set_color(w, self.color(parent));
                    self.set_color(parent, NodeColor::Black);
                    let w_right = self.right(w);
                    self.set_color(w_right, NodeColor::Black);
                    self.left_rotate(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left(parent);
                if self.color(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.right_rotate(parent);
                    w = self.left(self.parent(x));
                }
                if self.color(self.left(w)) == NodeColor::Black
                    && self.color(self.right(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == NodeColor::Black {
                        let w_right = self.right(w);
                        self.set_color(w_right, NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.left_rotate(w);
                        w = self.left(self.parent(x));
                    }
                    let parent = self.parent(x);
                    self.set_color(w, self.color(parent));
                    self.set_color(parent, NodeColor::Black);
                    let w_left = self.left(w);
                    self.set_color(w_left, NodeColor::Black);
                    self.right_rotate(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, NodeColor::Black);
    }

    /// Validate red-black shape and aggregates, returning a description of the first violation
    pub fn check_invariants(&self) -> Result<(), String> {
        let sentinel = &self.nodes[SENTINEL];
        if sentinel.color != NodeColor::Black
            || sentinel.parent != SENTINEL
            || sentinel.left != SENTINEL
            || sentinel.right != SENTINEL
            || sentinel.agg_length != 0
            || sentinel.agg_line_feeds != 0
        {
            return Err("sentinel node was mutated".to_string());
        }
        if self.root == SENTINEL {
            return Ok(());
        }
        if self.color(self.root) != NodeColor::Black {
            return Err("root is not black".to_string());
        }
        if self.parent(self.root) != SENTINEL {
            return Err("root has a parent".to_string());
        }
        self.check_subtree(self.root).map(|_| ())
    }

    /// Returns (black height, length, line feeds) of the subtree
    fn check_subtree(&self, index: NodeIndex) -> Result<(usize, usize, usize), String> {
        if index == SENTINEL {
            return Ok((1, 0, 0));
        }
        let node = &self.nodes[index];
        if !node.live {
            return Err(format!("node {index} is reachable but freed"));
        }
        for child in [node.left, node.right] {
            if child != SENTINEL && self.nodes[child].parent != index {
                return Err(format!("node {child} has a wrong parent link"));
            }
        }
        if node.color == NodeColor::Red
            && (self.color(node.left) == NodeColor::Red || self.color(node.right) == NodeColor::Red)
        {
            return Err(format!("red node {index} has a red child"));
        }
        let (left_height, left_len, left_lf) = self.check_subtree(node.left)?;
        let (right_height, right_len, right_lf) = self.check_subtree(node.right)?;
        if left_height != right_height {
            return Err(format!(
                "black height differs under node {index}: {left_height} vs {right_height}"
            ));
        }
        if node.size_left != left_len || node.lf_left != left_lf {
            return Err(format!(
                "node {index} left aggregates ({}, {}) != recomputed ({left_len}, {left_lf})",
                node.size_left, node.lf_left
            ));
        }
        let len = left_len + node.piece.length + right_len;
        let lf = left_lf + node.piece.line_feed_count + right_lf;
        if node.agg_length != len || node.agg_line_feeds != lf {
            return Err(format!(
                "node {index} subtree aggregates ({}, {}) != recomputed ({len}, {lf})",
                node.agg_length, node.agg_line_feeds
            ));
        }
        let height = left_height + usize::from(node.color == NodeColor::Black);
        Ok((height, len, lf))
    }
}

/// In-order iterator over node indices
pub struct NodeIter<'a> {
    arena: &'a NodeArena,
    current: NodeIndex,
}

impl Iterator for NodeIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        if self.current == SENTINEL {
            return None;
        }
        let index = self.current;
        self.current = self.arena.next(index);
        Some(index)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        InsertRight(usize, usize),
        InsertLeft(usize, usize),
        Delete(usize),
        Resize(usize, usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<usize>(), 1..10usize).prop_map(|(at, len)| Op::InsertRight(at, len)),
            (any::<usize>(), 1..10usize).prop_map(|(at, len)| Op::InsertLeft(at, len)),
            any::<usize>().prop_map(Op::Delete),
            (any::<usize>(), 1..10usize).prop_map(|(at, len)| Op::Resize(at, len)),
        ]
    }

    proptest! {
        #[test]
        fn prop_tree_matches_vec_model(ops in prop::collection::vec(op_strategy(), 1..80)) {
            let mut arena = NodeArena::new();
            let mut model: Vec<usize> = Vec::new();
            for op in ops {
                let nodes: Vec<NodeIndex> = arena.iter().collect();
                match op {
                    Op::InsertRight(at, len) => {
                        if nodes.is_empty() {
                            arena.rb_insert_right(SENTINEL, Piece { length: len, ..Piece::default() });
                            model.push(len);
                        } else {
                            let at = at % nodes.len();
                            arena.rb_insert_right(nodes[at], Piece { length: len, ..Piece::default() });
                            model.insert(at + 1, len);
                        }
                    }
                    Op::InsertLeft(at, len) => {
                        if nodes.is_empty() {
                            arena.rb_insert_left(SENTINEL, Piece { length: len, ..Piece::default() });
                            model.push(len);
                        } else {
                            let at = at % nodes.len();
                            arena.rb_insert_left(nodes[at], Piece { length: len, ..Piece::default() });
                            model.insert(at, len);
                        }
                    }
                    Op::Delete(at) => {
                        if !nodes.is_empty() {
                            let at = at % nodes.len();
                            arena.rb_delete(nodes[at]);
                            model.remove(at);
                        }
                    }
                    Op::Resize(at, len) => {
                        if !nodes.is_empty() {
                            let at = at % nodes.len();
                            arena.update_node(nodes[at], Piece { length: len, ..Piece::default() });
                            model[at] = len;
                        }
                    }
                }
                prop_assert!(arena.check_invariants().is_ok(), "{:?}", arena.check_invariants());
                let lengths: Vec<usize> = arena.iter().map(|i| arena.piece(i).length).collect();
                prop_assert_eq!(&lengths, &model);
                prop_assert_eq!(arena.total_length(), model.iter().sum::<usize>());
            }
        }
    }
}
