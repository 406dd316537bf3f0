//! Query results: a small, scanner-independent tree of [`Handle`]s distinct
//! from the primary [`synctex_model::Node`] type (spec.md §9 "Handles vs.
//! returned nodes"), plus the [`QueryIterator`] that walks it.

use la_arena::{Arena, Idx};
use synctex_model::NodeId;

pub type HandleId = Idx<Handle>;

/// One query result: the primary node it points at, plus its position in
/// the synthesized result tree (never the primary tree's own links).
#[derive(Debug, Clone)]
pub struct Handle {
    pub target: NodeId,
    pub page: i32,
    pub parent: Option<HandleId>,
    pub child: Option<HandleId>,
    pub sibling: Option<HandleId>,
}

/// The tree a query builds its answer in. Freeing it (dropping the
/// iterator) never touches the primary nodes it points at.
#[derive(Debug, Default)]
pub struct HandleTree {
    arena: Arena<Handle>,
}

impl HandleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, target: NodeId, page: i32) -> HandleId {
        self.arena.alloc(Handle { target, page, parent: None, child: None, sibling: None })
    }

    pub fn get(&self, id: HandleId) -> &Handle {
        &self.arena[id]
    }

    /// Append `child` as `owner`'s new last child (singly linked: this walks
    /// to the end of `owner`'s existing child chain, which is fine at the
    /// small sizes a single query result tree reaches).
    pub fn append_child(&mut self, owner: HandleId, child: HandleId) {
        self.arena[child].parent = Some(owner);
        match self.arena[owner].child {
            None => self.arena[owner].child = Some(child),
            Some(first) => {
                let mut last = first;
                while let Some(next) = self.arena[last].sibling {
                    last = next;
                }
                self.arena[last].sibling = Some(child);
            }
        }
    }

    /// Append `next` as a sibling at the end of the chain rooted at `first`.
    pub fn append_sibling(&mut self, first: HandleId, next: HandleId) {
        let parent = self.arena[first].parent;
        self.arena[next].parent = parent;
        let mut last = first;
        while let Some(s) = self.arena[last].sibling {
            last = s;
        }
        self.arena[last].sibling = Some(next);
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

/// A query's result: the [`HandleTree`] it owns plus a cursor into it
/// (spec.md §4.G "Iterator").
pub struct QueryIterator {
    tree: HandleTree,
    root: Option<HandleId>,
    cursor: Option<HandleId>,
    count: usize,
}

impl QueryIterator {
    pub fn new(tree: HandleTree, root: Option<HandleId>) -> Self {
        let count = tree.len();
        Self { tree, root, cursor: root, count }
    }

    pub fn empty() -> Self {
        Self { tree: HandleTree::new(), root: None, cursor: None, count: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.cursor = self.root;
    }

    /// Child first, falling back to the nearest ancestor's sibling —
    /// standard preorder over a child/sibling tree with back-pointers.
    pub fn next(&mut self) -> Option<NodeId> {
        let cur = self.cursor?;
        let target = self.tree.get(cur).target;

        let mut advance = self.tree.get(cur).child;
        if advance.is_none() {
            let mut walker = Some(cur);
            while let Some(id) = walker {
                if let Some(sibling) = self.tree.get(id).sibling {
                    advance = Some(sibling);
                    break;
                }
                walker = self.tree.get(id).parent;
            }
        }
        self.cursor = advance;
        Some(target)
    }

    pub fn free(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use synctex_model::{KernNode, Links, Location, Point};

    fn dummy_target() -> NodeId {
        let mut t = synctex_model::Tree::new();
        t.alloc(synctex_model::Node::Kern(KernNode { loc: Location::new(1, 1, None), point: Point::default(), width: 0, links: Links::default() }))
    }

    #[test]
    fn preorder_visits_child_then_sibling_then_parents_sibling() {
        let mut tree = HandleTree::new();
        let target = dummy_target();
        let root = tree.alloc(target, 1);
        let child = tree.alloc(target, 1);
        let grandchild = tree.alloc(target, 1);
        let root_sibling = tree.alloc(target, 2);
        tree.append_child(root, child);
        tree.append_child(child, grandchild);
        tree.append_sibling(root, root_sibling);

        let mut it = QueryIterator::new(tree, Some(root));
        let mut order = Vec::new();
        while it.has_next() {
            it.next();
            order.push(());
        }
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn reset_reseats_cursor_at_root() {
        let mut tree = HandleTree::new();
        let target = dummy_target();
        let root = tree.alloc(target, 1);
        let child = tree.alloc(target, 1);
        tree.append_child(root, child);
        let mut it = QueryIterator::new(tree, Some(root));
        it.next();
        it.next();
        assert!(!it.has_next());
        it.reset();
        assert!(it.has_next());
    }
}
