use la_arena::Arena;
use rustc_hash::FxHashMap;

use crate::node::{Location, Node, NodeId};

/// The parsed forest of a `.synctex` file: one arena plus the three root
/// lists (`Input`, `Sheet`, `Form` — spec.md §3.2) and the friend
/// acceleration table (§3.4 invariant 7, §9 design note).
///
/// The original implementation buckets friends by `line % 1024` into a fixed
/// array of linked lists; we use a hash map keyed by the full `(tag, line)`
/// pair instead; it is simpler and does not need a fixed bucket count tuned
/// to expected document size.
#[derive(Default)]
pub struct Tree {
    arena: Arena<Node>,
    inputs: Option<NodeId>,
    inputs_tail: Option<NodeId>,
    sheets: Option<NodeId>,
    sheets_tail: Option<NodeId>,
    forms: Option<NodeId>,
    forms_tail: Option<NodeId>,
    friend: FxHashMap<(i32, i32), Vec<NodeId>>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.arena[id]
    }

    pub fn inputs(&self) -> Option<NodeId> {
        self.inputs
    }

    pub fn sheets(&self) -> Option<NodeId> {
        self.sheets
    }

    pub fn forms(&self) -> Option<NodeId> {
        self.forms
    }

    /// Append `id` to the `Input` sibling chain.
    pub fn push_input(&mut self, id: NodeId) {
        if let Some(tail) = self.inputs_tail {
            self.arena[tail].set_sibling(Some(id));
        } else {
            self.inputs = Some(id);
        }
        self.inputs_tail = Some(id);
    }

    pub fn push_sheet(&mut self, id: NodeId) {
        if let Some(tail) = self.sheets_tail {
            self.arena[tail].set_sibling(Some(id));
        } else {
            self.sheets = Some(id);
        }
        self.sheets_tail = Some(id);
    }

    pub fn push_form(&mut self, id: NodeId) {
        if let Some(tail) = self.forms_tail {
            self.arena[tail].set_sibling(Some(id));
        } else {
            self.forms = Some(id);
        }
        self.forms_tail = Some(id);
    }

    /// Iterate a sibling chain starting at `head`.
    pub fn siblings(&self, head: Option<NodeId>) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = head;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.arena[id].sibling();
            Some(id)
        })
    }

    /// Append `child` as the new last child of `parent` (§3.3: every
    /// container keeps `child` pointing at the first and `last` at the most
    /// recently appended child, with the new child's `parent` set and linked
    /// onto the previous last child's `sibling`).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.arena[child].set_parent(Some(parent));
        match self.arena[parent].last() {
            Some(prev_last) => {
                self.arena[prev_last].set_sibling(Some(child));
            }
            None => {
                self.arena[parent].set_child(Some(child));
            }
        }
        self.arena[parent].set_last(Some(child));
    }

    /// Set `child`'s `arg_sibling` to `predecessor`, its predecessor in the
    /// child chain (spec.md §3.3: `arg_sibling` is the reverse-sibling
    /// pointer, maintained on insertion so that given a node, its
    /// predecessor in the child chain is O(1) — invariant P3, "`arg_sibling`
    /// is defined iff the node is not the first child"). Applies to every
    /// kind, not just one; the caller is expected to call this for every
    /// non-first child it appends.
    pub fn push_arg_sibling(&mut self, child: NodeId, predecessor: NodeId) {
        self.arena[child].set_arg_sibling(Some(predecessor));
    }

    /// Register `id` under its own `(tag, line)` in the friend table
    /// (§3.4 invariant 7). Only meaningful for
    /// [`crate::kind::NodeKind::is_friend_eligible`] kinds.
    pub fn register_friend(&mut self, id: NodeId) {
        if let Some(loc) = self.arena[id].own_loc() {
            self.friend.entry((loc.tag, loc.line)).or_default().push(id);
        }
    }

    pub fn friends(&self, tag: i32, line: i32) -> &[NodeId] {
        self.friend.get(&(tag, line)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// `(tag, line, column)` for `id`, forwarding through a proxy to its
    /// target (spec.md §3.1: proxies have no location of their own).
    pub fn tlc(&self, id: NodeId) -> Option<Location> {
        let node = &self.arena[id];
        if let Some(target) = node.target() {
            return self.tlc(target);
        }
        node.own_loc().copied()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{KernNode, Links, Location, Point};
    use pretty_assertions::assert_eq;

    fn kern(tag: i32, line: i32) -> Node {
        Node::Kern(KernNode { loc: Location::new(tag, line, None), point: Point::default(), width: 0, links: Links::default() })
    }

    #[test]
    fn append_child_links_first_and_subsequent() {
        let mut tree = Tree::new();
        let parent = tree.alloc(kern(1, 1));
        let c1 = tree.alloc(kern(1, 2));
        let c2 = tree.alloc(kern(1, 3));
        tree.append_child(parent, c1);
        tree.append_child(parent, c2);
        assert_eq!(tree.node(parent).child(), Some(c1));
        assert_eq!(tree.node(parent).last(), Some(c2));
        assert_eq!(tree.node(c1).sibling(), Some(c2));
        assert_eq!(tree.node(c1).parent(), Some(parent));
        assert_eq!(tree.node(c2).parent(), Some(parent));
    }

    #[test]
    fn friend_table_groups_by_tag_and_line() {
        let mut tree = Tree::new();
        let a = tree.alloc(kern(3, 10));
        let b = tree.alloc(kern(3, 10));
        let c = tree.alloc(kern(3, 11));
        tree.register_friend(a);
        tree.register_friend(b);
        tree.register_friend(c);
        assert_eq!(tree.friends(3, 10), &[a, b]);
        assert_eq!(tree.friends(3, 11), &[c]);
        assert!(tree.friends(99, 99).is_empty());
    }

    #[test]
    fn sibling_chain_roots_iterate_in_push_order() {
        let mut tree = Tree::new();
        let s1 = tree.alloc(kern(1, 1));
        let s2 = tree.alloc(kern(1, 2));
        tree.push_sheet(s1);
        tree.push_sheet(s2);
        let collected: Vec<_> = tree.siblings(tree.sheets()).collect();
        assert_eq!(collected, vec![s1, s2]);
    }
}
