//! §4.E form-ref expansion: after parsing, every `Ref` is replaced in place
//! by a root `ProxyVBox`/`ProxyHBox` pointing at the referenced form's
//! content, and the rest of that content's subtree is mirrored as child
//! proxies at the same constant `(h, v)` offset.
//!
//! We materialize the whole subtree eagerly at expansion time, rather than
//! synthesizing child proxies on demand during navigation the way the
//! original does. A form referenced from many places therefore costs one
//! full proxy subtree per reference instead of a handful of cached nodes,
//! but the resulting tree needs no special-cased lazy-child logic anywhere
//! else — every consumer (§4.F/G/H) just walks `child`/`sibling` like it
//! would for a real box.

use crate::error::{Error, Result};
use crate::kind::NodeKind;
use crate::node::{Links, Node, NodeId, Point, ProxyBoxNode, ProxyHBoxNode, ProxyNode};
use crate::tree::Tree;

fn find_form(tree: &Tree, tag: i32) -> Option<NodeId> {
    tree.siblings(tree.forms()).find(|&id| tree.node(id).tag() == Some(tag))
}

/// Plain struct instead of a tuple so the `Point` and `NodeId` fields can't
/// be swapped by accident at a call site.
struct Redirect {
    target: NodeId,
    offset: Point,
}

/// Chase through already-resolved proxies (and resolve not-yet-expanded
/// nested refs along the way) to the real, non-proxy, non-ref node a chain
/// of indirections ultimately points at, adding up offsets along the way
/// (invariant P6: a child proxy's offset is its owner's offset plus its
/// target's own offset).
fn resolve_redirect(tree: &mut Tree, mut target: NodeId, mut offset: Point) -> Redirect {
    loop {
        match tree.node(target) {
            Node::Proxy(p) | Node::ProxyLast(p) => {
                offset = Point { h: offset.h + p.offset.h, v: offset.v + p.offset.v };
                target = p.target;
            }
            Node::ProxyVBox(p) => {
                offset = Point { h: offset.h + p.offset.h, v: offset.v + p.offset.v };
                target = p.target;
            }
            Node::ProxyHBox(p) => {
                offset = Point { h: offset.h + p.base.offset.h, v: offset.v + p.base.offset.v };
                target = p.base.target;
            }
            Node::Ref(_) => {
                // Expand the nested ref in place; on success it becomes a
                // proxy we chase through on the next loop iteration. On
                // failure `target` is still a `Ref` (expand_ref only
                // mutates it after its checks succeed), so returning here
                // instead of looping again is what keeps this terminating.
                if let Err(e) = expand_ref(tree, target) {
                    tracing::warn!(error = %e, "failed to expand nested form ref, leaving it unresolved");
                    return Redirect { target, offset };
                }
            }
            _ => return Redirect { target, offset },
        }
    }
}

fn materialize_children_chain(tree: &mut Tree, parent_id: NodeId, head: Option<NodeId>, offset: Point) -> (Option<NodeId>, Option<NodeId>) {
    let mut result_head = None;
    let mut prev: Option<NodeId> = None;
    let mut cur = head;
    while let Some(target_child) = cur {
        let proxy_child = materialize_subtree(tree, target_child, offset);
        tree.node_mut(proxy_child).set_parent(Some(parent_id));
        if result_head.is_none() {
            result_head = Some(proxy_child);
        }
        if let Some(p) = prev {
            tree.node_mut(p).set_sibling(Some(proxy_child));
        }
        prev = Some(proxy_child);
        cur = tree.node(target_child).sibling();
    }
    (result_head, prev)
}

/// Build one child proxy mirroring `target_id`, inheriting `offset`
/// unchanged (spec.md §4.E: "each child proxy inherits `P`'s offset").
fn materialize_subtree(tree: &mut Tree, target_id: NodeId, offset: Point) -> NodeId {
    let resolved = resolve_redirect(tree, target_id, offset);
    let target_id = resolved.target;
    let offset = resolved.offset;
    let kind = tree.node(target_id).kind();

    if kind.is_box() {
        let is_hbox = kind.is_hbox();
        let base = ProxyBoxNode { offset, target: target_id, links: Links::default(), child: None, last: None };
        let id = tree.alloc(if is_hbox { Node::ProxyHBox(ProxyHBoxNode { base, next_hbox: None }) } else { Node::ProxyVBox(base) });
        let content_child = tree.node(target_id).child();
        let (child, last) = materialize_children_chain(tree, id, content_child, offset);
        match tree.node_mut(id) {
            Node::ProxyVBox(p) => {
                p.child = child;
                p.last = last;
            }
            Node::ProxyHBox(p) => {
                p.base.child = child;
                p.base.last = last;
            }
            _ => unreachable!(),
        }
        id
    } else {
        // The final proxy in a synthesized chain is marked `ProxyLast` so
        // navigation knows it reached the end without re-walking `target`.
        let is_last = tree.node(target_id).sibling().is_none();
        let proxy = ProxyNode { offset, target: target_id, links: Links::default(), target_last: None };
        tree.alloc(if is_last { Node::ProxyLast(proxy) } else { Node::Proxy(proxy) })
    }
}

/// Replace the `Ref` at `ref_id` in place with a root proxy over its target
/// form's content, preserving `ref_id`'s own `parent`/`sibling`/`arg_sibling`
/// so every existing pointer into the tree that named `ref_id` keeps working
/// unchanged (invariant P4: no `Ref` survives a successful parse).
///
/// Per P5, the root proxy's offset is `(ref.h, ref.v - content.height)`, not
/// a plain copy of the ref's own point — a ref's `v` names the top of the
/// form's content, not its origin.
pub fn expand_ref(tree: &mut Tree, ref_id: NodeId) -> Result<()> {
    let (form_tag, point, links, char_index, line_index) = match tree.node(ref_id) {
        Node::Ref(r) => (r.form_tag, r.point, r.links, r.char_index, r.line_index),
        // Already resolved: happens when a nested ref is reached twice
        // while chasing a cascading reference through `resolve_redirect`.
        _ => return Ok(()),
    };
    let form_id = find_form(tree, form_tag).ok_or(Error::MissingForm(form_tag))?;
    let content = tree.node(form_id).child().ok_or(Error::MissingForm(form_tag))?;

    let resolved = resolve_redirect(tree, content, Point::default());
    let (target, chain_offset) = (resolved.target, resolved.offset);
    if !tree.node(target).kind().is_box() {
        return Err(Error::NotABox(target));
    }
    let is_hbox = tree.node(target).kind().is_hbox();
    let target_height = tree.node(target).dims().map(|d| d.height).unwrap_or(0);
    let offset = Point { h: point.h + chain_offset.h, v: point.v - target_height + chain_offset.v };

    let base = ProxyBoxNode { offset, target, links, child: None, last: None };
    *tree.node_mut(ref_id) = if is_hbox { Node::ProxyHBox(ProxyHBoxNode { base, next_hbox: None }) } else { Node::ProxyVBox(base) };

    let content_child = tree.node(target).child();
    let (child, last) = materialize_children_chain(tree, ref_id, content_child, offset);
    match tree.node_mut(ref_id) {
        Node::ProxyVBox(p) => {
            p.child = child;
            p.last = last;
        }
        Node::ProxyHBox(p) => {
            p.base.child = child;
            p.base.last = last;
        }
        _ => unreachable!(),
    }

    // Step 4: a ref is typically followed by the trailing `BoxBdry` of its
    // enclosing hbox; carry its char/line index over so errors reported
    // against that boundary still point at the right source location.
    if let Some(sibling) = links.sibling {
        if tree.node(sibling).kind() == NodeKind::BoxBdry {
            if let Some(loc) = tree.node_mut(sibling).own_loc_mut() {
                loc.char_index = char_index;
                loc.line_index = line_index;
            }
        }
    }

    Ok(())
}

/// Expand every outstanding ref, logging (not failing) on a ref that cannot
/// be resolved — a form's ref naming an unknown tag is malformed input, not
/// a scanner bug (spec.md §7: `Malformed` is logged and the record skipped).
pub fn expand_all_refs(tree: &mut Tree, refs: &[NodeId]) {
    for &id in refs {
        if let Err(e) = expand_ref(tree, id) {
            tracing::warn!(error = %e, "failed to expand form ref, leaving it unresolved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BoxDims, BoxNode, FormNode, KernNode, Location, RefNode};
    use pretty_assertions::assert_eq;

    fn vbox(tag: i32, line: i32) -> Node {
        Node::VBox(BoxNode {
            loc: Location::new(tag, line, None),
            point: Point::default(),
            dims: BoxDims::default(),
            links: Links::default(),
            child: None,
            last: None,
        })
    }

    fn vbox_with_height(tag: i32, line: i32, height: i32) -> Node {
        Node::VBox(BoxNode {
            loc: Location::new(tag, line, None),
            point: Point::default(),
            dims: BoxDims { width: 0, height, depth: 0 },
            links: Links::default(),
            child: None,
            last: None,
        })
    }

    fn kern(tag: i32, line: i32) -> Node {
        Node::Kern(KernNode { loc: Location::new(tag, line, None), point: Point::default(), width: 10, links: Links::default() })
    }

    fn make_ref(form_tag: i32, point: Point, links: Links) -> Node {
        Node::Ref(RefNode { form_tag, point, links, char_index: None, line_index: None })
    }

    #[test]
    fn expand_ref_subtracts_content_height_from_v_per_p5() {
        let mut tree = Tree::new();

        let form_root = tree.alloc(vbox_with_height(5, 1, 8));
        let form_child = tree.alloc(kern(5, 2));
        tree.append_child(form_root, form_child);
        let form = tree.alloc(Node::Form(FormNode { tag: 5, sibling: None, child: Some(form_root), last: Some(form_root) }));
        tree.push_form(form);

        let sheet_sibling_before = tree.alloc(kern(1, 1));
        let r = tree.alloc(make_ref(5, Point { h: 50, v: 100 }, Links { parent: None, sibling: Some(sheet_sibling_before), arg_sibling: None }));

        expand_ref(&mut tree, r).unwrap();

        match tree.node(r) {
            Node::ProxyVBox(p) => {
                assert_eq!(p.offset, Point { h: 50, v: 92 });
                assert_eq!(p.target, form_root);
                assert_eq!(p.links.sibling, Some(sheet_sibling_before));
                assert!(p.child.is_some());
            }
            other => panic!("expected ProxyVBox, got {:?}", other.kind()),
        }
    }

    #[test]
    fn expand_ref_missing_form_is_an_error() {
        let mut tree = Tree::new();
        let r = tree.alloc(make_ref(42, Point::default(), Links::default()));
        assert!(matches!(expand_ref(&mut tree, r), Err(Error::MissingForm(42))));
    }

    #[test]
    fn expand_ref_composes_offsets_across_cascading_refs() {
        let mut tree = Tree::new();

        // Form 2: a leaf kern, zero height content.
        let inner_root = tree.alloc(vbox(2, 1));
        let inner_child = tree.alloc(kern(2, 2));
        tree.append_child(inner_root, inner_child);
        let inner_form = tree.alloc(Node::Form(FormNode { tag: 2, sibling: None, child: Some(inner_root), last: Some(inner_root) }));
        tree.push_form(inner_form);

        // Form 1's sole content is itself a ref to form 2, at offset (10, 20).
        let nested_ref = tree.alloc(make_ref(2, Point { h: 10, v: 20 }, Links::default()));
        let outer_form = tree.alloc(Node::Form(FormNode { tag: 1, sibling: None, child: Some(nested_ref), last: Some(nested_ref) }));
        tree.push_form(outer_form);

        // Top-level ref to form 1 at offset (1, 2).
        let top_ref = tree.alloc(make_ref(1, Point { h: 1, v: 2 }, Links::default()));
        expand_ref(&mut tree, top_ref).unwrap();

        match tree.node(top_ref) {
            Node::ProxyVBox(p) => assert_eq!(p.offset, Point { h: 11, v: 22 }),
            other => panic!("expected ProxyVBox, got {:?}", other.kind()),
        }
    }

    #[test]
    fn expand_ref_terminates_on_nested_ref_with_missing_form() {
        let mut tree = Tree::new();

        // Form 1's sole content is a ref to form 2, which doesn't exist.
        let nested_ref = tree.alloc(make_ref(2, Point { h: 10, v: 20 }, Links::default()));
        let outer_form = tree.alloc(Node::Form(FormNode { tag: 1, sibling: None, child: Some(nested_ref), last: Some(nested_ref) }));
        tree.push_form(outer_form);

        let top_ref = tree.alloc(make_ref(1, Point { h: 1, v: 2 }, Links::default()));
        // Must return (not hang) even though resolving the nested ref keeps
        // failing: the missing form means form 2 is never expanded into a
        // proxy, so a naive retry loop would call expand_ref on the same
        // still-`Ref` node forever.
        assert!(matches!(expand_ref(&mut tree, top_ref), Err(Error::NotABox(_))));
        assert!(matches!(tree.node(nested_ref), Node::Ref(_)), "failed nested ref is left unresolved, not looped on");
    }

    #[test]
    fn expand_ref_terminates_on_nested_ref_whose_content_is_not_a_box() {
        let mut tree = Tree::new();

        // Form 2's content is a bare kern, not a box.
        let inner_content = tree.alloc(kern(2, 1));
        let inner_form = tree.alloc(Node::Form(FormNode { tag: 2, sibling: None, child: Some(inner_content), last: Some(inner_content) }));
        tree.push_form(inner_form);

        // Form 1's sole content is a ref to form 2.
        let nested_ref = tree.alloc(make_ref(2, Point { h: 10, v: 20 }, Links::default()));
        let outer_form = tree.alloc(Node::Form(FormNode { tag: 1, sibling: None, child: Some(nested_ref), last: Some(nested_ref) }));
        tree.push_form(outer_form);

        let top_ref = tree.alloc(make_ref(1, Point { h: 1, v: 2 }, Links::default()));
        assert!(matches!(expand_ref(&mut tree, top_ref), Err(Error::NotABox(_))));
        assert!(matches!(tree.node(nested_ref), Node::Ref(_)), "failed nested ref is left unresolved, not looped on");
    }

    #[test]
    fn expand_ref_copies_char_index_onto_trailing_box_bdry() {
        let mut tree = Tree::new();
        let form_root = tree.alloc(vbox(5, 1));
        let form = tree.alloc(Node::Form(FormNode { tag: 5, sibling: None, child: Some(form_root), last: Some(form_root) }));
        tree.push_form(form);

        let bdry = tree.alloc(Node::BoxBdry(crate::node::BoxBdryNode { loc: Location::new(1, 99, None), point: Point::default(), links: Links::default() }));
        let r = tree.alloc(Node::Ref(RefNode {
            form_tag: 5,
            point: Point::default(),
            links: Links { parent: None, sibling: Some(bdry), arg_sibling: None },
            char_index: Some(77),
            line_index: Some(3),
        }));

        expand_ref(&mut tree, r).unwrap();

        let loc = tree.node(bdry).own_loc().unwrap();
        assert_eq!(loc.char_index, Some(77));
        assert_eq!(loc.line_index, Some(3));
    }

    #[test]
    fn kind_is_friend_eligible_matches_table() {
        assert!(NodeKind::Kern.is_friend_eligible());
        assert!(!NodeKind::VBox.is_friend_eligible());
    }
}
