//! Raw inspectors: `h`/`v`/`width`/`height`/`depth` in scaled points, with no
//! sign correction and no sp-to-page-point conversion. Those adjustments are
//! the vispector's job (`synctex-query`); this module only resolves a
//! proxy's position down to the real node it stands in for.

use crate::node::{BoxDims, Node, NodeId, Point};
use crate::tree::Tree;

fn resolved_point_and_dims(tree: &Tree, id: NodeId) -> (Point, BoxDims) {
    let node = tree.node(id);
    match node.target() {
        Some(target) => {
            let (target_point, dims) = resolved_point_and_dims(tree, target);
            let offset = node.offset();
            (Point { h: target_point.h + offset.h, v: target_point.v + offset.v }, dims)
        }
        None => (node.point().unwrap_or_default(), node.dims().unwrap_or_default()),
    }
}

pub fn h(tree: &Tree, id: NodeId) -> i32 {
    resolved_point_and_dims(tree, id).0.h
}

pub fn v(tree: &Tree, id: NodeId) -> i32 {
    resolved_point_and_dims(tree, id).0.v
}

pub fn width(tree: &Tree, id: NodeId) -> i32 {
    resolved_point_and_dims(tree, id).1.width
}

pub fn height(tree: &Tree, id: NodeId) -> i32 {
    resolved_point_and_dims(tree, id).1.height
}

pub fn depth(tree: &Tree, id: NodeId) -> i32 {
    resolved_point_and_dims(tree, id).1.depth
}

/// `(h, v, width, height, depth)` together, for callers that want the whole
/// box in one lookup (spec.md §4.F).
pub fn box_geometry(tree: &Tree, id: NodeId) -> (i32, i32, i32, i32, i32) {
    let (point, dims) = resolved_point_and_dims(tree, id);
    (point.h, point.v, dims.width, dims.height, dims.depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BoxDims as Dims, BoxNode, Links, Location, ProxyBoxNode};
    use pretty_assertions::assert_eq;

    #[test]
    fn raw_inspectors_read_own_fields_for_a_plain_box() {
        let mut tree = Tree::new();
        let id = tree.alloc(Node::VBox(BoxNode {
            loc: Location::new(1, 1, None),
            point: Point { h: 10, v: 20 },
            dims: Dims { width: 100, height: 200, depth: 5 },
            links: Links::default(),
            child: None,
            last: None,
        }));
        assert_eq!(h(&tree, id), 10);
        assert_eq!(v(&tree, id), 20);
        assert_eq!(width(&tree, id), 100);
        assert_eq!(height(&tree, id), 200);
        assert_eq!(depth(&tree, id), 5);
    }

    #[test]
    fn proxy_inspectors_add_offset_to_target_and_keep_target_dims() {
        let mut tree = Tree::new();
        let target = tree.alloc(Node::VBox(BoxNode {
            loc: Location::new(1, 1, None),
            point: Point { h: 10, v: 20 },
            dims: Dims { width: 100, height: 200, depth: 5 },
            links: Links::default(),
            child: None,
            last: None,
        }));
        let proxy = tree.alloc(Node::ProxyVBox(ProxyBoxNode {
            offset: Point { h: 1000, v: 2000 },
            target,
            links: Links::default(),
            child: None,
            last: None,
        }));
        assert_eq!(h(&tree, proxy), 1010);
        assert_eq!(v(&tree, proxy), 2020);
        assert_eq!(width(&tree, proxy), 100);
        assert_eq!(depth(&tree, proxy), 5);
    }
}
