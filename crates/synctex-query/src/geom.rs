//! §4.F geometric utilities: point-to-box distance, ordered axis distance and
//! the smaller-container comparator the edit query walks down with.

use std::cmp::Ordering;

use synctex_model::{Node, NodeId, NodeKind, Point, Tree};

/// Ordered horizontal distance from `hit` to `node`, resolving proxies and
/// (for legacy trees only) refs along the way.
///
/// Positive: `node` lies to the right of `hit`. Negative: to the left.
/// Zero: `hit` falls within `node`'s horizontal span.
pub fn h_dist(tree: &Tree, hit: Point, node: NodeId) -> i32 {
    h_dist_inner(tree, hit, node)
}

fn h_dist_inner(tree: &Tree, hit: Point, id: NodeId) -> i32 {
    let node = tree.node(id);
    match node {
        Node::Ref(r) => {
            // Refs shouldn't survive post-processing (invariant P4); this
            // branch only matters for a tree that skipped expansion.
            let _ = r;
            0
        }
        Node::Proxy(_) | Node::ProxyLast(_) | Node::ProxyVBox(_) | Node::ProxyHBox(_) => {
            let offset = node.offset();
            let shifted = Point { h: hit.h - offset.h, v: hit.v - offset.v };
            h_dist_inner(tree, shifted, node.target().expect("proxy always has a target"))
        }
        Node::Kern(k) => kern_axis_dist(hit.h, k.point.h, k.width),
        Node::VBox(_) | Node::VoidVBox(_) | Node::HBox(_) | Node::VoidHBox(_) => {
            let point = node.point().unwrap();
            let width = node.width();
            let (min, max) = span(point.h, width);
            box_axis_dist(hit.h, min, max)
        }
        _ => {
            let point = node.point().unwrap_or_default();
            point.h - hit.h
        }
    }
}

/// Ordered vertical distance, symmetric to [`h_dist`]: boxes use
/// `(v - height, v + depth)` as their vertical span.
pub fn v_dist(tree: &Tree, hit: Point, id: NodeId) -> i32 {
    let node = tree.node(id);
    match node {
        Node::Proxy(_) | Node::ProxyLast(_) | Node::ProxyVBox(_) | Node::ProxyHBox(_) => {
            let offset = node.offset();
            let shifted = Point { h: hit.h - offset.h, v: hit.v - offset.v };
            v_dist(tree, shifted, node.target().expect("proxy always has a target"))
        }
        Node::VBox(_) | Node::VoidVBox(_) | Node::HBox(_) | Node::VoidHBox(_) => {
            let point = node.point().unwrap();
            let dims = node.dims().unwrap();
            let min = point.v - dims.height;
            let max = point.v + dims.depth;
            box_axis_dist(hit.v, min, max)
        }
        _ => {
            let point = node.point().unwrap_or_default();
            point.v - hit.v
        }
    }
}

fn span(origin: i32, extent: i32) -> (i32, i32) {
    if extent >= 0 {
        (origin, origin + extent)
    } else {
        (origin + extent, origin)
    }
}

fn box_axis_dist(hit: i32, min: i32, max: i32) -> i32 {
    if hit < min {
        min - hit
    } else if hit > max {
        max - hit
    } else {
        0
    }
}

/// A kern's "box" runs `|width|` wide, positioned to the left of `h` when
/// `width >= 0` and to the right otherwise (spec.md §4.F). Hits that land
/// inside it get a ±1 penalty on the near-edge distance so a kern never ties
/// with real glyph content occupying the same line.
fn kern_axis_dist(hit: i32, h: i32, width: i32) -> i32 {
    let (min, max) = if width >= 0 { (h - width, h) } else { (h, h - width) };
    if hit < min {
        return min - hit;
    }
    if hit > max {
        return max - hit;
    }
    let dist_to_min = hit - min;
    let dist_to_max = max - hit;
    if dist_to_min <= dist_to_max {
        -(dist_to_min + 1)
    } else {
        dist_to_max + 1
    }
}

/// Nine-region point-to-box distance: zero inside, an axis gap on an edge,
/// the sum of both gaps at a corner.
pub fn box_dist(tree: &Tree, hit: Point, id: NodeId) -> i32 {
    h_dist(tree, hit, id).abs() + v_dist(tree, hit, id).abs()
}

pub fn point_in_box(tree: &Tree, hit: Point, id: NodeId) -> bool {
    h_dist(tree, hit, id) == 0 && v_dist(tree, hit, id) == 0
}

/// Orders two overlapping containers by area (`(height+depth) * |width|`),
/// the smaller winning; ties broken by narrower width, then smaller total
/// height.
pub fn smaller_container(tree: &Tree, a: NodeId, b: NodeId) -> Ordering {
    let metrics = |id: NodeId| -> (i64, i64, i64) {
        let dims = tree.node(id).dims().unwrap_or_default();
        let area = (dims.height as i64 + dims.depth as i64) * (dims.width as i64).abs();
        (area, (dims.width as i64).abs(), dims.height as i64 + dims.depth as i64)
    };
    let ma = metrics(a);
    let mb = metrics(b);
    ma.cmp(&mb)
}

pub fn is_box_kind(tree: &Tree, id: NodeId) -> bool {
    tree.node(id).kind().is_box()
}

pub fn is_hbox_kind(tree: &Tree, id: NodeId) -> bool {
    tree.node(id).kind() == NodeKind::HBox || tree.node(id).kind() == NodeKind::VoidHBox || tree.node(id).kind() == NodeKind::ProxyHBox
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use synctex_model::{BoxDims, BoxNode, Links, Location};

    fn vbox(tag: i32, line: i32, point: Point, dims: BoxDims) -> Node {
        Node::VBox(BoxNode { loc: Location::new(tag, line, None), point, dims, links: Links::default(), child: None, last: None })
    }

    #[test]
    fn box_axis_dist_zero_inside() {
        assert_eq!(box_axis_dist(5, 0, 10), 0);
    }

    #[test]
    fn box_axis_dist_positive_when_hit_left_of_box() {
        assert_eq!(box_axis_dist(-3, 0, 10), 3);
    }

    #[test]
    fn box_axis_dist_negative_when_hit_right_of_box() {
        assert_eq!(box_axis_dist(15, 0, 10), -5);
    }

    #[test]
    fn point_in_box_true_for_interior_hit() {
        let mut tree = Tree::new();
        let id = tree.alloc(vbox(1, 10, Point { h: 0, v: 100 }, BoxDims { width: 100, height: 50, depth: 10 }));
        assert!(point_in_box(&tree, Point { h: 50, v: 90 }, id));
        assert!(!point_in_box(&tree, Point { h: 200, v: 90 }, id));
    }

    #[test]
    fn smaller_container_prefers_smaller_area() {
        let mut tree = Tree::new();
        let big = tree.alloc(vbox(1, 1, Point::default(), BoxDims { width: 1000, height: 1000, depth: 0 }));
        let small = tree.alloc(vbox(1, 2, Point::default(), BoxDims { width: 10, height: 10, depth: 0 }));
        assert_eq!(smaller_container(&tree, small, big), Ordering::Less);
    }

    #[test]
    fn kern_hit_gets_nonzero_penalty_even_when_centered() {
        // width=10 positioned [h-10, h]; hit at h (the near edge) still must
        // not report a bare zero.
        assert_ne!(kern_axis_dist(10, 10, 10), 0);
    }
}
