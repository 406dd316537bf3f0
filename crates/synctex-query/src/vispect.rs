//! §4.H vispectors: convert scaled-point tree geometry into the page-point
//! floats callers actually want, applying the unit/offset the scanner
//! derived from the preamble and postamble (spec.md §4.I).

use synctex_model::{Node, NodeId, Point, Tree};

/// Chases `target`/`offset` down to the first non-proxy node, summing
/// offsets along the way (mirrors `synctex_model::inspect` but keeps the
/// terminal node itself, since kern/rule need their own fields, not just
/// resolved dims).
fn chase(tree: &Tree, id: NodeId) -> (NodeId, Point) {
    let mut id = id;
    let mut offset = Point::default();
    loop {
        let node = tree.node(id);
        match node.target() {
            Some(target) => {
                let o = node.offset();
                offset.h += o.h;
                offset.v += o.v;
                id = target;
            }
            None => return (id, offset),
        }
    }
}

pub fn visible_h(tree: &Tree, id: NodeId, unit: f64, x_offset: f64) -> f64 {
    let (term, offset) = chase(tree, id);
    let node = tree.node(term);
    let sp = match node {
        Node::Kern(k) => k.point.h + offset.h - k.width.max(0),
        Node::Rule(r) => r.point.h + offset.h - r.dims.width,
        _ => node.point().map(|p| p.h).unwrap_or(0) + offset.h,
    };
    sp as f64 * unit + x_offset
}

pub fn visible_v(tree: &Tree, id: NodeId, unit: f64, y_offset: f64) -> f64 {
    let (term, offset) = chase(tree, id);
    let node = tree.node(term);
    let sp = node.point().map(|p| p.v).unwrap_or(0) + offset.v;
    sp as f64 * unit + y_offset
}

pub fn visible_width(tree: &Tree, id: NodeId, unit: f64) -> f64 {
    let (term, _) = chase(tree, id);
    let node = tree.node(term);
    let sp = match node {
        Node::Kern(k) => k.width.unsigned_abs() as i64,
        Node::Rule(r) => r.dims.width.unsigned_abs() as i64,
        _ => node.width() as i64,
    };
    sp as f64 * unit
}

pub fn visible_height(tree: &Tree, id: NodeId, unit: f64) -> f64 {
    let (term, _) = chase(tree, id);
    let node = tree.node(term);
    let sp = node.inflated().map(|v| v.height).unwrap_or_else(|| node.height());
    sp as f64 * unit
}

pub fn visible_depth(tree: &Tree, id: NodeId, unit: f64) -> f64 {
    let (term, _) = chase(tree, id);
    let node = tree.node(term);
    let sp = node.inflated().map(|v| v.depth).unwrap_or_else(|| node.depth());
    sp as f64 * unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use synctex_model::{BoxDims, Links, Location, RuleNode};

    #[test]
    fn negative_width_rule_flips_origin_and_abs_width() {
        let mut tree = Tree::new();
        let id = tree.alloc(Node::Rule(RuleNode {
            loc: Location::new(2, 5, None),
            point: Point { h: 100, v: 200 },
            dims: BoxDims { width: -50, height: 10, depth: 5 },
            links: Links::default(),
        }));
        assert_eq!(visible_width(&tree, id, 1.0), 50.0);
        assert_eq!(visible_h(&tree, id, 1.0, 0.0), 150.0);
    }
}
