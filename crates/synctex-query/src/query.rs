//! §4.G query engine: edit query (page, h, v) and display query
//! (file, line, column, page_hint), each producing a [`QueryIterator`].

use rustc_hash::FxHashMap;

use synctex_model::{Node, NodeId, NodeKind, Point, Tree};

use crate::geom::{box_dist, h_dist, point_in_box, smaller_container, v_dist};
use crate::handle::{HandleId, HandleTree, QueryIterator};

fn find_sheet(tree: &Tree, page: i32) -> Option<NodeId> {
    tree.siblings(tree.sheets()).find(|&id| tree.node(id).page() == Some(page))
}

fn is_vbox(tree: &Tree, id: NodeId) -> bool {
    matches!(tree.node(id).kind(), NodeKind::VBox | NodeKind::ProxyVBox)
}

fn children_of(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    tree.siblings(tree.node(id).child()).filter(|&c| tree.node(c).kind() != NodeKind::BoxBdry).collect()
}

/// Recursively descend from `id` into the smallest child box that still
/// contains `hit`; if no child box contains it, descend into the child box
/// (that itself has children) closest to the hit by [`box_dist`].
fn deepest_container(tree: &Tree, hit: Point, id: NodeId) -> NodeId {
    let children = children_of(tree, id);
    let box_children: Vec<NodeId> = children.iter().copied().filter(|&c| tree.node(c).kind().is_box()).collect();

    let containing: Vec<NodeId> = box_children.iter().copied().filter(|&c| point_in_box(tree, hit, c)).collect();
    if !containing.is_empty() {
        let best = containing.into_iter().min_by(|&a, &b| smaller_container(tree, a, b)).expect("non-empty");
        return deepest_container(tree, hit, best);
    }

    let has_children: Vec<NodeId> = box_children.iter().copied().filter(|&c| tree.node(c).child().is_some()).collect();
    if let Some(best) = has_children.into_iter().min_by_key(|&c| box_dist(tree, hit, c)) {
        return deepest_container(tree, hit, best);
    }

    id
}

/// Nearest child to the left and to the right of `hit` within `container`,
/// ordered along h (or v, for a vbox container).
fn nearest_siblings(tree: &Tree, hit: Point, container: NodeId) -> (Option<NodeId>, Option<NodeId>) {
    let children = children_of(tree, container);
    let use_v = is_vbox(tree, container);
    let dist = |c: NodeId| if use_v { v_dist(tree, hit, c) } else { h_dist(tree, hit, c) };

    let mut left: Option<(i32, NodeId)> = None;
    let mut right: Option<(i32, NodeId)> = None;
    for c in children {
        let d = dist(c);
        if d > 0 {
            if right.is_none_or(|(best, _)| d < best) {
                right = Some((d, c));
            }
        } else if d < 0 {
            if left.is_none_or(|(best, _)| d > best) {
                left = Some((d, c));
            }
        } else {
            // Exact hit: treat as both candidates so the narrowing step
            // below still has something to recurse into.
            left = Some((0, c));
            right = Some((0, c));
        }
    }
    (left.map(|(_, c)| c), right.map(|(_, c)| c))
}

/// Narrow a candidate found by [`nearest_siblings`] by recursing into its
/// own deepest container, then finding the closest leaf within that.
fn narrow(tree: &Tree, hit: Point, candidate: NodeId) -> NodeId {
    if tree.node(candidate).kind().is_box() {
        let deepest = deepest_container(tree, hit, candidate);
        closest_deep_child(tree, hit, deepest).unwrap_or(deepest)
    } else {
        candidate
    }
}

/// "Closest deep child" fallback (§4.G step 6): the single content node
/// anywhere under `root` minimizing [`box_dist`] to `hit`.
fn closest_deep_child(tree: &Tree, hit: Point, root: NodeId) -> Option<NodeId> {
    fn walk(tree: &Tree, hit: Point, id: NodeId, best: &mut Option<(i32, NodeId)>) {
        for c in children_of(tree, id) {
            let d = box_dist(tree, hit, c);
            if best.is_none_or(|(bd, _)| d < bd) {
                *best = Some((d, c));
            }
            if tree.node(c).child().is_some() {
                walk(tree, hit, c, best);
            }
        }
    }
    let mut best = None;
    walk(tree, hit, root, &mut best);
    best.map(|(_, id)| id)
}

fn line_of(tree: &Tree, id: NodeId) -> i32 {
    tree.tlc(id).map(|l| l.line).unwrap_or(i32::MAX)
}

/// `(page, h, v)` in scaled points → query iterator (spec.md §4.G). Unit
/// conversion from page points into scaled points is the caller's concern
/// (the facade owns the scanner's unit/offset); this entry point always
/// takes the hit already in tree coordinates.
pub fn edit_query(tree: &Tree, page: i32, hit: Point) -> QueryIterator {
    let Some(sheet) = find_sheet(tree, page) else {
        return QueryIterator::empty();
    };

    let mut best_hbox: Option<NodeId> = None;
    for hbox in tree.siblings(tree.node(sheet).next_hbox()) {
        if point_in_box(tree, hit, hbox) {
            best_hbox = Some(match best_hbox {
                Some(prev) if smaller_container(tree, prev, hbox) != std::cmp::Ordering::Greater => prev,
                _ => hbox,
            });
        }
    }

    let mut winners: Vec<NodeId> = Vec::new();
    if let Some(hbox) = best_hbox {
        let deepest = deepest_container(tree, hit, hbox);
        let (left, right) = nearest_siblings(tree, hit, deepest);
        winners.extend(left.map(|c| narrow(tree, hit, c)));
        winners.extend(right.map(|c| narrow(tree, hit, c)));
    } else if let Some(found) = closest_deep_child(tree, hit, sheet) {
        winners.push(found);
    }

    if winners.is_empty() {
        return QueryIterator::empty();
    }
    if winners.len() == 2 {
        let (a, b) = (winners[0], winners[1]);
        let (la, lb) = (line_of(tree, a), line_of(tree, b));
        let winner_first = if la < lb {
            vec![a, b]
        } else if lb < la {
            vec![b, a]
        } else if box_dist(tree, hit, a) <= box_dist(tree, hit, b) {
            vec![a, b]
        } else {
            vec![b, a]
        };
        winners = winner_first;
    }

    let mut handles = HandleTree::new();
    let mut prev = None;
    let mut root = None;
    for id in winners {
        let page = tree.node(sheet).page().unwrap_or(page);
        let h = handles.alloc(id, page);
        if root.is_none() {
            root = Some(h);
        }
        if let Some(p) = prev {
            handles.append_sibling(p, h);
        }
        prev = Some(h);
    }
    QueryIterator::new(handles, root)
}

fn normalized_name(name: &str) -> String {
    let name = name.strip_prefix("./").unwrap_or(name);
    if cfg!(windows) {
        name.to_ascii_lowercase()
    } else {
        name.to_string()
    }
}

/// Resolve `file` to an input tag: exact match first, then a
/// case-insensitive/relative-prefix comparison (spec.md §6.4), preferring a
/// unique basename match when several inputs share one.
fn resolve_tag(tree: &Tree, file: &str) -> Option<i32> {
    let target = normalized_name(file);
    let target_base = target.rsplit('/').next().unwrap_or(&target);

    let mut exact = None;
    let mut basename_matches = Vec::new();
    for id in tree.siblings(tree.inputs()) {
        let Node::Input(input) = tree.node(id) else { continue };
        let candidate = normalized_name(&input.name);
        if candidate == target {
            exact = Some(input.tag);
            break;
        }
        if candidate.rsplit('/').next().unwrap_or(&candidate) == target_base {
            basename_matches.push(input.tag);
        }
    }
    exact.or_else(|| if basename_matches.len() == 1 { Some(basename_matches[0]) } else { None })
}

fn ancestor_page(tree: &Tree, id: NodeId) -> i32 {
    let mut cur = id;
    loop {
        match tree.node(cur).parent() {
            Some(p) => {
                if let Some(page) = tree.node(p).page() {
                    return page;
                }
                cur = p;
            }
            None => return tree.node(cur).page().unwrap_or(0),
        }
    }
}

fn ancestor_box(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut cur = tree.node(id).parent()?;
    loop {
        if tree.node(cur).kind().is_box() {
            return Some(cur);
        }
        cur = tree.node(cur).parent()?;
    }
}

const DISPLAY_QUERY_MAX_PERTURBATION: i32 = 100;

/// `(file, line, column, page_hint)` → query iterator (spec.md §4.G).
/// `strong_mode` disables the ±1, ±2, … line-perturbation fallback.
pub fn display_query(tree: &Tree, file: &str, line: i32, _column: i32, page_hint: i32, strong_mode: bool) -> QueryIterator {
    let Some(tag) = resolve_tag(tree, file) else {
        return QueryIterator::empty();
    };

    let candidates = find_candidates(tree, tag, line, strong_mode);
    if candidates.is_empty() {
        return QueryIterator::empty();
    }

    let mut by_page: FxHashMap<i32, Vec<NodeId>> = FxHashMap::default();
    for id in candidates {
        by_page.entry(ancestor_page(tree, id)).or_default().push(id);
    }

    let mut pages: Vec<i32> = by_page.keys().copied().collect();
    pages.sort_by_key(|&p| (p - page_hint).abs());

    let mut handles = HandleTree::new();
    let mut page_heads: Vec<HandleId> = Vec::new();
    for page in pages {
        let mut members = by_page.remove(&page).unwrap();
        let weight_of = |id: NodeId| -> usize {
            let Some(anchor) = ancestor_box(tree, id) else { return 0 };
            members.iter().filter(|&&other| ancestor_box(tree, other) == Some(anchor)).count().saturating_sub(1)
        };
        let mut weighted: Vec<(usize, NodeId)> = members.iter().map(|&id| (weight_of(id), id)).filter(|&(w, _)| w > 0).collect();
        if weighted.is_empty() {
            // No companions shared an ancestor box: keep the raw list rather
            // than discarding the whole page (a document with exactly one
            // match per line is the common case, not a synthetic one).
            weighted = members.into_iter().map(|id| (0, id)).collect();
        }
        weighted.sort_by(|a, b| b.0.cmp(&a.0));

        let mut prev_in_page: Option<HandleId> = None;
        let mut page_head: Option<HandleId> = None;
        for (_, id) in weighted {
            let h = handles.alloc(id, page);
            if page_head.is_none() {
                page_head = Some(h);
            }
            if let Some(p) = prev_in_page {
                handles.append_child(p, h);
            }
            prev_in_page = Some(h);
        }
        if let Some(head) = page_head {
            page_heads.push(head);
        }
    }

    let root = page_heads.first().copied();
    for pair in page_heads.windows(2) {
        handles.append_sibling(pair[0], pair[1]);
    }
    QueryIterator::new(handles, root)
}

fn find_candidates(tree: &Tree, tag: i32, line: i32, strong_mode: bool) -> Vec<NodeId> {
    let exact: Vec<NodeId> = tree.friends(tag, line).to_vec();
    if !exact.is_empty() || strong_mode {
        return exact;
    }
    for delta in 1..=DISPLAY_QUERY_MAX_PERTURBATION {
        for candidate_line in [line - delta, line + delta] {
            let hit = tree.friends(tag, candidate_line);
            if !hit.is_empty() {
                return hit.to_vec();
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use synctex_model::{BoxDims, BoxNode, InputNode, KernNode, Links, Location, SheetNode};

    fn make_sheet_with_vbox() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let sheet = tree.alloc(Node::Sheet(SheetNode { page: 1, ..Default::default() }));
        tree.push_sheet(sheet);
        let vbox = tree.alloc(Node::VBox(BoxNode {
            loc: Location::new(1, 10, None),
            point: Point { h: 20, v: 350 },
            dims: BoxDims { width: 330, height: 330, depth: 0 },
            links: Links::default(),
            child: None,
            last: None,
        }));
        tree.append_child(sheet, vbox);
        (tree, sheet, vbox)
    }

    #[test]
    fn display_query_resolves_exact_input_name() {
        let (mut tree, _sheet, vbox) = make_sheet_with_vbox();
        let input = tree.alloc(Node::Input(InputNode { tag: 1, line: 1, name: "./1.tex".into(), sibling: None }));
        tree.push_input(input);
        let k = tree.alloc(Node::Kern(KernNode { loc: Location::new(1, 10, None), point: Point::default(), width: 0, links: Links::default() }));
        tree.append_child(vbox, k);
        tree.register_friend(k);

        let mut it = display_query(&tree, "./1.tex", 10, 0, 1, false);
        assert!(it.has_next());
        assert_eq!(it.next(), Some(k));
    }

    #[test]
    fn edit_query_missing_page_returns_empty() {
        let (tree, _sheet, _vbox) = make_sheet_with_vbox();
        let it = edit_query(&tree, 99, Point { h: 0, v: 0 });
        assert!(!it.has_next());
        assert_eq!(it.count(), 0);
    }
}
