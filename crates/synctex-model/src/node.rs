use la_arena::Idx;

use crate::kind::NodeKind;

/// Identity of a primary node or proxy in a [`crate::Tree`]'s arena.
///
/// Per spec.md §9's "proxies via node + offset + target reference" design
/// note, this is an arena index rather than a raw pointer: targets outlive
/// referrers for as long as the owning `Tree` is alive, so resolving a
/// `NodeId` back to data is always a plain index lookup.
pub type NodeId = Idx<Node>;

/// Where a node was defined in the `.synctex` source: the `(tag, line,
/// column)` triple of spec.md §3.1, plus the optional char/line index the
/// original carries behind `SYNCTEX_USE_CHARINDEX` (spec.md §9 supplement) —
/// used only to retarget a synthesized trailing `BoxBdry` when a form ref is
/// spliced out from under it (§4.E step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub tag: i32,
    pub line: i32,
    /// `None` means no column field was present in the record; `Some(-1)`
    /// is a legitimate sentinel some engines emit and is preserved as-is
    /// (spec.md §9 Open Question).
    pub column: Option<i32>,
    pub char_index: Option<u32>,
    pub line_index: Option<u32>,
}

impl Location {
    pub fn new(tag: i32, line: i32, column: Option<i32>) -> Self {
        Self { tag, line, column, char_index: None, line_index: None }
    }
}

/// A point in scaled points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub h: i32,
    pub v: i32,
}

/// Width/height/depth in scaled points. Negative values are legal and
/// semantically meaningful (spec.md §3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxDims {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

/// The inflated "visible" box dimensions an hbox grows to enclose
/// overflowing content (spec.md §4.D, `make_hbox_contain_box`/`_point`).
/// Stored in scaled points; converted to page points only by the vispector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InflatedDims {
    pub h: i32,
    pub v: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

/// Common navigation slots shared by every box/content kind rooted in a
/// sheet or form (spec.md §3.3): sibling chain with back-pointer, parent,
/// first/last child.
#[derive(Debug, Clone, Copy, Default)]
pub struct Links {
    pub parent: Option<NodeId>,
    pub sibling: Option<NodeId>,
    pub arg_sibling: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct InputNode {
    pub tag: i32,
    pub line: i32,
    pub name: String,
    pub sibling: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SheetNode {
    pub page: i32,
    pub sibling: Option<NodeId>,
    pub child: Option<NodeId>,
    pub last: Option<NodeId>,
    pub next_hbox: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct FormNode {
    pub tag: i32,
    pub sibling: Option<NodeId>,
    pub child: Option<NodeId>,
    pub last: Option<NodeId>,
}

/// `VBox` / `HBox`: non-void content boxes built at parse time.
#[derive(Debug, Clone)]
pub struct BoxNode {
    pub loc: Location,
    pub point: Point,
    pub dims: BoxDims,
    pub links: Links,
    pub child: Option<NodeId>,
    pub last: Option<NodeId>,
}

/// The hbox-only supplement: `next_hbox` threading and the inflated `_V`
/// dimensions (spec.md §3.1, §4.D).
#[derive(Debug, Clone)]
pub struct HBoxNode {
    pub base: BoxNode,
    pub next_hbox: Option<NodeId>,
    pub mean_line: i32,
    pub weight: i32,
    pub inflated: InflatedDims,
}

/// `VoidVBox` / `VoidHBox`: boxes with dimensions but no content.
#[derive(Debug, Clone)]
pub struct VoidBoxNode {
    pub loc: Location,
    pub point: Point,
    pub dims: BoxDims,
    pub links: Links,
}

#[derive(Debug, Clone)]
pub struct KernNode {
    pub loc: Location,
    pub point: Point,
    pub width: i32,
    pub links: Links,
}

#[derive(Debug, Clone)]
pub struct GlueNode {
    pub loc: Location,
    pub point: Point,
    pub links: Links,
}

#[derive(Debug, Clone)]
pub struct RuleNode {
    pub loc: Location,
    pub point: Point,
    pub dims: BoxDims,
    pub links: Links,
}

#[derive(Debug, Clone)]
pub struct MathNode {
    pub loc: Location,
    pub point: Point,
    pub links: Links,
}

#[derive(Debug, Clone)]
pub struct BoundaryNode {
    pub loc: Location,
    pub point: Point,
    pub links: Links,
}

/// Synthetic open/close marker inserted as the first and last child of every
/// hbox (spec.md §3.1 glossary entry "BoxBdry").
#[derive(Debug, Clone)]
pub struct BoxBdryNode {
    pub loc: Location,
    pub point: Point,
    pub links: Links,
}

/// `f tag:h,v` form reference. Replaced with a root proxy during §4.E
/// post-processing; no `Ref` survives in a parsed tree (invariant P4).
#[derive(Debug, Clone)]
pub struct RefNode {
    pub form_tag: i32,
    pub point: Point,
    pub links: Links,
    /// Carried so §4.E step 4 can copy them onto the trailing `BoxBdry` the
    /// ref is spliced in front of, once the ref itself is gone.
    pub char_index: Option<u32>,
    pub line_index: Option<u32>,
}

/// Generic (non-box) proxy: a placement of some primary content at an
/// `(h, v)` offset from its owner (spec.md §3.1, §4.E).
#[derive(Debug, Clone)]
pub struct ProxyNode {
    pub offset: Point,
    pub target: NodeId,
    pub links: Links,
    /// Set on the synthesized final proxy of a lazily materialized child
    /// chain (`ProxyLast`); carries the target's own last sibling for
    /// boundary logic. `None` for ordinary (non-`ProxyLast`) proxies.
    pub target_last: Option<NodeId>,
}

/// Root proxy family: replaces a `Ref`, owns (possibly lazily materialized)
/// child proxies the way a real box owns children.
#[derive(Debug, Clone)]
pub struct ProxyBoxNode {
    pub offset: Point,
    pub target: NodeId,
    pub links: Links,
    pub child: Option<NodeId>,
    pub last: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ProxyHBoxNode {
    pub base: ProxyBoxNode,
    pub next_hbox: Option<NodeId>,
}

/// A node in a SyncTeX tree. One variant per kind (spec.md §3.1); absent
/// navigational slots for a kind are simply not fields on that variant,
/// rather than `-1` sentinels into a shared cell array (spec.md §9).
#[derive(Debug, Clone)]
pub enum Node {
    Input(InputNode),
    Sheet(SheetNode),
    Form(FormNode),
    VBox(BoxNode),
    HBox(HBoxNode),
    VoidVBox(VoidBoxNode),
    VoidHBox(VoidBoxNode),
    Kern(KernNode),
    Glue(GlueNode),
    Rule(RuleNode),
    Math(MathNode),
    Boundary(BoundaryNode),
    BoxBdry(BoxBdryNode),
    Ref(RefNode),
    Proxy(ProxyNode),
    ProxyLast(ProxyNode),
    ProxyVBox(ProxyBoxNode),
    ProxyHBox(ProxyHBoxNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Input(_) => NodeKind::Input,
            Node::Sheet(_) => NodeKind::Sheet,
            Node::Form(_) => NodeKind::Form,
            Node::VBox(_) => NodeKind::VBox,
            Node::HBox(_) => NodeKind::HBox,
            Node::VoidVBox(_) => NodeKind::VoidVBox,
            Node::VoidHBox(_) => NodeKind::VoidHBox,
            Node::Kern(_) => NodeKind::Kern,
            Node::Glue(_) => NodeKind::Glue,
            Node::Rule(_) => NodeKind::Rule,
            Node::Math(_) => NodeKind::Math,
            Node::Boundary(_) => NodeKind::Boundary,
            Node::BoxBdry(_) => NodeKind::BoxBdry,
            Node::Ref(_) => NodeKind::Ref,
            Node::Proxy(_) => NodeKind::Proxy,
            Node::ProxyLast(_) => NodeKind::ProxyLast,
            Node::ProxyVBox(_) => NodeKind::ProxyVBox,
            Node::ProxyHBox(_) => NodeKind::ProxyHBox,
        }
    }

    pub fn isa(&self) -> &'static str {
        self.kind().as_str()
    }

    /// `(tag, line, column)` — the tlcpector of spec.md §3.1. Proxies
    /// forward to their target; callers resolve through `Tree` when the
    /// target itself needs a lookup (see [`crate::tree::Tree::tlc`]).
    pub fn own_loc(&self) -> Option<&Location> {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => Some(&b.loc),
            Node::VoidHBox(b) => Some(&b.loc),
            Node::HBox(b) => Some(&b.base.loc),
            Node::Kern(n) => Some(&n.loc),
            Node::Glue(n) => Some(&n.loc),
            Node::Rule(n) => Some(&n.loc),
            Node::Math(n) => Some(&n.loc),
            Node::Boundary(n) => Some(&n.loc),
            Node::BoxBdry(n) => Some(&n.loc),
            _ => None,
        }
    }

    pub fn own_loc_mut(&mut self) -> Option<&mut Location> {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => Some(&mut b.loc),
            Node::VoidHBox(b) => Some(&mut b.loc),
            Node::HBox(b) => Some(&mut b.base.loc),
            Node::Kern(n) => Some(&mut n.loc),
            Node::Glue(n) => Some(&mut n.loc),
            Node::Rule(n) => Some(&mut n.loc),
            Node::Math(n) => Some(&mut n.loc),
            Node::Boundary(n) => Some(&mut n.loc),
            Node::BoxBdry(n) => Some(&mut n.loc),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => b.links.parent,
            Node::VoidHBox(b) => b.links.parent,
            Node::HBox(b) => b.base.links.parent,
            Node::Kern(n) => n.links.parent,
            Node::Glue(n) => n.links.parent,
            Node::Rule(n) => n.links.parent,
            Node::Math(n) => n.links.parent,
            Node::Boundary(n) => n.links.parent,
            Node::BoxBdry(n) => n.links.parent,
            Node::Ref(n) => n.links.parent,
            Node::Proxy(p) | Node::ProxyLast(p) => p.links.parent,
            Node::ProxyVBox(p) => p.links.parent,
            Node::ProxyHBox(p) => p.base.links.parent,
            Node::Input(_) | Node::Sheet(_) | Node::Form(_) => None,
        }
    }

    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => b.links.parent = parent,
            Node::VoidHBox(b) => b.links.parent = parent,
            Node::HBox(b) => b.base.links.parent = parent,
            Node::Kern(n) => n.links.parent = parent,
            Node::Glue(n) => n.links.parent = parent,
            Node::Rule(n) => n.links.parent = parent,
            Node::Math(n) => n.links.parent = parent,
            Node::Boundary(n) => n.links.parent = parent,
            Node::BoxBdry(n) => n.links.parent = parent,
            Node::Ref(n) => n.links.parent = parent,
            Node::Proxy(p) | Node::ProxyLast(p) => p.links.parent = parent,
            Node::ProxyVBox(p) => p.links.parent = parent,
            Node::ProxyHBox(p) => p.base.links.parent = parent,
            Node::Input(_) | Node::Sheet(_) | Node::Form(_) => {}
        }
    }

    pub fn sibling(&self) -> Option<NodeId> {
        match self {
            Node::Input(n) => n.sibling,
            Node::Sheet(n) => n.sibling,
            Node::Form(n) => n.sibling,
            Node::VBox(b) | Node::VoidVBox(b) => b.links.sibling,
            Node::VoidHBox(b) => b.links.sibling,
            Node::HBox(b) => b.base.links.sibling,
            Node::Kern(n) => n.links.sibling,
            Node::Glue(n) => n.links.sibling,
            Node::Rule(n) => n.links.sibling,
            Node::Math(n) => n.links.sibling,
            Node::Boundary(n) => n.links.sibling,
            Node::BoxBdry(n) => n.links.sibling,
            Node::Ref(n) => n.links.sibling,
            Node::Proxy(p) | Node::ProxyLast(p) => p.links.sibling,
            Node::ProxyVBox(p) => p.links.sibling,
            Node::ProxyHBox(p) => p.base.links.sibling,
        }
    }

    pub fn set_sibling(&mut self, sibling: Option<NodeId>) {
        match self {
            Node::Input(n) => n.sibling = sibling,
            Node::Sheet(n) => n.sibling = sibling,
            Node::Form(n) => n.sibling = sibling,
            Node::VBox(b) | Node::VoidVBox(b) => b.links.sibling = sibling,
            Node::VoidHBox(b) => b.links.sibling = sibling,
            Node::HBox(b) => b.base.links.sibling = sibling,
            Node::Kern(n) => n.links.sibling = sibling,
            Node::Glue(n) => n.links.sibling = sibling,
            Node::Rule(n) => n.links.sibling = sibling,
            Node::Math(n) => n.links.sibling = sibling,
            Node::Boundary(n) => n.links.sibling = sibling,
            Node::BoxBdry(n) => n.links.sibling = sibling,
            Node::Ref(n) => n.links.sibling = sibling,
            Node::Proxy(p) | Node::ProxyLast(p) => p.links.sibling = sibling,
            Node::ProxyVBox(p) => p.links.sibling = sibling,
            Node::ProxyHBox(p) => p.base.links.sibling = sibling,
        }
    }

    pub fn arg_sibling(&self) -> Option<NodeId> {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => b.links.arg_sibling,
            Node::VoidHBox(b) => b.links.arg_sibling,
            Node::HBox(b) => b.base.links.arg_sibling,
            Node::Kern(n) => n.links.arg_sibling,
            Node::Glue(n) => n.links.arg_sibling,
            Node::Rule(n) => n.links.arg_sibling,
            Node::Math(n) => n.links.arg_sibling,
            Node::Boundary(n) => n.links.arg_sibling,
            Node::BoxBdry(n) => n.links.arg_sibling,
            Node::Ref(n) => n.links.arg_sibling,
            Node::Proxy(p) | Node::ProxyLast(p) => p.links.arg_sibling,
            Node::ProxyVBox(p) => p.links.arg_sibling,
            Node::ProxyHBox(p) => p.base.links.arg_sibling,
            Node::Input(_) | Node::Sheet(_) | Node::Form(_) => None,
        }
    }

    pub fn set_arg_sibling(&mut self, arg_sibling: Option<NodeId>) {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => b.links.arg_sibling = arg_sibling,
            Node::VoidHBox(b) => b.links.arg_sibling = arg_sibling,
            Node::HBox(b) => b.base.links.arg_sibling = arg_sibling,
            Node::Kern(n) => n.links.arg_sibling = arg_sibling,
            Node::Glue(n) => n.links.arg_sibling = arg_sibling,
            Node::Rule(n) => n.links.arg_sibling = arg_sibling,
            Node::Math(n) => n.links.arg_sibling = arg_sibling,
            Node::Boundary(n) => n.links.arg_sibling = arg_sibling,
            Node::BoxBdry(n) => n.links.arg_sibling = arg_sibling,
            Node::Ref(n) => n.links.arg_sibling = arg_sibling,
            Node::Proxy(p) | Node::ProxyLast(p) => p.links.arg_sibling = arg_sibling,
            Node::ProxyVBox(p) => p.links.arg_sibling = arg_sibling,
            Node::ProxyHBox(p) => p.base.links.arg_sibling = arg_sibling,
            Node::Input(_) | Node::Sheet(_) | Node::Form(_) => {}
        }
    }

    pub fn child(&self) -> Option<NodeId> {
        match self {
            Node::Sheet(n) => n.child,
            Node::Form(n) => n.child,
            Node::VBox(b) => b.child,
            Node::HBox(b) => b.base.child,
            Node::ProxyVBox(p) => p.child,
            Node::ProxyHBox(p) => p.base.child,
            _ => None,
        }
    }

    pub fn set_child(&mut self, child: Option<NodeId>) {
        match self {
            Node::Sheet(n) => n.child = child,
            Node::Form(n) => n.child = child,
            Node::VBox(b) => b.child = child,
            Node::HBox(b) => b.base.child = child,
            Node::ProxyVBox(p) => p.child = child,
            Node::ProxyHBox(p) => p.base.child = child,
            _ => {}
        }
    }

    pub fn last(&self) -> Option<NodeId> {
        match self {
            Node::Sheet(n) => n.last,
            Node::Form(n) => n.last,
            Node::VBox(b) => b.last,
            Node::HBox(b) => b.base.last,
            Node::ProxyVBox(p) => p.last,
            Node::ProxyHBox(p) => p.base.last,
            _ => None,
        }
    }

    pub fn set_last(&mut self, last: Option<NodeId>) {
        match self {
            Node::Sheet(n) => n.last = last,
            Node::Form(n) => n.last = last,
            Node::VBox(b) => b.last = last,
            Node::HBox(b) => b.base.last = last,
            Node::ProxyVBox(p) => p.last = last,
            Node::ProxyHBox(p) => p.base.last = last,
            _ => {}
        }
    }

    pub fn next_hbox(&self) -> Option<NodeId> {
        match self {
            Node::Sheet(n) => n.next_hbox,
            Node::HBox(b) => b.next_hbox,
            Node::ProxyHBox(p) => p.next_hbox,
            _ => None,
        }
    }

    pub fn set_next_hbox(&mut self, next_hbox: Option<NodeId>) {
        match self {
            Node::Sheet(n) => n.next_hbox = next_hbox,
            Node::HBox(b) => b.next_hbox = next_hbox,
            Node::ProxyHBox(p) => p.next_hbox = next_hbox,
            _ => {}
        }
    }

    /// The node a proxy or form ref refers to; `None` for every other kind.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Node::Proxy(p) | Node::ProxyLast(p) => Some(p.target),
            Node::ProxyVBox(p) => Some(p.target),
            Node::ProxyHBox(p) => Some(p.base.target),
            _ => None,
        }
    }

    pub fn offset(&self) -> Point {
        match self {
            Node::Proxy(p) | Node::ProxyLast(p) => p.offset,
            Node::ProxyVBox(p) => p.offset,
            Node::ProxyHBox(p) => p.base.offset,
            _ => Point::default(),
        }
    }

    pub fn tag(&self) -> Option<i32> {
        match self {
            Node::Input(n) => Some(n.tag),
            Node::Form(n) => Some(n.tag),
            Node::Ref(n) => Some(n.form_tag),
            other => other.own_loc().map(|l| l.tag),
        }
    }

    pub fn page(&self) -> Option<i32> {
        match self {
            Node::Sheet(n) => Some(n.page),
            _ => None,
        }
    }

    /// This node's own `(h, v)`, in scaled points, unadjusted for any
    /// enclosing proxy offset. `None` for root-list kinds that carry no
    /// position (`Input`, `Sheet`, `Form`).
    pub fn point(&self) -> Option<Point> {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => Some(b.point),
            Node::VoidHBox(b) => Some(b.point),
            Node::HBox(b) => Some(b.base.point),
            Node::Kern(n) => Some(n.point),
            Node::Glue(n) => Some(n.point),
            Node::Rule(n) => Some(n.point),
            Node::Math(n) => Some(n.point),
            Node::Boundary(n) => Some(n.point),
            Node::BoxBdry(n) => Some(n.point),
            Node::Ref(n) => Some(n.point),
            _ => None,
        }
    }

    /// Width/height/depth, for box and rule kinds only.
    pub fn dims(&self) -> Option<BoxDims> {
        match self {
            Node::VBox(b) | Node::VoidVBox(b) => Some(b.dims),
            Node::VoidHBox(b) => Some(b.dims),
            Node::HBox(b) => Some(b.base.dims),
            Node::Rule(n) => Some(n.dims),
            _ => None,
        }
    }

    /// The inflated `_V` dimensions an hbox grew to in order to contain
    /// overflowing content; `None` for every other kind.
    pub fn inflated(&self) -> Option<InflatedDims> {
        match self {
            Node::HBox(b) => Some(b.inflated),
            _ => None,
        }
    }

    pub fn width(&self) -> i32 {
        self.dims().map(|d| d.width).unwrap_or(0)
    }

    pub fn height(&self) -> i32 {
        self.dims().map(|d| d.height).unwrap_or(0)
    }

    pub fn depth(&self) -> i32 {
        self.dims().map(|d| d.depth).unwrap_or(0)
    }

    pub fn mean_line(&self) -> Option<i32> {
        match self {
            Node::HBox(b) => Some(b.mean_line),
            _ => None,
        }
    }

    pub fn weight(&self) -> Option<i32> {
        match self {
            Node::HBox(b) => Some(b.weight),
            _ => None,
        }
    }
}
