/// The twenty-ish node kinds a SyncTeX tree is built from (spec.md §3.1),
/// minus `Handle` (kept as a distinct type in `synctex-query` so a query
/// result can never be mistaken for a tree-owning node — see spec.md §9's
/// "Handles vs. returned nodes" design note).
///
/// The original C implementation distinguishes kinds by a bitmask
/// (`synctex_mask_root`, `synctex_mask_box`, `synctex_mask_proxy`, ...) so a
/// handful of cross-cutting questions ("is this a box", "is this a proxy")
/// can be answered in O(1) without a big match. We reproduce that as methods
/// on this enum instead of a mask table, since Rust's exhaustive `match`
/// makes the mask bits themselves unnecessary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Input,
    Sheet,
    Form,
    VBox,
    HBox,
    VoidVBox,
    VoidHBox,
    Kern,
    Glue,
    Rule,
    Math,
    Boundary,
    BoxBdry,
    Ref,
    Proxy,
    ProxyLast,
    ProxyVBox,
    ProxyHBox,
}

impl NodeKind {
    /// A root-list member (`Input`, `Sheet`, `Form`): owned directly by the
    /// scanner via `sibling`, with no `parent`.
    pub fn is_root(self) -> bool {
        matches!(self, NodeKind::Input | NodeKind::Sheet | NodeKind::Form)
    }

    /// Box family: carries width/height/depth and participates in the
    /// box-containment queries of §4.F/§4.G.
    pub fn is_box(self) -> bool {
        matches!(
            self,
            NodeKind::VBox | NodeKind::HBox | NodeKind::VoidVBox | NodeKind::VoidHBox | NodeKind::ProxyVBox | NodeKind::ProxyHBox
        )
    }

    /// Horizontal box family: accelerated by the sheet's `next_hbox` chain
    /// and carries the `_V` inflated-dimension fields.
    pub fn is_hbox(self) -> bool {
        matches!(self, NodeKind::HBox | NodeKind::VoidHBox | NodeKind::ProxyHBox)
    }

    pub fn is_vbox(self) -> bool {
        matches!(self, NodeKind::VBox | NodeKind::VoidVBox | NodeKind::ProxyVBox)
    }

    /// Void boxes have no content: `child` is always `None`.
    pub fn is_void(self) -> bool {
        matches!(self, NodeKind::VoidVBox | NodeKind::VoidHBox)
    }

    /// Proxy family: non-owning placement wrapper with an `(h, v)` offset
    /// and a `target`.
    pub fn is_proxy(self) -> bool {
        matches!(self, NodeKind::Proxy | NodeKind::ProxyLast | NodeKind::ProxyVBox | NodeKind::ProxyHBox)
    }

    /// A root proxy replacing a form ref is always a box proxy (§4.E step 2:
    /// "error otherwise" when the form's content child is not a box kind).
    pub fn is_root_proxy(self) -> bool {
        matches!(self, NodeKind::ProxyVBox | NodeKind::ProxyHBox)
    }

    /// Eligible for the friend acceleration table (§3.4 invariant 7): every
    /// primary node that is not a box, not a root-list member, carrying its
    /// own `(tag, line)`.
    pub fn is_friend_eligible(self) -> bool {
        matches!(self, NodeKind::Kern | NodeKind::Glue | NodeKind::Rule | NodeKind::Math | NodeKind::Boundary | NodeKind::BoxBdry)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Sheet => "sheet",
            NodeKind::Form => "form",
            NodeKind::VBox => "vbox",
            NodeKind::HBox => "hbox",
            NodeKind::VoidVBox => "void vbox",
            NodeKind::VoidHBox => "void hbox",
            NodeKind::Kern => "kern",
            NodeKind::Glue => "glue",
            NodeKind::Rule => "rule",
            NodeKind::Math => "math",
            NodeKind::Boundary => "boundary",
            NodeKind::BoxBdry => "box bdry",
            NodeKind::Ref => "ref",
            NodeKind::Proxy => "proxy",
            NodeKind::ProxyLast => "proxy last",
            NodeKind::ProxyVBox => "proxy vbox",
            NodeKind::ProxyHBox => "proxy hbox",
        }
    }
}
