//! Subsystem C/D/E of the SyncTeX parser: the node graph, the arena that
//! owns it, and form-ref proxy expansion.
//!
//! The original implementation keeps every node in a single C struct with a
//! kind tag and a union-like inline data array indexed per class (see
//! `synctex_parser_advanced.h`). We use a tagged enum over per-kind field
//! structs instead (see [`node::Node`]): the kind tag and the data live
//! together, and a `match` replaces the class descriptor table.

pub mod error;
pub mod inspect;
pub mod kind;
pub mod node;
pub mod proxy;
pub mod tree;

pub use error::{Error, Result};
pub use kind::NodeKind;
pub use node::{
    BoundaryNode, BoxBdryNode, BoxDims, BoxNode, FormNode, GlueNode, HBoxNode, InflatedDims, InputNode, KernNode,
    Links, Location, MathNode, Node, NodeId, Point, ProxyBoxNode, ProxyHBoxNode, ProxyNode, RefNode, RuleNode,
    SheetNode, VoidBoxNode,
};
pub use proxy::{expand_all_refs, expand_ref};
pub use tree::Tree;
