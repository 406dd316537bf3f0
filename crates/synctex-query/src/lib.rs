//! Geometric utilities, the edit/display query engine, result handles and
//! vispectors (spec.md §4.F–§4.H) layered on top of a parsed
//! [`synctex_model::Tree`].

mod geom;
mod handle;
mod query;
mod vispect;

pub use geom::{box_dist, h_dist, is_box_kind, is_hbox_kind, point_in_box, smaller_container, v_dist};
pub use handle::{Handle, HandleId, HandleTree, QueryIterator};
pub use query::{display_query, edit_query};
pub use vispect::{visible_depth, visible_h, visible_height, visible_v, visible_width};
