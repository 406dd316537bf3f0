use core::fmt;

use crate::node::NodeId;

/// Errors raised while expanding form-ref proxies (§4.E). Parse-time errors
/// live in `synctex-parser`; this crate only ever fails at the "does this
/// graph make sense" layer, after the nodes already exist.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A `Ref` named a form tag with no matching `Form` root.
    MissingForm(i32),
    /// A form's content resolved to something other than a box, which §4.E
    /// step 2 treats as malformed: only a vbox or hbox can be proxied as a
    /// ref target.
    NotABox(NodeId),
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingForm(tag) => write!(f, "no form with tag {tag}"),
            Error::NotABox(_) => write!(f, "form content is not a box"),
        }
    }
}

impl std::error::Error for Error {}
