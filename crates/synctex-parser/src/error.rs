use core::fmt;

/// Fatal parse errors (spec.md §7): everything else becomes a [`crate::diagnostics::Diagnostic`]
/// and parsing continues.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Reader(synctex_reader::Error),
    /// The container stack could not be reconciled: more closes were seen
    /// than opens, in a way recovery can't paper over.
    UnbalancedContainers,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Reader(e) => write!(f, "{e}"),
            Error::UnbalancedContainers => write!(f, "container stack is unbalanced"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Reader(e) => Some(e),
            Error::UnbalancedContainers => None,
        }
    }
}

impl From<synctex_reader::Error> for Error {
    fn from(e: synctex_reader::Error) -> Self {
        Error::Reader(e)
    }
}
