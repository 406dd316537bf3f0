use core::fmt;

/// Errors raised while reading or lexically decoding a SyncTeX file.
///
/// Mirrors the taxonomy spec.md §7 assigns to this layer: `BadArgument` and
/// `IoError` are fatal to the caller; `Eof` is acceptable in some contexts
/// (e.g. the postamble) and fatal in others, which is the caller's call to
/// make, not this crate's; `NotOk` is never fatal by itself, it just means a
/// scan predicate didn't match at the current position.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A null/invalid argument was passed (e.g. an empty match literal).
    BadArgument(&'static str),
    /// A scan predicate did not match at the current position. The cursor is
    /// left untouched.
    NotOk,
    /// End of file reached while more input was required.
    Eof,
    /// The underlying file or decompression stream failed.
    Io(std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadArgument(what) => write!(f, "bad argument: {what}"),
            Error::NotOk => write!(f, "scan predicate did not match"),
            Error::Eof => write!(f, "end of file"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Eof
        } else {
            Error::Io(e)
        }
    }
}
