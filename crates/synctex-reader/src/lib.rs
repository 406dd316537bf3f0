//! Buffered, gzip-transparent reader and lexical decoders for the SyncTeX
//! line-structured text format.
//!
//! This crate implements subsystems A (Reader) and B (lexical decoders) of
//! the SyncTeX parser: a bounded buffer that re-reads from the underlying
//! file whenever a token straddles the buffer boundary, and the handful of
//! scanners (`decode_int`, `decode_dimensioned_float`, ...) that the tree
//! grammar parser builds on.

mod decode;
mod error;
mod reader;

pub use decode::{decode_dimensioned_float, decode_int, decode_int_opt, decode_int_v, decode_string, Unit};
pub use error::{Error, Result};
pub use reader::{MatchOutcome, Reader, SYNCTEX_BUFFER_MIN_SIZE};

/// Default buffer size for a [`Reader`], matching the original implementation's
/// default (32 KiB). Never grows past this: growth is disallowed so a
/// pathological file cannot cause unbounded memory amplification.
pub const SYNCTEX_BUFFER_SIZE: usize = 32 * 1024;
