use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::trace;

use crate::error::{Error, Result};

/// Buffers never shrink below this size (§4.A).
pub const SYNCTEX_BUFFER_MIN_SIZE: usize = 32;

/// Outcome of [`Reader::match_literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    NotMatched,
}

/// A bounded, gzip-transparent buffer over a SyncTeX file.
///
/// Owns the underlying (possibly gzipped) handle, a heap buffer of fixed
/// capacity plus a one-byte NUL terminator, and three cursors
/// `start <= cur <= end` into that buffer. `charindex_offset` is the
/// absolute file offset of `start`, so `charindex_offset + (cur - start)` is
/// always the absolute offset of the byte at `cur`.
pub struct Reader {
    source: Box<dyn Read>,
    path: PathBuf,
    buffer: Vec<u8>,
    capacity: usize,
    start: usize,
    cur: usize,
    end: usize,
    charindex_offset: u64,
    line_number: u32,
    at_eof: bool,
}

impl Reader {
    /// Open `path`, transparently decompressing if it ends in `.gz`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(path, crate::SYNCTEX_BUFFER_SIZE)
    }

    pub fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let capacity = capacity.max(SYNCTEX_BUFFER_MIN_SIZE);
        let file = File::open(&path)?;
        let is_gz = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("gz")).unwrap_or(false);
        let source: Box<dyn Read> = if is_gz { Box::new(GzDecoder::new(file)) } else { Box::new(file) };
        let mut buffer = vec![0u8; capacity + 1];
        buffer[capacity] = 0;
        Ok(Self {
            source,
            path,
            buffer,
            capacity,
            start: 0,
            cur: 0,
            end: 0,
            charindex_offset: 0,
            line_number: 0,
            at_eof: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based line number of the line currently under the cursor.
    pub fn line_number(&self) -> u32 {
        self.line_number.max(1)
    }

    /// Absolute byte offset in the decoded stream of the current cursor.
    pub fn char_index(&self) -> u32 {
        (self.charindex_offset + (self.cur - self.start) as u64) as u32
    }

    fn available(&self) -> usize {
        self.end - self.cur
    }

    /// §4.A `ensure_available`: guarantee at least `n` bytes are readable
    /// from `cur` without crossing `end`, refilling the buffer from the
    /// underlying file if necessary. Returns the number of bytes actually
    /// available (may be less than `n` only at EOF).
    pub fn ensure_available(&mut self, n: usize) -> Result<usize> {
        if self.available() >= n || self.at_eof {
            return Ok(self.available());
        }
        // Slide [cur, end) down to [start, start+k).
        let k = self.end - self.cur;
        self.buffer.copy_within(self.cur..self.end, self.start);
        self.charindex_offset += (self.cur - self.start) as u64;
        self.cur = self.start;
        self.end = self.start + k;

        loop {
            let room = self.capacity - (self.end - self.start);
            if room == 0 || self.available() >= n {
                break;
            }
            let dst_start = self.end;
            let read = self.source.read(&mut self.buffer[dst_start..dst_start + room])?;
            trace!(read, "refilled synctex reader buffer");
            if read == 0 {
                self.at_eof = true;
                break;
            }
            self.end += read;
        }
        self.buffer[self.end] = 0;
        Ok(self.available())
    }

    /// Byte at `cur + offset`, without advancing, refilling as needed.
    pub fn peek_at(&mut self, offset: usize) -> Result<Option<u8>> {
        self.ensure_available(offset + 1)?;
        Ok(self.buffer.get(self.cur + offset).copied().filter(|_| self.cur + offset < self.end))
    }

    pub fn peek(&mut self) -> Result<Option<u8>> {
        self.peek_at(0)
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.cur += n;
    }

    pub(crate) fn cur_slice(&self) -> &[u8] {
        &self.buffer[self.cur..self.end]
    }

    pub(crate) fn offset(&self) -> u64 {
        self.charindex_offset + (self.cur - self.start) as u64
    }

    /// Restore the cursor to a previously observed absolute offset, provided
    /// it still lies within the current buffer window (always true for the
    /// rewinds `match_literal` performs, since it never reads past the
    /// bytes it is comparing).
    pub(crate) fn rewind_to(&mut self, offset: u64) {
        debug_assert!(offset >= self.charindex_offset);
        self.cur = self.start + (offset - self.charindex_offset) as usize;
    }

    /// §4.A `next_line`: advance past the next `\n`, incrementing the line
    /// counter. Fails with `Eof` if no more lines remain.
    pub fn next_line(&mut self) -> Result<()> {
        loop {
            self.ensure_available(1)?;
            if self.available() == 0 {
                return Err(Error::Eof);
            }
            if let Some(pos) = self.cur_slice().iter().position(|&b| b == b'\n') {
                self.advance(pos + 1);
                self.line_number += 1;
                return Ok(());
            }
            // No newline in the current window: consume what we have and
            // force a refill to pull in more.
            let have = self.available();
            self.advance(have);
            if self.at_eof {
                self.line_number += 1;
                return Ok(());
            }
        }
    }

    /// §4.A `match_literal`: rewindable exact-match of `s` at the cursor.
    pub fn match_literal(&mut self, s: &[u8]) -> Result<MatchOutcome> {
        if s.is_empty() {
            return Err(Error::BadArgument("match_literal: empty literal"));
        }
        let origin = self.offset();
        self.ensure_available(s.len())?;
        let got = self.cur_slice();
        let n = got.len().min(s.len());
        if got[..n] != s[..n] {
            self.rewind_to(origin);
            return Ok(MatchOutcome::NotMatched);
        }
        if n < s.len() {
            // Buffer was shorter than the literal even after a refill: EOF.
            self.rewind_to(origin);
            return Err(Error::Eof);
        }
        self.advance(s.len());
        Ok(MatchOutcome::Matched)
    }

    /// Consume bytes up to (not including) the next `\n`, without allocating
    /// the result — used for `c`/`!`/`%` records that the parser discards.
    pub fn skip_to_eol(&mut self) -> Result<()> {
        loop {
            self.ensure_available(1)?;
            if self.available() == 0 {
                return Ok(());
            }
            match self.cur_slice().iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.advance(pos);
                    return Ok(());
                }
                None => {
                    let have = self.available();
                    self.advance(have);
                    if self.at_eof {
                        return Ok(());
                    }
                }
            }
        }
    }

    pub fn is_eof(&mut self) -> Result<bool> {
        Ok(self.ensure_available(1)? == 0)
    }
}
