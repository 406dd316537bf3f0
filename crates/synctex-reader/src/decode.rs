//! §4.B lexical decoders. All scan at the reader's cursor; on success they
//! advance the cursor and return the value, on failure they leave the
//! cursor exactly where it was.

use crate::error::{Error, Result};
use crate::reader::Reader;

/// A TeX dimension unit suffix, and the scaled-point conversion factor for
/// it (spec.md §4.B). `sp` is the identity; everything else is expressed in
/// terms of a TeX point (`65536` scaled points).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    In,
    Cm,
    Mm,
    Pt,
    Bp,
    Pc,
    Sp,
    Dd,
    Cc,
    Nd,
    Nc,
}

impl Unit {
    fn from_suffix(suffix: [u8; 2]) -> Option<Self> {
        Some(match &suffix {
            b"in" => Unit::In,
            b"cm" => Unit::Cm,
            b"mm" => Unit::Mm,
            b"pt" => Unit::Pt,
            b"bp" => Unit::Bp,
            b"pc" => Unit::Pc,
            b"sp" => Unit::Sp,
            b"dd" => Unit::Dd,
            b"cc" => Unit::Cc,
            b"nd" => Unit::Nd,
            b"nc" => Unit::Nc,
            _ => return None,
        })
    }

    /// Scaled points per unit of this dimension.
    pub fn factor(self) -> f64 {
        const PT: f64 = 65536.0;
        match self {
            Unit::In => 72.27 * PT,
            Unit::Cm => 72.27 * PT / 2.54,
            Unit::Mm => 72.27 * PT / 25.4,
            Unit::Pt => PT,
            Unit::Bp => 72.27 / 72.0 * PT,
            Unit::Pc => 12.0 * PT,
            Unit::Sp => 1.0,
            Unit::Dd => 1238.0 / 1157.0 * PT,
            Unit::Cc => 14856.0 / 1157.0 * PT,
            Unit::Nd => 685.0 / 642.0 * PT,
            Unit::Nc => 1370.0 / 107.0 * PT,
        }
    }
}

/// Consume one leading `:` or `,` separator, if present.
fn skip_separator(reader: &mut Reader) -> Result<()> {
    if matches!(reader.peek()?, Some(b':') | Some(b',')) {
        reader.advance(1);
    }
    Ok(())
}

/// Scan a run of bytes matching `pred` starting at `cur`, without advancing;
/// returns the matched bytes.
fn scan_while(reader: &mut Reader, mut pred: impl FnMut(u8) -> bool) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        match reader.peek_at(out.len())? {
            Some(b) if pred(b) => out.push(b),
            _ => break,
        }
    }
    Ok(out)
}

fn raw_decode_int(reader: &mut Reader) -> Result<i32> {
    let mut len = 0usize;
    if matches!(reader.peek_at(0)?, Some(b'-') | Some(b'+')) {
        len = 1;
    }
    let digits_start = len;
    while matches!(reader.peek_at(len)?, Some(b) if b.is_ascii_digit()) {
        len += 1;
    }
    if len == digits_start {
        return Err(Error::NotOk);
    }
    let mut bytes = Vec::with_capacity(len);
    for i in 0..len {
        bytes.push(reader.peek_at(i)?.expect("already bounds-checked"));
    }
    let text = std::str::from_utf8(&bytes).map_err(|_| Error::NotOk)?;
    let value: i32 = text.parse().map_err(|_| Error::NotOk)?;
    reader.advance(len);
    Ok(value)
}

fn raw_decode_float(reader: &mut Reader) -> Result<f64> {
    let mut len = 0usize;
    if matches!(reader.peek_at(0)?, Some(b'-') | Some(b'+')) {
        len = 1;
    }
    let mut saw_digit = false;
    while matches!(reader.peek_at(len)?, Some(b) if b.is_ascii_digit()) {
        len += 1;
        saw_digit = true;
    }
    if matches!(reader.peek_at(len)?, Some(b'.')) {
        len += 1;
        while matches!(reader.peek_at(len)?, Some(b) if b.is_ascii_digit()) {
            len += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return Err(Error::NotOk);
    }
    let mut bytes = Vec::with_capacity(len);
    for i in 0..len {
        bytes.push(reader.peek_at(i)?.expect("already bounds-checked"));
    }
    let text = std::str::from_utf8(&bytes).map_err(|_| Error::NotOk)?;
    let value: f64 = text.parse().map_err(|_| Error::NotOk)?;
    reader.advance(len);
    Ok(value)
}

/// `decode_int`: optionally consume one `:` or `,`, then parse a signed
/// decimal integer.
pub fn decode_int(reader: &mut Reader) -> Result<i32> {
    let origin = reader.offset();
    skip_separator(reader)?;
    match raw_decode_int(reader) {
        Ok(v) => Ok(v),
        Err(e) => {
            reader.rewind_to(origin);
            Err(e)
        }
    }
}

/// `decode_int_opt`: the optional `column` field. If the next byte is `,`,
/// an integer is required after it; otherwise `default` is returned without
/// consuming anything.
pub fn decode_int_opt(reader: &mut Reader, default: i32) -> Result<i32> {
    if !matches!(reader.peek()?, Some(b',')) {
        return Ok(default);
    }
    let origin = reader.offset();
    reader.advance(1);
    match raw_decode_int(reader) {
        Ok(v) => Ok(v),
        Err(e) => {
            reader.rewind_to(origin);
            Err(e)
        }
    }
}

/// `decode_int_v`: parse an integer, or, if the separator is immediately
/// followed by `=`, reuse the most recently decoded `v` coordinate.
pub fn decode_int_v(reader: &mut Reader, last_v: &mut Option<i32>) -> Result<i32> {
    let origin = reader.offset();
    skip_separator(reader)?;
    if matches!(reader.peek()?, Some(b'=')) {
        reader.advance(1);
        return match *last_v {
            Some(v) => Ok(v),
            None => {
                reader.rewind_to(origin);
                Err(Error::NotOk)
            }
        };
    }
    match raw_decode_int(reader) {
        Ok(v) => {
            *last_v = Some(v);
            Ok(v)
        }
        Err(e) => {
            reader.rewind_to(origin);
            Err(e)
        }
    }
}

/// `decode_string`: consume up to (not including) `\n`, trimming trailing
/// ASCII spaces.
pub fn decode_string(reader: &mut Reader) -> Result<String> {
    let mut bytes = scan_while(reader, |b| b != b'\n')?;
    reader.advance(bytes.len());
    while bytes.last() == Some(&b' ') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|_| Error::NotOk)
}

/// `decode_dimensioned_float`: a decimal float followed by one of the unit
/// suffixes in [`Unit`], converted to scaled points.
pub fn decode_dimensioned_float(reader: &mut Reader) -> Result<i32> {
    let origin = reader.offset();
    let value = match raw_decode_float(reader) {
        Ok(v) => v,
        Err(e) => {
            reader.rewind_to(origin);
            return Err(e);
        }
    };
    let suffix = [reader.peek_at(0)?, reader.peek_at(1)?];
    let (a, b) = match suffix {
        [Some(a), Some(b)] => (a, b),
        _ => {
            reader.rewind_to(origin);
            return Err(Error::NotOk);
        }
    };
    let Some(unit) = Unit::from_suffix([a.to_ascii_lowercase(), b.to_ascii_lowercase()]) else {
        reader.rewind_to(origin);
        return Err(Error::NotOk);
    };
    reader.advance(2);
    Ok((value * unit.factor()).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn reader_for(bytes: &[u8]) -> Reader {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        let path = f.into_temp_path();
        let path = path.keep().unwrap();
        Reader::open(path).unwrap()
    }

    #[test]
    fn decode_int_with_colon_separator() {
        let mut r = reader_for(b":1234rest");
        assert_eq!(decode_int(&mut r).unwrap(), 1234);
    }

    #[test]
    fn decode_int_negative_no_separator() {
        let mut r = reader_for(b"-42,");
        assert_eq!(decode_int(&mut r).unwrap(), -42);
    }

    #[test]
    fn decode_int_opt_absent_returns_default() {
        let mut r = reader_for(b":200");
        assert_eq!(decode_int_opt(&mut r, -1).unwrap(), -1);
        // Cursor untouched: the leading `:` is still there for decode_int.
        assert_eq!(decode_int(&mut r).unwrap(), 200);
    }

    #[test]
    fn decode_int_v_reuses_last_value() {
        let mut r = reader_for(b",=rest");
        let mut last_v = Some(7);
        assert_eq!(decode_int_v(&mut r, &mut last_v).unwrap(), 7);
    }

    #[test]
    fn decode_int_v_updates_last_value() {
        let mut r = reader_for(b",99rest");
        let mut last_v = None;
        assert_eq!(decode_int_v(&mut r, &mut last_v).unwrap(), 99);
        assert_eq!(last_v, Some(99));
    }

    #[test]
    fn decode_string_trims_trailing_spaces() {
        let mut r = reader_for(b"./path with spaces.tex   \nnext");
        assert_eq!(decode_string(&mut r).unwrap(), "./path with spaces.tex");
    }

    #[test]
    fn decode_dimensioned_float_pt() {
        let mut r = reader_for(b"1pt");
        assert_eq!(decode_dimensioned_float(&mut r).unwrap(), 65536);
    }

    #[test]
    fn decode_dimensioned_float_sp_identity() {
        let mut r = reader_for(b"65536sp");
        assert_eq!(decode_dimensioned_float(&mut r).unwrap(), 65536);
    }

    #[test]
    fn decode_dimensioned_float_rejects_unknown_unit() {
        let mut r = reader_for(b"1xx");
        assert!(decode_dimensioned_float(&mut r).is_err());
    }
}
