//! Compressed integers and sequence point blobs in the Portable PDB encoding.
//!
//! Blob layout:
//! ```text
//! header:  local signature (compressed u32), initial document (compressed u32)
//! record:  δIL offset, then either
//!          document record - δIL == 0 (not first record), new document (compressed u32)
//!          hidden point    - δLines == 0, δColumns == 0
//!          sequence point  - δLines (u32), δColumns (u32 if δLines == 0 else i32),
//!                            start line, start column (u32 for first visible point,
//!                            i32 deltas against previous visible point otherwise)
//! ```
//! Documents are 1-based rows in the blob, 0-based indexes in [`SequencePoint::document`].

use crate::debugger::error::Error;
use crate::debugger::symbol::SequencePoint;
use bytes::{Buf, BufMut};

/// Start line of a hidden (compiler generated) sequence point.
pub const HIDDEN_LINE: u32 = 0xFEEFEE;

const MAX_1_BYTE: u32 = 0x7F;
const MAX_2_BYTE: u32 = 0x3FFF;
const MAX_4_BYTE: u32 = 0x1FFF_FFFF;

fn malformed(what: &str) -> Error {
    Error::SymbolParse(format!("malformed {what}"))
}

pub fn read_compressed_u32(buf: &mut impl Buf) -> Result<u32, Error> {
    read_compressed_raw(buf).map(|(value, _)| value)
}

/// Read compressed unsigned integer, return value and its width in bits.
fn read_compressed_raw(buf: &mut impl Buf) -> Result<(u32, u32), Error> {
    if !buf.has_remaining() {
        return Err(malformed("compressed integer"));
    }
    let b0 = buf.get_u8() as u32;
    if b0 & 0x80 == 0 {
        return Ok((b0, 7));
    }
    if b0 & 0xC0 == 0x80 {
        if buf.remaining() < 1 {
            return Err(malformed("compressed integer"));
        }
        let b1 = buf.get_u8() as u32;
        return Ok((((b0 & 0x3F) << 8) | b1, 14));
    }
    if b0 & 0xE0 == 0xC0 {
        if buf.remaining() < 3 {
            return Err(malformed("compressed integer"));
        }
        let rest = [buf.get_u8(), buf.get_u8(), buf.get_u8()];
        let value = ((b0 & 0x1F) << 24)
            | ((rest[0] as u32) << 16)
            | ((rest[1] as u32) << 8)
            | rest[2] as u32;
        return Ok((value, 29));
    }
    Err(malformed("compressed integer"))
}

pub fn read_compressed_i32(buf: &mut impl Buf) -> Result<i32, Error> {
    let (raw, width) = read_compressed_raw(buf)?;
    let value = raw >> 1;
    if raw & 1 == 0 {
        return Ok(value as i32);
    }
    let sign_ext = match width {
        7 => 0xFFFF_FFC0,
        14 => 0xFFFF_E000,
        _ => 0xF000_0000,
    };
    Ok((value | sign_ext) as i32)
}

pub fn write_compressed_u32(buf: &mut impl BufMut, value: u32) -> Result<(), Error> {
    match value {
        0..=MAX_1_BYTE => buf.put_u8(value as u8),
        0x80..=MAX_2_BYTE => buf.put_u16(0x8000 | value as u16),
        0x4000..=MAX_4_BYTE => buf.put_u32(0xC000_0000 | value),
        _ => {
            return Err(Error::SymbolParse(format!(
                "{value} too large for compressed integer"
            )))
        }
    }
    Ok(())
}

pub fn write_compressed_i32(buf: &mut impl BufMut, value: i32) -> Result<(), Error> {
    let sign = (value < 0) as u32;
    match value {
        -0x40..=0x3F => buf.put_u8(((((value as u32) << 1) & 0x7F) | sign) as u8),
        -0x2000..=0x1FFF => {
            buf.put_u16(0x8000 | ((((value as u32) << 1) & 0x3FFF) | sign) as u16)
        }
        -0x1000_0000..=0x0FFF_FFFF => {
            buf.put_u32(0xC000_0000 | (((value as u32) << 1) & 0x1FFF_FFFF) | sign)
        }
        _ => {
            return Err(Error::SymbolParse(format!(
                "{value} too large for compressed integer"
            )))
        }
    }
    Ok(())
}

fn document_index(row: u32) -> Result<usize, Error> {
    if row == 0 {
        return Err(malformed("document reference"));
    }
    Ok(row as usize - 1)
}

/// Decode sequence points blob. Points are returned in ascending offset order.
pub fn decode_sequence_points(mut blob: &[u8]) -> Result<Vec<SequencePoint>, Error> {
    let _local_signature = read_compressed_u32(&mut blob)?;
    let mut document = document_index(read_compressed_u32(&mut blob)?)?;

    let mut points: Vec<SequencePoint> = vec![];
    let mut offset = 0u32;
    let mut prev_visible: Option<(u32, u32)> = None;

    while blob.has_remaining() {
        let delta_offset = read_compressed_u32(&mut blob)?;
        let first = points.is_empty();
        if delta_offset == 0 && !first {
            document = document_index(read_compressed_u32(&mut blob)?)?;
            continue;
        }
        offset = offset
            .checked_add(delta_offset)
            .ok_or_else(|| malformed("instruction offset"))?;

        let delta_lines = read_compressed_u32(&mut blob)?;
        let delta_columns = if delta_lines == 0 {
            read_compressed_u32(&mut blob)? as i64
        } else {
            read_compressed_i32(&mut blob)? as i64
        };

        if delta_lines == 0 && delta_columns == 0 {
            points.push(SequencePoint::hidden(offset, document));
            continue;
        }

        let (start_line, start_column) = match prev_visible {
            None => (
                read_compressed_u32(&mut blob)? as i64,
                read_compressed_u32(&mut blob)? as i64,
            ),
            Some((line, column)) => (
                line as i64 + read_compressed_i32(&mut blob)? as i64,
                column as i64 + read_compressed_i32(&mut blob)? as i64,
            ),
        };
        let position = |v: i64| u32::try_from(v).map_err(|_| malformed("sequence point position"));
        let end_line = position(start_line + delta_lines as i64)?;
        let end_column = position(start_column + delta_columns)?;
        let start_line = position(start_line)?;
        let start_column = position(start_column)?;

        prev_visible = Some((start_line, start_column));
        points.push(SequencePoint {
            offset,
            document,
            start_line,
            start_column,
            end_line,
            end_column,
        });
    }

    Ok(points)
}

/// Encode sequence points blob. Points must be ordered by strictly ascending offset
/// and visible points must have non empty span.
pub fn encode_sequence_points(points: &[SequencePoint]) -> Result<Vec<u8>, Error> {
    let mut blob = vec![];
    let mut document = points.first().map(|p| p.document).unwrap_or_default();
    write_compressed_u32(&mut blob, 0)?;
    write_compressed_u32(&mut blob, document as u32 + 1)?;

    let mut prev_offset: Option<u32> = None;
    let mut prev_visible: Option<(u32, u32)> = None;
    for sp in points {
        let delta_offset = match prev_offset {
            None => sp.offset,
            Some(prev) if sp.offset > prev => sp.offset - prev,
            Some(_) => {
                return Err(Error::SymbolParse(format!(
                    "sequence point offsets must ascend (offset {})",
                    sp.offset
                )))
            }
        };
        if sp.document != document && prev_offset.is_some() {
            write_compressed_u32(&mut blob, 0)?;
            write_compressed_u32(&mut blob, sp.document as u32 + 1)?;
            document = sp.document;
        }
        write_compressed_u32(&mut blob, delta_offset)?;
        prev_offset = Some(sp.offset);

        if sp.is_hidden() {
            write_compressed_u32(&mut blob, 0)?;
            write_compressed_u32(&mut blob, 0)?;
            continue;
        }

        let delta_lines = sp.end_line.checked_sub(sp.start_line).ok_or_else(|| {
            Error::SymbolParse(format!("sequence point at {} ends before start", sp.offset))
        })?;
        let delta_columns = sp.end_column as i64 - sp.start_column as i64;
        if delta_lines == 0 && delta_columns <= 0 {
            return Err(Error::SymbolParse(format!(
                "sequence point at {} has empty span",
                sp.offset
            )));
        }
        write_compressed_u32(&mut blob, delta_lines)?;
        if delta_lines == 0 {
            write_compressed_u32(&mut blob, delta_columns as u32)?;
        } else {
            write_compressed_i32(&mut blob, delta_columns as i32)?;
        }

        match prev_visible {
            None => {
                write_compressed_u32(&mut blob, sp.start_line)?;
                write_compressed_u32(&mut blob, sp.start_column)?;
            }
            Some((line, column)) => {
                write_compressed_i32(&mut blob, sp.start_line as i32 - line as i32)?;
                write_compressed_i32(&mut blob, sp.start_column as i32 - column as i32)?;
            }
        }
        prev_visible = Some((sp.start_line, sp.start_column));
    }

    Ok(blob)
}
