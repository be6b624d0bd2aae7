//! TIFF PackBits run-length coding of bit-plane rows.
//!
//! A header byte `n` in `0..=127` is followed by `n + 1` literal bytes; a
//! header in `-127..=-1` (as `i8`) is followed by one byte repeated
//! `1 - n` times. `-128` is never produced and skipped when decoding.

use std::fmt;

/// Longest literal or repeat chunk behind one header.
const MAX_CHUNK: usize = 128;

/// Shortest run worth encoding as a repeat.
const MIN_RUN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    /// A header promised more bytes than the input holds.
    Truncated { offset: usize },
    /// Decoding produced more bytes than the row holds.
    Overflow { expected: usize },
    /// Decoding ended before the row was complete.
    Incomplete { expected: usize, actual: usize },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::Truncated { offset } => {
                write!(f, "packed data truncated at byte {}", offset)
            }
            PackError::Overflow { expected } => {
                write!(f, "packed data decodes to more than {} bytes", expected)
            }
            PackError::Incomplete { expected, actual } => {
                write!(f, "packed data decodes to {} bytes, expected {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for PackError {}

/// Length of the run of equal bytes starting at `line[start]`.
#[inline]
fn run_length(line: &[u8], start: usize) -> usize {
    let value = line[start];
    line[start..].iter().take_while(|&&b| b == value).count()
}

fn emit_literal(literal: &[u8], out: &mut Vec<u8>) {
    for chunk in literal.chunks(MAX_CHUNK) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

/// Append the PackBits encoding of `line` to `out`.
pub fn pack_bits(line: &[u8], out: &mut Vec<u8>) {
    let mut literal_start = 0;
    let mut i = 0;
    while i < line.len() {
        let run = run_length(line, i);
        if run < MIN_RUN {
            i += run;
            continue;
        }

        emit_literal(&line[literal_start..i], out);
        let value = line[i];
        let mut remaining = run;
        while remaining > 0 {
            let chunk = remaining.min(MAX_CHUNK);
            out.push((1 - chunk as i32) as i8 as u8);
            out.push(value);
            remaining -= chunk;
        }
        i += run;
        literal_start = i;
    }
    emit_literal(&line[literal_start..], out);
}

/// Decode one packed row of exactly `expected_len` bytes.
pub fn unpack_bits(data: &[u8], expected_len: usize) -> Result<Vec<u8>, PackError> {
    let (out, used) = unpack_row(data, expected_len)?;
    if used != data.len() {
        return Err(PackError::Overflow {
            expected: expected_len,
        });
    }
    Ok(out)
}

/// Decode the first row of `expected_len` bytes from a run of packed rows.
///
/// Returns the row and the number of packed bytes it occupied.
pub fn unpack_row(data: &[u8], expected_len: usize) -> Result<(Vec<u8>, usize), PackError> {
    let mut out = Vec::with_capacity(expected_len);
    let mut pos = 0;
    while pos < data.len() && out.len() < expected_len {
        let header = data[pos] as i8;
        pos += 1;
        match header {
            0..=127 => {
                let count = header as usize + 1;
                let bytes = data
                    .get(pos..pos + count)
                    .ok_or(PackError::Truncated { offset: pos })?;
                out.extend_from_slice(bytes);
                pos += count;
            }
            -128 => {}
            _ => {
                let count = (1 - header as i32) as usize;
                let value = *data.get(pos).ok_or(PackError::Truncated { offset: pos })?;
                out.resize(out.len() + count, value);
                pos += 1;
            }
        }
        if out.len() > expected_len {
            return Err(PackError::Overflow {
                expected: expected_len,
            });
        }
    }
    if out.len() != expected_len {
        return Err(PackError::Incomplete {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok((out, pos))
}

/// Packed form of an all-zero row of `width_bytes` bytes.
pub fn blank_row(width_bytes: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * width_bytes.div_ceil(MAX_CHUNK) + 2);
    pack_bits(&vec![0u8; width_bytes], &mut out);
    out
}
