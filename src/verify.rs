// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::fmt;
use std::io::Read;
use thiserror::Error;
use crate::protocol::{read_chunk, CHUNK_SIZE};

/// Half-open byte range `[start, end)` that differs from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchRange {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for MismatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes {}-{}", self.start, self.end - 1)
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("read-back ends at byte {available}, source chunk at {offset} needs {needed} bytes")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
        /// Ranges that already differed before the read-back ran out
        mismatches: Vec<MismatchRange>,
    },

    #[error("failed to re-read source: {0}")]
    Source(#[from] std::io::Error),
}

/// Compares `source` against `read_back` chunk by chunk.
///
/// Every differing chunk is reported, not just the first. A read-back shorter
/// than the source is an error rather than a mismatch, and it still carries
/// the ranges found up to that point.
pub fn verify<R: Read + ?Sized>(
    source: &mut R,
    read_back: &[u8],
) -> Result<Vec<MismatchRange>, VerifyError> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut mismatches = Vec::new();
    let mut offset = 0;

    loop {
        let len = read_chunk(source, &mut buffer)?;
        if len == 0 {
            break;
        }

        let end = offset + len;
        let Some(actual) = read_back.get(offset..end) else {
            return Err(VerifyError::Truncated {
                offset,
                needed: len,
                available: read_back.len(),
                mismatches,
            });
        };

        if actual != &buffer[..len] {
            mismatches.push(MismatchRange { start: offset, end });
        }
        offset = end;
    }

    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_identical_sequences_match() {
        for len in [0usize, 1, 64, 130, 4096] {
            let data = pattern(len);
            assert!(verify(&mut Cursor::new(&data), &data).unwrap().is_empty(), "length {}", len);
        }
    }

    #[test]
    fn test_single_chunk_difference() {
        let source = pattern(200);
        for chunk in 0..4 {
            let mut read_back = source.clone();
            let start = chunk * CHUNK_SIZE;
            let end = (start + CHUNK_SIZE).min(source.len());
            read_back[end - 1] ^= 0xFF;

            let mismatches = verify(&mut Cursor::new(&source), &read_back).unwrap();

            assert_eq!(mismatches, vec![MismatchRange { start, end }], "chunk {}", chunk);
        }
    }

    #[test]
    fn test_scan_continues_past_first_mismatch() {
        let source = pattern(256);
        let mut read_back = source.clone();
        read_back[0] ^= 1;
        read_back[200] ^= 1;

        let mismatches = verify(&mut Cursor::new(&source), &read_back).unwrap();

        assert_eq!(
            mismatches,
            vec![
                MismatchRange { start: 0, end: 64 },
                MismatchRange { start: 192, end: 256 },
            ]
        );
    }

    #[test]
    fn test_short_read_back_is_an_error() {
        let source = pattern(130);
        let read_back = &source[..100];

        match verify(&mut Cursor::new(&source), read_back) {
            Err(VerifyError::Truncated { offset, needed, available, mismatches }) => {
                assert_eq!(offset, 64);
                assert_eq!(needed, 64);
                assert_eq!(available, 100);
                assert!(mismatches.is_empty());
            }
            other => panic!("Expected truncation error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_read_back_keeps_earlier_mismatches() {
        let source = pattern(200);
        let mut read_back = source[..150].to_vec();
        read_back[0] ^= 0xFF;

        match verify(&mut Cursor::new(&source), &read_back) {
            Err(VerifyError::Truncated { offset, available, mismatches, .. }) => {
                assert_eq!(offset, 128);
                assert_eq!(available, 150);
                assert_eq!(mismatches, vec![MismatchRange { start: 0, end: 64 }]);
            }
            other => panic!("Expected truncation error, got {:?}", other),
        }
    }

    #[test]
    fn test_longer_read_back_compares_source_length_only() {
        let source = pattern(10);
        let mut read_back = source.clone();
        read_back.extend_from_slice(b"trailing");
        assert!(verify(&mut Cursor::new(&source), &read_back).unwrap().is_empty());
    }

    #[test]
    fn test_range_display_is_inclusive() {
        let range = MismatchRange { start: 64, end: 128 };
        assert_eq!(range.to_string(), "Bytes 64-127");
    }
}
