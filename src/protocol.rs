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

//! ROM programmer protocol constants

use std::io::{ErrorKind, Read};
use std::time::Duration;

/// Maximum number of bytes sent per write/acknowledge cycle
pub const CHUNK_SIZE: usize = 64;

/// Continue - device stored the chunk and wants the next one
pub const ACK_CONTINUE: u8 = b'O';

/// Done - device has all it needs, stop sending
pub const ACK_DONE: u8 = b'D';

/// Mode code that puts the device into write mode
pub const MODE_WRITE: &[u8; 2] = b"3\n";

/// Mode code that puts the device into read mode
pub const MODE_READ: &[u8; 2] = b"4\n";

pub const DEFAULT_BAUD: u32 = 57600;

/// Pause after opening the port before traffic is trustworthy
pub const OPEN_SETTLE: Duration = Duration::from_secs(2);

/// Pause before and after sending a mode code
pub const MODE_SETTLE: Duration = Duration::from_secs(2);

/// Acknowledgement sent by the device after each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Continue,
    Done,
}

impl Ack {
    /// Anything other than 'O' or 'D' is line noise and yields `None`.
    pub fn from_byte(byte: u8) -> Option<Ack> {
        match byte {
            ACK_CONTINUE => Some(Ack::Continue),
            ACK_DONE => Some(Ack::Done),
            _ => None,
        }
    }
}

/// Formats a read-back size the way a human would type it into a terminal.
pub fn size_token(size: usize) -> Vec<u8> {
    format!("{}\n", size).into_bytes()
}

/// Fills `buf` from `source` until it is full or the source is exhausted.
///
/// Returns the number of bytes placed in `buf`; anything short of `buf.len()`
/// means the source has no more data.
pub fn read_chunk<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
